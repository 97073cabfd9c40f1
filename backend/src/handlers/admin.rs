//! HTTP handlers for certificate administration

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::{AppError, AppResult};
use crate::handlers::certificate::admin_service;
use crate::middleware::{AuthUser, CurrentUser};
use crate::models::{capability, CertificateDefinition};
use crate::services::access::Permissions;
use crate::services::certificate::{
    CertificateInput, CreateCertificateInput, CreatedCertificate, ResetStatus, SettingsOptions,
};
use crate::AppState;

/// Course editing is granted by the token issuer
fn require_course_update(user: &AuthUser) -> AppResult<()> {
    if user.has_permission(capability::COURSE_UPDATE) {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

/// Managers of the certificate's module, or course editors
async fn require_certificate_admin(state: &AppState, user: &AuthUser, certificate_id: i64) -> AppResult<()> {
    if user.has_permission(capability::COURSE_UPDATE) {
        return Ok(());
    }
    let module = state
        .certificates
        .find_module_for_certificate(certificate_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Certificate".to_string()))?;
    let capabilities = state.directory.user_capabilities(module.id, user.user_id).await?;
    Permissions::from_capabilities(&capabilities).require_manage()
}

// ============================================================================
// Definitions
// ============================================================================

/// Create a certificate activity in a course
pub async fn create_certificate(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateCertificateInput>,
) -> AppResult<(StatusCode, Json<CreatedCertificate>)> {
    require_course_update(&current_user.0)?;
    let created = admin_service(&state).create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a certificate's settings
pub async fn update_certificate(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(certificate_id): Path<i64>,
    Json(input): Json<CertificateInput>,
) -> AppResult<Json<CertificateDefinition>> {
    require_certificate_admin(&state, &current_user.0, certificate_id).await?;
    let definition = admin_service(&state).update(certificate_id, input).await?;
    Ok(Json(definition))
}

/// Delete a certificate with its issues and stored files
pub async fn delete_certificate(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(certificate_id): Path<i64>,
) -> AppResult<StatusCode> {
    require_certificate_admin(&state, &current_user.0, certificate_id).await?;
    admin_service(&state).delete(certificate_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Course level
// ============================================================================

/// Remove all issued certificates of a course
pub async fn reset_course(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(course_id): Path<i64>,
) -> AppResult<Json<Vec<ResetStatus>>> {
    require_course_update(&current_user.0)?;
    let status = admin_service(&state).reset_course(course_id).await?;
    Ok(Json(status))
}

/// Choice lists for the settings form of a course
pub async fn settings_options(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(course_id): Path<i64>,
) -> AppResult<Json<SettingsOptions>> {
    require_course_update(&current_user.0)?;
    let options = admin_service(&state).settings_options(course_id).await?;
    Ok(Json(options))
}
