//! HTTP handlers for viewing certificates and their stored files

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::{Attempt, UserOutline};
use crate::services::access::{AccessService, Permissions};
use crate::services::certificate::CertificateService;
use crate::services::workflow::{CertificateWorkflow, ViewOutcome};
use crate::AppState;

/// Response body when the certificate went out by e-mail
#[derive(Debug, Serialize)]
pub struct EmailedResponse {
    pub issue_id: i64,
    pub sent: bool,
    pub message: String,
}

pub(crate) fn pdf_response(file_name: &str, pdf: Vec<u8>, attachment: bool) -> Response {
    let disposition = format!(
        "{}; filename=\"{}\"",
        if attachment { "attachment" } else { "inline" },
        file_name.replace('"', "")
    );
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response()
}

pub(crate) fn admin_service(state: &AppState) -> CertificateService {
    CertificateService::new(
        state.certificates.clone(),
        state.gradebook.clone(),
        state.files.clone(),
        state.assets.clone(),
    )
}

// ============================================================================
// Viewing
// ============================================================================

/// View a certificate: issue it on first view, then deliver the PDF
pub async fn view_certificate(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(cm_id): Path<i64>,
) -> AppResult<Response> {
    let workflow = CertificateWorkflow::new(&state);
    let result = workflow.view(current_user.0.user_id, cm_id).await?;

    let response = match result.outcome {
        ViewOutcome::Inline { file_name, pdf } => pdf_response(&file_name, pdf, false),
        ViewOutcome::Download { file_name, pdf } => pdf_response(&file_name, pdf, true),
        ViewOutcome::Emailed { sent } => Json(EmailedResponse {
            issue_id: result.issue.id,
            sent,
            message: if sent {
                "Your certificate has been emailed".to_string()
            } else {
                "Your certificate was already emailed".to_string()
            },
        })
        .into_response(),
    };
    Ok(response)
}

/// List the caller's own issues of a certificate
pub async fn list_attempts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(cm_id): Path<i64>,
) -> AppResult<Json<Vec<Attempt>>> {
    let (ctx, definition) = AccessService::new(&state)
        .authorize(current_user.0.user_id, cm_id)
        .await?;
    ctx.permissions.require_view()?;

    let attempts = admin_service(&state).attempts(&definition, ctx.user.id).await?;
    Ok(Json(attempts))
}

/// Issued or not issued, for one user
pub async fn user_outline(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((cm_id, user_id)): Path<(i64, i64)>,
) -> AppResult<Json<UserOutline>> {
    let (ctx, definition) = AccessService::new(&state)
        .authorize(current_user.0.user_id, cm_id)
        .await?;
    if ctx.user.id == user_id {
        ctx.permissions.require_view()?;
    } else {
        ctx.permissions.require_manage()?;
    }

    let outline = admin_service(&state).user_outline(&definition, user_id).await?;
    Ok(Json(outline))
}

// ============================================================================
// Stored files
// ============================================================================

/// Download a stored certificate by its content hash
///
/// Only the owner of the file or a manager of its course module may fetch it.
pub async fn download_file(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(hash): Path<String>,
) -> AppResult<Response> {
    let file = state
        .files
        .find_by_hash(&hash)
        .await?
        .ok_or_else(|| AppError::NotFound("File".to_string()))?;

    let caller = current_user.0.user_id;
    if file.user_id != caller {
        let capabilities = state
            .directory
            .user_capabilities(file.key.context_id, caller)
            .await?;
        Permissions::from_capabilities(&capabilities).require_manage()?;
    }

    let content = state.files.read(&file).await?;
    tracing::info!(hash = %file.content_hash, user_id = caller, "Stored certificate downloaded");
    Ok(pdf_response(&file.key.file_name, content, true))
}
