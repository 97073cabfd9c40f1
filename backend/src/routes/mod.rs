//! Route definitions for the certificate issuance service

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - certificates
        .nest("/certificates", certificate_routes(state))
}

/// Certificate routes (protected)
fn certificate_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_certificate))
        .route(
            "/:id",
            put(handlers::update_certificate).delete(handlers::delete_certificate),
        )
        .route("/modules/:cm", get(handlers::view_certificate))
        .route("/modules/:cm/attempts", get(handlers::list_attempts))
        .route("/modules/:cm/outline/:user", get(handlers::user_outline))
        .route("/modules/:cm/report", get(handlers::get_report))
        .route("/files/:hash", get(handlers::download_file))
        .route("/options/:course", get(handlers::settings_options))
        .route("/reset/:course", post(handlers::reset_course))
        .layer(middleware::from_fn_with_state(state, auth_middleware))
}
