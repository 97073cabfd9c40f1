//! Certificate issuance service
//!
//! Issues course completion certificates as PDF documents, notifies
//! teachers, and reports on issued certificates.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;

pub use config::Config;

use external::{FileStore, Mailer};
use repository::{CertificateRepository, Directory, Gradebook};
use services::AssetCatalogue;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub certificates: Arc<dyn CertificateRepository>,
    pub gradebook: Arc<dyn Gradebook>,
    pub directory: Arc<dyn Directory>,
    pub files: Arc<dyn FileStore>,
    pub mailer: Arc<dyn Mailer>,
    /// Picture directories, with each definition's resolved slots
    pub assets: AssetCatalogue,
    pub config: Arc<Config>,
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Certificate Issuance Service API v1.0"
}
