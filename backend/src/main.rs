//! Certificate Issuance Service - Backend Server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use certificate_backend::external::{DiskFileStore, LogMailer, Mailer, SmtpMailer};
use certificate_backend::repository::PgStore;
use certificate_backend::services::AssetCatalogue;
use certificate_backend::{config, create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certificate_backend=debug,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    tracing::info!("Starting Certificate Issuance Server");
    tracing::info!("Environment: {}", config.environment);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    let mailer: Arc<dyn Mailer> = if config.mail.enabled {
        tracing::info!("SMTP relay {}:{}", config.mail.smtp_host, config.mail.smtp_port);
        Arc::new(SmtpMailer::new(&config.mail)?)
    } else {
        tracing::info!("Mail disabled, messages are only logged");
        Arc::new(LogMailer)
    };

    // Create application state
    let store = Arc::new(PgStore::new(db_pool.clone()));
    let state = AppState {
        certificates: store.clone(),
        gradebook: store.clone(),
        directory: store,
        files: Arc::new(DiskFileStore::new(db_pool, config.storage.root.clone())),
        mailer,
        assets: AssetCatalogue::new(config.assets.root.clone()),
        config: Arc::new(config.clone()),
    };

    // Build application
    let app = create_app(state);

    // Start server
    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
