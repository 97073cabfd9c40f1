//! Configuration management for the certificate issuance service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with CERT_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Outgoing mail configuration
    pub mail: MailConfig,

    /// Site identity used in links and dates
    pub site: SiteConfig,

    /// Certificate image directories
    pub assets: AssetsConfig,

    /// Issued file blob storage
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for verifying JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    /// When false, messages are logged and dropped
    pub enabled: bool,

    pub smtp_host: String,

    pub smtp_port: u16,

    /// Upgrade the connection with STARTTLS
    pub starttls: bool,

    pub smtp_username: Option<String>,

    pub smtp_password: Option<String>,

    /// Envelope sender; display names vary per message
    pub from_address: String,

    /// Display name used when no person is the sender
    pub site_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    /// Public base URL, without a trailing slash
    pub www_root: String,

    /// strftime pattern for the locale date format
    pub date_pattern: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssetsConfig {
    pub root: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub root: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("CERT_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("mail.enabled", false)?
            .set_default("mail.smtp_host", "localhost")?
            .set_default("mail.smtp_port", 25)?
            .set_default("mail.starttls", false)?
            .set_default("mail.from_address", "noreply@localhost")?
            .set_default("mail.site_name", "Certificates")?
            .set_default("site.www_root", "http://localhost:3000")?
            .set_default("site.date_pattern", shared::DEFAULT_LOCALE_PATTERN)?
            .set_default("assets.root", "assets")?
            .set_default("storage.root", "storage")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (CERT_ prefix)
            .add_source(
                Environment::with_prefix("CERT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl SiteConfig {
    /// Absolute link to the issued-certificates report of a course module
    pub fn report_url(&self, cm_id: i64) -> String {
        format!(
            "{}/certificates/modules/{}/report",
            self.www_root.trim_end_matches('/'),
            cm_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_url_has_no_double_slash() {
        let site = SiteConfig {
            www_root: "https://lms.example.edu/".to_string(),
            date_pattern: shared::DEFAULT_LOCALE_PATTERN.to_string(),
        };
        assert_eq!(
            site.report_url(42),
            "https://lms.example.edu/certificates/modules/42/report"
        );
    }
}
