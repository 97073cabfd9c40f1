//! HTTP handlers

pub mod admin;
pub mod certificate;
pub mod health;
pub mod reporting;

pub use admin::*;
pub use certificate::{download_file, list_attempts, user_outline, view_certificate};
pub use health::health_check;
pub use reporting::get_report;
