//! Shared types and formatting for the certificate issuance service
//!
//! This crate contains the domain models and pure formatting rules shared
//! between the backend and the settings-form preview (via WASM).

pub mod formatting;
pub mod models;
pub mod types;
pub mod validation;

pub use formatting::*;
pub use models::*;
pub use types::*;
pub use validation::*;
