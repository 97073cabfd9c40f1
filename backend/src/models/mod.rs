//! Domain models for the certificate issuance service
//!
//! Re-exports models from the shared crate together with the value types the
//! backend passes between services

pub use shared::formatting::{
    format_date, format_grade, format_real, format_report_date, GradeValue, NOT_APPLICABLE,
};
pub use shared::models::*;
pub use shared::types::{CertificateStrings, ChoiceOption};
