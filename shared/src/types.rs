//! Display strings used across the platform

use serde::{Deserialize, Serialize};

/// Fixed certificate wording
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateStrings {
    pub title: String,
    pub certify: String,
    pub statement: String,
    pub course_grade: String,
    pub grade: String,
    pub credit_hours: String,
}

impl Default for CertificateStrings {
    fn default() -> Self {
        Self {
            title: "CERTIFICATE of ACHIEVEMENT".to_string(),
            certify: "This is to certify that".to_string(),
            statement: "has completed the course".to_string(),
            course_grade: "Course Grade".to_string(),
            grade: "Grade".to_string(),
            credit_hours: "Credit Hours".to_string(),
        }
    }
}

/// One entry of a settings choice list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}
