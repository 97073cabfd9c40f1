//! Certificate issue models

use serde::{Deserialize, Serialize};

/// One issuance attempt of a certificate to a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateIssue {
    pub id: i64,
    pub certificate_id: i64,
    pub user_id: i64,
    pub code: String,
    pub time_created: i64,
    /// 0 while pending, the stamped instant once finalised
    pub cert_date: i64,
    pub report_grade: Option<String>,
    pub student_name: String,
    pub class_name: String,
    pub mailed: bool,
}

impl CertificateIssue {
    pub fn is_pending(&self) -> bool {
        self.cert_date == 0
    }
}

/// Values for a freshly prepared issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIssue {
    pub certificate_id: i64,
    pub user_id: i64,
    pub code: String,
    pub time_created: i64,
    pub student_name: String,
    pub class_name: String,
}

/// Length of the generated verification code
pub const ISSUE_CODE_LENGTH: usize = 10;

/// Per-user activity summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UserOutline {
    Issued { time: i64 },
    NotIssued,
}

/// One row of a reissue history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attempt {
    pub issue_id: i64,
    /// Empty while the attempt is still pending
    pub date_completed: String,
    pub grade: Option<String>,
}
