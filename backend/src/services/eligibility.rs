//! First-view guard
//!
//! Decides whether viewing a certificate creates a new pending issue.

use std::sync::Arc;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::{AppError, AppResult};
use crate::models::{CertificateDefinition, CertificateIssue, Course, NewIssue, UserRecord, ISSUE_CODE_LENGTH};
use crate::repository::CertificateRepository;

/// Result of preparing an issue for a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    /// A pending issue was inserted by this call
    Created(CertificateIssue),
    /// An earlier issue is reused
    Existing(CertificateIssue),
}

impl Prepared {
    pub fn issue(&self) -> &CertificateIssue {
        match self {
            Prepared::Created(issue) | Prepared::Existing(issue) => issue,
        }
    }

    pub fn into_issue(self) -> CertificateIssue {
        match self {
            Prepared::Created(issue) | Prepared::Existing(issue) => issue,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Prepared::Created(_))
    }
}

/// Random verification code of [`ISSUE_CODE_LENGTH`] ASCII alphanumerics
pub fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ISSUE_CODE_LENGTH)
        .map(char::from)
        .collect()
}

#[derive(Clone)]
pub struct EligibilityGuard {
    certificates: Arc<dyn CertificateRepository>,
}

impl EligibilityGuard {
    pub fn new(certificates: Arc<dyn CertificateRepository>) -> Self {
        Self { certificates }
    }

    /// Return the issue a view works on, inserting a pending one if needed
    pub async fn prepare(
        &self,
        course: &Course,
        user: &UserRecord,
        definition: &CertificateDefinition,
    ) -> AppResult<Prepared> {
        if definition.reissue {
            if let Some(pending) = self
                .certificates
                .find_pending_issue(definition.id, user.id)
                .await?
            {
                tracing::debug!(issue_id = pending.id, "Reusing pending issue");
                return Ok(Prepared::Existing(pending));
            }
        } else if let Some(latest) = self
            .certificates
            .list_user_issues(definition.id, user.id)
            .await?
            .pop()
        {
            tracing::debug!(issue_id = latest.id, "Certificate already issued");
            return Ok(Prepared::Existing(latest));
        }

        let new_issue = NewIssue {
            certificate_id: definition.id,
            user_id: user.id,
            code: generate_code(),
            time_created: Utc::now().timestamp(),
            student_name: user.full_name(),
            class_name: course.full_name.clone(),
        };

        match self
            .certificates
            .insert_pending_issue(&new_issue, definition.reissue)
            .await?
        {
            Some(created) => {
                tracing::info!(
                    issue_id = created.id,
                    certificate_id = definition.id,
                    user_id = user.id,
                    "Pending issue created"
                );
                Ok(Prepared::Created(created))
            }
            // A concurrent view won the insert
            None => self
                .winning_issue(definition, user.id)
                .await?
                .map(Prepared::Existing)
                .ok_or_else(|| AppError::Internal("Issue vanished after conflict".to_string())),
        }
    }

    async fn winning_issue(
        &self,
        definition: &CertificateDefinition,
        user_id: i64,
    ) -> AppResult<Option<CertificateIssue>> {
        if definition.reissue {
            self.certificates.find_pending_issue(definition.id, user_id).await
        } else {
            Ok(self
                .certificates
                .list_user_issues(definition.id, user_id)
                .await?
                .pop())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::validation::validate_issue_code;

    #[test]
    fn generated_codes_are_valid() {
        for _ in 0..50 {
            assert!(validate_issue_code(&generate_code()).is_ok());
        }
    }
}
