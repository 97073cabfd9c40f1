//! Issue finalisation

use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{CertificateDefinition, CertificateIssue};
use crate::repository::CertificateRepository;
use crate::services::access::RequestContext;
use crate::services::grading::GradeResolver;
use crate::services::notification::Notifier;

#[derive(Clone)]
pub struct IssueRecorder {
    certificates: Arc<dyn CertificateRepository>,
    resolver: GradeResolver,
    notifier: Notifier,
}

impl IssueRecorder {
    pub fn new(
        certificates: Arc<dyn CertificateRepository>,
        resolver: GradeResolver,
        notifier: Notifier,
    ) -> Self {
        Self {
            certificates,
            resolver,
            notifier,
        }
    }

    /// Stamp a pending issue with its date and grade, then notify
    ///
    /// An issue that is already finalised is returned unchanged.
    pub async fn finalize(
        &self,
        ctx: &RequestContext,
        definition: &CertificateDefinition,
        issue_id: i64,
    ) -> AppResult<CertificateIssue> {
        let issue = self
            .certificates
            .find_issue(issue_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Certificate issue".to_string()))?;
        if !issue.is_pending() {
            tracing::debug!(issue_id, "Issue already finalised");
            return Ok(issue);
        }

        let grade = self
            .resolver
            .resolve_grade(definition, &ctx.course, issue.user_id)
            .await?;
        let cert_date = self.resolver.resolve_date(definition, issue.user_id).await?;

        let finalized = match self
            .certificates
            .finalize_issue(issue_id, cert_date, grade.value.as_deref())
            .await?
        {
            Some(finalized) => finalized,
            // Finalised by a concurrent view
            None => {
                return self
                    .certificates
                    .find_issue(issue_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Certificate issue".to_string()))
            }
        };

        tracing::info!(
            issue_id,
            certificate_id = definition.id,
            user_id = finalized.user_id,
            cert_date,
            "Certificate issued"
        );

        if let Err(e) = self.notifier.notify_issued(ctx, definition, &finalized).await {
            tracing::warn!(issue_id, error = %e, "Award notification skipped");
        }

        Ok(finalized)
    }
}
