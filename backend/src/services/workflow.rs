//! The certificate view pipeline
//!
//! One view runs, in order: authorize, prepare the issue, finalise it when
//! still pending, lay out and write the PDF, store it, then deliver it.

use std::sync::Arc;

use shared::validation::clean_filename;

use crate::error::AppResult;
use crate::external::pdf::render_pdf;
use crate::external::storage::{FileKey, FileStore, PDF_MIME_TYPE};
use crate::models::{capability, CertificateDefinition, CertificateIssue, Delivery};
use crate::repository::Directory;
use crate::services::access::{AccessService, RequestContext};
use crate::services::assets::AssetCatalogue;
use crate::services::eligibility::EligibilityGuard;
use crate::services::grading::GradeResolver;
use crate::services::issuance::IssueRecorder;
use crate::services::notification::Notifier;
use crate::services::rendering::{self, RenderPlan};
use crate::AppState;

/// How the rendered certificate leaves the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    Inline { file_name: String, pdf: Vec<u8> },
    Download { file_name: String, pdf: Vec<u8> },
    /// Sent to the student; `sent` is false when it had been mailed before
    Emailed { sent: bool },
}

#[derive(Debug, Clone)]
pub struct ViewResult {
    pub issue: CertificateIssue,
    pub outcome: ViewOutcome,
}

#[derive(Clone)]
pub struct CertificateWorkflow {
    access: AccessService,
    guard: EligibilityGuard,
    resolver: GradeResolver,
    recorder: IssueRecorder,
    notifier: Notifier,
    assets: AssetCatalogue,
    directory: Arc<dyn Directory>,
    files: Arc<dyn FileStore>,
}

impl CertificateWorkflow {
    pub fn new(state: &AppState) -> Self {
        let config = &state.config;
        let resolver = GradeResolver::new(state.gradebook.clone(), config.site.date_pattern.clone());
        let notifier = Notifier::new(
            state.certificates.clone(),
            state.directory.clone(),
            state.mailer.clone(),
            config.site.clone(),
            config.mail.site_name.clone(),
        );
        Self {
            access: AccessService::new(state),
            guard: EligibilityGuard::new(state.certificates.clone()),
            recorder: IssueRecorder::new(state.certificates.clone(), resolver.clone(), notifier.clone()),
            resolver,
            notifier,
            assets: state.assets.clone(),
            directory: state.directory.clone(),
            files: state.files.clone(),
        }
    }

    /// Names typed in place of a signature picture, sorted by last name
    async fn signers(&self, ctx: &RequestContext, definition: &CertificateDefinition) -> AppResult<Vec<String>> {
        if !definition.print_teacher {
            return Ok(Vec::new());
        }
        let mut teachers = self
            .directory
            .users_with_capability(ctx.module.id, capability::PRINT_TEACHER)
            .await?;
        teachers.sort_by(|a, b| (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name)));
        Ok(teachers.iter().map(|t| t.full_name()).collect())
    }

    /// Layout of an issue's certificate
    pub async fn plan(
        &self,
        ctx: &RequestContext,
        definition: &CertificateDefinition,
        issue: &CertificateIssue,
    ) -> AppResult<RenderPlan> {
        let content = self.resolver.content(definition, issue, &ctx.course).await?;
        let signers = self.signers(ctx, definition).await?;
        let slots = self.assets.resolve_slots(definition, signers).await;
        Ok(rendering::plan(definition, &slots, &content, self.resolver.strings()))
    }

    pub async fn view(&self, user_id: i64, cm_id: i64) -> AppResult<ViewResult> {
        let (ctx, definition) = self.access.authorize(user_id, cm_id).await?;
        ctx.permissions.require_view()?;

        let prepared = self.guard.prepare(&ctx.course, &ctx.user, &definition).await?;
        let mut issue = prepared.into_issue();
        if issue.is_pending() {
            issue = self.recorder.finalize(&ctx, &definition, issue.id).await?;
        }

        let plan = self.plan(&ctx, &definition, &issue).await?;
        let pdf = render_pdf(&plan).await?;
        let file_name = clean_filename(&format!("{}.pdf", definition.name));

        if definition.save_cert {
            let key = FileKey::issue(ctx.module.id, issue.id, file_name.clone());
            match self.files.save_if_absent(&key, PDF_MIME_TYPE, ctx.user.id, &pdf).await {
                Ok(stored) => tracing::debug!(issue_id = issue.id, hash = %stored.content_hash, "Certificate stored"),
                Err(e) => tracing::warn!(issue_id = issue.id, error = %e, "Certificate could not be stored"),
            }
        }

        let outcome = match definition.delivery {
            Delivery::Inline => ViewOutcome::Inline { file_name, pdf },
            Delivery::Download => ViewOutcome::Download { file_name, pdf },
            Delivery::Email => ViewOutcome::Emailed {
                sent: self.notifier.email_student(&ctx, &definition, &issue, &pdf).await?,
            },
        };

        tracing::info!(issue_id = issue.id, cm_id, delivery = ?definition.delivery, "Certificate delivered");
        Ok(ViewResult { issue, outcome })
    }
}
