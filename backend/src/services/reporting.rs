//! Issued-certificates report
//!
//! Rows are built from finalised issues only: the latest one per user,
//! without managers of the module, narrowed by the module's group settings.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use shared::validation::clean_filename;

use crate::error::AppResult;
use crate::models::{
    capability, format_report_date, CertificateDefinition, CertificateIssue, Course, CourseModule,
    ReportFormat, ReportRow, ReportSort, UserRecord, NOT_APPLICABLE,
};
use crate::repository::{CertificateRepository, Directory};
use crate::services::export;

/// A rendered report ready to be sent
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub format: ReportFormat,
    /// Download name, `None` for the HTML page
    pub file_name: Option<String>,
    pub body: Vec<u8>,
}

struct Entry {
    issue: CertificateIssue,
    user: UserRecord,
    row: ReportRow,
}

#[derive(Clone)]
pub struct ReportService {
    certificates: Arc<dyn CertificateRepository>,
    directory: Arc<dyn Directory>,
}

impl ReportService {
    pub fn new(certificates: Arc<dyn CertificateRepository>, directory: Arc<dyn Directory>) -> Self {
        Self {
            certificates,
            directory,
        }
    }

    /// Latest finalised issue of every user, keyed by user id
    fn latest_per_user(issues: Vec<CertificateIssue>) -> BTreeMap<i64, CertificateIssue> {
        let mut latest: BTreeMap<i64, CertificateIssue> = BTreeMap::new();
        for issue in issues {
            let newer = latest
                .get(&issue.user_id)
                .map(|current| (issue.time_created, issue.id) > (current.time_created, current.id))
                .unwrap_or(true);
            if newer {
                latest.insert(issue.user_id, issue);
            }
        }
        latest
    }

    /// Report rows in the requested order
    pub async fn rows(
        &self,
        course: &Course,
        module: &CourseModule,
        definition: &CertificateDefinition,
        sort: ReportSort,
        current_group: Option<i64>,
    ) -> AppResult<Vec<ReportRow>> {
        let mut issues = Self::latest_per_user(self.certificates.list_finalized_issues(definition.id).await?);

        let managers: BTreeSet<i64> = self
            .directory
            .users_with_capability(module.id, capability::MANAGE)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect();
        issues.retain(|user_id, _| !managers.contains(user_id));

        if module.group_members_only {
            let members: BTreeSet<i64> = match module.grouping_id {
                Some(grouping_id) => self.directory.grouping_members(grouping_id).await?,
                None => self.directory.course_group_members(course.id).await?,
            }
            .into_iter()
            .collect();
            issues.retain(|user_id, _| members.contains(user_id));
        }

        if module.group_mode.is_active() {
            if let Some(group_id) = current_group.filter(|g| *g > 0) {
                let members: BTreeSet<i64> =
                    self.directory.group_members(group_id).await?.into_iter().collect();
                issues.retain(|user_id, _| members.contains(user_id));
            }
        }

        let mut entries = Vec::with_capacity(issues.len());
        for (user_id, issue) in issues {
            let Some(user) = self.directory.find_user(user_id).await? else {
                tracing::debug!(user_id, "Issued user no longer exists");
                continue;
            };
            let groups = self
                .directory
                .user_groups(course.id, user_id)
                .await?
                .into_iter()
                .map(|g| g.name)
                .collect::<Vec<_>>()
                .join(", ");
            let row = ReportRow {
                last_name: user.last_name.clone(),
                first_name: user.first_name.clone(),
                id_number: user.id_number.clone(),
                groups,
                date: format_report_date(issue.cert_date),
                grade: issue
                    .report_grade
                    .clone()
                    .filter(|g| !g.is_empty())
                    .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
                code: issue.code.clone(),
            };
            entries.push(Entry { issue, user, row });
        }

        match sort {
            ReportSort::StudentName => entries.sort_by(|a, b| a.issue.student_name.cmp(&b.issue.student_name)),
            ReportSort::Date => entries.sort_by_key(|e| (e.issue.cert_date, e.issue.id)),
            ReportSort::LastName => entries.sort_by(|a, b| {
                (&a.user.last_name, &a.user.first_name).cmp(&(&b.user.last_name, &b.user.first_name))
            }),
            ReportSort::Code => entries.sort_by(|a, b| a.issue.code.cmp(&b.issue.code)),
        }

        Ok(entries.into_iter().map(|e| e.row).collect())
    }

    /// Encode rows in one of the report formats
    pub fn render(
        course: &Course,
        definition: &CertificateDefinition,
        format: ReportFormat,
        rows: &[ReportRow],
    ) -> AppResult<ReportDocument> {
        let title = format!("{}: Report", definition.name);
        let base_name = clean_filename(&format!("{} {}", course.short_name, definition.name));
        let body = match format {
            ReportFormat::Html => export::render_html(&title, rows).into_bytes(),
            ReportFormat::Ods => export::render_ods("Report", rows)?,
            ReportFormat::Xls => export::render_xlsx("Report", rows)?,
            ReportFormat::Txt => export::render_txt(rows)?,
        };
        let file_name = (format != ReportFormat::Html).then(|| format!("{}.{}", base_name, format.extension()));

        tracing::info!(
            certificate_id = definition.id,
            format = format.extension(),
            rows = rows.len(),
            "Report rendered"
        );

        Ok(ReportDocument {
            format,
            file_name,
            body,
        })
    }
}
