//! Certificate administration
//!
//! Create, update and delete definitions, reset a course, and the per-user
//! summaries the host shows in activity reports.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::validation::invalid_emails;

use crate::error::{AppError, AppResult};
use crate::external::storage::{FileStore, ISSUE_AREA};
use crate::models::{
    format_report_date, Attempt, BorderColor, CertificateDefinition, ChoiceOption, DateFormat, DateSource,
    Delivery, GradeFormat, GradeSource, GroupMode, Orientation, PageTemplate, UserOutline,
};
use crate::repository::{CertificateRepository, Gradebook, NewCourseModule};
use crate::services::assets::{AssetCatalogue, AssetKind};

const MAX_NAME_LENGTH: usize = 255;

fn default_template() -> String {
    PageTemplate::Letter.code().to_string()
}

fn default_orientation() -> String {
    Orientation::Landscape.code().to_string()
}

fn default_selector() -> String {
    "0".to_string()
}

fn default_one() -> i16 {
    1
}

/// Settings form values, using the stored column encodings
#[derive(Debug, Clone, Deserialize)]
pub struct CertificateInput {
    pub name: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub email_teachers: bool,
    #[serde(default)]
    pub email_others: String,
    #[serde(default)]
    pub save_cert: bool,
    #[serde(default)]
    pub delivery: i16,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "default_orientation")]
    pub orientation: String,
    #[serde(default = "default_selector")]
    pub border_style: String,
    #[serde(default)]
    pub border_color: i16,
    #[serde(default = "default_selector")]
    pub watermark: String,
    #[serde(default = "default_selector")]
    pub seal: String,
    #[serde(default = "default_selector")]
    pub signature: String,
    #[serde(default)]
    pub print_date: i64,
    #[serde(default = "default_one")]
    pub date_format: i16,
    #[serde(default)]
    pub print_number: bool,
    #[serde(default)]
    pub print_grade: i64,
    #[serde(default = "default_one")]
    pub grade_format: i16,
    #[serde(default)]
    pub print_outcome: i64,
    #[serde(default)]
    pub print_hours: String,
    #[serde(default)]
    pub print_teacher: bool,
    #[serde(default)]
    pub custom_text: String,
    #[serde(default)]
    pub reissue: bool,
}

impl CertificateInput {
    /// Check every field and build a definition for a course
    pub fn into_definition(self, id: i64, course_id: i64, time_created: i64) -> AppResult<CertificateDefinition> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("name", "Name is required"));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(AppError::validation("name", "Name must be at most 255 characters"));
        }
        let rejected = invalid_emails(&self.email_others);
        if !rejected.is_empty() {
            return Err(AppError::validation(
                "email_others",
                format!("Invalid email addresses: {}", rejected.join(", ")),
            ));
        }

        let delivery = Delivery::from_raw(self.delivery)
            .ok_or_else(|| AppError::validation("delivery", "Unknown delivery option"))?;
        let template = PageTemplate::from_code(&self.template)
            .ok_or_else(|| AppError::validation("template", "Unknown certificate type"))?;
        let orientation = Orientation::from_code(&self.orientation)
            .ok_or_else(|| AppError::validation("orientation", "Orientation must be L or P"))?;
        let border_color = BorderColor::from_raw(self.border_color)
            .ok_or_else(|| AppError::validation("border_color", "Unknown border colour"))?;
        let date_format = DateFormat::from_raw(self.date_format)
            .ok_or_else(|| AppError::validation("date_format", "Unknown date format"))?;
        let grade_format = GradeFormat::from_raw(self.grade_format)
            .ok_or_else(|| AppError::validation("grade_format", "Unknown grade format"))?;

        Ok(CertificateDefinition {
            id,
            course_id,
            name,
            intro: self.intro,
            email_teachers: self.email_teachers,
            email_others: self.email_others.trim().to_string(),
            save_cert: self.save_cert,
            delivery,
            template,
            orientation,
            border_style: self.border_style,
            border_color,
            watermark: self.watermark,
            seal: self.seal,
            signature: self.signature,
            print_date: DateSource::from_raw(self.print_date),
            date_format,
            print_number: self.print_number,
            print_grade: GradeSource::from_raw(self.print_grade),
            grade_format,
            print_outcome: (self.print_outcome > 0).then_some(self.print_outcome),
            print_hours: self.print_hours.trim().to_string(),
            print_teacher: self.print_teacher,
            custom_text: self.custom_text,
            reissue: self.reissue,
            time_created,
            time_modified: Utc::now().timestamp(),
        })
    }
}

/// Course placement of a new certificate
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCertificateInput {
    pub course_id: i64,
    #[serde(default)]
    pub group_mode: i16,
    #[serde(default)]
    pub group_members_only: bool,
    pub grouping_id: Option<i64>,
    #[serde(flatten)]
    pub certificate: CertificateInput,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedCertificate {
    pub cm_id: i64,
    pub certificate: CertificateDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetStatus {
    pub component: String,
    pub item: String,
    pub removed: u64,
    pub error: bool,
}

/// Choice lists of the settings form
#[derive(Debug, Clone, Serialize)]
pub struct SettingsOptions {
    pub borders: Vec<ChoiceOption>,
    pub seals: Vec<ChoiceOption>,
    pub watermarks: Vec<ChoiceOption>,
    pub signatures: Vec<ChoiceOption>,
    pub print_grade: Vec<ChoiceOption>,
    pub print_date: Vec<ChoiceOption>,
    pub print_outcome: Vec<ChoiceOption>,
    pub grade_format: Vec<ChoiceOption>,
    pub date_format: Vec<ChoiceOption>,
    pub delivery: Vec<ChoiceOption>,
    pub border_color: Vec<ChoiceOption>,
    pub template: Vec<ChoiceOption>,
    pub orientation: Vec<ChoiceOption>,
}

fn fixed_options(pairs: &[(&str, &str)]) -> Vec<ChoiceOption> {
    pairs.iter().map(|(v, l)| ChoiceOption::new(*v, *l)).collect()
}

#[derive(Clone)]
pub struct CertificateService {
    certificates: Arc<dyn CertificateRepository>,
    gradebook: Arc<dyn Gradebook>,
    files: Arc<dyn FileStore>,
    assets: AssetCatalogue,
}

impl CertificateService {
    pub fn new(
        certificates: Arc<dyn CertificateRepository>,
        gradebook: Arc<dyn Gradebook>,
        files: Arc<dyn FileStore>,
        assets: AssetCatalogue,
    ) -> Self {
        Self {
            certificates,
            gradebook,
            files,
            assets,
        }
    }

    // ========================================================================
    // Definitions
    // ========================================================================

    pub async fn create(&self, input: CreateCertificateInput) -> AppResult<CreatedCertificate> {
        self.certificates
            .find_course(input.course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course".to_string()))?;

        let now = Utc::now().timestamp();
        let mut definition = input.certificate.into_definition(0, input.course_id, now)?;
        let module = NewCourseModule {
            course_id: input.course_id,
            group_mode: GroupMode::from_raw(input.group_mode),
            group_members_only: input.group_members_only,
            grouping_id: input.grouping_id,
        };
        let (id, cm_id) = self.certificates.insert_certificate(&definition, &module).await?;
        definition.id = id;

        tracing::info!(certificate_id = id, cm_id, course_id = input.course_id, "Certificate created");
        Ok(CreatedCertificate {
            cm_id,
            certificate: definition,
        })
    }

    pub async fn update(&self, id: i64, input: CertificateInput) -> AppResult<CertificateDefinition> {
        let existing = self
            .certificates
            .find_certificate(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Certificate".to_string()))?;
        let definition = input.into_definition(id, existing.course_id, existing.time_created)?;

        if !self.certificates.update_certificate(&definition).await? {
            return Err(AppError::NotFound("Certificate".to_string()));
        }
        self.assets.forget(id).await;
        tracing::info!(certificate_id = id, "Certificate updated");
        Ok(definition)
    }

    /// Delete a definition, its issues and its stored files
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let module = self
            .certificates
            .find_module_for_certificate(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Certificate".to_string()))?;

        if !self.certificates.delete_certificate(id).await? {
            return Err(AppError::NotFound("Certificate".to_string()));
        }
        self.assets.forget(id).await;
        let removed = self.files.delete_area(module.id, ISSUE_AREA).await?;

        tracing::info!(certificate_id = id, cm_id = module.id, files = removed, "Certificate deleted");
        Ok(())
    }

    /// Remove every issue of the course's certificates
    pub async fn reset_course(&self, course_id: i64) -> AppResult<Vec<ResetStatus>> {
        let removed = self.certificates.delete_issues_for_course(course_id).await?;
        tracing::info!(course_id, removed, "Issued certificates removed");
        Ok(vec![ResetStatus {
            component: "Certificates".to_string(),
            item: "Issued certificates removed".to_string(),
            removed,
            error: false,
        }])
    }

    // ========================================================================
    // Per-user summaries
    // ========================================================================

    pub async fn user_outline(&self, definition: &CertificateDefinition, user_id: i64) -> AppResult<UserOutline> {
        let issues = self.certificates.list_user_issues(definition.id, user_id).await?;
        Ok(issues
            .iter()
            .rev()
            .find(|issue| !issue.is_pending())
            .map(|issue| UserOutline::Issued { time: issue.cert_date })
            .unwrap_or(UserOutline::NotIssued))
    }

    /// All issues of a user, oldest first
    pub async fn attempts(&self, definition: &CertificateDefinition, user_id: i64) -> AppResult<Vec<Attempt>> {
        let show_grade = definition.print_grade != GradeSource::None;
        Ok(self
            .certificates
            .list_user_issues(definition.id, user_id)
            .await?
            .into_iter()
            .map(|issue| Attempt {
                issue_id: issue.id,
                date_completed: if issue.cert_date > 0 {
                    format_report_date(issue.cert_date)
                } else {
                    String::new()
                },
                grade: show_grade.then(|| issue.report_grade.unwrap_or_default()),
            })
            .collect())
    }

    // ========================================================================
    // Settings form
    // ========================================================================

    pub async fn settings_options(&self, course_id: i64) -> AppResult<SettingsOptions> {
        let activities = self.gradebook.graded_activities(course_id).await?;
        let outcomes = self.gradebook.outcome_items(course_id).await?;

        let mut print_grade = fixed_options(&[("0", "No"), ("1", "Course Grade")]);
        print_grade.extend(
            activities
                .iter()
                .map(|a| ChoiceOption::new(a.id.to_string(), format!("{} Grade", a.name))),
        );

        let mut print_date = fixed_options(&[("0", "No"), ("1", "Date issued")]);
        print_date.extend(
            activities
                .iter()
                .map(|a| ChoiceOption::new(a.id.to_string(), format!("{} Date graded", a.name))),
        );

        let print_outcome = if outcomes.is_empty() {
            fixed_options(&[("0", "No outcomes")])
        } else {
            let mut options = fixed_options(&[("0", "No")]);
            options.extend(outcomes.iter().map(|o| {
                let label = match &o.module {
                    Some(module) => format!("{}: {}", module, o.name),
                    None => o.name.clone(),
                };
                ChoiceOption::new(o.id.to_string(), label)
            }));
            options
        };

        Ok(SettingsOptions {
            borders: self.assets.options(AssetKind::Border).await?,
            seals: self.assets.options(AssetKind::Seal).await?,
            watermarks: self.assets.options(AssetKind::Watermark).await?,
            signatures: self.assets.options(AssetKind::Signature).await?,
            print_grade,
            print_date,
            print_outcome,
            grade_format: fixed_options(&[("1", "Percentage Grade"), ("2", "Points Grade"), ("3", "Letter Grade")]),
            date_format: fixed_options(&[
                ("1", "January 1, 2000"),
                ("2", "January 1st, 2000"),
                ("3", "1 January 2000"),
                ("4", "January 2000"),
                ("5", "Locale default"),
            ]),
            delivery: fixed_options(&[("0", "Open in browser"), ("1", "Force download"), ("2", "Email certificate")]),
            border_color: fixed_options(&[("0", "No"), ("1", "Black"), ("2", "Brown"), ("3", "Blue"), ("4", "Green")]),
            template: fixed_options(&[
                (PageTemplate::Letter.code(), "Letter"),
                (PageTemplate::A4.code(), "A4"),
            ]),
            orientation: fixed_options(&[("L", "Landscape"), ("P", "Portrait")]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CertificateInput {
        serde_json::from_value(serde_json::json!({ "name": "Intro Certificate" })).unwrap()
    }

    #[test]
    fn defaults_produce_a_valid_definition() {
        let def = input().into_definition(0, 7, 100).unwrap();
        assert_eq!(def.course_id, 7);
        assert_eq!(def.template, PageTemplate::Letter);
        assert_eq!(def.orientation, Orientation::Landscape);
        assert_eq!(def.print_grade, GradeSource::None);
        assert_eq!(def.print_outcome, None);
        assert_eq!(def.date_format, DateFormat::LongMonthDay);
    }

    #[test]
    fn bad_recipients_are_rejected() {
        let mut bad = input();
        bad.email_others = "dean@example.edu, nope".to_string();
        match bad.into_definition(0, 1, 0) {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "email_others"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn out_of_range_codes_are_rejected() {
        let mut bad = input();
        bad.grade_format = 9;
        assert!(bad.into_definition(0, 1, 0).is_err());

        let mut blank = input();
        blank.name = "   ".to_string();
        assert!(blank.into_definition(0, 1, 0).is_err());
    }
}
