//! Grade, date and outcome resolution
//!
//! Lookups go through the [`Gradebook`]; every miss degrades to the `N/A`
//! placeholder or an absent line instead of an error.

use std::sync::Arc;

use chrono::Utc;

use crate::error::AppResult;
use crate::models::{
    format_date, format_grade, format_real, CertificateDefinition, CertificateIssue, CertificateStrings,
    Course, DateSource, GradeSource, NOT_APPLICABLE,
};
use crate::repository::Gradebook;
use crate::services::rendering::CertificateContent;

/// Which grade a resolved value belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradeLabel {
    Course,
    /// Activity display name, empty when the activity is missing
    Activity(String),
}

/// A grade formatted in the definition's grade format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGrade {
    pub label: GradeLabel,
    /// `None` when no grade is printed at all
    pub value: Option<String>,
}

impl ResolvedGrade {
    fn none() -> Self {
        Self {
            label: GradeLabel::Course,
            value: None,
        }
    }

    /// Printed line for a value, e.g. `Course Grade:  85.00`
    pub fn line(&self, value: &str, strings: &CertificateStrings) -> String {
        match &self.label {
            GradeLabel::Course => format!("{}:  {}", strings.course_grade, value),
            GradeLabel::Activity(name) => format!("{} {}: {}", name, strings.grade, value)
                .trim()
                .to_string(),
        }
    }
}

#[derive(Clone)]
pub struct GradeResolver {
    gradebook: Arc<dyn Gradebook>,
    locale_pattern: String,
    strings: CertificateStrings,
}

impl GradeResolver {
    pub fn new(gradebook: Arc<dyn Gradebook>, locale_pattern: impl Into<String>) -> Self {
        Self {
            gradebook,
            locale_pattern: locale_pattern.into(),
            strings: CertificateStrings::default(),
        }
    }

    pub fn strings(&self) -> &CertificateStrings {
        &self.strings
    }

    pub async fn resolve_grade(
        &self,
        definition: &CertificateDefinition,
        course: &Course,
        user_id: i64,
    ) -> AppResult<ResolvedGrade> {
        let format = definition.grade_format;
        let resolved = match definition.print_grade {
            GradeSource::None => ResolvedGrade::none(),
            GradeSource::Course => {
                let value = self
                    .gradebook
                    .course_grade(course.id, user_id)
                    .await?
                    .map(|grade| format_grade(&grade, format))
                    .unwrap_or_else(|| NOT_APPLICABLE.to_string());
                ResolvedGrade {
                    label: GradeLabel::Course,
                    value: Some(value),
                }
            }
            GradeSource::Activity(cm_id) => match self.gradebook.activity_grade(cm_id, user_id).await? {
                Some(activity) => ResolvedGrade {
                    label: GradeLabel::Activity(activity.name),
                    value: Some(format_grade(&activity.value, format)),
                },
                None => ResolvedGrade {
                    label: GradeLabel::Activity(String::new()),
                    value: Some(NOT_APPLICABLE.to_string()),
                },
            },
        };
        Ok(resolved)
    }

    /// Unix seconds stamped on a certificate finalised now
    pub async fn resolve_date(&self, definition: &CertificateDefinition, user_id: i64) -> AppResult<i64> {
        let now = Utc::now().timestamp();
        match definition.print_date {
            DateSource::IssueDate => Ok(now),
            DateSource::ActivityGraded(cm_id) => Ok(self
                .gradebook
                .activity_grade(cm_id, user_id)
                .await?
                .and_then(|activity| activity.date_graded)
                .filter(|graded| *graded > 0)
                .unwrap_or(now)),
        }
    }

    /// Outcome line, `None` when no outcome is printed or the item is gone
    pub async fn resolve_outcome(
        &self,
        definition: &CertificateDefinition,
        user_id: i64,
    ) -> AppResult<Option<String>> {
        let Some(item_id) = definition.print_outcome else {
            return Ok(None);
        };
        Ok(self
            .gradebook
            .outcome_grade(item_id, user_id)
            .await?
            .map(|outcome| format!("{}: {}", outcome.name, format_real(outcome.value.grade))))
    }

    /// Everything printed on one issue's certificate
    pub async fn content(
        &self,
        definition: &CertificateDefinition,
        issue: &CertificateIssue,
        course: &Course,
    ) -> AppResult<CertificateContent> {
        let timestamp = if issue.cert_date > 0 {
            issue.cert_date
        } else {
            self.resolve_date(definition, issue.user_id).await?
        };

        let grade = if definition.print_grade == GradeSource::None {
            None
        } else {
            let resolved = self.resolve_grade(definition, course, issue.user_id).await?;
            // A stored grade wins over a fresh lookup
            let value = issue.report_grade.clone().or(resolved.value.clone());
            value.map(|v| resolved.line(&v, &self.strings))
        };

        let hours = definition.print_hours.trim();
        Ok(CertificateContent {
            student_name: issue.student_name.clone(),
            class_name: issue.class_name.clone(),
            date: format_date(timestamp, definition.date_format, &self.locale_pattern),
            grade,
            outcome: self.resolve_outcome(definition, issue.user_id).await?,
            credit_hours: (!hours.is_empty())
                .then(|| format!("{}: {}", self.strings.credit_hours, hours)),
            code: definition.print_number.then(|| issue.code.clone()),
            custom_text: (!definition.custom_text.trim().is_empty())
                .then(|| definition.custom_text.clone()),
        })
    }
}
