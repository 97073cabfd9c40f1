//! Persistence seams for the issuance pipeline
//!
//! Three traits cover the host data the pipeline reads and writes:
//! certificate definitions and issues, the gradebook, and the user and
//! group directory. [`postgres`] implements all three over a `PgPool`;
//! [`memory`] implements them over an in-process store for tests.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppResult;
use crate::models::{
    CertificateDefinition, CertificateIssue, Course, CourseModule, GradeValue, Group, GroupMode,
    NewIssue, UserRecord,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Grade of one user in one graded activity
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityGrade {
    /// Activity display name
    pub name: String,
    pub value: GradeValue,
    /// Unix seconds, `None` while ungraded
    pub date_graded: Option<i64>,
}

/// Grade of one user against one outcome item
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeGrade {
    pub name: String,
    pub value: GradeValue,
}

/// A choosable grade item in the settings form
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GradeItemSummary {
    /// Course module id for activities, grade item id for outcomes
    pub id: i64,
    pub name: String,
    /// Module kind, e.g. `quiz`
    pub module: Option<String>,
}

/// Course module row created together with a certificate
#[derive(Debug, Clone)]
pub struct NewCourseModule {
    pub course_id: i64,
    pub group_mode: GroupMode,
    pub group_members_only: bool,
    pub grouping_id: Option<i64>,
}

/// Certificate definitions, their course modules and issued records
#[async_trait]
pub trait CertificateRepository: Send + Sync {
    /// Check that the store answers
    async fn ping(&self) -> AppResult<()>;

    async fn find_course_module(&self, cm_id: i64) -> AppResult<Option<CourseModule>>;

    async fn find_module_for_certificate(&self, certificate_id: i64)
        -> AppResult<Option<CourseModule>>;

    async fn find_course(&self, course_id: i64) -> AppResult<Option<Course>>;

    async fn find_certificate(&self, id: i64) -> AppResult<Option<CertificateDefinition>>;

    /// Insert a definition and its course module, returning both new ids
    async fn insert_certificate(
        &self,
        definition: &CertificateDefinition,
        module: &NewCourseModule,
    ) -> AppResult<(i64, i64)>;

    async fn update_certificate(&self, definition: &CertificateDefinition) -> AppResult<bool>;

    /// Delete a definition with its course module and issues
    async fn delete_certificate(&self, id: i64) -> AppResult<bool>;

    async fn find_pending_issue(
        &self,
        certificate_id: i64,
        user_id: i64,
    ) -> AppResult<Option<CertificateIssue>>;

    /// Insert a pending issue atomically with its existence check
    ///
    /// Returns `None` when a pending issue already exists, or when
    /// `allow_reissue` is false and the user holds any issue at all.
    async fn insert_pending_issue(
        &self,
        issue: &NewIssue,
        allow_reissue: bool,
    ) -> AppResult<Option<CertificateIssue>>;

    async fn find_issue(&self, id: i64) -> AppResult<Option<CertificateIssue>>;

    /// Set cert_date and report_grade on a still-pending issue
    ///
    /// Returns `None` when the issue is missing or already finalised.
    async fn finalize_issue(
        &self,
        id: i64,
        cert_date: i64,
        report_grade: Option<&str>,
    ) -> AppResult<Option<CertificateIssue>>;

    /// Set the mailed flag, returning false when it was already set
    async fn mark_mailed(&self, id: i64) -> AppResult<bool>;

    /// All issues of a user, oldest first
    async fn list_user_issues(
        &self,
        certificate_id: i64,
        user_id: i64,
    ) -> AppResult<Vec<CertificateIssue>>;

    async fn list_finalized_issues(&self, certificate_id: i64) -> AppResult<Vec<CertificateIssue>>;

    async fn delete_issues_for_course(&self, course_id: i64) -> AppResult<u64>;
}

/// Read access to course, activity and outcome grades
#[async_trait]
pub trait Gradebook: Send + Sync {
    async fn course_grade(&self, course_id: i64, user_id: i64) -> AppResult<Option<GradeValue>>;

    async fn activity_grade(&self, cm_id: i64, user_id: i64) -> AppResult<Option<ActivityGrade>>;

    async fn outcome_grade(&self, item_id: i64, user_id: i64) -> AppResult<Option<OutcomeGrade>>;

    async fn graded_activities(&self, course_id: i64) -> AppResult<Vec<GradeItemSummary>>;

    async fn outcome_items(&self, course_id: i64) -> AppResult<Vec<GradeItemSummary>>;
}

/// Users, capabilities and group membership
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_user(&self, id: i64) -> AppResult<Option<UserRecord>>;

    /// Holders of a capability on a course module, lowest id first
    async fn users_with_capability(
        &self,
        cm_id: i64,
        capability: &str,
    ) -> AppResult<Vec<UserRecord>>;

    async fn user_capabilities(&self, cm_id: i64, user_id: i64) -> AppResult<Vec<String>>;

    /// Groups of a user in a course, ordered by name
    async fn user_groups(&self, course_id: i64, user_id: i64) -> AppResult<Vec<Group>>;

    async fn group_members(&self, group_id: i64) -> AppResult<Vec<i64>>;

    async fn grouping_members(&self, grouping_id: i64) -> AppResult<Vec<i64>>;

    /// Users belonging to at least one group of the course
    async fn course_group_members(&self, course_id: i64) -> AppResult<Vec<i64>>;
}
