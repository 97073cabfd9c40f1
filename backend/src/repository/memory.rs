//! In-process implementation of the repository traits
//!
//! Backs the integration tests and local demos. All state lives behind one
//! `tokio::sync::RwLock`, so every trait call observes a consistent snapshot.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::{
    ActivityGrade, CertificateRepository, Directory, GradeItemSummary, Gradebook, NewCourseModule,
    OutcomeGrade,
};
use crate::error::AppResult;
use crate::models::{
    CertificateDefinition, CertificateIssue, Course, CourseModule, GradeValue, Group, NewIssue,
    UserRecord,
};

/// A gradable item known to the in-memory gradebook
#[derive(Debug, Clone)]
pub struct MemoryGradeItem {
    pub course_id: i64,
    pub name: String,
    pub module: Option<String>,
    pub min: Decimal,
    pub max: Decimal,
}

#[derive(Debug, Clone, Default)]
struct MemoryGrade {
    value: Option<Decimal>,
    date_graded: Option<i64>,
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    users: BTreeMap<i64, UserRecord>,
    courses: BTreeMap<i64, Course>,
    modules: BTreeMap<i64, CourseModule>,
    certificates: BTreeMap<i64, CertificateDefinition>,
    issues: BTreeMap<i64, CertificateIssue>,
    capabilities: BTreeSet<(i64, i64, String)>,
    groups: BTreeMap<i64, Group>,
    group_members: BTreeSet<(i64, i64)>,
    grouping_groups: BTreeSet<(i64, i64)>,
    course_items: HashMap<i64, MemoryGradeItem>,
    activity_items: BTreeMap<i64, MemoryGradeItem>,
    outcome_items: BTreeMap<i64, MemoryGradeItem>,
    course_grades: HashMap<(i64, i64), MemoryGrade>,
    activity_grades: HashMap<(i64, i64), MemoryGrade>,
    outcome_grades: HashMap<(i64, i64), MemoryGrade>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        let used = [
            self.modules.keys().next_back(),
            self.certificates.keys().next_back(),
            self.issues.keys().next_back(),
        ]
        .into_iter()
        .flatten()
        .copied()
        .max()
        .unwrap_or(0);
        self.next_id = self.next_id.max(used + 1);
        self.next_id
    }
}

/// Shared in-memory store implementing all three repository traits
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Seeding
    // ========================================================================

    pub async fn add_user(&self, user: UserRecord) {
        self.state.write().await.users.insert(user.id, user);
    }

    pub async fn add_course(&self, course: Course) {
        self.state.write().await.courses.insert(course.id, course);
    }

    pub async fn add_module(&self, module: CourseModule) {
        self.state.write().await.modules.insert(module.id, module);
    }

    pub async fn add_certificate(&self, definition: CertificateDefinition) {
        self.state
            .write()
            .await
            .certificates
            .insert(definition.id, definition);
    }

    pub async fn grant(&self, cm_id: i64, user_id: i64, capability: &str) {
        self.state
            .write()
            .await
            .capabilities
            .insert((cm_id, user_id, capability.to_string()));
    }

    pub async fn add_group(&self, group: Group) {
        self.state.write().await.groups.insert(group.id, group);
    }

    pub async fn add_group_member(&self, group_id: i64, user_id: i64) {
        self.state
            .write()
            .await
            .group_members
            .insert((group_id, user_id));
    }

    pub async fn add_grouping_group(&self, grouping_id: i64, group_id: i64) {
        self.state
            .write()
            .await
            .grouping_groups
            .insert((grouping_id, group_id));
    }

    pub async fn set_course_item(&self, item: MemoryGradeItem) {
        self.state
            .write()
            .await
            .course_items
            .insert(item.course_id, item);
    }

    pub async fn set_course_grade(&self, course_id: i64, user_id: i64, grade: Option<Decimal>) {
        self.state.write().await.course_grades.insert(
            (course_id, user_id),
            MemoryGrade {
                value: grade,
                date_graded: None,
            },
        );
    }

    /// Register a graded activity under its course module id
    pub async fn add_activity(&self, cm_id: i64, item: MemoryGradeItem) {
        self.state.write().await.activity_items.insert(cm_id, item);
    }

    pub async fn set_activity_grade(
        &self,
        cm_id: i64,
        user_id: i64,
        grade: Option<Decimal>,
        date_graded: Option<i64>,
    ) {
        self.state.write().await.activity_grades.insert(
            (cm_id, user_id),
            MemoryGrade {
                value: grade,
                date_graded,
            },
        );
    }

    pub async fn add_outcome(&self, item_id: i64, item: MemoryGradeItem) {
        self.state.write().await.outcome_items.insert(item_id, item);
    }

    pub async fn set_outcome_grade(&self, item_id: i64, user_id: i64, grade: Option<Decimal>) {
        self.state.write().await.outcome_grades.insert(
            (item_id, user_id),
            MemoryGrade {
                value: grade,
                date_graded: None,
            },
        );
    }

    /// Insert an issue row as-is, bypassing the pending rule
    pub async fn add_issue(&self, issue: CertificateIssue) {
        self.state.write().await.issues.insert(issue.id, issue);
    }

    /// Snapshot of every issue row, ordered by id
    pub async fn issues(&self) -> Vec<CertificateIssue> {
        self.state.read().await.issues.values().cloned().collect()
    }
}

// ============================================================================
// Certificates and issues
// ============================================================================

#[async_trait]
impl CertificateRepository for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn find_course_module(&self, cm_id: i64) -> AppResult<Option<CourseModule>> {
        Ok(self.state.read().await.modules.get(&cm_id).cloned())
    }

    async fn find_module_for_certificate(
        &self,
        certificate_id: i64,
    ) -> AppResult<Option<CourseModule>> {
        Ok(self
            .state
            .read()
            .await
            .modules
            .values()
            .find(|m| m.instance_id == certificate_id)
            .cloned())
    }

    async fn find_course(&self, course_id: i64) -> AppResult<Option<Course>> {
        Ok(self.state.read().await.courses.get(&course_id).cloned())
    }

    async fn find_certificate(&self, id: i64) -> AppResult<Option<CertificateDefinition>> {
        Ok(self.state.read().await.certificates.get(&id).cloned())
    }

    async fn insert_certificate(
        &self,
        definition: &CertificateDefinition,
        module: &NewCourseModule,
    ) -> AppResult<(i64, i64)> {
        let mut state = self.state.write().await;
        let certificate_id = state.allocate_id();
        let cm_id = state.allocate_id();

        let mut stored = definition.clone();
        stored.id = certificate_id;
        state.certificates.insert(certificate_id, stored);
        state.modules.insert(
            cm_id,
            CourseModule {
                id: cm_id,
                course_id: module.course_id,
                instance_id: certificate_id,
                group_mode: module.group_mode,
                group_members_only: module.group_members_only,
                grouping_id: module.grouping_id,
            },
        );

        Ok((certificate_id, cm_id))
    }

    async fn update_certificate(&self, definition: &CertificateDefinition) -> AppResult<bool> {
        let mut state = self.state.write().await;
        match state.certificates.get_mut(&definition.id) {
            Some(existing) => {
                let time_created = existing.time_created;
                *existing = definition.clone();
                existing.time_created = time_created;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_certificate(&self, id: i64) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let removed = state.certificates.remove(&id).is_some();
        state.modules.retain(|_, m| m.instance_id != id);
        state.issues.retain(|_, issue| issue.certificate_id != id);
        Ok(removed)
    }

    async fn find_pending_issue(
        &self,
        certificate_id: i64,
        user_id: i64,
    ) -> AppResult<Option<CertificateIssue>> {
        Ok(self
            .state
            .read()
            .await
            .issues
            .values()
            .find(|i| i.certificate_id == certificate_id && i.user_id == user_id && i.is_pending())
            .cloned())
    }

    async fn insert_pending_issue(
        &self,
        issue: &NewIssue,
        allow_reissue: bool,
    ) -> AppResult<Option<CertificateIssue>> {
        let mut state = self.state.write().await;
        let conflict = state.issues.values().any(|i| {
            i.certificate_id == issue.certificate_id
                && i.user_id == issue.user_id
                && (i.is_pending() || !allow_reissue)
        });
        if conflict {
            return Ok(None);
        }

        let id = state.allocate_id();
        let stored = CertificateIssue {
            id,
            certificate_id: issue.certificate_id,
            user_id: issue.user_id,
            code: issue.code.clone(),
            time_created: issue.time_created,
            cert_date: 0,
            report_grade: None,
            student_name: issue.student_name.clone(),
            class_name: issue.class_name.clone(),
            mailed: false,
        };
        state.issues.insert(id, stored.clone());
        Ok(Some(stored))
    }

    async fn find_issue(&self, id: i64) -> AppResult<Option<CertificateIssue>> {
        Ok(self.state.read().await.issues.get(&id).cloned())
    }

    async fn finalize_issue(
        &self,
        id: i64,
        cert_date: i64,
        report_grade: Option<&str>,
    ) -> AppResult<Option<CertificateIssue>> {
        let mut state = self.state.write().await;
        match state.issues.get_mut(&id) {
            Some(issue) if issue.is_pending() => {
                issue.cert_date = cert_date;
                issue.report_grade = report_grade.map(str::to_string);
                Ok(Some(issue.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_mailed(&self, id: i64) -> AppResult<bool> {
        let mut state = self.state.write().await;
        match state.issues.get_mut(&id) {
            Some(issue) if !issue.mailed => {
                issue.mailed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_user_issues(
        &self,
        certificate_id: i64,
        user_id: i64,
    ) -> AppResult<Vec<CertificateIssue>> {
        let state = self.state.read().await;
        let mut issues: Vec<_> = state
            .issues
            .values()
            .filter(|i| i.certificate_id == certificate_id && i.user_id == user_id)
            .cloned()
            .collect();
        issues.sort_by_key(|i| (i.time_created, i.id));
        Ok(issues)
    }

    async fn list_finalized_issues(&self, certificate_id: i64) -> AppResult<Vec<CertificateIssue>> {
        Ok(self
            .state
            .read()
            .await
            .issues
            .values()
            .filter(|i| i.certificate_id == certificate_id && !i.is_pending())
            .cloned()
            .collect())
    }

    async fn delete_issues_for_course(&self, course_id: i64) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let certificate_ids: BTreeSet<i64> = state
            .certificates
            .values()
            .filter(|c| c.course_id == course_id)
            .map(|c| c.id)
            .collect();
        let before = state.issues.len();
        state
            .issues
            .retain(|_, issue| !certificate_ids.contains(&issue.certificate_id));
        Ok((before - state.issues.len()) as u64)
    }
}

// ============================================================================
// Gradebook
// ============================================================================

fn summaries(items: &BTreeMap<i64, MemoryGradeItem>, course_id: i64) -> Vec<GradeItemSummary> {
    let mut summaries: Vec<_> = items
        .iter()
        .filter(|(_, item)| item.course_id == course_id)
        .map(|(id, item)| GradeItemSummary {
            id: *id,
            name: item.name.clone(),
            module: item.module.clone(),
        })
        .collect();
    summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    summaries
}

#[async_trait]
impl Gradebook for MemoryStore {
    async fn course_grade(&self, course_id: i64, user_id: i64) -> AppResult<Option<GradeValue>> {
        let state = self.state.read().await;
        let Some(item) = state.course_items.get(&course_id) else {
            return Ok(None);
        };
        let grade = state
            .course_grades
            .get(&(course_id, user_id))
            .and_then(|g| g.value);
        Ok(Some(GradeValue::new(grade, item.min, item.max)))
    }

    async fn activity_grade(&self, cm_id: i64, user_id: i64) -> AppResult<Option<ActivityGrade>> {
        let state = self.state.read().await;
        let Some(item) = state.activity_items.get(&cm_id) else {
            return Ok(None);
        };
        let grade = state
            .activity_grades
            .get(&(cm_id, user_id))
            .cloned()
            .unwrap_or_default();
        Ok(Some(ActivityGrade {
            name: item.name.clone(),
            value: GradeValue::new(grade.value, item.min, item.max),
            date_graded: grade.date_graded,
        }))
    }

    async fn outcome_grade(&self, item_id: i64, user_id: i64) -> AppResult<Option<OutcomeGrade>> {
        let state = self.state.read().await;
        let Some(item) = state.outcome_items.get(&item_id) else {
            return Ok(None);
        };
        let grade = state
            .outcome_grades
            .get(&(item_id, user_id))
            .and_then(|g| g.value);
        Ok(Some(OutcomeGrade {
            name: item.name.clone(),
            value: GradeValue::new(grade, item.min, item.max),
        }))
    }

    async fn graded_activities(&self, course_id: i64) -> AppResult<Vec<GradeItemSummary>> {
        Ok(summaries(&self.state.read().await.activity_items, course_id))
    }

    async fn outcome_items(&self, course_id: i64) -> AppResult<Vec<GradeItemSummary>> {
        Ok(summaries(&self.state.read().await.outcome_items, course_id))
    }
}

// ============================================================================
// Directory
// ============================================================================

#[async_trait]
impl Directory for MemoryStore {
    async fn find_user(&self, id: i64) -> AppResult<Option<UserRecord>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn users_with_capability(
        &self,
        cm_id: i64,
        capability: &str,
    ) -> AppResult<Vec<UserRecord>> {
        let state = self.state.read().await;
        let holders: BTreeSet<i64> = state
            .capabilities
            .iter()
            .filter(|(cm, _, cap)| *cm == cm_id && cap == capability)
            .map(|(_, user, _)| *user)
            .collect();
        Ok(holders
            .into_iter()
            .filter_map(|id| state.users.get(&id).cloned())
            .collect())
    }

    async fn user_capabilities(&self, cm_id: i64, user_id: i64) -> AppResult<Vec<String>> {
        Ok(self
            .state
            .read()
            .await
            .capabilities
            .iter()
            .filter(|(cm, user, _)| *cm == cm_id && *user == user_id)
            .map(|(_, _, cap)| cap.clone())
            .collect())
    }

    async fn user_groups(&self, course_id: i64, user_id: i64) -> AppResult<Vec<Group>> {
        let state = self.state.read().await;
        let mut groups: Vec<Group> = state
            .group_members
            .iter()
            .filter(|(_, user)| *user == user_id)
            .filter_map(|(group, _)| state.groups.get(group))
            .filter(|g| g.course_id == course_id)
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn group_members(&self, group_id: i64) -> AppResult<Vec<i64>> {
        Ok(self
            .state
            .read()
            .await
            .group_members
            .iter()
            .filter(|(group, _)| *group == group_id)
            .map(|(_, user)| *user)
            .collect())
    }

    async fn grouping_members(&self, grouping_id: i64) -> AppResult<Vec<i64>> {
        let state = self.state.read().await;
        let groups: BTreeSet<i64> = state
            .grouping_groups
            .iter()
            .filter(|(grouping, _)| *grouping == grouping_id)
            .map(|(_, group)| *group)
            .collect();
        let members: BTreeSet<i64> = state
            .group_members
            .iter()
            .filter(|(group, _)| groups.contains(group))
            .map(|(_, user)| *user)
            .collect();
        Ok(members.into_iter().collect())
    }

    async fn course_group_members(&self, course_id: i64) -> AppResult<Vec<i64>> {
        let state = self.state.read().await;
        let members: BTreeSet<i64> = state
            .group_members
            .iter()
            .filter(|(group, _)| {
                state
                    .groups
                    .get(group)
                    .is_some_and(|g| g.course_id == course_id)
            })
            .map(|(_, user)| *user)
            .collect();
        Ok(members.into_iter().collect())
    }
}
