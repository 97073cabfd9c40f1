//! PostgreSQL implementation of the repository traits

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use super::{
    ActivityGrade, CertificateRepository, Directory, GradeItemSummary, Gradebook, NewCourseModule,
    OutcomeGrade,
};
use crate::error::AppResult;
use crate::models::{
    BorderColor, CertificateDefinition, CertificateIssue, Course, CourseModule, DateFormat,
    DateSource, Delivery, GradeFormat, GradeSource, GradeValue, Group, GroupMode, InvalidColumn,
    NewIssue, Orientation, PageTemplate, UserRecord,
};

const CERTIFICATE_COLUMNS: &str = "id, course_id, name, intro, email_teachers, email_others, \
    save_cert, delivery, cert_type, orientation, border_style, border_color, print_watermark, \
    print_seal, print_signature, print_date, date_format, print_number, print_grade, \
    grade_format, print_outcome, print_hours, print_teacher, custom_text, reissue, \
    time_created, time_modified";

const ISSUE_COLUMNS: &str = "id, certificate_id, user_id, code, time_created, cert_date, \
    report_grade, student_name, class_name, mailed";

const USER_COLUMNS: &str = "u.id, u.first_name, u.last_name, u.email, u.id_number, u.mail_html";

/// Fold a bigint id into the int4 key space of the two-key advisory lock
///
/// Colliding keys only serialize unrelated pairs.
fn advisory_key(id: i64) -> i32 {
    (id ^ (id >> 32)) as i32
}

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct CertificateRow {
    id: i64,
    course_id: i64,
    name: String,
    intro: String,
    email_teachers: bool,
    email_others: String,
    save_cert: bool,
    delivery: i16,
    cert_type: String,
    orientation: String,
    border_style: String,
    border_color: i16,
    print_watermark: String,
    print_seal: String,
    print_signature: String,
    print_date: i64,
    date_format: i16,
    print_number: bool,
    print_grade: i64,
    grade_format: i16,
    print_outcome: i64,
    print_hours: String,
    print_teacher: bool,
    custom_text: String,
    reissue: bool,
    time_created: i64,
    time_modified: i64,
}

impl TryFrom<CertificateRow> for CertificateDefinition {
    type Error = InvalidColumn;

    fn try_from(row: CertificateRow) -> Result<Self, Self::Error> {
        Ok(CertificateDefinition {
            id: row.id,
            course_id: row.course_id,
            name: row.name,
            intro: row.intro,
            email_teachers: row.email_teachers,
            email_others: row.email_others,
            save_cert: row.save_cert,
            delivery: Delivery::from_raw(row.delivery)
                .ok_or_else(|| InvalidColumn::new("delivery", row.delivery))?,
            template: PageTemplate::from_code(&row.cert_type)
                .ok_or_else(|| InvalidColumn::new("cert_type", &row.cert_type))?,
            orientation: Orientation::from_code(&row.orientation)
                .ok_or_else(|| InvalidColumn::new("orientation", &row.orientation))?,
            border_style: row.border_style,
            border_color: BorderColor::from_raw(row.border_color)
                .ok_or_else(|| InvalidColumn::new("border_color", row.border_color))?,
            watermark: row.print_watermark,
            seal: row.print_seal,
            signature: row.print_signature,
            print_date: DateSource::from_raw(row.print_date),
            date_format: DateFormat::from_raw(row.date_format)
                .ok_or_else(|| InvalidColumn::new("date_format", row.date_format))?,
            print_number: row.print_number,
            print_grade: GradeSource::from_raw(row.print_grade),
            grade_format: GradeFormat::from_raw(row.grade_format)
                .ok_or_else(|| InvalidColumn::new("grade_format", row.grade_format))?,
            print_outcome: (row.print_outcome > 0).then_some(row.print_outcome),
            print_hours: row.print_hours,
            print_teacher: row.print_teacher,
            custom_text: row.custom_text,
            reissue: row.reissue,
            time_created: row.time_created,
            time_modified: row.time_modified,
        })
    }
}

#[derive(Debug, FromRow)]
struct IssueRow {
    id: i64,
    certificate_id: i64,
    user_id: i64,
    code: String,
    time_created: i64,
    cert_date: i64,
    report_grade: Option<String>,
    student_name: String,
    class_name: String,
    mailed: bool,
}

impl From<IssueRow> for CertificateIssue {
    fn from(row: IssueRow) -> Self {
        CertificateIssue {
            id: row.id,
            certificate_id: row.certificate_id,
            user_id: row.user_id,
            code: row.code,
            time_created: row.time_created,
            cert_date: row.cert_date,
            report_grade: row.report_grade,
            student_name: row.student_name,
            class_name: row.class_name,
            mailed: row.mailed,
        }
    }
}

#[derive(Debug, FromRow)]
struct ModuleRow {
    id: i64,
    course_id: i64,
    instance_id: i64,
    group_mode: i16,
    group_members_only: bool,
    grouping_id: Option<i64>,
}

impl From<ModuleRow> for CourseModule {
    fn from(row: ModuleRow) -> Self {
        CourseModule {
            id: row.id,
            course_id: row.course_id,
            instance_id: row.instance_id,
            group_mode: GroupMode::from_raw(row.group_mode),
            group_members_only: row.group_members_only,
            grouping_id: row.grouping_id,
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    id_number: String,
    mail_html: bool,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            id_number: row.id_number,
            mail_html: row.mail_html,
        }
    }
}

#[derive(Debug, FromRow)]
struct GradeRow {
    item_name: String,
    grade_min: Decimal,
    grade_max: Decimal,
    final_grade: Option<Decimal>,
    date_graded: Option<i64>,
}

impl GradeRow {
    fn value(&self) -> GradeValue {
        GradeValue::new(self.final_grade, self.grade_min, self.grade_max)
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: i64,
    name: String,
    module: Option<String>,
}

// ============================================================================
// Certificates and issues
// ============================================================================

#[async_trait]
impl CertificateRepository for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn find_course_module(&self, cm_id: i64) -> AppResult<Option<CourseModule>> {
        let row = sqlx::query_as::<_, ModuleRow>(
            r#"
            SELECT id, course_id, instance_id, group_mode, group_members_only, grouping_id
            FROM course_modules
            WHERE id = $1 AND module = 'certificate'
            "#,
        )
        .bind(cm_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(CourseModule::from))
    }

    async fn find_module_for_certificate(
        &self,
        certificate_id: i64,
    ) -> AppResult<Option<CourseModule>> {
        let row = sqlx::query_as::<_, ModuleRow>(
            r#"
            SELECT id, course_id, instance_id, group_mode, group_members_only, grouping_id
            FROM course_modules
            WHERE module = 'certificate' AND instance_id = $1
            "#,
        )
        .bind(certificate_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(CourseModule::from))
    }

    async fn find_course(&self, course_id: i64) -> AppResult<Option<Course>> {
        let row = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT id, short_name, full_name FROM courses WHERE id = $1",
        )
        .bind(course_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(id, short_name, full_name)| Course {
            id,
            short_name,
            full_name,
        }))
    }

    async fn find_certificate(&self, id: i64) -> AppResult<Option<CertificateDefinition>> {
        let row = sqlx::query_as::<_, CertificateRow>(&format!(
            "SELECT {} FROM certificates WHERE id = $1",
            CERTIFICATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(Some(CertificateDefinition::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn insert_certificate(
        &self,
        definition: &CertificateDefinition,
        module: &NewCourseModule,
    ) -> AppResult<(i64, i64)> {
        let mut tx = self.db.begin().await?;

        let certificate_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO certificates (
                course_id, name, intro, email_teachers, email_others, save_cert, delivery,
                cert_type, orientation, border_style, border_color, print_watermark, print_seal,
                print_signature, print_date, date_format, print_number, print_grade,
                grade_format, print_outcome, print_hours, print_teacher, custom_text, reissue,
                time_created, time_modified
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25, $26)
            RETURNING id
            "#,
        )
        .bind(definition.course_id)
        .bind(&definition.name)
        .bind(&definition.intro)
        .bind(definition.email_teachers)
        .bind(&definition.email_others)
        .bind(definition.save_cert)
        .bind(definition.delivery.to_raw())
        .bind(definition.template.code())
        .bind(definition.orientation.code())
        .bind(&definition.border_style)
        .bind(definition.border_color.to_raw())
        .bind(&definition.watermark)
        .bind(&definition.seal)
        .bind(&definition.signature)
        .bind(definition.print_date.to_raw())
        .bind(definition.date_format.to_raw())
        .bind(definition.print_number)
        .bind(definition.print_grade.to_raw())
        .bind(definition.grade_format.to_raw())
        .bind(definition.print_outcome.unwrap_or(0))
        .bind(&definition.print_hours)
        .bind(definition.print_teacher)
        .bind(&definition.custom_text)
        .bind(definition.reissue)
        .bind(definition.time_created)
        .bind(definition.time_modified)
        .fetch_one(&mut *tx)
        .await?;

        let cm_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO course_modules (
                course_id, module, instance_id, group_mode, group_members_only, grouping_id
            )
            VALUES ($1, 'certificate', $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(module.course_id)
        .bind(certificate_id)
        .bind(module.group_mode.to_raw())
        .bind(module.group_members_only)
        .bind(module.grouping_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((certificate_id, cm_id))
    }

    async fn update_certificate(&self, definition: &CertificateDefinition) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE certificates SET
                name = $2, intro = $3, email_teachers = $4, email_others = $5, save_cert = $6,
                delivery = $7, cert_type = $8, orientation = $9, border_style = $10,
                border_color = $11, print_watermark = $12, print_seal = $13,
                print_signature = $14, print_date = $15, date_format = $16, print_number = $17,
                print_grade = $18, grade_format = $19, print_outcome = $20, print_hours = $21,
                print_teacher = $22, custom_text = $23, reissue = $24, time_modified = $25
            WHERE id = $1
            "#,
        )
        .bind(definition.id)
        .bind(&definition.name)
        .bind(&definition.intro)
        .bind(definition.email_teachers)
        .bind(&definition.email_others)
        .bind(definition.save_cert)
        .bind(definition.delivery.to_raw())
        .bind(definition.template.code())
        .bind(definition.orientation.code())
        .bind(&definition.border_style)
        .bind(definition.border_color.to_raw())
        .bind(&definition.watermark)
        .bind(&definition.seal)
        .bind(&definition.signature)
        .bind(definition.print_date.to_raw())
        .bind(definition.date_format.to_raw())
        .bind(definition.print_number)
        .bind(definition.print_grade.to_raw())
        .bind(definition.grade_format.to_raw())
        .bind(definition.print_outcome.unwrap_or(0))
        .bind(&definition.print_hours)
        .bind(definition.print_teacher)
        .bind(&definition.custom_text)
        .bind(definition.reissue)
        .bind(definition.time_modified)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_certificate(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM course_modules WHERE module = 'certificate' AND instance_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        // Issues go with the definition through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM certificates WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_pending_issue(
        &self,
        certificate_id: i64,
        user_id: i64,
    ) -> AppResult<Option<CertificateIssue>> {
        let row = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {} FROM certificate_issues \
             WHERE certificate_id = $1 AND user_id = $2 AND cert_date = 0",
            ISSUE_COLUMNS
        ))
        .bind(certificate_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(CertificateIssue::from))
    }

    async fn insert_pending_issue(
        &self,
        issue: &NewIssue,
        allow_reissue: bool,
    ) -> AppResult<Option<CertificateIssue>> {
        let mut tx = self.db.begin().await?;

        // Serializes first views of one (certificate, user) pair until commit
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(advisory_key(issue.certificate_id))
            .bind(advisory_key(issue.user_id))
            .execute(&mut *tx)
            .await?;

        if !allow_reissue {
            let (already_issued,): (bool,) = sqlx::query_as(
                "SELECT EXISTS (SELECT 1 FROM certificate_issues WHERE certificate_id = $1 AND user_id = $2)",
            )
            .bind(issue.certificate_id)
            .bind(issue.user_id)
            .fetch_one(&mut *tx)
            .await?;
            if already_issued {
                tx.commit().await?;
                return Ok(None);
            }
        }

        let row = sqlx::query_as::<_, IssueRow>(&format!(
            r#"
            INSERT INTO certificate_issues (
                certificate_id, user_id, code, time_created, cert_date, student_name, class_name
            )
            VALUES ($1, $2, $3, $4, 0, $5, $6)
            ON CONFLICT (certificate_id, user_id) WHERE cert_date = 0 DO NOTHING
            RETURNING {}
            "#,
            ISSUE_COLUMNS
        ))
        .bind(issue.certificate_id)
        .bind(issue.user_id)
        .bind(&issue.code)
        .bind(issue.time_created)
        .bind(&issue.student_name)
        .bind(&issue.class_name)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.map(CertificateIssue::from))
    }

    async fn find_issue(&self, id: i64) -> AppResult<Option<CertificateIssue>> {
        let row = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {} FROM certificate_issues WHERE id = $1",
            ISSUE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(CertificateIssue::from))
    }

    async fn finalize_issue(
        &self,
        id: i64,
        cert_date: i64,
        report_grade: Option<&str>,
    ) -> AppResult<Option<CertificateIssue>> {
        let row = sqlx::query_as::<_, IssueRow>(&format!(
            r#"
            UPDATE certificate_issues
            SET cert_date = $2, report_grade = $3
            WHERE id = $1 AND cert_date = 0
            RETURNING {}
            "#,
            ISSUE_COLUMNS
        ))
        .bind(id)
        .bind(cert_date)
        .bind(report_grade)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(CertificateIssue::from))
    }

    async fn mark_mailed(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE certificate_issues SET mailed = TRUE WHERE id = $1 AND mailed = FALSE",
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_user_issues(
        &self,
        certificate_id: i64,
        user_id: i64,
    ) -> AppResult<Vec<CertificateIssue>> {
        let rows = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {} FROM certificate_issues \
             WHERE certificate_id = $1 AND user_id = $2 \
             ORDER BY time_created, id",
            ISSUE_COLUMNS
        ))
        .bind(certificate_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(CertificateIssue::from).collect())
    }

    async fn list_finalized_issues(&self, certificate_id: i64) -> AppResult<Vec<CertificateIssue>> {
        let rows = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {} FROM certificate_issues \
             WHERE certificate_id = $1 AND cert_date > 0 \
             ORDER BY id",
            ISSUE_COLUMNS
        ))
        .bind(certificate_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(CertificateIssue::from).collect())
    }

    async fn delete_issues_for_course(&self, course_id: i64) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM certificate_issues
            WHERE certificate_id IN (SELECT id FROM certificates WHERE course_id = $1)
            "#,
        )
        .bind(course_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// Gradebook
// ============================================================================

#[async_trait]
impl Gradebook for PgStore {
    async fn course_grade(&self, course_id: i64, user_id: i64) -> AppResult<Option<GradeValue>> {
        let row = sqlx::query_as::<_, GradeRow>(
            r#"
            SELECT gi.item_name, gi.grade_min, gi.grade_max, gg.final_grade, gg.date_graded
            FROM grade_items gi
            LEFT JOIN grade_grades gg ON gg.item_id = gi.id AND gg.user_id = $2
            WHERE gi.course_id = $1 AND gi.item_type = 'course'
            ORDER BY gi.id
            LIMIT 1
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|r| r.value()))
    }

    async fn activity_grade(&self, cm_id: i64, user_id: i64) -> AppResult<Option<ActivityGrade>> {
        let row = sqlx::query_as::<_, GradeRow>(
            r#"
            SELECT gi.item_name, gi.grade_min, gi.grade_max, gg.final_grade, gg.date_graded
            FROM grade_items gi
            LEFT JOIN grade_grades gg ON gg.item_id = gi.id AND gg.user_id = $2
            WHERE gi.cm_id = $1 AND gi.item_type = 'mod'
            ORDER BY gi.id
            LIMIT 1
            "#,
        )
        .bind(cm_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|r| ActivityGrade {
            value: r.value(),
            date_graded: r.date_graded,
            name: r.item_name,
        }))
    }

    async fn outcome_grade(&self, item_id: i64, user_id: i64) -> AppResult<Option<OutcomeGrade>> {
        let row = sqlx::query_as::<_, GradeRow>(
            r#"
            SELECT gi.item_name, gi.grade_min, gi.grade_max, gg.final_grade, gg.date_graded
            FROM grade_items gi
            LEFT JOIN grade_grades gg ON gg.item_id = gi.id AND gg.user_id = $2
            WHERE gi.id = $1 AND gi.item_type = 'outcome'
            "#,
        )
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|r| OutcomeGrade {
            value: r.value(),
            name: r.item_name,
        }))
    }

    async fn graded_activities(&self, course_id: i64) -> AppResult<Vec<GradeItemSummary>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT cm_id AS id, item_name AS name, item_module AS module
            FROM grade_items
            WHERE course_id = $1 AND item_type = 'mod' AND cm_id IS NOT NULL
            ORDER BY item_name, id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| GradeItemSummary {
                id: r.id,
                name: r.name,
                module: r.module,
            })
            .collect())
    }

    async fn outcome_items(&self, course_id: i64) -> AppResult<Vec<GradeItemSummary>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, item_name AS name, item_module AS module
            FROM grade_items
            WHERE course_id = $1 AND item_type = 'outcome'
            ORDER BY item_name, id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| GradeItemSummary {
                id: r.id,
                name: r.name,
                module: r.module,
            })
            .collect())
    }
}

// ============================================================================
// Directory
// ============================================================================

#[async_trait]
impl Directory for PgStore {
    async fn find_user(&self, id: i64) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users u WHERE u.id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(UserRecord::from))
    }

    async fn users_with_capability(
        &self,
        cm_id: i64,
        capability: &str,
    ) -> AppResult<Vec<UserRecord>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {}
            FROM users u
            JOIN capability_assignments ca ON ca.user_id = u.id
            WHERE ca.cm_id = $1 AND ca.capability = $2
            ORDER BY u.id
            "#,
            USER_COLUMNS
        ))
        .bind(cm_id)
        .bind(capability)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(UserRecord::from).collect())
    }

    async fn user_capabilities(&self, cm_id: i64, user_id: i64) -> AppResult<Vec<String>> {
        let capabilities = sqlx::query_scalar::<_, String>(
            "SELECT capability FROM capability_assignments WHERE cm_id = $1 AND user_id = $2",
        )
        .bind(cm_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(capabilities)
    }

    async fn user_groups(&self, course_id: i64, user_id: i64) -> AppResult<Vec<Group>> {
        let rows = sqlx::query_as::<_, (i64, i64, String)>(
            r#"
            SELECT g.id, g.course_id, g.name
            FROM groups g
            JOIN group_members gm ON gm.group_id = g.id
            WHERE g.course_id = $1 AND gm.user_id = $2
            ORDER BY g.name, g.id
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, course_id, name)| Group {
                id,
                course_id,
                name,
            })
            .collect())
    }

    async fn group_members(&self, group_id: i64) -> AppResult<Vec<i64>> {
        let members = sqlx::query_scalar::<_, i64>(
            "SELECT user_id FROM group_members WHERE group_id = $1 ORDER BY user_id",
        )
        .bind(group_id)
        .fetch_all(&self.db)
        .await?;

        Ok(members)
    }

    async fn grouping_members(&self, grouping_id: i64) -> AppResult<Vec<i64>> {
        let members = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT DISTINCT gm.user_id
            FROM group_members gm
            JOIN grouping_groups gg ON gg.group_id = gm.group_id
            WHERE gg.grouping_id = $1
            ORDER BY gm.user_id
            "#,
        )
        .bind(grouping_id)
        .fetch_all(&self.db)
        .await?;

        Ok(members)
    }

    async fn course_group_members(&self, course_id: i64) -> AppResult<Vec<i64>> {
        let members = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT DISTINCT gm.user_id
            FROM group_members gm
            JOIN groups g ON g.id = gm.group_id
            WHERE g.course_id = $1
            ORDER BY gm.user_id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.db)
        .await?;

        Ok(members)
    }
}
