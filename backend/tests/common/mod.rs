//! Shared fixture for the integration tests
//!
//! One course with one certificate module, a student and a manager, all held
//! by the in-memory store.

#![allow(dead_code)]

use std::sync::Arc;

use certificate_backend::config::{
    AssetsConfig, Config, DatabaseConfig, JwtConfig, MailConfig, ServerConfig, SiteConfig,
    StorageConfig,
};
use certificate_backend::external::{MemoryFileStore, MemoryMailer};
use certificate_backend::models::{
    capability, BorderColor, CertificateDefinition, CertificateIssue, Course, CourseModule,
    DateFormat, DateSource, Delivery, GradeFormat, GradeSource, GroupMode, Orientation,
    PageTemplate, UserRecord,
};
use certificate_backend::repository::MemoryStore;
use certificate_backend::services::access::{AccessService, RequestContext};
use certificate_backend::services::assets::AssetCatalogue;
use certificate_backend::AppState;

pub const COURSE_ID: i64 = 10;
pub const CM_ID: i64 = 100;
pub const CERTIFICATE_ID: i64 = 200;
pub const STUDENT_ID: i64 = 1;
pub const TEACHER_ID: i64 = 2;

pub fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://localhost/certificates_test".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry: 3600,
        },
        mail: MailConfig {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 25,
            starttls: false,
            smtp_username: None,
            smtp_password: None,
            from_address: "noreply@example.com".to_string(),
            site_name: "Example Campus".to_string(),
        },
        site: SiteConfig {
            www_root: "https://campus.example.com/".to_string(),
            date_pattern: shared::formatting::DEFAULT_LOCALE_PATTERN.to_string(),
        },
        assets: AssetsConfig {
            root: "/nonexistent/certificate-assets".to_string(),
        },
        storage: StorageConfig {
            root: "/nonexistent/certificate-files".to_string(),
        },
    }
}

pub fn user(id: i64, first: &str, last: &str) -> UserRecord {
    UserRecord {
        id,
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
        id_number: String::new(),
        mail_html: false,
    }
}

pub fn course() -> Course {
    Course {
        id: COURSE_ID,
        short_name: "RUST101".to_string(),
        full_name: "Introduction to Rust".to_string(),
    }
}

pub fn module() -> CourseModule {
    CourseModule {
        id: CM_ID,
        course_id: COURSE_ID,
        instance_id: CERTIFICATE_ID,
        group_mode: GroupMode::None,
        group_members_only: false,
        grouping_id: None,
    }
}

/// A plain letter landscape certificate printing nothing optional
pub fn definition() -> CertificateDefinition {
    CertificateDefinition {
        id: CERTIFICATE_ID,
        course_id: COURSE_ID,
        name: "Course Completion".to_string(),
        intro: String::new(),
        email_teachers: false,
        email_others: String::new(),
        save_cert: false,
        delivery: Delivery::Inline,
        template: PageTemplate::Letter,
        orientation: Orientation::Landscape,
        border_style: "0".to_string(),
        border_color: BorderColor::None,
        watermark: "0".to_string(),
        seal: "0".to_string(),
        signature: "0".to_string(),
        print_date: DateSource::IssueDate,
        date_format: DateFormat::LongMonthDay,
        print_number: false,
        print_grade: GradeSource::None,
        grade_format: GradeFormat::Percentage,
        print_outcome: None,
        print_hours: String::new(),
        print_teacher: false,
        custom_text: String::new(),
        reissue: false,
        time_created: 1_700_000_000,
        time_modified: 1_700_000_000,
    }
}

pub fn finalized_issue(id: i64, user_id: i64, time_created: i64, code: &str) -> CertificateIssue {
    CertificateIssue {
        id,
        certificate_id: CERTIFICATE_ID,
        user_id,
        code: code.to_string(),
        time_created,
        cert_date: time_created + 60,
        report_grade: None,
        student_name: String::new(),
        class_name: "Introduction to Rust".to_string(),
        mailed: false,
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
    pub files: Arc<MemoryFileStore>,
    pub state: AppState,
}

impl Fixture {
    pub async fn new(definition: CertificateDefinition) -> Self {
        Self::with_parts(definition, module(), MemoryMailer::new()).await
    }

    pub async fn with_parts(
        definition: CertificateDefinition,
        module: CourseModule,
        mailer: MemoryMailer,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        store.add_course(course()).await;
        store.add_module(module).await;
        store.add_certificate(definition).await;
        store.add_user(user(STUDENT_ID, "Ada", "Lovelace")).await;
        store.add_user(user(TEACHER_ID, "Grace", "Hopper")).await;
        store.grant(CM_ID, STUDENT_ID, capability::VIEW).await;
        store.grant(CM_ID, TEACHER_ID, capability::MANAGE).await;

        let mailer = Arc::new(mailer);
        let files = Arc::new(MemoryFileStore::new());
        let state = AppState {
            certificates: store.clone(),
            gradebook: store.clone(),
            directory: store.clone(),
            files: files.clone(),
            mailer: mailer.clone(),
            assets: AssetCatalogue::new(test_config().assets.root),
            config: Arc::new(test_config()),
        };

        Self {
            store,
            mailer,
            files,
            state,
        }
    }

    pub async fn context(&self, user_id: i64) -> (RequestContext, CertificateDefinition) {
        AccessService::new(&self.state)
            .authorize(user_id, CM_ID)
            .await
            .unwrap()
    }
}
