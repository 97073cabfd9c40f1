//! Tests for certificate administration
//! Covers definition lifecycle, course reset, per-user summaries and the settings form

mod common;

use std::path::PathBuf;

use certificate_backend::error::AppError;
use certificate_backend::external::storage::{FileKey, FileStore, PDF_MIME_TYPE};
use certificate_backend::models::{Attempt, ChoiceOption, Delivery, GradeSource, UserOutline};
use certificate_backend::repository::memory::MemoryGradeItem;
use certificate_backend::repository::CertificateRepository;
use certificate_backend::services::assets::AssetCatalogue;
use certificate_backend::services::certificate::{
    CertificateInput, CertificateService, CreateCertificateInput,
};
use common::{
    definition, finalized_issue, test_config, Fixture, CERTIFICATE_ID, CM_ID, COURSE_ID,
    STUDENT_ID,
};
use rust_decimal::Decimal;
use serde_json::json;

fn service(fixture: &Fixture) -> CertificateService {
    service_with_assets(fixture, test_config().assets.root)
}

fn service_with_assets(fixture: &Fixture, root: impl Into<PathBuf>) -> CertificateService {
    CertificateService::new(
        fixture.store.clone(),
        fixture.store.clone(),
        fixture.files.clone(),
        AssetCatalogue::new(root),
    )
}

fn create_input(value: serde_json::Value) -> CreateCertificateInput {
    serde_json::from_value(value).unwrap()
}

fn no() -> ChoiceOption {
    ChoiceOption::new("0", "No")
}

// =============================================================================
// Definition lifecycle
// =============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn create_places_the_certificate_in_the_course() {
        let fixture = Fixture::new(definition()).await;

        let created = service(&fixture)
            .create(create_input(json!({
                "course_id": COURSE_ID,
                "group_mode": 1,
                "name": "  Advanced Certificate ",
                "delivery": 2,
                "print_grade": 1,
                "email_others": "registrar@example.com"
            })))
            .await
            .unwrap();

        let def = &created.certificate;
        assert_eq!(def.name, "Advanced Certificate");
        assert_eq!(def.course_id, COURSE_ID);
        assert_eq!(def.delivery, Delivery::Email);
        assert_eq!(def.print_grade, GradeSource::Course);
        let module = fixture
            .store
            .find_course_module(created.cm_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(module.instance_id, def.id);
        assert!(module.group_mode.is_active());
        assert_eq!(
            fixture.store.find_certificate(def.id).await.unwrap().unwrap().name,
            "Advanced Certificate"
        );
    }

    #[tokio::test]
    async fn create_needs_an_existing_course() {
        let fixture = Fixture::new(definition()).await;

        let result = service(&fixture)
            .create(create_input(json!({ "course_id": 999, "name": "Orphan" })))
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_rejects_bad_recipients() {
        let fixture = Fixture::new(definition()).await;

        let result = service(&fixture)
            .create(create_input(json!({
                "course_id": COURSE_ID,
                "name": "Broken",
                "email_others": "registrar@example.com, not-an-address"
            })))
            .await;

        match result {
            Err(AppError::Validation { field, message }) => {
                assert_eq!(field, "email_others");
                assert!(message.contains("not-an-address"));
            }
            other => panic!("expected validation error, got {:?}", other.map(|c| c.cm_id)),
        }
    }

    #[tokio::test]
    async fn update_keeps_course_and_creation_time() {
        let fixture = Fixture::new(definition()).await;
        let input: CertificateInput =
            serde_json::from_value(json!({ "name": "Renamed", "reissue": true })).unwrap();

        let updated = service(&fixture).update(CERTIFICATE_ID, input).await.unwrap();

        assert_eq!(updated.name, "Renamed");
        assert!(updated.reissue);
        assert_eq!(updated.course_id, COURSE_ID);
        assert_eq!(updated.time_created, definition().time_created);
        let stored = fixture.store.find_certificate(CERTIFICATE_ID).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn update_of_unknown_certificate_is_not_found() {
        let fixture = Fixture::new(definition()).await;
        let input: CertificateInput = serde_json::from_value(json!({ "name": "Ghost" })).unwrap();

        let result = service(&fixture).update(4242, input).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_removes_issues_module_and_files() {
        let fixture = Fixture::new(definition()).await;
        fixture
            .store
            .add_issue(finalized_issue(50, STUDENT_ID, 1_700_000_000, "ABCDEFGHIJ"))
            .await;
        fixture
            .files
            .save_if_absent(
                &FileKey::issue(CM_ID, 50, "Course Completion.pdf"),
                PDF_MIME_TYPE,
                STUDENT_ID,
                b"%PDF-1.3",
            )
            .await
            .unwrap();

        service(&fixture).delete(CERTIFICATE_ID).await.unwrap();

        assert!(fixture.store.find_certificate(CERTIFICATE_ID).await.unwrap().is_none());
        assert!(fixture.store.find_course_module(CM_ID).await.unwrap().is_none());
        assert!(fixture.store.issues().await.is_empty());
        assert!(fixture.files.files().await.is_empty());
    }

    #[tokio::test]
    async fn reset_removes_issues_only() {
        let fixture = Fixture::new(definition()).await;
        fixture
            .store
            .add_issue(finalized_issue(50, STUDENT_ID, 1_700_000_000, "ABCDEFGHIJ"))
            .await;
        fixture
            .store
            .add_issue(finalized_issue(51, STUDENT_ID, 1_700_100_000, "KLMNOPQRST"))
            .await;

        let status = service(&fixture).reset_course(COURSE_ID).await.unwrap();

        assert_eq!(status.len(), 1);
        assert_eq!(status[0].removed, 2);
        assert!(!status[0].error);
        assert!(fixture.store.issues().await.is_empty());
        assert!(fixture.store.find_certificate(CERTIFICATE_ID).await.unwrap().is_some());
    }
}

// =============================================================================
// Per-user summaries
// =============================================================================

mod summaries {
    use super::*;

    #[tokio::test]
    async fn outline_reports_the_latest_finalized_issue() {
        let fixture = Fixture::new(definition()).await;
        let service = service(&fixture);

        assert_eq!(
            service.user_outline(&definition(), STUDENT_ID).await.unwrap(),
            UserOutline::NotIssued
        );

        fixture
            .store
            .add_issue(finalized_issue(50, STUDENT_ID, 1_700_000_000, "ABCDEFGHIJ"))
            .await;
        let mut pending = finalized_issue(51, STUDENT_ID, 1_700_100_000, "KLMNOPQRST");
        pending.cert_date = 0;
        fixture.store.add_issue(pending).await;

        assert_eq!(
            service.user_outline(&definition(), STUDENT_ID).await.unwrap(),
            UserOutline::Issued { time: 1_700_000_060 }
        );
    }

    #[tokio::test]
    async fn attempts_show_grades_only_when_printed() {
        let fixture = Fixture::new(definition()).await;
        let mut graded = finalized_issue(50, STUDENT_ID, 1_700_000_000, "ABCDEFGHIJ");
        graded.report_grade = Some("85.00".to_string());
        fixture.store.add_issue(graded).await;
        let mut pending = finalized_issue(51, STUDENT_ID, 1_700_100_000, "KLMNOPQRST");
        pending.cert_date = 0;
        fixture.store.add_issue(pending).await;
        let service = service(&fixture);

        let hidden = service.attempts(&definition(), STUDENT_ID).await.unwrap();
        let mut printing = definition();
        printing.print_grade = GradeSource::Course;
        let shown = service.attempts(&printing, STUDENT_ID).await.unwrap();

        assert_eq!(hidden.len(), 2);
        assert!(hidden.iter().all(|a| a.grade.is_none()));
        assert_eq!(
            shown,
            vec![
                Attempt {
                    issue_id: 50,
                    date_completed: shared::formatting::format_report_date(1_700_000_060),
                    grade: Some("85.00".to_string()),
                },
                Attempt {
                    issue_id: 51,
                    date_completed: String::new(),
                    grade: Some(String::new()),
                },
            ]
        );
    }
}

// =============================================================================
// Settings form
// =============================================================================

mod settings {
    use super::*;

    fn item(name: &str, module: Option<&str>) -> MemoryGradeItem {
        MemoryGradeItem {
            course_id: COURSE_ID,
            name: name.to_string(),
            module: module.map(str::to_string),
            min: Decimal::ZERO,
            max: Decimal::from(10),
        }
    }

    #[tokio::test]
    async fn grade_and_date_choices_list_graded_activities() {
        let fixture = Fixture::new(definition()).await;
        fixture.store.add_activity(300, item("Final exam", None)).await;
        fixture.store.add_outcome(400, item("Teamwork", Some("Project"))).await;

        let options = service(&fixture).settings_options(COURSE_ID).await.unwrap();

        assert_eq!(
            options.print_grade,
            vec![
                no(),
                ChoiceOption::new("1", "Course Grade"),
                ChoiceOption::new("300", "Final exam Grade"),
            ]
        );
        assert_eq!(
            options.print_date,
            vec![
                no(),
                ChoiceOption::new("1", "Date issued"),
                ChoiceOption::new("300", "Final exam Date graded"),
            ]
        );
        assert_eq!(
            options.print_outcome,
            vec![no(), ChoiceOption::new("400", "Project: Teamwork")]
        );
        assert_eq!(options.borders, vec![no()]);
        assert_eq!(options.orientation.len(), 2);
    }

    #[tokio::test]
    async fn courses_without_outcomes_say_so() {
        let fixture = Fixture::new(definition()).await;

        let options = service(&fixture).settings_options(COURSE_ID).await.unwrap();

        assert_eq!(options.print_outcome, vec![ChoiceOption::new("0", "No outcomes")]);
    }

    #[tokio::test]
    async fn picture_choices_come_from_the_assets_directory() {
        let root = std::env::temp_dir().join(format!(
            "certificate-assets-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let borders = root.join("borders");
        tokio::fs::create_dir_all(&borders).await.unwrap();
        for name in ["Plain.jpg", "Fancy.png", "README.txt"] {
            tokio::fs::write(borders.join(name), b"x").await.unwrap();
        }
        let fixture = Fixture::new(definition()).await;

        let options = service_with_assets(&fixture, &root)
            .settings_options(COURSE_ID)
            .await
            .unwrap();

        assert_eq!(
            options.borders,
            vec![
                ChoiceOption::new("Fancy.png", "Fancy"),
                ChoiceOption::new("Plain.jpg", "Plain"),
                no(),
            ]
        );
        assert_eq!(options.seals, vec![no()]);
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
