//! Tests for award notifications and student delivery by e-mail

mod common;

use certificate_backend::external::MemoryMailer;
use certificate_backend::models::{capability, CertificateIssue, Group, GroupMode};
use certificate_backend::services::notification::Notifier;
use common::{
    definition, finalized_issue, module, user, Fixture, CM_ID, COURSE_ID, STUDENT_ID, TEACHER_ID,
};

const OTHER_TEACHER_ID: i64 = 3;

fn notifier(fixture: &Fixture) -> Notifier {
    let config = &fixture.state.config;
    Notifier::new(
        fixture.store.clone(),
        fixture.store.clone(),
        fixture.mailer.clone(),
        config.site.clone(),
        config.mail.site_name.clone(),
    )
}

fn awarded_issue() -> CertificateIssue {
    let mut issue = finalized_issue(50, STUDENT_ID, 1_700_000_000, "ABCDEFGHIJ");
    issue.student_name = "Ada Lovelace".to_string();
    issue
}

async fn separate_groups_fixture() -> Fixture {
    let mut grouped = module();
    grouped.group_mode = GroupMode::Separate;
    let fixture = Fixture::with_parts(definition(), grouped, MemoryMailer::new()).await;
    fixture
        .store
        .add_user(user(OTHER_TEACHER_ID, "Alan", "Turing"))
        .await;
    fixture
        .store
        .grant(CM_ID, OTHER_TEACHER_ID, capability::MANAGE)
        .await;
    for (id, name) in [(1, "Blue"), (2, "Red")] {
        fixture
            .store
            .add_group(Group {
                id,
                course_id: COURSE_ID,
                name: name.to_string(),
            })
            .await;
    }
    fixture
}

fn ids(users: &[certificate_backend::models::UserRecord]) -> Vec<i64> {
    users.iter().map(|u| u.id).collect()
}

// =============================================================================
// Teacher selection
// =============================================================================

mod teachers {
    use super::*;

    #[tokio::test]
    async fn managers_are_notified_without_groups() {
        let fixture = Fixture::new(definition()).await;
        let (ctx, _) = fixture.context(STUDENT_ID).await;

        let teachers = notifier(&fixture)
            .teachers_to_notify(&ctx, &ctx.user)
            .await
            .unwrap();

        assert_eq!(ids(&teachers), vec![TEACHER_ID]);
    }

    #[tokio::test]
    async fn student_is_never_their_own_teacher() {
        let fixture = Fixture::new(definition()).await;
        fixture.store.grant(CM_ID, STUDENT_ID, capability::MANAGE).await;
        let (ctx, _) = fixture.context(STUDENT_ID).await;

        let teachers = notifier(&fixture)
            .teachers_to_notify(&ctx, &ctx.user)
            .await
            .unwrap();

        assert_eq!(ids(&teachers), vec![TEACHER_ID]);
    }

    #[tokio::test]
    async fn separate_groups_limit_teachers_to_shared_groups() {
        let fixture = separate_groups_fixture().await;
        fixture.store.add_group_member(1, STUDENT_ID).await;
        fixture.store.add_group_member(1, TEACHER_ID).await;
        fixture.store.add_group_member(2, OTHER_TEACHER_ID).await;
        let (ctx, _) = fixture.context(STUDENT_ID).await;

        let teachers = notifier(&fixture)
            .teachers_to_notify(&ctx, &ctx.user)
            .await
            .unwrap();

        assert_eq!(ids(&teachers), vec![TEACHER_ID]);
    }

    #[tokio::test]
    async fn ungrouped_student_goes_to_ungrouped_teachers() {
        let fixture = separate_groups_fixture().await;
        fixture.store.add_group_member(2, OTHER_TEACHER_ID).await;
        let (ctx, _) = fixture.context(STUDENT_ID).await;

        let teachers = notifier(&fixture)
            .teachers_to_notify(&ctx, &ctx.user)
            .await
            .unwrap();

        assert_eq!(ids(&teachers), vec![TEACHER_ID]);
    }
}

// =============================================================================
// Award notifications
// =============================================================================

mod awards {
    use super::*;

    #[tokio::test]
    async fn teachers_and_others_receive_the_award() {
        let mut def = definition();
        def.email_teachers = true;
        def.email_others = "registrar@example.com, dean@example.com".to_string();
        let fixture = Fixture::new(def).await;
        let (ctx, def) = fixture.context(STUDENT_ID).await;

        notifier(&fixture)
            .notify_issued(&ctx, &def, &awarded_issue())
            .await
            .unwrap();

        let sent = fixture.mailer.sent().await;
        let recipients: Vec<&str> = sent.iter().map(|m| m.to.email.as_str()).collect();
        assert_eq!(
            recipients,
            vec![
                "grace.hopper@example.com",
                "registrar@example.com",
                "dean@example.com"
            ]
        );
        for mail in &sent {
            assert_eq!(mail.subject, "Certificate awarded: Ada Lovelace -> Course Completion");
            assert_eq!(mail.from_name, "Ada Lovelace");
            assert!(mail.text.contains("https://campus.example.com/certificates/modules/100/report"));
            assert!(mail.attachment.is_none());
        }
        // Teacher prefers plain text, external recipients always get HTML
        assert!(sent[0].html.is_none());
        assert!(sent[1].html.is_some());
    }

    #[tokio::test]
    async fn html_teachers_receive_html() {
        let mut def = definition();
        def.email_teachers = true;
        let fixture = Fixture::new(def).await;
        let mut teacher = user(TEACHER_ID, "Grace", "Hopper");
        teacher.mail_html = true;
        fixture.store.add_user(teacher).await;
        let (ctx, def) = fixture.context(STUDENT_ID).await;

        notifier(&fixture)
            .notify_issued(&ctx, &def, &awarded_issue())
            .await
            .unwrap();

        let sent = fixture.mailer.sent().await;
        assert_eq!(sent.len(), 1);
        let html = sent[0].html.as_deref().unwrap();
        assert!(html.contains("<i>Course Completion</i>"));
    }

    #[tokio::test]
    async fn failed_deliveries_do_not_stop_the_rest() {
        let mut def = definition();
        def.email_teachers = true;
        def.email_others = "registrar@example.com".to_string();
        let fixture = Fixture::with_parts(
            def,
            module(),
            MemoryMailer::rejecting(["grace.hopper@example.com"]),
        )
        .await;
        let (ctx, def) = fixture.context(STUDENT_ID).await;

        let result = notifier(&fixture)
            .notify_issued(&ctx, &def, &awarded_issue())
            .await;

        assert!(result.is_ok());
        let sent = fixture.mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to.email, "registrar@example.com");
    }

    #[tokio::test]
    async fn disabled_notifications_send_nothing() {
        let fixture = Fixture::new(definition()).await;
        let (ctx, def) = fixture.context(STUDENT_ID).await;

        notifier(&fixture)
            .notify_issued(&ctx, &def, &awarded_issue())
            .await
            .unwrap();

        assert!(fixture.mailer.sent().await.is_empty());
    }
}

// =============================================================================
// Student delivery
// =============================================================================

mod student_mail {
    use super::*;

    #[tokio::test]
    async fn certificate_is_mailed_once() {
        let fixture = Fixture::new(definition()).await;
        fixture.store.add_issue(awarded_issue()).await;
        let (ctx, def) = fixture.context(STUDENT_ID).await;
        let notifier = notifier(&fixture);
        let pdf = b"%PDF-1.3 test".to_vec();

        let first = notifier
            .email_student(&ctx, &def, &awarded_issue(), &pdf)
            .await
            .unwrap();
        let second = notifier
            .email_student(&ctx, &def, &awarded_issue(), &pdf)
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        let sent = fixture.mailer.sent().await;
        assert_eq!(sent.len(), 1);
        let mail = &sent[0];
        assert_eq!(mail.to.email, "ada.lovelace@example.com");
        assert_eq!(mail.subject, "Introduction to Rust: Course Completion");
        assert_eq!(mail.from_name, "Example Campus");
        assert!(mail.text.starts_with("Dear Ada Lovelace,"));
        assert!(mail.html.is_some());
        let attachment = mail.attachment.as_ref().unwrap();
        assert_eq!(attachment.filename, "Course Completion.pdf");
        assert_eq!(attachment.content_type, "application/pdf");
        assert_eq!(attachment.bytes, pdf);

        let stored = fixture.store.issues().await;
        assert!(stored[0].mailed);
    }

    #[tokio::test]
    async fn course_editor_signs_the_mail() {
        let fixture = Fixture::new(definition()).await;
        fixture.store.add_issue(awarded_issue()).await;
        fixture
            .store
            .grant(CM_ID, TEACHER_ID, capability::COURSE_UPDATE)
            .await;
        let (ctx, def) = fixture.context(STUDENT_ID).await;

        notifier(&fixture)
            .email_student(&ctx, &def, &awarded_issue(), b"%PDF")
            .await
            .unwrap();

        assert_eq!(fixture.mailer.sent().await[0].from_name, "Grace Hopper");
    }

    #[tokio::test]
    async fn already_mailed_issue_is_skipped() {
        let fixture = Fixture::new(definition()).await;
        let mut issue = awarded_issue();
        issue.mailed = true;
        fixture.store.add_issue(issue.clone()).await;
        let (ctx, def) = fixture.context(STUDENT_ID).await;

        let sent = notifier(&fixture)
            .email_student(&ctx, &def, &issue, b"%PDF")
            .await
            .unwrap();

        assert!(!sent);
        assert!(fixture.mailer.sent().await.is_empty());
    }
}
