//! End-to-end tests of the HTTP surface
//! Requests go through the router with signed bearer tokens

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use certificate_backend::create_app;
use certificate_backend::middleware::auth::Claims;
use certificate_backend::models::{capability, Delivery};
use common::{definition, Fixture, CM_ID, COURSE_ID, STUDENT_ID, TEACHER_ID};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

fn token(user_id: i64, permissions: &[&str]) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        exp: now + 600,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(common::test_config().jwt.secret.as_bytes()),
    )
    .unwrap()
}

fn get(uri: &str, bearer: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
        .body(Body::empty())
        .unwrap()
}

fn send_json(method: Method, uri: &str, bearer: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn error_code(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap();
    value["error"]["code"].as_str().unwrap_or_default().to_string()
}

// =============================================================================
// Authentication
// =============================================================================

mod authentication {
    use super::*;

    #[tokio::test]
    async fn health_is_public() {
        let fixture = Fixture::new(definition()).await;
        let app = create_app(fixture.state.clone());

        let request = Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap();
        let (status, _, body) = call(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["database"], "connected");
    }

    #[tokio::test]
    async fn certificate_routes_need_a_token() {
        let fixture = Fixture::new(definition()).await;
        let app = create_app(fixture.state.clone());

        let request = Request::builder()
            .uri(format!("/api/v1/certificates/modules/{}", CM_ID))
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = call(&app, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn forged_tokens_are_rejected() {
        let fixture = Fixture::new(definition()).await;
        let app = create_app(fixture.state.clone());
        let now = chrono::Utc::now().timestamp();
        let forged = encode(
            &Header::default(),
            &Claims {
                sub: STUDENT_ID.to_string(),
                permissions: Vec::new(),
                exp: now + 600,
                iat: now,
            },
            &EncodingKey::from_secret(b"someone-else"),
        )
        .unwrap();

        let (status, _, _) = call(&app, get(&format!("/api/v1/certificates/modules/{}", CM_ID), &forged)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

// =============================================================================
// Viewing and files
// =============================================================================

mod viewing {
    use super::*;

    #[tokio::test]
    async fn view_returns_an_inline_pdf() {
        let fixture = Fixture::new(definition()).await;
        let app = create_app(fixture.state.clone());

        let (status, headers, body) = call(
            &app,
            get(&format!("/api/v1/certificates/modules/{}", CM_ID), &token(STUDENT_ID, &[])),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "inline; filename=\"Course Completion.pdf\""
        );
        assert!(body.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn emailed_view_answers_with_json() {
        let mut def = definition();
        def.delivery = Delivery::Email;
        let fixture = Fixture::new(def).await;
        let app = create_app(fixture.state.clone());

        let (status, _, body) = call(
            &app,
            get(&format!("/api/v1/certificates/modules/{}", CM_ID), &token(STUDENT_ID, &[])),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["sent"], true);
        assert_eq!(fixture.mailer.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn stored_files_are_served_to_owner_and_managers() {
        let mut def = definition();
        def.save_cert = true;
        let fixture = Fixture::new(def).await;
        let app = create_app(fixture.state.clone());
        call(
            &app,
            get(&format!("/api/v1/certificates/modules/{}", CM_ID), &token(STUDENT_ID, &[])),
        )
        .await;
        let hash = fixture.files.files().await[0].content_hash.clone();
        let uri = format!("/api/v1/certificates/files/{}", hash);
        fixture.store.add_user(common::user(9, "Eve", "Outsider")).await;

        let (owner, headers, body) = call(&app, get(&uri, &token(STUDENT_ID, &[]))).await;
        let (manager, _, _) = call(&app, get(&uri, &token(TEACHER_ID, &[]))).await;
        let (stranger, _, _) = call(&app, get(&uri, &token(9, &[]))).await;

        assert_eq!(owner, StatusCode::OK);
        assert!(headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment"));
        assert!(body.starts_with(b"%PDF"));
        assert_eq!(manager, StatusCode::OK);
        assert_eq!(stranger, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn malformed_hashes_are_bad_requests() {
        let fixture = Fixture::new(definition()).await;
        let app = create_app(fixture.state.clone());

        let (status, _, body) = call(
            &app,
            get("/api/v1/certificates/files/not-a-hash", &token(STUDENT_ID, &[])),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "INVALID_HASH");
    }

    #[tokio::test]
    async fn students_read_only_their_own_outline() {
        let fixture = Fixture::new(definition()).await;
        let app = create_app(fixture.state.clone());
        let student = token(STUDENT_ID, &[]);

        let (own, _, body) = call(
            &app,
            get(&format!("/api/v1/certificates/modules/{}/outline/{}", CM_ID, STUDENT_ID), &student),
        )
        .await;
        let (other, _, _) = call(
            &app,
            get(&format!("/api/v1/certificates/modules/{}/outline/{}", CM_ID, TEACHER_ID), &student),
        )
        .await;

        assert_eq!(own, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({ "status": "not_issued" }));
        assert_eq!(other, StatusCode::FORBIDDEN);
    }
}

// =============================================================================
// Reports and administration
// =============================================================================

mod administration {
    use super::*;

    #[tokio::test]
    async fn report_requires_manage() {
        let fixture = Fixture::new(definition()).await;
        let app = create_app(fixture.state.clone());
        let uri = format!("/api/v1/certificates/modules/{}/report?download=txt&sort=code", CM_ID);

        let (student, _, _) = call(&app, get(&uri, &token(STUDENT_ID, &[]))).await;
        let (teacher, headers, body) = call(&app, get(&uri, &token(TEACHER_ID, &[]))).await;

        assert_eq!(student, StatusCode::FORBIDDEN);
        assert_eq!(teacher, StatusCode::OK);
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"RUST101 Course Completion.txt\""
        );
        assert!(String::from_utf8(body).unwrap().starts_with("Last name\tFirst name"));
    }

    #[tokio::test]
    async fn course_editors_create_certificates() {
        let fixture = Fixture::new(definition()).await;
        let app = create_app(fixture.state.clone());
        let body = json!({ "course_id": COURSE_ID, "name": "Second Certificate" });

        let (refused, _, _) = call(
            &app,
            send_json(Method::POST, "/api/v1/certificates", &token(TEACHER_ID, &[]), body.clone()),
        )
        .await;
        let (created, _, response) = call(
            &app,
            send_json(
                Method::POST,
                "/api/v1/certificates",
                &token(TEACHER_ID, &[capability::COURSE_UPDATE]),
                body,
            ),
        )
        .await;

        assert_eq!(refused, StatusCode::FORBIDDEN);
        assert_eq!(created, StatusCode::CREATED);
        let value: Value = serde_json::from_slice(&response).unwrap();
        assert_eq!(value["certificate"]["name"], "Second Certificate");
        assert!(value["cm_id"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn module_managers_update_and_delete() {
        let fixture = Fixture::new(definition()).await;
        let app = create_app(fixture.state.clone());
        let uri = format!("/api/v1/certificates/{}", common::CERTIFICATE_ID);

        let (student, _, _) = call(
            &app,
            send_json(Method::PUT, &uri, &token(STUDENT_ID, &[]), json!({ "name": "Hijacked" })),
        )
        .await;
        let (updated, _, _) = call(
            &app,
            send_json(Method::PUT, &uri, &token(TEACHER_ID, &[]), json!({ "name": "Renamed" })),
        )
        .await;
        let delete = Request::builder()
            .method(Method::DELETE)
            .uri(&uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token(TEACHER_ID, &[])))
            .body(Body::empty())
            .unwrap();
        let (deleted, _, _) = call(&app, delete).await;

        assert_eq!(student, StatusCode::FORBIDDEN);
        assert_eq!(updated, StatusCode::OK);
        assert_eq!(deleted, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn invalid_settings_are_bad_requests() {
        let fixture = Fixture::new(definition()).await;
        let app = create_app(fixture.state.clone());

        let (status, _, body) = call(
            &app,
            send_json(
                Method::PUT,
                &format!("/api/v1/certificates/{}", common::CERTIFICATE_ID),
                &token(TEACHER_ID, &[]),
                json!({ "name": "Renamed", "orientation": "X" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "VALIDATION_ERROR");
    }
}
