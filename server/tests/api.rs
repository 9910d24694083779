use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use infradocs_server::{
    config::Config,
    mailer::Outbox,
    store::{MemoryDocumentStore, MemoryUserStore, UserStore},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    users: Arc<MemoryUserStore>,
    outbox: Arc<Outbox>,
}

impl TestApp {
    fn new() -> Self {
        let mut config = Config::default();
        config.auth.jwt_secret = "integration-secret".into();
        let users = Arc::new(MemoryUserStore::new());
        let outbox = Arc::new(Outbox::new());
        let state = AppState::new(
            Arc::new(MemoryDocumentStore::new()),
            users.clone(),
            outbox.clone(),
            config,
        );
        Self {
            router: infradocs_server::app(state),
            users,
            outbox,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.send(method, uri, token, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Register a user with `role` and return `(id, token)`.
    async fn user(&self, name: &str, role: &str) -> (String, String) {
        let email = format!("{name}@example.com");
        let (status, body) = self
            .json(
                Method::POST,
                "/api/users/auth/register",
                None,
                Some(json!({
                    "username": name,
                    "email": email,
                    "phone": "5511999999999",
                    "birthdate": "1990-05-17",
                    "jobTitle": "Network engineer",
                    "role": role,
                    "password": "secret123",
                    "passwordConfirmation": "secret123",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["dados"]["id"].as_str().unwrap().to_string();
        (id, self.login(&email, "secret123").await)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/users/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["dados"]["token"].as_str().unwrap().to_string()
    }
}

fn rack_document() -> Value {
    json!({
        "title": "Main rack",
        "identifier": "RACK001",
        "sections": [{
            "title": "Network",
            "blocks": [{ "variant": "plainText", "rawValue": "Core switch" }],
            "nestedSections": [{
                "title": "VLANs",
                "blocks": [{
                    "variant": "detailList",
                    "details": [{ "label": "VLAN 10", "value": "Servers" }]
                }]
            }]
        }]
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.json(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn document_lifecycle_and_render() {
    let app = TestApp::new();
    let (_, token) = app.user("tech", "technician").await;

    let (status, body) = app
        .json(Method::POST, "/api/docs", Some(&token), Some(rack_document()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["sucesso"], true);

    let (status, body) = app
        .json(Method::GET, "/api/docs/id/RACK001", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let doc = &body["dados"];
    assert_eq!(doc["sections"][0]["title"], "Network");
    assert_eq!(doc["sections"][0]["nestedSections"][0]["title"], "VLANs");
    assert_eq!(
        doc["sections"][0]["nestedSections"][0]["nestedSections"],
        json!([])
    );
    assert!(doc["lastUpdated"].is_string());

    let (status, body) = app.json(Method::GET, "/api/docs", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["dados"][0]["identifier"], "RACK001");

    let (status, html) = app.send(Method::GET, "/render/RACK001", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(html).unwrap();
    assert!(html.contains("<h2 class=\"mt-4 mb-3 text-break\">Network</h2>"));
    assert!(html.contains("<h3 class=\"mt-4 mb-3 text-break\">VLANs</h3>"));
    assert!(html.find("Network").unwrap() < html.find("VLANs").unwrap());

    let (status, body) = app
        .json(
            Method::PUT,
            "/api/docs/RACK001",
            Some(&token),
            Some(json!({ "title": "Main rack (rev 2)" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["dados"]["title"], "Main rack (rev 2)");
    assert_eq!(body["dados"]["sections"][0]["title"], "Network");

    let (status, body) = app
        .json(Method::DELETE, "/api/docs/RACK001", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dados"]["identifier"], "RACK001");

    let (status, _) = app
        .json(Method::GET, "/api/docs/id/RACK001", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_identifier_is_rejected() {
    let app = TestApp::new();
    let (_, token) = app.user("admin", "admin").await;
    app.json(Method::POST, "/api/docs", Some(&token), Some(rack_document()))
        .await;
    let (status, body) = app
        .json(Method::POST, "/api/docs", Some(&token), Some(rack_document()))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["sucesso"], false);
}

#[tokio::test]
async fn ownership_rules() {
    let app = TestApp::new();
    let (_, owner) = app.user("owner", "technician").await;
    let (_, other) = app.user("other", "technician").await;
    let (_, admin) = app.user("boss", "admin").await;
    let (_, viewer) = app.user("reader", "viewer").await;

    let (status, _) = app
        .json(Method::POST, "/api/docs", Some(&viewer), Some(rack_document()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.json(Method::POST, "/api/docs", Some(&owner), Some(rack_document()))
        .await;

    let edit = json!({ "title": "Edited" });
    let (status, body) = app
        .json(Method::PUT, "/api/docs/RACK001", Some(&other), Some(edit.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["sucesso"], false);
    let (status, _) = app
        .json(Method::DELETE, "/api/docs/RACK001", Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .json(Method::PUT, "/api/docs/RACK001", Some(&owner), Some(edit.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .json(Method::PUT, "/api/docs/RACK001", Some(&admin), Some(edit))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(Method::GET, "/api/docs/id/RACK001", Some(&viewer), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(Method::DELETE, "/api/docs/RACK001", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_document_is_404_before_403() {
    let app = TestApp::new();
    let (_, viewer) = app.user("reader", "viewer").await;
    let (status, _) = app
        .json(
            Method::PUT,
            "/api/docs/NOPE",
            Some(&viewer),
            Some(json!({ "title": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .json(Method::DELETE, "/api/docs/NOPE", Some(&viewer), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn identifier_cannot_change_on_update() {
    let app = TestApp::new();
    let (_, token) = app.user("admin", "admin").await;
    app.json(Method::POST, "/api/docs", Some(&token), Some(rack_document()))
        .await;
    let (status, _) = app
        .json(
            Method::PUT,
            "/api/docs/RACK001",
            Some(&token),
            Some(json!({ "identifier": "RACK002" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn untitled_nested_section_is_rejected() {
    let app = TestApp::new();
    let (_, token) = app.user("admin", "admin").await;
    let body = json!({
        "title": "Broken",
        "identifier": "BROKEN1",
        "sections": [{ "title": "Top", "nestedSections": [{ "blocks": [] }] }]
    });
    let (status, body) = app
        .json(Method::POST, "/api/docs", Some(&token), Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["sucesso"], false);
    assert!(body["mensagem"].is_string());
}

#[tokio::test]
async fn blank_detail_is_rejected() {
    let app = TestApp::new();
    let (_, token) = app.user("admin", "admin").await;
    let body = json!({
        "title": "Broken",
        "identifier": "BROKEN2",
        "sections": [{
            "title": "VLANs",
            "blocks": [{ "variant": "detailList", "details": [{ "label": "", "value": "" }] }]
        }]
    });
    let (status, body) = app
        .json(Method::POST, "/api/docs", Some(&token), Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["mensagem"].as_str().unwrap().contains("label and a value"));

    let (status, _) = app
        .json(Method::GET, "/api/docs/id/BROKEN2", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn requests_without_valid_token_are_401() {
    let app = TestApp::new();
    let (status, body) = app.json(Method::GET, "/api/docs", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["sucesso"], false);

    let (status, _) = app
        .json(Method::GET, "/api/docs", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_scheme_is_case_insensitive() {
    let app = TestApp::new();
    let (_, token) = app.user("ana", "viewer").await;
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/docs")
        .header(header::AUTHORIZATION, format!("bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn render_unknown_document_is_404_text() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/render/GHOST", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(String::from_utf8(body).unwrap().contains("GHOST"));
}

#[tokio::test]
async fn registration_and_login_errors() {
    let app = TestApp::new();
    let (status, _) = app
        .json(
            Method::POST,
            "/api/users/auth/register",
            None,
            Some(json!({ "email": "a@example.com", "password": "x", "passwordConfirmation": "y" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    app.user("ana", "viewer").await;
    let (status, _) = app
        .json(
            Method::POST,
            "/api/users/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "wrong-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = app
        .json(
            Method::POST,
            "/api/users/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // emails are matched case-insensitively
    app.login("ANA@Example.com", "secret123").await;
}

#[tokio::test]
async fn password_recovery_flow() {
    let app = TestApp::new();
    app.user("ana", "viewer").await;

    let (status, _) = app
        .json(
            Method::GET,
            "/api/users/auth/verify-code/ana@example.com/ABC123",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(Method::GET, "/api/users/auth/recover/ana@example.com", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let mail = app.outbox.last_to("ana@example.com").await.unwrap();
    let account = app.users.find_by_email("ana@example.com").await.unwrap().unwrap();
    let code = account.recovery_code.clone().unwrap();
    assert!(mail.text.contains(&code));

    let (status, body) = app
        .json(
            Method::GET,
            &format!("/api/users/auth/verify-code/ana@example.com/{}", code.to_lowercase()),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dados"]["userId"], account.id.as_str());

    let reset = |code: &str| {
        json!({
            "email": "ana@example.com",
            "code": code,
            "password": "newpass1",
            "passwordConfirmation": "newpass1",
        })
    };
    let (status, mismatch) = app
        .json(
            Method::PUT,
            "/api/users/auth/update-password-recovery",
            None,
            Some(reset("ZZZZZZ")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(
            Method::PUT,
            "/api/users/auth/update-password-recovery",
            None,
            Some(reset(&code)),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    app.login("ana@example.com", "newpass1").await;

    let (status, reused) = app
        .json(
            Method::PUT,
            "/api/users/auth/update-password-recovery",
            None,
            Some(reset(&code)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_ne!(reused["mensagem"], mismatch["mensagem"]);
}

#[tokio::test]
async fn expired_code_differs_from_mismatch() {
    let app = TestApp::new();
    app.user("ana", "viewer").await;
    app.user("bia", "viewer").await;
    for email in ["ana@example.com", "bia@example.com"] {
        let (status, _) = app
            .json(Method::GET, &format!("/api/users/auth/recover/{email}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    // expiry is checked before the code itself, so ana's stale code reports
    // Expired even when it matches
    let mut ana = app.users.find_by_email("ana@example.com").await.unwrap().unwrap();
    let code = ana.recovery_code.clone().unwrap();
    ana.recovery_code_expiry = Some(Utc::now() - Duration::minutes(1));
    app.users.update(ana).await.unwrap();

    let (expired_status, expired) = app
        .json(
            Method::GET,
            &format!("/api/users/auth/verify-code/ana@example.com/{code}"),
            None,
            None,
        )
        .await;

    let bia = app.users.find_by_email("bia@example.com").await.unwrap().unwrap();
    let wrong = if bia.recovery_code.as_deref() == Some("ZZZZZZ") { "YYYYYY" } else { "ZZZZZZ" };
    let (mismatch_status, mismatch) = app
        .json(
            Method::GET,
            &format!("/api/users/auth/verify-code/bia@example.com/{wrong}"),
            None,
            None,
        )
        .await;

    assert_eq!(expired_status, StatusCode::BAD_REQUEST);
    assert_eq!(mismatch_status, StatusCode::BAD_REQUEST);
    assert!(expired["mensagem"].as_str().unwrap().contains("expired"));
    assert_ne!(expired["mensagem"], mismatch["mensagem"]);
}

#[tokio::test]
async fn user_administration_permissions() {
    let app = TestApp::new();
    let (ana_id, ana) = app.user("ana", "technician").await;
    let (bob_id, _) = app.user("bob", "viewer").await;
    let (_, admin) = app.user("boss", "admin").await;

    let (status, _) = app.json(Method::GET, "/api/users", Some(&ana), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.json(Method::GET, "/api/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert!(!body.to_string().contains("passwordHash"));

    let (status, _) = app
        .json(Method::GET, &format!("/api/users/{bob_id}"), Some(&ana), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .json(Method::GET, &format!("/api/users/{ana_id}"), Some(&ana), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dados"]["role"], "technician");

    let (status, _) = app
        .json(
            Method::PUT,
            &format!("/api/users/{ana_id}"),
            Some(&ana),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .json(
            Method::PUT,
            &format!("/api/users/{ana_id}"),
            Some(&ana),
            Some(json!({ "phone": "5511000000000" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dados"]["phone"], "5511000000000");

    let (status, _) = app
        .json(Method::DELETE, &format!("/api/users/{bob_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .json(Method::GET, &format!("/api/users/{bob_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
