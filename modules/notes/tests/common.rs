#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use base64::Engine;
use modkit_db::{ConnectOpts, DbHandle};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tower::ServiceExt;

use notes::config::{Argon2Config, NotesConfig};
use notes::domain::service::Service;
use notes::infra::storage::migrations::Migrator;

/// Module config with argon2 costs low enough for tests.
pub fn test_config() -> NotesConfig {
    NotesConfig {
        argon2: Argon2Config {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        },
        ..NotesConfig::default()
    }
}

/// Fresh in-memory SQLite database with migrations applied.
pub async fn test_db() -> Arc<DbHandle> {
    let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default())
        .await
        .expect("Failed to connect to test database");
    Migrator::up(db.seaorm(), None)
        .await
        .expect("Failed to run migrations");
    Arc::new(db)
}

pub async fn test_service_with(cfg: &NotesConfig) -> Arc<Service> {
    let db = test_db().await;
    Arc::new(notes::build_service(db.sea(), cfg).expect("service"))
}

pub async fn test_service() -> Arc<Service> {
    test_service_with(&test_config()).await
}

/// Minimal OpenAPI registry stub; records nothing.
pub struct MockOpenApiRegistry;

impl modkit::api::OpenApiRegistry for MockOpenApiRegistry {
    fn register_openapi(&self, _doc: utoipa::openapi::OpenApi) {}

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub fn router_for(service: Arc<Service>) -> Router {
    notes::api::rest::routes::register_routes(Router::new(), &MockOpenApiRegistry, service)
        .expect("Failed to register routes")
}

pub async fn test_router() -> Router {
    router_for(test_service().await)
}

pub enum Auth<'a> {
    None,
    Token(&'a str),
    Basic(&'a str, &'a str),
}

impl Auth<'_> {
    fn header(&self) -> Option<String> {
        match self {
            Auth::None => None,
            Auth::Token(t) => Some(format!("Token {t}")),
            Auth::Basic(u, p) => Some(format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode(format!("{u}:{p}"))
            )),
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Send one request; `body` goes out as JSON when present.
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    auth: Auth<'_>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(h) = auth.header() {
        builder = builder.header(header::AUTHORIZATION, h);
    }
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };
    send_request(router, builder.body(body).unwrap()).await
}

pub async fn send_request(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

/// Register `username` with a valid password and return a fresh token.
pub async fn register_and_login(router: &Router, username: &str) -> String {
    let reg = send(
        router,
        Method::POST,
        "/users/register/",
        Auth::None,
        Some(serde_json::json!({"username": username, "password": "correct-horse"})),
    )
    .await;
    assert_eq!(reg.status, StatusCode::CREATED, "register {username}: {:?}", reg.body);

    let login = send(
        router,
        Method::POST,
        "/auth/login/",
        Auth::None,
        Some(serde_json::json!({"username": username, "password": "correct-horse"})),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK, "login {username}: {:?}", login.body);
    login.body["token"].as_str().unwrap().to_string()
}
