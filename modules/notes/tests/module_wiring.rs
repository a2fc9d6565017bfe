//! The notes module composed with the ingress through the module registry.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use modkit::{
    context::{ConfigProvider, ModuleCtxBuilder},
    registry::{ModuleEntry, ModuleRegistry},
    ClientHub,
};
use modkit_db::{ConnectOpts, DbHandle};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use api_ingress::ApiIngress;
use notes::contract::{client::NotesApi, model::NewUser};
use notes::Notes;

use common::{send, send_request, Auth};

struct JsonConfig(serde_json::Value);

impl ConfigProvider for JsonConfig {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.get(module_name)
    }
}

async fn compose(base_path: &str) -> (Router, Arc<ClientHub>) {
    let db = Arc::new(
        DbHandle::connect("sqlite::memory:", ConnectOpts::default())
            .await
            .unwrap(),
    );
    let modules_cfg = json!({
        "api_ingress": {"enable_docs": true, "base_path": base_path},
        "notes": {"argon2": {"memory_kib": 64, "iterations": 1, "parallelism": 1}},
    });

    let ingress = Arc::new(ApiIngress::default());
    let notes = Arc::new(Notes::default());
    let registry = ModuleRegistry::builder()
        .module(
            ModuleEntry::new("api_ingress", ingress.clone())
                .rest_host(ingress.clone())
                .stateful(ingress),
        )
        .module(
            ModuleEntry::new("notes", notes.clone())
                .deps(&["api_ingress"])
                .db(notes.clone())
                .rest(notes),
        )
        .build()
        .unwrap();

    let hub = Arc::new(ClientHub::new());
    let ctx = ModuleCtxBuilder::new(CancellationToken::new())
        .with_db(db.clone())
        .with_config_provider(Arc::new(JsonConfig(modules_cfg)))
        .with_client_hub(hub.clone())
        .build();

    registry.run_init_phase(&ctx).await.unwrap();
    registry.run_db_phase(&db).await.unwrap();
    let router = registry.run_rest_phase(&ctx, Router::new()).unwrap();
    (router, hub)
}

#[tokio::test]
async fn notes_are_served_through_the_ingress() {
    let (router, _) = compose("").await;

    let health = send(&router, Method::GET, "/health", Auth::None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "healthy");

    let token = common::register_and_login(&router, "A").await;
    let created = send(
        &router,
        Method::POST,
        "/notes/",
        Auth::Token(&token),
        Some(json!({"text": "buy milk"})),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert!(created.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn openapi_document_includes_notes() {
    let (router, _) = compose("").await;

    let doc = send(&router, Method::GET, "/openapi.json", Auth::None, None).await;
    assert_eq!(doc.status, StatusCode::OK);
    assert!(doc.body["paths"]["/notes/"]["get"].is_object());
    assert!(doc.body["paths"]["/notes/{id}/"]["patch"].is_object());
    assert!(doc.body["paths"]["/auth/login/"]["post"].is_object());
    assert!(doc.body["components"]["securitySchemes"]["token"].is_object());
}

#[tokio::test]
async fn base_path_prefixes_notes_routes() {
    let (router, _) = compose("/api").await;

    let r = send_request(
        &router,
        Request::builder()
            .method(Method::POST)
            .uri("/api/users/register/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"username":"A","password":"correct-horse"}"#,
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(r.status, StatusCode::CREATED);

    let unprefixed = send(&router, Method::GET, "/notes/", Auth::None, None).await;
    assert_eq!(unprefixed.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn local_client_is_published_to_the_hub() {
    let (router, hub) = compose("").await;

    let api = hub.get::<dyn NotesApi>().unwrap();
    let user = api
        .register_user(NewUser {
            username: "hub".into(),
            email: None,
            password: "correct-horse".into(),
        })
        .await
        .unwrap();

    // visible through REST as well
    let token = common::register_and_login(&router, "B").await;
    let r = send(
        &router,
        Method::GET,
        &format!("/users/{}/", user.id),
        Auth::Token(&token),
        None,
    )
    .await;
    assert_eq!(r.body["username"], "hub");
}
