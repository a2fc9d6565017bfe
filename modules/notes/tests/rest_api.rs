//! REST surface: notes CRUD, ownership, registration and authentication.
//!
//! Every test builds its own router over a fresh in-memory SQLite database.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;

use common::{register_and_login, send, send_request, test_router, Auth};

#[tokio::test]
async fn buy_milk_scenario() {
    let router = test_router().await;
    let token = register_and_login(&router, "A").await;

    let created = send(
        &router,
        Method::POST,
        "/notes/",
        Auth::Token(&token),
        Some(json!({"text": "buy milk"})),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let note = created.body;
    assert!(note["id"].as_i64().unwrap() > 0);
    assert_eq!(note["text"], "buy milk");
    assert_eq!(note["user"]["username"], "A");
    assert_eq!(note["date_created"], note["date_edited"]);

    let id = note["id"].as_i64().unwrap();
    let patched = send(
        &router,
        Method::PATCH,
        &format!("/notes/{id}/"),
        Auth::Token(&token),
        Some(json!({"text": "buy milk and eggs"})),
    )
    .await;
    assert_eq!(patched.status, StatusCode::OK);
    let updated = patched.body;
    assert_eq!(updated["text"], "buy milk and eggs");
    assert_eq!(updated["id"], note["id"]);
    assert_eq!(updated["user"], note["user"]);
    assert_eq!(updated["date_created"], note["date_created"]);

    let before: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(note["date_edited"].clone()).unwrap();
    let after: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(updated["date_edited"].clone()).unwrap();
    assert!(after > before);

    // the stored row matches the response
    let fetched = send(
        &router,
        Method::GET,
        &format!("/notes/{id}/"),
        Auth::Token(&token),
        None,
    )
    .await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body, updated);
}

#[tokio::test]
async fn owner_is_the_requester_whatever_the_body_says() {
    let router = test_router().await;
    let token_a = register_and_login(&router, "alice").await;
    let _token_b = register_and_login(&router, "bob").await;

    let created = send(
        &router,
        Method::POST,
        "/notes/",
        Auth::Token(&token_a),
        Some(json!({"text": "mine", "user": {"id": 2, "username": "bob"}, "id": 777})),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["user"]["username"], "alice");
    assert_ne!(created.body["id"], 777);
}

#[tokio::test]
async fn listing_is_most_recently_edited_first() {
    let router = test_router().await;
    let token = register_and_login(&router, "A").await;

    let mut ids = Vec::new();
    for text in ["first", "second", "third"] {
        let r = send(
            &router,
            Method::POST,
            "/notes/",
            Auth::Token(&token),
            Some(json!({"text": text})),
        )
        .await;
        ids.push(r.body["id"].as_i64().unwrap());
    }

    // touching the oldest note moves it to the top
    let r = send(
        &router,
        Method::PATCH,
        &format!("/notes/{}/", ids[0]),
        Auth::Token(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["text"], "first");

    let list = send(&router, Method::GET, "/notes/", Auth::Token(&token), None).await;
    assert_eq!(list.status, StatusCode::OK);
    let got: Vec<i64> = list
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_i64().unwrap())
        .collect();
    assert_eq!(got, vec![ids[0], ids[2], ids[1]]);
}

#[tokio::test]
async fn foreign_notes_are_forbidden_and_missing_ones_not_found() {
    let router = test_router().await;
    let token_a = register_and_login(&router, "A").await;
    let token_b = register_and_login(&router, "B").await;

    let created = send(
        &router,
        Method::POST,
        "/notes/",
        Auth::Token(&token_a),
        Some(json!({"text": "private"})),
    )
    .await;
    let uri = format!("/notes/{}/", created.body["id"]);

    for (method, body) in [
        (Method::GET, None),
        (Method::PUT, Some(json!({"text": "hijack"}))),
        (Method::PATCH, Some(json!({"text": "hijack"}))),
        (Method::DELETE, None),
    ] {
        let r = send(&router, method.clone(), &uri, Auth::Token(&token_b), body).await;
        assert_eq!(r.status, StatusCode::FORBIDDEN, "{method}");
        assert_eq!(r.body["code"], "NOTES_FORBIDDEN");
    }

    // B's list does not leak A's note
    let list = send(&router, Method::GET, "/notes/", Auth::Token(&token_b), None).await;
    assert_eq!(list.body, json!([]));

    // still intact for the owner
    let r = send(&router, Method::GET, &uri, Auth::Token(&token_a), None).await;
    assert_eq!(r.body["text"], "private");

    let missing = send(&router, Method::GET, "/notes/9999/", Auth::Token(&token_b), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["code"], "NOTES_NOT_FOUND");
    assert_eq!(missing.body["instance"], "/notes/9999/");
}

#[tokio::test]
async fn put_requires_text_and_delete_returns_no_content() {
    let router = test_router().await;
    let token = register_and_login(&router, "A").await;
    let created = send(
        &router,
        Method::POST,
        "/notes/",
        Auth::Token(&token),
        Some(json!({"text": "x"})),
    )
    .await;
    let uri = format!("/notes/{}/", created.body["id"]);

    let r = send(&router, Method::PUT, &uri, Auth::Token(&token), Some(json!({}))).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.body["errors"][0]["pointer"], "/text");

    let r = send(&router, Method::PUT, &uri, Auth::Token(&token), Some(json!({"text": "y"}))).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["text"], "y");

    let r = send(&router, Method::DELETE, &uri, Auth::Token(&token), None).await;
    assert_eq!(r.status, StatusCode::NO_CONTENT);
    let r = send(&router, Method::GET, &uri, Auth::Token(&token), None).await;
    assert_eq!(r.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_note_text_is_rejected() {
    let router = test_router().await;
    let token = register_and_login(&router, "A").await;
    for body in [json!({}), json!({"text": "   "})] {
        let r = send(&router, Method::POST, "/notes/", Auth::Token(&token), Some(body)).await;
        assert_eq!(r.status, StatusCode::BAD_REQUEST);
        assert_eq!(r.body["code"], "NOTES_VALIDATION");
        assert_eq!(r.body["errors"][0]["detail"], "This field may not be blank.");
    }
}

#[tokio::test]
async fn routes_answer_with_and_without_trailing_slash() {
    let router = test_router().await;
    let token = register_and_login(&router, "A").await;
    for uri in ["/notes", "/notes/", "/users/me", "/users/me/"] {
        let r = send(&router, Method::GET, uri, Auth::Token(&token), None).await;
        assert_eq!(r.status, StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn registration_validation() {
    let router = test_router().await;

    let short = send(
        &router,
        Method::POST,
        "/users/",
        Auth::None,
        Some(json!({"username": "A", "password": "1234567"})),
    )
    .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(short.body["errors"][0]["pointer"], "/password");
    assert_eq!(
        short.body["errors"][0]["detail"],
        "Ensure this field has at least 8 characters."
    );

    let ok = send(
        &router,
        Method::POST,
        "/users/",
        Auth::None,
        Some(json!({"username": "A", "email": "a@example.com", "password": "12345678"})),
    )
    .await;
    assert_eq!(ok.status, StatusCode::CREATED);
    assert_eq!(ok.body["username"], "A");
    assert_eq!(ok.body["email"], "a@example.com");
    assert!(ok.body.get("password").is_none());

    let dup = send(
        &router,
        Method::POST,
        "/users/register/",
        Auth::None,
        Some(json!({"username": "A", "password": "another-password"})),
    )
    .await;
    assert_eq!(dup.status, StatusCode::BAD_REQUEST);
    assert_eq!(dup.body["errors"][0]["pointer"], "/username");

    let missing = send(&router, Method::POST, "/users/", Auth::None, Some(json!({}))).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    let pointers: Vec<&str> = missing.body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["pointer"].as_str().unwrap())
        .collect();
    assert!(pointers.contains(&"/username"));
    assert!(pointers.contains(&"/password"));

    let bad_email = send(
        &router,
        Method::POST,
        "/users/",
        Auth::None,
        Some(json!({"username": "C", "email": "not-an-email", "password": "12345678"})),
    )
    .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_email.body["errors"][0]["pointer"], "/email");
}

#[tokio::test]
async fn unauthenticated_requests_get_a_token_challenge() {
    let router = test_router().await;
    for auth in [Auth::None, Auth::Token("not-a-real-token")] {
        let r = send(&router, Method::GET, "/notes/", auth, None).await;
        assert_eq!(r.status, StatusCode::UNAUTHORIZED);
        assert_eq!(r.headers[header::WWW_AUTHENTICATE], "Token");
        assert_eq!(r.body["code"], "NOTES_NOT_AUTHENTICATED");
    }
}

#[tokio::test]
async fn login_logout_and_basic_auth() {
    let router = test_router().await;
    let token = register_and_login(&router, "A").await;

    // login through the legacy path too
    let r = send(
        &router,
        Method::POST,
        "/users/login/",
        Auth::None,
        Some(json!({"username": "A", "password": "correct-horse"})),
    )
    .await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["user"]["username"], "A");
    assert_ne!(r.body["token"], token.as_str());

    let wrong = send(
        &router,
        Method::POST,
        "/auth/login/",
        Auth::None,
        Some(json!({"username": "A", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["code"], "NOTES_INVALID_CREDENTIALS");

    let basic = send(
        &router,
        Method::GET,
        "/users/me/",
        Auth::Basic("A", "correct-horse"),
        None,
    )
    .await;
    assert_eq!(basic.status, StatusCode::OK);
    assert_eq!(basic.body["username"], "A");

    let basic_wrong = send(&router, Method::GET, "/users/me/", Auth::Basic("A", "nope"), None).await;
    assert_eq!(basic_wrong.status, StatusCode::UNAUTHORIZED);

    let bearer = send_request(
        &router,
        Request::builder()
            .uri("/users/me/")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(bearer.status, StatusCode::OK);

    let out = send(&router, Method::POST, "/auth/logout/", Auth::Token(&token), None).await;
    assert_eq!(out.status, StatusCode::NO_CONTENT);
    let after = send(&router, Method::GET, "/users/me/", Auth::Token(&token), None).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn basic_auth_can_be_disabled() {
    let mut cfg = common::test_config();
    cfg.allow_basic_auth = false;
    let router = common::router_for(common::test_service_with(&cfg).await);
    let _ = register_and_login(&router, "A").await;

    let r = send(
        &router,
        Method::GET,
        "/users/me/",
        Auth::Basic("A", "correct-horse"),
        None,
    )
    .await;
    assert_eq!(r.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_listing_and_lookup() {
    let router = test_router().await;
    let token = register_and_login(&router, "A").await;
    let _ = register_and_login(&router, "B").await;

    let list = send(&router, Method::GET, "/users/", Auth::Token(&token), None).await;
    assert_eq!(list.status, StatusCode::OK);
    let names: Vec<&str> = list
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["A", "B"]);

    let id = list.body[1]["id"].as_i64().unwrap();
    let one = send(&router, Method::GET, &format!("/users/{id}/"), Auth::Token(&token), None).await;
    assert_eq!(one.body["username"], "B");

    let missing = send(&router, Method::GET, "/users/4242/", Auth::Token(&token), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["code"], "USERS_NOT_FOUND");
}

#[tokio::test]
async fn form_bodies_are_accepted() {
    let router = test_router().await;
    let token = register_and_login(&router, "A").await;

    let form = send_request(
        &router,
        Request::builder()
            .method(Method::POST)
            .uri("/notes/")
            .header(header::AUTHORIZATION, format!("Token {token}"))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("text=buy+bread"))
            .unwrap(),
    )
    .await;
    assert_eq!(form.status, StatusCode::CREATED);
    assert_eq!(form.body["text"], "buy bread");

    let multipart = send_request(
        &router,
        Request::builder()
            .method(Method::POST)
            .uri("/users/register/")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
            .body(Body::from(
                "--XYZ\r\nContent-Disposition: form-data; name=\"username\"\r\n\r\nformuser\r\n\
                 --XYZ\r\nContent-Disposition: form-data; name=\"password\"\r\n\r\nlong-enough\r\n\
                 --XYZ--\r\n",
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(multipart.status, StatusCode::CREATED, "{:?}", multipart.body);
    assert_eq!(multipart.body["username"], "formuser");
}

#[tokio::test]
async fn malformed_json_is_a_problem() {
    let router = test_router().await;
    let token = register_and_login(&router, "A").await;
    let r = send_request(
        &router,
        Request::builder()
            .method(Method::POST)
            .uri("/notes/")
            .header(header::AUTHORIZATION, format!("Token {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"text\":"))
            .unwrap(),
    )
    .await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.headers[header::CONTENT_TYPE], "application/problem+json");
    assert_eq!(r.body["code"], "NOTES_MALFORMED_BODY");
}
