// tests for the http api, driven through the router without a socket

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use learnhub::{ContentClassifier, Identity, Server, Store, USER_HEADER};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app() -> (Router, Store) {
    let store = Store::connect("sqlite::memory:").await.unwrap();
    (Server::router(store.clone(), ContentClassifier::new()), store)
}

async fn send(app: &Router, method: Method, uri: &str, uid: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(uid) = uid {
        req = req.header(USER_HEADER, uid);
    }
    let req = match body {
        Some(body) => req
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_classify() {
    let (app, _) = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/classify",
        None,
        Some(json!({ "text": "SELECT * FROM users WHERE id = 1;" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "isCode": true, "language": "sql" }));
}

#[tokio::test]
async fn test_classify_explain() {
    let (app, _) = app().await;
    let (_, body) = send(
        &app,
        Method::POST,
        "/classify",
        None,
        Some(json!({ "text": "hello there", "answerType": "code", "explain": true })),
    )
    .await;

    assert_eq!(body["result"]["isCode"], true);
    assert_eq!(body["signals"]["declaredCode"], true);
}

#[tokio::test]
async fn test_writes_need_admin() {
    let (app, store) = app().await;
    let users = store.users();
    users.ensure_user(&Identity::new("admin", "a@x.io")).await.unwrap();
    users.ensure_user(&Identity::new("student", "s@x.io")).await.unwrap();

    let chapter = json!({ "title": "Networks", "order": 1 });

    let (status, _) = send(&app, Method::POST, "/chapters", None, Some(chapter.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::POST, "/chapters", Some("student"), Some(chapter.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::POST, "/chapters", Some("admin"), Some(chapter.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "Networks");

    let (status, _) = send(&app, Method::POST, "/chapters", Some("admin"), Some(chapter)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_sign_in_then_render_and_grade() {
    let (app, _) = app().await;

    let (status, user) = send(
        &app,
        Method::POST,
        "/session",
        None,
        Some(json!({ "uid": "t1", "email": "ada@x.io" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["role"], "admin");

    let (_, chapter) = send(
        &app,
        Method::POST,
        "/chapters",
        Some("t1"),
        Some(json!({ "title": "Python", "order": 1 })),
    )
    .await;
    let id = chapter["id"].as_str().unwrap().to_string();

    let (status, practice) = send(
        &app,
        Method::POST,
        &format!("/chapters/{id}/practice"),
        Some("t1"),
        Some(json!({
            "title": "Add",
            "answers": ["def add(a, b):\n    return a + b"],
            "answerType": "code"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let pid = practice["id"].as_str().unwrap().to_string();

    let (status, view) = send(&app, Method::GET, &format!("/chapters/{id}/practice/{pid}/render"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["block"]["kind"], "code");
    assert_eq!(view["block"]["language"], "python");

    let (_, exam) = send(
        &app,
        Method::POST,
        &format!("/chapters/{id}/exams"),
        Some("t1"),
        Some(json!({
            "title": "Quiz",
            "questions": ["1 + 1?", "2 + 2?"],
            "options": [["1", "2"], ["4", "5"]],
            "correctAnswers": [1, 0]
        })),
    )
    .await;
    let eid = exam["id"].as_str().unwrap().to_string();
    assert_eq!(exam["passingScore"], 70);

    let (status, score) = send(
        &app,
        Method::POST,
        &format!("/chapters/{id}/exams/{eid}/grade"),
        None,
        Some(json!({ "answers": [1, null] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(score, json!({ "correct": 1, "total": 2, "percent": 50, "passed": false }));
}

#[tokio::test]
async fn test_last_admin_over_http() {
    let (app, store) = app().await;
    store.users().ensure_user(&Identity::new("admin", "a@x.io")).await.unwrap();

    let (status, body) = send(
        &app,
        Method::PUT,
        "/users/admin/role",
        Some("admin"),
        Some(json!({ "role": "user" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("last admin"));
}

#[tokio::test]
async fn test_missing_chapter_is_404() {
    let (app, _) = app().await;
    let (status, _) = send(&app, Method::GET, "/chapters/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_classify_without_text() {
    let (app, _) = app().await;
    let (status, body) = send(&app, Method::POST, "/classify", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "isCode": false, "language": "javascript" }));
}

#[tokio::test]
async fn test_bad_body_is_json_error() {
    let (app, _) = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/classify",
        None,
        Some(json!({ "text": "x = 1", "answerType": "banana" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_profile_image_cleared_with_null() {
    let (app, _) = app().await;
    send(
        &app,
        Method::POST,
        "/session",
        None,
        Some(json!({ "uid": "u1", "email": "ada@x.io" })),
    )
    .await;

    let (status, user) = send(
        &app,
        Method::PATCH,
        "/profile",
        Some("u1"),
        Some(json!({ "displayName": "Ada", "profileImage": "data:image/png;base64,AAAA" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["profileImage"], "data:image/png;base64,AAAA");

    let (status, user) = send(&app, Method::PATCH, "/profile", Some("u1"), Some(json!({ "profileImage": null }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(user.get("profileImage").is_none());
    assert_eq!(user["displayName"], "Ada");

    let (status, _) = send(&app, Method::PATCH, "/profile", None, Some(json!({ "displayName": "x" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
