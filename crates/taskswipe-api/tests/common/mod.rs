#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tower::ServiceExt;

use taskswipe_api::auth::AuthKeys;
use taskswipe_api::{AppStateInner, router};
use taskswipe_db::Database;
use taskswipe_notify::{Dispatcher, fanout};

pub struct TestApp {
    pub router: Router,
    pub db: Arc<Database>,
    _fanout: JoinHandle<()>,
}

pub struct TestUser {
    pub id: String,
    pub access: String,
    pub refresh: String,
}

pub fn keys() -> AuthKeys {
    AuthKeys::new(
        "test-access-secret",
        "test-refresh-secret",
        chrono::Duration::minutes(15),
        chrono::Duration::days(7),
    )
}

/// Router over an in-memory store with the notification worker running.
pub fn spawn_app() -> TestApp {
    let db = Arc::new(Database::open_in_memory().expect("open in-memory db"));
    let dispatcher = Dispatcher::new();
    let worker = fanout::spawn(db.clone(), &dispatcher);

    let state = Arc::new(AppStateInner {
        db: db.clone(),
        keys: keys(),
        dispatcher,
    });

    TestApp {
        router: router(state),
        db,
        _fanout: worker,
    }
}

pub async fn request(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let req = match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&payload).expect("serialize request body")))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };

    let response = app.router.clone().oneshot(req).await.expect("route request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read response body");

    let parsed = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse response body")
    };
    (status, parsed)
}

pub async fn register(app: &TestApp, email: &str, role: &str) -> TestUser {
    let (status, body) = request(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "email": email,
            "password": "hunter2hunter2",
            "firstName": "Test",
            "lastName": "User",
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    TestUser {
        id: body["user"]["id"].as_str().expect("user id").to_string(),
        access: body["tokens"]["accessToken"].as_str().expect("access token").to_string(),
        refresh: body["tokens"]["refreshToken"].as_str().expect("refresh token").to_string(),
    }
}

pub async fn create_task(app: &TestApp, owner: &TestUser, title: &str) -> String {
    let (status, body) = request(
        app,
        Method::POST,
        "/tasks",
        Some(&owner.access),
        Some(json!({
            "title": title,
            "description": "Two boxes, second floor",
            "category": "moving",
            "budget": 40.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create task failed: {body}");
    body["id"].as_str().expect("task id").to_string()
}

pub async fn swipe(app: &TestApp, user: &TestUser, task_id: &str, direction: &str) -> (StatusCode, Value) {
    request(
        app,
        Method::POST,
        "/swipes",
        Some(&user.access),
        Some(json!({ "taskId": task_id, "direction": direction })),
    )
    .await
}

/// Client accepts, worker likes: returns the match id.
pub async fn matched_pair(app: &TestApp) -> (TestUser, TestUser, String, String) {
    let client = register(app, "client@example.com", "client").await;
    let worker = register(app, "worker@example.com", "worker").await;
    let task_id = create_task(app, &client, "Help me move").await;

    let (status, _) = swipe(app, &client, &task_id, "right").await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = swipe(app, &worker, &task_id, "right").await;
    assert_eq!(status, StatusCode::CREATED);

    let match_id = body["match"]["id"].as_str().expect("match id").to_string();
    (client, worker, task_id, match_id)
}

/// Polls until `user` has `expected` notifications. Fan-out runs after the
/// response is sent, so it lags the request slightly.
pub async fn wait_for_notifications(app: &TestApp, user: &TestUser, expected: usize) -> Vec<Value> {
    let mut last = Vec::new();
    for _ in 0..200 {
        let (status, body) = request(app, Method::GET, "/notifications", Some(&user.access), None).await;
        assert_eq!(status, StatusCode::OK);
        last = body["notifications"].as_array().cloned().unwrap_or_default();
        if last.len() >= expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(last.len(), expected, "notifications: {last:?}");
    last
}
