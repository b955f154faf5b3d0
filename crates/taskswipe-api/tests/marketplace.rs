//! End-to-end flows over tasks, swipes, matches, messages and notifications.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{create_task, matched_pair, register, request, spawn_app, swipe, wait_for_notifications};

#[tokio::test]
async fn mutual_right_swipe_creates_match_and_notifies_both() {
    let app = spawn_app();
    let client = register(&app, "client@example.com", "client").await;
    let worker = register(&app, "worker@example.com", "worker").await;
    let task_id = create_task(&app, &client, "Assemble a desk").await;

    let (status, body) = swipe(&app, &client, &task_id, "right").await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["match"].is_null());

    let (status, body) = swipe(&app, &worker, &task_id, "right").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["swipe"]["direction"], "right");
    assert_eq!(body["match"]["status"], "active");
    assert_eq!(body["match"]["workerId"], worker.id.as_str());
    assert_eq!(body["match"]["clientId"], client.id.as_str());

    let (_, task) = request(&app, Method::GET, &format!("/tasks/{task_id}"), Some(&worker.access), None).await;
    assert_eq!(task["status"], "matched");

    let worker_notes = wait_for_notifications(&app, &worker, 1).await;
    let client_notes = wait_for_notifications(&app, &client, 1).await;
    assert_eq!(worker_notes[0]["type"], "match");
    assert_eq!(worker_notes[0]["title"], "New Match!");
    assert_eq!(client_notes[0]["title"], "Match Found!");
    assert_eq!(client_notes[0]["matchId"], body["match"]["id"]);
}

#[tokio::test]
async fn right_swipe_without_acceptance_waits() {
    let app = spawn_app();
    let client = register(&app, "client@example.com", "client").await;
    let worker = register(&app, "worker@example.com", "worker").await;
    let task_id = create_task(&app, &client, "Water plants").await;

    let (status, body) = swipe(&app, &worker, &task_id, "right").await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["match"].is_null());

    let (_, task) = request(&app, Method::GET, &format!("/tasks/{task_id}"), Some(&client.access), None).await;
    assert_eq!(task["status"], "open");
    assert_eq!(task["likeCount"], 1);
    assert_eq!(task["viewCount"], 1);

    let (status, body) = request(&app, Method::GET, "/matches", Some(&worker.access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["matches"].as_array().unwrap().is_empty());

    // The owner's later acceptance pairs them.
    let (_, body) = swipe(&app, &client, &task_id, "right").await;
    assert_eq!(body["match"]["workerId"], worker.id.as_str());
}

#[tokio::test]
async fn duplicate_swipe_is_rejected() {
    let app = spawn_app();
    let client = register(&app, "client@example.com", "client").await;
    let worker = register(&app, "worker@example.com", "worker").await;
    let task_id = create_task(&app, &client, "Paint a fence").await;

    let (status, _) = swipe(&app, &worker, &task_id, "left").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = swipe(&app, &worker, &task_id, "right").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Already swiped on this task");

    let (_, status_body) =
        request(&app, Method::GET, &format!("/swipes/task/{task_id}"), Some(&worker.access), None).await;
    assert_eq!(status_body["swipe"]["direction"], "left");

    let (_, listed) = request(&app, Method::GET, "/swipes", Some(&worker.access), None).await;
    assert_eq!(listed["swipes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn swipe_input_errors() {
    let app = spawn_app();
    let client = register(&app, "client@example.com", "client").await;
    let worker = register(&app, "worker@example.com", "worker").await;
    let task_id = create_task(&app, &client, "Fix a bike").await;

    let (status, _) = swipe(&app, &worker, &task_id, "up").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = swipe(&app, &worker, "4b8f1f8e-1d2c-4c63-9f0e-0c1f2a3b4c5d", "right").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, status_body) =
        request(&app, Method::GET, &format!("/swipes/task/{task_id}"), Some(&worker.access), None).await;
    assert!(status_body["swipe"].is_null());
}

#[tokio::test]
async fn swipes_on_a_matched_task_are_closed() {
    let app = spawn_app();
    let (_, _, task_id, _) = matched_pair(&app).await;
    let late = register(&app, "late@example.com", "worker").await;

    let (status, body) = swipe(&app, &late, &task_id, "right").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Task is no longer open");
}

#[tokio::test]
async fn message_notifies_only_the_other_participant() {
    let app = spawn_app();
    let (client, worker, _, match_id) = matched_pair(&app).await;
    wait_for_notifications(&app, &client, 1).await;

    let (status, msg) = request(
        &app,
        Method::POST,
        &format!("/matches/{match_id}/messages"),
        Some(&worker.access),
        Some(json!({ "content": "I can come by at 5" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(msg["messageType"], "text");
    assert_eq!(msg["senderId"], worker.id.as_str());

    let client_notes = wait_for_notifications(&app, &client, 2).await;
    assert_eq!(client_notes[0]["type"], "message");
    assert_eq!(client_notes[0]["title"], "New Message");
    wait_for_notifications(&app, &worker, 1).await;

    let (status, history) =
        request(&app, Method::GET, &format!("/matches/{match_id}/messages"), Some(&client.access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["messages"].as_array().unwrap().len(), 1);

    let (_, detail) = request(&app, Method::GET, &format!("/matches/{match_id}"), Some(&client.access), None).await;
    assert!(detail["lastMessageAt"].is_string());
    assert_eq!(detail["otherUser"]["id"], worker.id.as_str());
    assert_eq!(detail["task"]["title"], "Help me move");
}

#[tokio::test]
async fn messages_keep_send_order_and_replays_are_idempotent() {
    let app = spawn_app();
    let (client, worker, _, match_id) = matched_pair(&app).await;
    let uri = format!("/matches/{match_id}/messages");

    for (user, text) in [(&worker, "one"), (&client, "two"), (&worker, "three")] {
        let (status, _) = request(&app, Method::POST, &uri, Some(&user.access), Some(json!({ "content": text }))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let keyed = json!({ "content": "four", "clientMessageId": "k-4" });
    let (first_status, first) = request(&app, Method::POST, &uri, Some(&client.access), Some(keyed.clone())).await;
    let (second_status, second) = request(&app, Method::POST, &uri, Some(&client.access), Some(keyed)).await;
    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["id"], second["id"]);

    let (_, history) = request(&app, Method::GET, &uri, Some(&worker.access), None).await;
    let contents: Vec<_> = history["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(contents, ["one", "two", "three", "four"]);

    // Worker: one match notification plus one per client message, replay excluded.
    wait_for_notifications(&app, &worker, 3).await;
}

#[tokio::test]
async fn message_content_is_validated() {
    let app = spawn_app();
    let (_, worker, _, match_id) = matched_pair(&app).await;
    let uri = format!("/matches/{match_id}/messages");

    let (status, _) = request(&app, Method::POST, &uri, Some(&worker.access), Some(json!({ "content": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let long = "x".repeat(4001);
    let (status, _) = request(&app, Method::POST, &uri, Some(&worker.access), Some(json!({ "content": long }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn outsiders_cannot_touch_a_match() {
    let app = spawn_app();
    let (_, _, _, match_id) = matched_pair(&app).await;
    let outsider = register(&app, "outsider@example.com", "worker").await;

    let (status, _) = request(&app, Method::GET, &format!("/matches/{match_id}"), Some(&outsider.access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/matches/{match_id}/messages");
    let (status, _) = request(&app, Method::GET, &uri, Some(&outsider.access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = request(&app, Method::POST, &uri, Some(&outsider.access), Some(json!({ "content": "hi" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        Method::PUT,
        &format!("/matches/{match_id}"),
        Some(&outsider.access),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A malformed id is answered like any id the caller does not own.
    let (status, _) = request(&app, Method::GET, "/matches/not-a-uuid", Some(&outsider.access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = request(&app, Method::DELETE, "/tasks/not-a-uuid", Some(&outsider.access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = request(&app, Method::GET, "/tasks/not-a-uuid", Some(&outsider.access), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completing_a_match_completes_its_task() {
    let app = spawn_app();
    let (client, worker, task_id, match_id) = matched_pair(&app).await;

    let (status, _) = request(
        &app,
        Method::PUT,
        &format!("/matches/{match_id}"),
        Some(&worker.access),
        Some(json!({ "status": "paused" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = request(
        &app,
        Method::PUT,
        &format!("/matches/{match_id}"),
        Some(&client.access),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "completed");

    let (_, task) = request(&app, Method::GET, &format!("/tasks/{task_id}"), Some(&client.access), None).await;
    assert_eq!(task["status"], "completed");

    // Finished matches drop out of the active list.
    let (_, listed) = request(&app, Method::GET, "/matches", Some(&worker.access), None).await;
    assert!(listed["matches"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn cancelling_a_match_cancels_its_task() {
    let app = spawn_app();
    let (client, worker, task_id, match_id) = matched_pair(&app).await;

    let (status, updated) = request(
        &app,
        Method::PUT,
        &format!("/matches/{match_id}"),
        Some(&worker.access),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "cancelled");

    let (_, task) = request(&app, Method::GET, &format!("/tasks/{task_id}"), Some(&client.access), None).await;
    assert_eq!(task["status"], "cancelled");

    let (status, _) = request(
        &app,
        Method::PUT,
        &format!("/matches/{match_id}"),
        Some(&client.access),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, task) = request(&app, Method::GET, &format!("/tasks/{task_id}"), Some(&client.access), None).await;
    assert_eq!(task["status"], "cancelled");
}

#[tokio::test]
async fn reads_do_not_change_state() {
    let app = spawn_app();
    let (_, worker, task_id, match_id) = matched_pair(&app).await;
    wait_for_notifications(&app, &worker, 1).await;

    let paths = [
        "/swipes".to_string(),
        format!("/swipes/task/{task_id}"),
        "/matches".to_string(),
        format!("/matches/{match_id}"),
        format!("/matches/{match_id}/messages"),
        "/notifications".to_string(),
    ];

    let mut first = Vec::new();
    for path in &paths {
        let (status, body) = request(&app, Method::GET, path, Some(&worker.access), None).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        first.push(body);
    }
    for (path, expected) in paths.iter().zip(&first) {
        let (status, body) = request(&app, Method::GET, path, Some(&worker.access), None).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(&body, expected, "{path}");
    }

    let notes = wait_for_notifications(&app, &worker, 1).await;
    assert_eq!(notes[0]["read"], false);
}

#[tokio::test]
async fn only_the_owner_may_change_a_task() {
    let app = spawn_app();
    let owner = register(&app, "owner@example.com", "client").await;
    let other = register(&app, "other@example.com", "client").await;
    let task_id = create_task(&app, &owner, "Clean gutters").await;
    let uri = format!("/tasks/{task_id}");

    let (status, _) = request(&app, Method::PUT, &uri, Some(&other.access), Some(json!({ "budget": 1.0 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = request(&app, Method::DELETE, &uri, Some(&other.access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(&app, Method::PUT, &uri, Some(&owner.access), Some(json!({ "status": "completed" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, task) = request(
        &app,
        Method::PUT,
        &uri,
        Some(&owner.access),
        Some(json!({ "budget": 55.0, "priority": "high" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["budget"], 55.0);
    assert_eq!(task["priority"], "high");

    let (status, _) = request(&app, Method::DELETE, &uri, Some(&owner.access), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = request(&app, Method::GET, &uri, Some(&owner.access), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn matched_tasks_cannot_be_deleted_or_cancelled() {
    let app = spawn_app();
    let (client, _, task_id, _) = matched_pair(&app).await;
    let uri = format!("/tasks/{task_id}");

    let (status, _) = request(&app, Method::DELETE, &uri, Some(&client.access), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        request(&app, Method::PUT, &uri, Some(&client.access), Some(json!({ "status": "cancelled" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Task is no longer open");
}

#[tokio::test]
async fn task_feed_hides_own_and_closed_tasks() {
    let app = spawn_app();
    let client = register(&app, "client@example.com", "client").await;
    let worker = register(&app, "worker@example.com", "worker").await;
    for i in 0..3 {
        create_task(&app, &client, &format!("Task {i}")).await;
    }
    create_task(&app, &worker, "Worker's own errand").await;

    let (status, feed) = request(&app, Method::GET, "/tasks?limit=2", Some(&worker.access), None).await;
    assert_eq!(status, StatusCode::OK);
    let tasks = feed["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["title"], "Task 2");
    assert_eq!(feed["pagination"]["hasMore"], true);

    let (_, page2) = request(&app, Method::GET, "/tasks?limit=2&page=2", Some(&worker.access), None).await;
    assert_eq!(page2["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(page2["pagination"]["hasMore"], false);

    let (_, mine) = request(&app, Method::GET, "/tasks/my-tasks", Some(&client.access), None).await;
    assert_eq!(mine["tasks"].as_array().unwrap().len(), 3);
    assert!(mine.get("pagination").is_none());

    let (status, _) = request(&app, Method::GET, "/tasks?limit=abc", Some(&worker.access), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn task_creation_is_validated() {
    let app = spawn_app();
    let client = register(&app, "client@example.com", "client").await;

    for body in [
        json!({ "title": " ", "budget": 10.0 }),
        json!({ "title": "Mow lawn", "budget": -5.0 }),
        json!({ "title": "Mow lawn", "budget": 10.0, "priority": "urgent" }),
        json!({ "budget": 10.0 }),
    ] {
        let (status, resp) = request(&app, Method::POST, "/tasks", Some(&client.access), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{resp}");
    }
}

#[tokio::test]
async fn notifications_belong_to_their_target() {
    let app = spawn_app();
    let (client, worker, _, _) = matched_pair(&app).await;
    let notes = wait_for_notifications(&app, &worker, 1).await;
    let note_id = notes[0]["id"].as_str().unwrap();

    let (status, _) =
        request(&app, Method::PUT, &format!("/notifications/{note_id}/read"), Some(&client.access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) =
        request(&app, Method::DELETE, &format!("/notifications/{note_id}"), Some(&client.access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
        request(&app, Method::PUT, &format!("/notifications/{note_id}/read"), Some(&worker.access), None).await;
    assert_eq!(status, StatusCode::OK);
    let notes = wait_for_notifications(&app, &worker, 1).await;
    assert_eq!(notes[0]["read"], true);
    assert!(notes[0]["readAt"].is_string());

    wait_for_notifications(&app, &client, 1).await;
    let (status, body) = request(&app, Method::PUT, "/notifications/read-all", Some(&client.access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);

    let (status, _) =
        request(&app, Method::DELETE, &format!("/notifications/{note_id}"), Some(&worker.access), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) =
        request(&app, Method::DELETE, &format!("/notifications/{note_id}"), Some(&worker.access), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
