//! End-to-end tests of the HTTP surface over the in-memory adapters.

use api_lib::{
    adapters::InMemoryDocumentStore,
    config::Config,
    web::{router, state::AppState},
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use study_tracker_core::{
    Account, AccountEventStream, IdentityProvider, PortError, PortResult, ProfileUpdate, SignedIn,
};
use tower::ServiceExt;

fn app_with(config: Config) -> Router {
    router(Arc::new(AppState::in_memory(config)))
}

fn app() -> Router {
    app_with(Config::in_memory())
}

async fn send(app: &Router, method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = cookie {
        builder = builder.header(header::COOKIE, format!("session={}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value, set_cookie)
}

fn token_from(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|c| c.strip_prefix("session="))
        .unwrap()
        .to_string()
}

async fn sign_up(app: &Router, email: &str) -> String {
    let (status, _, cookie) = send(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "name": "Ana",
            "email": email,
            "password": "secret1",
            "confirmPassword": "secret1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    token_from(&cookie.unwrap())
}

async fn add_task(app: &Router, token: &str, task: Value) -> String {
    let (status, body, _) = send(app, "POST", "/tasks", Some(token), Some(task)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn signup_sets_a_session_cookie_and_me_resolves_it() {
    let app = app();
    let token = sign_up(&app, "Ana@School.edu").await;

    let (status, me, _) = send(&app, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ana@school.edu");
    assert_eq!(me["name"], "Ana");
}

#[tokio::test]
async fn signup_rejects_duplicates_and_mismatched_passwords() {
    let app = app();
    sign_up(&app, "ana@school.edu").await;

    let body = json!({"name": "Ana", "email": "ana@school.edu", "password": "secret1", "confirmPassword": "secret1"});
    let (status, _, _) = send(&app, "POST", "/auth/signup", None, Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let body = json!({"name": "Ben", "email": "ben@school.edu", "password": "secret1", "confirmPassword": "secret2"});
    let (status, _, _) = send(&app, "POST", "/auth/signup", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let app = app();
    for uri in ["/tasks", "/sessions", "/progress", "/schedule", "/dashboard", "/auth/me"] {
        let (status, _, _) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
    }
    let (status, _, _) = send(&app, "GET", "/tasks", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = app();
    let token = sign_up(&app, "ana@school.edu").await;

    let (status, _, cookie) = send(&app, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cookie.unwrap().contains("Max-Age=0"));

    let (status, _, _) = send(&app, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn task_lifecycle() {
    let app = app();
    let token = sign_up(&app, "ana@school.edu").await;

    let id = add_task(
        &app,
        &token,
        json!({"title": "Essay", "dueDate": "2099-03-01T10:00:00Z", "subject": "History", "priority": "high"}),
    )
    .await;

    let (status, list, _) = send(&app, "GET", "/tasks", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["skipped"], 0);
    let task = &list["tasks"][0];
    assert_eq!(task["id"], id.as_str());
    assert_eq!(task["priority"], "high");
    assert_eq!(task["completed"], false);
    assert_eq!(task["overdue"], false);

    let patch = json!({"title": "Long essay", "subject": ""});
    let (status, _, _) = send(&app, "PATCH", &format!("/tasks/{}", id), Some(&token), Some(patch)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list, _) = send(&app, "GET", "/tasks", Some(&token), None).await;
    assert_eq!(list["tasks"][0]["title"], "Long essay");
    assert_eq!(list["tasks"][0]["subject"], Value::Null);

    let (status, _, _) = send(&app, "DELETE", &format!("/tasks/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, list, _) = send(&app, "GET", "/tasks", Some(&token), None).await;
    assert_eq!(list["tasks"].as_array().unwrap().len(), 0);

    let (status, _, _) = send(&app, "DELETE", &format!("/tasks/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn task_without_title_is_rejected() {
    let app = app();
    let token = sign_up(&app, "ana@school.edu").await;

    let body = json!({"title": "   ", "dueDate": "2099-03-01T10:00:00Z"});
    let (status, _, _) = send(&app, "POST", "/tasks", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completion_toggles_once_per_direction() {
    let app = app();
    let token = sign_up(&app, "ana@school.edu").await;
    let id = add_task(&app, &token, json!({"title": "Quiz", "dueDate": "2099-03-01T10:00:00Z"})).await;
    let uri = format!("/tasks/{}/completion", id);

    let (status, task, _) = send(&app, "PUT", &uri, Some(&token), Some(json!({"completed": true}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["completed"], true);
    assert!(task["completedAt"].is_string());

    let (status, _, _) = send(&app, "PUT", &uri, Some(&token), Some(json!({"completed": true}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, task, _) = send(&app, "PUT", &uri, Some(&token), Some(json!({"completed": false}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["completed"], false);
    assert_eq!(task["completedAt"], Value::Null);
}

#[tokio::test]
async fn tasks_are_private_to_their_account() {
    let app = app();
    let ana = sign_up(&app, "ana@school.edu").await;
    let ben = sign_up(&app, "ben@school.edu").await;
    let id = add_task(&app, &ana, json!({"title": "Quiz", "dueDate": "2099-03-01T10:00:00Z"})).await;

    let (_, list, _) = send(&app, "GET", "/tasks", Some(&ben), None).await;
    assert_eq!(list["tasks"].as_array().unwrap().len(), 0);

    let patch = json!({"title": "Mine now"});
    let (status, _, _) = send(&app, "PATCH", &format!("/tasks/{}", id), Some(&ben), Some(patch)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn progress_groups_by_subject() {
    let app = app();
    let token = sign_up(&app, "ana@school.edu").await;

    for (subject, done) in [(Some("Math"), true), (Some("Math"), true), (Some("Math"), false), (None, true), (None, false)] {
        let mut body = json!({"title": "Work", "dueDate": "2024-01-08T10:00:00Z"});
        if let Some(subject) = subject {
            body["subject"] = json!(subject);
        }
        let id = add_task(&app, &token, body).await;
        if done {
            let uri = format!("/tasks/{}/completion", id);
            let (status, _, _) = send(&app, "PUT", &uri, Some(&token), Some(json!({"completed": true}))).await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    let (status, report, _) = send(&app, "GET", "/progress", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total"], 5);
    assert_eq!(report["completed"], 3);
    assert_eq!(report["overallPercentage"], 60);
    assert_eq!(report["bySubject"]["Math"]["percentage"], 67);
    assert_eq!(report["bySubject"].as_object().unwrap().len(), 1);
    assert_eq!(report["byWeekday"].as_array().unwrap().len(), 7);
    // 2024-01-08 is a Monday.
    assert_eq!(report["byWeekday"][0]["total"], 5);
}

#[tokio::test]
async fn schedule_groups_sessions_by_day() {
    let app = app();
    let token = sign_up(&app, "ana@school.edu").await;

    for (title, date, start, end) in [
        ("Afternoon", "2024-02-01", "2024-02-01T14:00:00Z", "2024-02-01T15:00:00Z"),
        ("Morning", "2024-02-01", "2024-02-01T09:00:00Z", "2024-02-01T10:00:00Z"),
        ("Next day", "2024-02-02", "2024-02-02T08:00:00Z", "2024-02-02T09:00:00Z"),
    ] {
        let body = json!({"title": title, "date": date, "startTime": start, "endTime": end});
        let (status, saved, _) = send(&app, "POST", "/sessions", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(saved["advisory"], Value::Null);
    }

    let (status, schedule, _) = send(&app, "GET", "/schedule", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let groups = schedule["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["key"], "2024-02-01");
    assert_eq!(groups[0]["label"], "Thu, Feb 1");
    assert_eq!(groups[0]["sessions"][0]["title"], "Morning");
    assert_eq!(groups[0]["sessions"][1]["title"], "Afternoon");
    assert_eq!(groups[0]["sessions"][0]["timeRange"], "09:00 AM - 10:00 AM");
    assert_eq!(groups[1]["sessions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn session_ending_before_it_starts_is_adjusted() {
    let app = app();
    let token = sign_up(&app, "ana@school.edu").await;

    let body = json!({
        "title": "Lab",
        "date": "2099-05-04",
        "startTime": "2099-05-04T13:00:00Z",
        "endTime": "2099-05-04T12:00:00Z"
    });
    let (status, saved, _) = send(&app, "POST", "/sessions", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(saved["advisory"]["kind"], "endTimeAdjusted");

    let (_, list, _) = send(&app, "GET", "/sessions", Some(&token), None).await;
    assert_eq!(list["sessions"][0]["endTime"], "2099-05-04T14:00:00Z");

    let id = saved["id"].as_str().unwrap();
    let (status, updated, _) =
        send(&app, "PATCH", &format!("/sessions/{}", id), Some(&token), Some(json!({"location": "Room 4"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["advisory"], Value::Null);

    let (status, _, _) = send(&app, "DELETE", &format!("/sessions/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn dashboard_limits_upcoming_items() {
    let app = app();
    let token = sign_up(&app, "ana@school.edu").await;

    for day in 1..=4 {
        add_task(&app, &token, json!({"title": format!("Task {}", day), "dueDate": format!("2099-01-0{}T10:00:00Z", day)})).await;
    }
    let done = add_task(&app, &token, json!({"title": "Done", "dueDate": "2098-12-01T10:00:00Z"})).await;
    send(&app, "PUT", &format!("/tasks/{}/completion", done), Some(&token), Some(json!({"completed": true}))).await;

    for (date, hour) in [("2099-02-03", "09"), ("2099-02-01", "11"), ("2099-02-02", "08"), ("2000-01-01", "08")] {
        let body = json!({
            "title": "Study",
            "date": date,
            "startTime": format!("{}T{}:00:00Z", date, hour),
            "endTime": format!("{}T{}:30:00Z", date, hour)
        });
        send(&app, "POST", "/sessions", Some(&token), Some(body)).await;
    }

    let (status, dashboard, _) = send(&app, "GET", "/dashboard", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["total"], 5);
    assert_eq!(dashboard["completed"], 1);
    assert_eq!(dashboard["percentage"], 20);

    let tasks = dashboard["upcomingTasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0]["title"], "Task 1");

    let sessions = dashboard["upcomingSessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["date"], "2099-02-01");
    assert_eq!(sessions[1]["date"], "2099-02-02");
}

#[tokio::test]
async fn partitioned_tasks_put_recent_completions_first() {
    let app = app();
    let token = sign_up(&app, "ana@school.edu").await;

    let first = add_task(&app, &token, json!({"title": "First", "dueDate": "2099-01-01T10:00:00Z"})).await;
    let second = add_task(&app, &token, json!({"title": "Second", "dueDate": "2099-01-02T10:00:00Z"})).await;
    add_task(&app, &token, json!({"title": "Open", "dueDate": "2099-01-03T10:00:00Z"})).await;
    for id in [&first, &second] {
        send(&app, "PUT", &format!("/tasks/{}/completion", id), Some(&token), Some(json!({"completed": true}))).await;
    }

    let (status, view, _) = send(&app, "GET", "/tasks/partitioned", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["active"].as_array().unwrap().len(), 1);
    assert_eq!(view["completed"][0]["title"], "Second");
    assert_eq!(view["completed"][1]["title"], "First");
}

#[tokio::test]
async fn password_reset_replaces_the_password() {
    let app = app_with(Config {
        expose_reset_tokens: true,
        ..Config::in_memory()
    });
    sign_up(&app, "ana@school.edu").await;

    let (status, issued, _) =
        send(&app, "POST", "/auth/password-reset", None, Some(json!({"email": "ana@school.edu"}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let reset_token = issued["token"].as_str().unwrap().to_string();

    let confirm = json!({"token": reset_token, "newPassword": "better1", "confirmPassword": "better1"});
    let (status, _, _) = send(&app, "POST", "/auth/password-reset/confirm", None, Some(confirm.clone())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&app, "POST", "/auth/password-reset/confirm", None, Some(confirm)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let old = json!({"email": "ana@school.edu", "password": "secret1"});
    let (status, _, _) = send(&app, "POST", "/auth/login", None, Some(old)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let new = json!({"email": "ana@school.edu", "password": "better1"});
    let (status, _, cookie) = send(&app, "POST", "/auth/login", None, Some(new)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cookie.is_some());
}

#[tokio::test]
async fn reset_tokens_stay_hidden_by_default() {
    let app = app();
    sign_up(&app, "ana@school.edu").await;

    let (status, issued, _) =
        send(&app, "POST", "/auth/password-reset", None, Some(json!({"email": "ana@school.edu"}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(issued["token"], Value::Null);
}

#[tokio::test]
async fn profile_and_password_changes() {
    let app = app();
    let token = sign_up(&app, "ana@school.edu").await;

    let (status, me, _) = send(&app, "PUT", "/auth/profile", Some(&token), Some(json!({"name": "Ana Lima"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Ana Lima");

    let (status, _, _) = send(&app, "PUT", "/auth/profile", Some(&token), Some(json!({"name": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let wrong = json!({"currentPassword": "nope12", "newPassword": "better1", "confirmPassword": "better1"});
    let (status, _, _) = send(&app, "PUT", "/auth/password", Some(&token), Some(wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let right = json!({"currentPassword": "secret1", "newPassword": "better1", "confirmPassword": "better1"});
    let (status, _, _) = send(&app, "PUT", "/auth/password", Some(&token), Some(right)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

/// An identity backend whose every call fails as if the database were down.
struct UnreachableIdentity;

fn outage<T>() -> PortResult<T> {
    Err(PortError::Unexpected("connection refused".to_string()))
}

#[async_trait]
impl IdentityProvider for UnreachableIdentity {
    async fn register(&self, _: &str, _: &str, _: &str) -> PortResult<SignedIn> {
        outage()
    }
    async fn login(&self, _: &str, _: &str) -> PortResult<SignedIn> {
        outage()
    }
    async fn logout(&self, _: &str) -> PortResult<()> {
        outage()
    }
    async fn reset_password(&self, _: &str) -> PortResult<String> {
        outage()
    }
    async fn confirm_password_reset(&self, _: &str, _: &str) -> PortResult<()> {
        outage()
    }
    async fn update_profile(&self, _: &Account, _: ProfileUpdate) -> PortResult<Account> {
        outage()
    }
    async fn change_password(&self, _: &Account, _: &str, _: &str) -> PortResult<()> {
        outage()
    }
    async fn current_account(&self, _: &str) -> PortResult<Option<Account>> {
        outage()
    }
    fn subscribe(&self) -> AccountEventStream {
        Box::pin(futures::stream::empty())
    }
}

#[tokio::test]
async fn login_during_an_identity_outage_is_a_server_error() {
    let state = AppState::new(
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(UnreachableIdentity),
        Arc::new(Config::in_memory()),
    );
    let app = router(Arc::new(state));

    let body = json!({"email": "ana@school.edu", "password": "secret1"});
    let (status, _, cookie) = send(&app, "POST", "/auth/login", None, Some(body)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(cookie.is_none());

    let (status, _, _) = send(&app, "GET", "/tasks", Some("any-token"), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn wrong_password_is_still_unauthorized() {
    let app = app();
    sign_up(&app, "ana@school.edu").await;

    let body = json!({"email": "ana@school.edu", "password": "wrong12"});
    let (status, _, _) = send(&app, "POST", "/auth/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn moving_only_the_start_time_keeps_the_session_ordered() {
    let app = app();
    let token = sign_up(&app, "ana@school.edu").await;

    let body = json!({
        "title": "Lab",
        "date": "2099-05-04",
        "startTime": "2099-05-04T09:00:00Z",
        "endTime": "2099-05-04T10:00:00Z"
    });
    let (_, saved, _) = send(&app, "POST", "/sessions", Some(&token), Some(body)).await;
    let id = saved["id"].as_str().unwrap();

    let patch = json!({"startTime": "2099-05-04T15:00:00Z"});
    let (status, updated, _) = send(&app, "PATCH", &format!("/sessions/{}", id), Some(&token), Some(patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["advisory"]["kind"], "endTimeAdjusted");

    let (_, list, _) = send(&app, "GET", "/sessions", Some(&token), None).await;
    assert_eq!(list["sessions"][0]["startTime"], "2099-05-04T15:00:00Z");
    assert_eq!(list["sessions"][0]["endTime"], "2099-05-04T16:00:00Z");
}
