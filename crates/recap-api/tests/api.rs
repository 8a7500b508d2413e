//! End-to-end tests for the REST surface over an in-memory SQLite store and a
//! scripted model.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use recap_ai::{ClientError, TextGenerator};
use recap_api::{AppStateInner, router};
use recap_db::{Database, Store};
use recap_types::models::{EmailKind, EmailSections, GeneratedEmail, Message, Tag};

struct ScriptedModel {
    reply: String,
    calls: AtomicUsize,
}

#[async_trait]
impl TextGenerator for ScriptedModel {
    async fn generate_text(&self, api_key: &str, _prompt: &str) -> Result<String, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if api_key == "revoked" {
            return Err(ClientError::Api {
                status: 403,
                message: "API key revoked".to_string(),
            });
        }
        Ok(self.reply.clone())
    }
}

struct Harness {
    app: Router,
    store: Arc<Database>,
    model: Arc<ScriptedModel>,
}

impl Harness {
    fn new() -> Self {
        Self::with_default_key(None)
    }

    fn with_default_key(default_key: Option<&str>) -> Self {
        let store = Arc::new(Database::open_in_memory().unwrap());
        let model = Arc::new(ScriptedModel {
            reply: r#"Sure! {"subject": "Generated", "content": "Hello team", "sections": {"wins": ["w"]}}"#
                .to_string(),
            calls: AtomicUsize::new(0),
        });
        let state = AppStateInner::new(store.clone(), model.clone())
            .with_default_api_key(default_key.map(str::to_string));
        Self {
            app: router(Arc::new(state)),
            store,
            model,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn signup(&self, username: &str) -> Uuid {
        let (status, body) = self
            .send(
                Method::POST,
                "/signup",
                Some(json!({"username": username, "password": "hunter22"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().parse().unwrap()
    }

    fn calls(&self) -> usize {
        self.model.calls.load(Ordering::SeqCst)
    }
}

fn weekly_email(week_of: &str, ids: Vec<Uuid>) -> GeneratedEmail {
    GeneratedEmail {
        id: Uuid::new_v4(),
        kind: EmailKind::Weekly,
        subject: format!("Weekly {week_of}"),
        content: format!("Summary for {week_of}"),
        generated_at: Utc::now(),
        week_of: Some(week_of.to_string()),
        month_of: None,
        raw_message_ids: ids,
        sections: EmailSections::default(),
    }
}

#[tokio::test]
async fn signup_then_login_returns_same_id() {
    let h = Harness::new();
    let id = h.signup("ada").await;

    let (status, body) = h
        .send(
            Method::POST,
            "/login",
            Some(json!({"username": "ada", "password": "hunter22"})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["userId"], id.to_string());
}

#[tokio::test]
async fn duplicate_signup_is_rejected() {
    let h = Harness::new();
    h.signup("ada").await;

    let (status, body) = h
        .send(
            Method::POST,
            "/signup",
            Some(json!({"username": "ada", "password": "other"})),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username already exists");
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_rejected() {
    let h = Harness::new();
    h.signup("ada").await;

    for creds in [
        json!({"username": "ada", "password": "wrong"}),
        json!({"username": "nobody", "password": "hunter22"}),
    ] {
        let (status, body) = h.send(Method::POST, "/login", Some(creds)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid username or password");
    }
}

#[tokio::test]
async fn missing_credentials_are_a_validation_error() {
    let h = Harness::new();
    let (status, body) = h
        .send(Method::POST, "/signup", Some(json!({"username": "ada"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username and password are required");

    let (status, _) = h.send(Method::POST, "/login", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn message_lifecycle() {
    let h = Harness::new();
    let user = h.signup("ada").await;

    let mut ids = vec![];
    for (content, tag) in [("won", "win"), ("blocked", "challenge"), ("kaizen", "never settle")] {
        let (status, body) = h
            .send(
                Method::POST,
                "/messages",
                Some(json!({"userId": user, "content": content, "tag": tag})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["weekOf"], recap_types::dates::current_week());
        ids.push(body["id"].as_str().unwrap().to_string());
    }

    let (status, _) = h
        .send(Method::DELETE, &format!("/messages/{}", ids[1]), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, listed) = h.send(Method::GET, "/messages", None).await;
    let listed_ids: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(listed_ids, vec![ids[0].as_str(), ids[2].as_str()]);
    assert_eq!(listed[1]["tag"], "never-settle");

    let (status, body) = h
        .send(Method::DELETE, &format!("/messages/{}", ids[1]), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn message_validation() {
    let h = Harness::new();
    let user = h.signup("ada").await;

    let (status, body) = h
        .send(
            Method::POST,
            "/messages",
            Some(json!({"userId": user, "content": "x", "tag": "victory"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid tag"));

    let (status, _) = h
        .send(Method::POST, "/messages", Some(json!({"userId": user, "tag": "win"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h
        .send(
            Method::POST,
            "/messages",
            Some(json!({"userId": Uuid::new_v4(), "content": "x", "tag": "win"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn same_day_messages_are_listed_together_for_their_week() {
    let h = Harness::new();
    let user = h.signup("ada").await;
    let morning = "2025-01-09T08:00:00Z".parse().unwrap();
    let evening = "2025-01-09T19:00:00Z".parse().unwrap();
    let win = Message::new(user, "won", Tag::Win, morning);
    let challenge = Message::new(user, "hard", Tag::Challenge, evening);
    let other = Message::new(user, "later", Tag::Upcoming, "2025-01-20T10:00:00Z".parse().unwrap());
    h.store.replace_messages(&[win.clone(), challenge.clone(), other]).unwrap();

    // Any day of the week selects it.
    let (status, body) = h.send(Method::GET, "/messages?weekOf=2025-01-11", None).await;
    assert_eq!(status, StatusCode::OK);
    let got: Vec<Message> = serde_json::from_value(body).unwrap();
    assert_eq!(got, vec![win, challenge]);

    let (_, weeks) = h.send(Method::GET, "/weeks", None).await;
    assert_eq!(weeks[0]["weekOf"], "2025-01-20");
    assert_eq!(weeks[1]["weekOf"], "2025-01-06");
    assert_eq!(weeks[1]["messageCount"], 2);
    assert_eq!(weeks[1]["range"], "Jan 06 - Jan 12, 2025");

    let (status, _) = h.send(Method::GET, "/messages?weekOf=last-week", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn weekly_generation_without_messages_never_calls_model() {
    let h = Harness::new();
    let (status, body) = h
        .send(
            Method::POST,
            "/emails/weekly",
            Some(json!({"weekOf": "2025-01-06", "apiKey": "key"})),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No messages found for the selected week.");
    assert_eq!(h.calls(), 0);
}

#[tokio::test]
async fn weekly_generation_requires_a_credential() {
    let h = Harness::new();
    let user = h.signup("ada").await;
    h.store
        .add_message(&Message::new(user, "won", Tag::Win, "2025-01-07T10:00:00Z".parse().unwrap()))
        .unwrap();

    let (status, body) = h
        .send(Method::POST, "/emails/weekly", Some(json!({"weekOf": "2025-01-06"})))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Gemini API not initialized. Please provide an API key.");
    assert_eq!(h.calls(), 0);
}

#[tokio::test]
async fn weekly_generation_uses_stored_key_and_persists_email() {
    let h = Harness::new();
    let user = h.signup("ada").await;
    let a = Message::new(user, "won", Tag::Win, "2025-01-07T10:00:00Z".parse().unwrap());
    let b = Message::new(user, "hard", Tag::Challenge, "2025-01-08T10:00:00Z".parse().unwrap());
    let elsewhere = Message::new(user, "next", Tag::Win, "2025-01-15T10:00:00Z".parse().unwrap());
    h.store.replace_messages(&[a.clone(), b.clone(), elsewhere]).unwrap();

    let (status, _) = h
        .send(Method::PUT, "/settings/api-key", Some(json!({"apiKey": "stored"})))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, key_status) = h.send(Method::GET, "/settings/api-key", None).await;
    assert_eq!(key_status, json!({"configured": true}));

    let (status, email) = h
        .send(Method::POST, "/emails/weekly", Some(json!({"weekOf": "2025-01-06"})))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(email["type"], "weekly");
    assert_eq!(email["subject"], "Generated");
    assert_eq!(email["content"], "Hello team");
    assert_eq!(email["weekOf"], "2025-01-06");
    assert_eq!(email["sections"]["wins"], json!(["w"]));
    assert_eq!(email["rawMessageIds"], json!([a.id, b.id]));
    assert_eq!(h.calls(), 1);

    let (_, history) = h.send(Method::GET, "/emails", None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["id"], email["id"]);
}

#[tokio::test]
async fn remote_failure_is_reported_verbatim() {
    let h = Harness::new();
    let user = h.signup("ada").await;
    h.store
        .add_message(&Message::new(user, "won", Tag::Win, "2025-01-07T10:00:00Z".parse().unwrap()))
        .unwrap();

    let (status, body) = h
        .send(
            Method::POST,
            "/emails/weekly",
            Some(json!({"weekOf": "2025-01-06", "apiKey": "revoked"})),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "API error (status 403): API key revoked");
    let (_, history) = h.send(Method::GET, "/emails", None).await;
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn monthly_generation_rolls_up_weeks_of_that_month() {
    let h = Harness::with_default_key(Some("server-key"));
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    h.store
        .replace_emails(&[
            weekly_email("2025-01-06", vec![first]),
            weekly_email("2025-01-27", vec![second]),
            // Starts in December, so it belongs to December.
            weekly_email("2024-12-30", vec![Uuid::new_v4()]),
        ])
        .unwrap();

    let (status, email) = h
        .send(Method::POST, "/emails/monthly", Some(json!({"monthOf": "2025-01"})))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(email["type"], "monthly");
    assert_eq!(email["monthOf"], "2025-01");
    assert_eq!(email["rawMessageIds"], json!([first, second]));

    let (_, monthly) = h.send(Method::GET, "/emails?type=monthly", None).await;
    assert_eq!(monthly.as_array().unwrap().len(), 1);

    let (status, body) = h
        .send(Method::POST, "/emails/monthly", Some(json!({"monthOf": "2025-03"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No weekly emails found for the selected month.");
    assert_eq!(h.calls(), 1);

    let (status, _) = h
        .send(Method::POST, "/emails/monthly", Some(json!({"monthOf": "Jan"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn emails_can_be_edited_and_deleted() {
    let h = Harness::new();
    let email = weekly_email("2025-01-06", vec![]);
    h.store.add_email(&email).unwrap();
    let uri = format!("/emails/{}", email.id);

    let (status, updated) = h
        .send(Method::PUT, &uri, Some(json!({"content": "Edited body"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["content"], "Edited body");
    assert_eq!(updated["subject"], email.subject);

    let (status, _) = h.send(Method::PUT, &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = h
        .send(Method::PUT, &uri, Some(json!({"subject": "gone"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clearing_data_keeps_accounts() {
    let h = Harness::new();
    let user = h.signup("ada").await;
    h.send(
        Method::POST,
        "/messages",
        Some(json!({"userId": user, "content": "x", "tag": "upcoming"})),
    )
    .await;
    h.send(Method::PUT, "/settings/api-key", Some(json!({"apiKey": "k"})))
        .await;

    let (status, _) = h.send(Method::DELETE, "/data", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, messages) = h.send(Method::GET, "/messages", None).await;
    assert_eq!(messages, json!([]));
    let (_, key_status) = h.send(Method::GET, "/settings/api-key", None).await;
    assert_eq!(key_status, json!({"configured": false}));

    let (status, _) = h
        .send(
            Method::POST,
            "/login",
            Some(json!({"username": "ada", "password": "hunter22"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_reports_ok() {
    let h = Harness::new();
    let (status, body) = h.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn malformed_path_and_query_values_return_json_errors() {
    let h = Harness::new();

    for (method, uri) in [
        (Method::DELETE, "/messages/not-a-uuid"),
        (Method::GET, "/messages?userId=abc"),
        (Method::GET, "/weeks?userId=abc"),
        (Method::GET, "/emails?type=daily"),
        (Method::DELETE, "/emails/not-a-uuid"),
    ] {
        let (status, body) = h.send(method, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string(), "{uri}: {body}");
    }

    let (status, body) = h
        .send(Method::PUT, "/emails/not-a-uuid", Some(json!({"subject": "x"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn blank_email_edits_are_rejected() {
    let h = Harness::new();
    let email = weekly_email("2025-01-06", vec![]);
    h.store.add_email(&email).unwrap();
    let uri = format!("/emails/{}", email.id);

    for body in [
        json!({"subject": ""}),
        json!({"content": "   "}),
        json!({"subject": "Fine", "content": ""}),
    ] {
        let (status, _) = h.send(Method::PUT, &uri, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let stored = h.store.get_email(email.id).unwrap().unwrap();
    assert_eq!(stored.subject, email.subject);
    assert_eq!(stored.content, email.content);
}

#[tokio::test]
async fn stored_api_key_can_be_cleared() {
    let h = Harness::new();
    let (status, _) = h
        .send(Method::PUT, "/settings/api-key", Some(json!({"apiKey": "k"})))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = h.send(Method::DELETE, "/settings/api-key", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, key_status) = h.send(Method::GET, "/settings/api-key", None).await;
    assert_eq!(key_status, json!({"configured": false}));
    assert_eq!(h.store.get_api_key().unwrap(), None);

    let (status, _) = h
        .send(Method::PUT, "/settings/api-key", Some(json!({"apiKey": "  "})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn server_key_counts_as_configured() {
    let h = Harness::with_default_key(Some("server-key"));
    let (_, key_status) = h.send(Method::GET, "/settings/api-key", None).await;
    assert_eq!(key_status, json!({"configured": true}));
}
