use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::EmailKind;

// -- Auth --

/// Fields are optional so a missing one surfaces as a 400 with a readable
/// message instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub user_id: Uuid,
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub user_id: Option<Uuid>,
    pub content: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    pub user_id: Option<Uuid>,
    pub week_of: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSummary {
    pub week_of: String,
    pub range: String,
    pub message_count: usize,
}

// -- Emails --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateWeeklyRequest {
    pub week_of: Option<String>,
    pub user_id: Option<Uuid>,
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMonthlyRequest {
    pub month_of: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEmailRequest {
    pub subject: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailQuery {
    #[serde(rename = "type")]
    pub kind: Option<EmailKind>,
}

// -- Settings --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyRequest {
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiKeyStatus {
    pub configured: bool,
}
