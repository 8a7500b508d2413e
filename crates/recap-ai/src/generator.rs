//! Weekly and monthly generation.
//!
//! Flow: validate credential and input → build prompt → one model call →
//! extract the JSON object from the reply → fill gaps with fallbacks.
//! Input checks run before the call so a rejected request never reaches
//! the vendor.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use recap_types::dates::{format_month_key, format_week_key};
use recap_types::models::{EmailKind, EmailSections, GeneratedEmail, Message};

use crate::client::{ClientError, TextGenerator};
use crate::extract::extract_json_object;
use crate::prompts::{build_monthly_prompt, build_weekly_prompt, monthly_subject, weekly_subject};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Gemini API not initialized. Please provide an API key.")]
    MissingApiKey,

    #[error("No messages found for the selected week.")]
    NoMessages,

    #[error("No weekly emails found for the selected month.")]
    NoWeeklyEmails,

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl GenerationError {
    /// True when the caller can fix the request; false for upstream failures.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, GenerationError::Client(_))
    }
}

/// The parsed reply, before it becomes a stored [`GeneratedEmail`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmailDraft {
    pub subject: String,
    pub content: String,
    pub sections: EmailSections,
}

impl EmailDraft {
    /// Interprets model output. Missing fields fall back to `fallback_subject`
    /// and the raw text; a reply with no JSON object becomes the content.
    pub fn from_model_text(text: &str, fallback_subject: String) -> Self {
        let Some(object) = extract_json_object(text) else {
            warn!("Model reply contained no JSON object; using raw text as content");
            return Self {
                subject: fallback_subject,
                content: text.to_string(),
                sections: EmailSections::default(),
            };
        };

        Self {
            subject: non_empty_str(&object, "subject").unwrap_or(fallback_subject),
            content: non_empty_str(&object, "content").unwrap_or_else(|| text.to_string()),
            sections: object
                .get("sections")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default(),
        }
    }

    pub fn into_email(
        self,
        kind: EmailKind,
        week_of: Option<String>,
        month_of: Option<String>,
        raw_message_ids: Vec<Uuid>,
    ) -> GeneratedEmail {
        GeneratedEmail {
            id: Uuid::new_v4(),
            kind,
            subject: self.subject,
            content: self.content,
            generated_at: Utc::now(),
            week_of,
            month_of,
            raw_message_ids,
            sections: self.sections,
        }
    }
}

fn non_empty_str(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn require_api_key(api_key: Option<&str>) -> Result<&str, GenerationError> {
    api_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(GenerationError::MissingApiKey)
}

/// Generates the weekly email for `week` (a Monday) from that week's messages.
/// The result references exactly the messages it was built from.
pub async fn generate_weekly(
    model: &dyn TextGenerator,
    api_key: Option<&str>,
    week: NaiveDate,
    messages: &[Message],
) -> Result<GeneratedEmail, GenerationError> {
    let api_key = require_api_key(api_key)?;
    if messages.is_empty() {
        return Err(GenerationError::NoMessages);
    }

    let week_key = format_week_key(week);
    info!("Generating weekly email for {} from {} messages", week_key, messages.len());

    let prompt = build_weekly_prompt(week, messages);
    let text = model.generate_text(api_key, &prompt).await?;
    let draft = EmailDraft::from_model_text(&text, weekly_subject(week));

    let ids = messages.iter().map(|m| m.id).collect();
    Ok(draft.into_email(EmailKind::Weekly, Some(week_key), None, ids))
}

/// Generates the monthly roll-up for `month` (first day) from the weekly
/// emails of that month. Source ids are the union of the weeklies' ids.
pub async fn generate_monthly(
    model: &dyn TextGenerator,
    api_key: Option<&str>,
    month: NaiveDate,
    weekly_emails: &[GeneratedEmail],
) -> Result<GeneratedEmail, GenerationError> {
    let api_key = require_api_key(api_key)?;
    if weekly_emails.is_empty() {
        return Err(GenerationError::NoWeeklyEmails);
    }

    let month_key = format_month_key(month);
    info!(
        "Generating monthly email for {} from {} weekly emails",
        month_key,
        weekly_emails.len()
    );

    let prompt = build_monthly_prompt(month, weekly_emails);
    let text = model.generate_text(api_key, &prompt).await?;
    let draft = EmailDraft::from_model_text(&text, monthly_subject(month));

    let mut seen = HashSet::new();
    let ids = weekly_emails
        .iter()
        .flat_map(|e| e.raw_message_ids.iter().copied())
        .filter(|id| seen.insert(*id))
        .collect();

    Ok(draft.into_email(EmailKind::Monthly, None, Some(month_key), ids))
}
