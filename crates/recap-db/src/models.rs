//! Database row types. These map directly to SQLite rows and are converted
//! into the recap-types models at the edge of the crate.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use recap_types::models::{EmailSections, GeneratedEmail, Message, UserRecord};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub tag: String,
    pub timestamp: String,
    pub week_of: String,
}

pub struct EmailRow {
    pub id: String,
    pub kind: String,
    pub subject: String,
    pub content: String,
    pub generated_at: String,
    pub week_of: Option<String>,
    pub month_of: Option<String>,
    pub raw_message_ids: String,
    pub sections: String,
}

/// Fixed-width RFC 3339 so text ordering matches chronological ordering
/// and nanoseconds survive a round trip.
pub fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Corrupt timestamp '{raw}'"))?
        .with_timezone(&Utc))
}

fn decode_uuid(raw: &str, what: &str) -> Result<Uuid> {
    raw.parse()
        .with_context(|| format!("Corrupt {what} '{raw}'"))
}

impl TryFrom<UserRow> for UserRecord {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: decode_uuid(&row.id, "user id")?,
            created_at: decode_timestamp(&row.created_at)?,
            username: row.username,
            password_hash: row.password,
        })
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Self {
            id: decode_uuid(&row.id, "message id")?,
            user_id: decode_uuid(&row.user_id, "message user_id")?,
            tag: row
                .tag
                .parse()
                .with_context(|| format!("Corrupt tag on message '{}'", row.id))?,
            timestamp: decode_timestamp(&row.timestamp)?,
            content: row.content,
            week_of: row.week_of,
        })
    }
}

impl TryFrom<EmailRow> for GeneratedEmail {
    type Error = anyhow::Error;

    fn try_from(row: EmailRow) -> Result<Self> {
        let raw_message_ids: Vec<Uuid> = serde_json::from_str(&row.raw_message_ids)
            .with_context(|| format!("Corrupt raw_message_ids on email '{}'", row.id))?;
        let sections: EmailSections = serde_json::from_str(&row.sections)
            .with_context(|| format!("Corrupt sections on email '{}'", row.id))?;

        Ok(Self {
            id: decode_uuid(&row.id, "email id")?,
            kind: row.kind.parse().map_err(anyhow::Error::msg)?,
            generated_at: decode_timestamp(&row.generated_at)?,
            subject: row.subject,
            content: row.content,
            week_of: row.week_of,
            month_of: row.month_of,
            raw_message_ids,
            sections,
        })
    }
}
