use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// User row as the store sees it, including the Argon2 PHC string.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

// -- Tags --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tag {
    Win,
    Challenge,
    #[serde(alias = "never settle")]
    NeverSettle,
    Upcoming,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid tag '{0}': expected one of win, challenge, never-settle, upcoming")]
pub struct InvalidTag(pub String);

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Win => "win",
            Tag::Challenge => "challenge",
            Tag::NeverSettle => "never-settle",
            Tag::Upcoming => "upcoming",
        }
    }

    /// Section heading used when the tag is shown to the model.
    pub fn label(self) -> &'static str {
        match self {
            Tag::Win => "WIN",
            Tag::Challenge => "CHALLENGE",
            Tag::NeverSettle => "NEVER SETTLE",
            Tag::Upcoming => "UPCOMING",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = InvalidTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "win" => Ok(Tag::Win),
            "challenge" => Ok(Tag::Challenge),
            "never-settle" | "never settle" => Ok(Tag::NeverSettle),
            "upcoming" => Ok(Tag::Upcoming),
            _ => Err(InvalidTag(s.to_string())),
        }
    }
}

// -- Messages --

/// A tagged note. `week_of` is derived from `timestamp` at creation and
/// stored alongside it so week queries never recompute it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub tag: Tag,
    pub timestamp: DateTime<Utc>,
    pub week_of: String,
}

impl Message {
    pub fn new(user_id: Uuid, content: impl Into<String>, tag: Tag, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            content: content.into(),
            tag,
            timestamp,
            week_of: crate::dates::week_key(timestamp),
        }
    }
}

// -- Generated emails --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailKind {
    Weekly,
    Monthly,
}

impl EmailKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EmailKind::Weekly => "weekly",
            EmailKind::Monthly => "monthly",
        }
    }
}

impl FromStr for EmailKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(EmailKind::Weekly),
            "monthly" => Ok(EmailKind::Monthly),
            other => Err(format!("Unknown email kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailSections {
    pub wins: Vec<String>,
    pub challenges: Vec<String>,
    pub never_settles: Vec<String>,
    pub upcoming: Vec<String>,
}

impl EmailSections {
    pub fn is_empty(&self) -> bool {
        self.wins.is_empty()
            && self.challenges.is_empty()
            && self.never_settles.is_empty()
            && self.upcoming.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedEmail {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: EmailKind,
    pub subject: String,
    pub content: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_of: Option<String>,
    #[serde(default)]
    pub raw_message_ids: Vec<Uuid>,
    #[serde(default)]
    pub sections: EmailSections,
}
