use anyhow::Result;
use thiserror::Error;
use uuid::Uuid;

use recap_types::models::{GeneratedEmail, Message, UserRecord};

/// Returned (inside `anyhow::Error`) when a username is already taken.
#[derive(Debug, Error)]
#[error("Username already exists")]
pub struct DuplicateUsername;

#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub user_id: Option<Uuid>,
    pub week_of: Option<String>,
}

impl MessageFilter {
    pub fn week(week_of: impl Into<String>) -> Self {
        Self {
            user_id: None,
            week_of: Some(week_of.into()),
        }
    }

    pub fn matches(&self, message: &Message) -> bool {
        self.user_id.is_none_or(|id| message.user_id == id)
            && self.week_of.as_deref().is_none_or(|w| message.week_of == w)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekCount {
    pub week_of: String,
    pub count: usize,
}

/// Persistence for users, messages, generated emails and the stored AI
/// credential. Implementations are blocking; async callers should move
/// calls onto a blocking thread.
pub trait Store: Send + Sync {
    // -- Users --

    /// Fails with [`DuplicateUsername`] when the name is taken.
    fn create_user(&self, user: &UserRecord) -> Result<()>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>>;
    fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>>;

    // -- Messages --

    fn add_message(&self, message: &Message) -> Result<()>;
    /// Oldest first.
    fn get_messages(&self, filter: &MessageFilter) -> Result<Vec<Message>>;
    /// Returns false when no message had that id.
    fn delete_message(&self, id: Uuid) -> Result<bool>;
    fn clear_messages(&self) -> Result<()>;
    /// Replaces the whole collection atomically.
    fn replace_messages(&self, messages: &[Message]) -> Result<()>;
    /// Distinct weeks with message counts, newest week first.
    fn list_weeks(&self, user_id: Option<Uuid>) -> Result<Vec<WeekCount>>;

    // -- Emails --

    fn add_email(&self, email: &GeneratedEmail) -> Result<()>;
    /// Newest first.
    fn get_emails(&self) -> Result<Vec<GeneratedEmail>>;
    fn get_email(&self, id: Uuid) -> Result<Option<GeneratedEmail>>;
    /// Edits subject and/or content. `None` when the email does not exist.
    fn update_email(
        &self,
        id: Uuid,
        subject: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<GeneratedEmail>>;
    fn delete_email(&self, id: Uuid) -> Result<bool>;
    fn clear_emails(&self) -> Result<()>;
    fn replace_emails(&self, emails: &[GeneratedEmail]) -> Result<()>;

    // -- Settings --

    fn get_api_key(&self) -> Result<Option<String>>;
    fn set_api_key(&self, api_key: &str) -> Result<()>;
    fn clear_api_key(&self) -> Result<()>;

    /// Drops messages, emails and the stored credential in one step.
    /// Accounts are kept.
    fn clear_all(&self) -> Result<()>;
}
