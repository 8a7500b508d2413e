//! In-process store with the same contract as the SQLite database. Nothing
//! survives a restart; useful for ephemeral runs and tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use uuid::Uuid;

use recap_types::models::{GeneratedEmail, Message, UserRecord};

use crate::store::{DuplicateUsername, MessageFilter, Store, WeekCount};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserRecord>,
    messages: Vec<Message>,
    emails: Vec<GeneratedEmail>,
    api_key: Option<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store lock poisoned: {}", e))
    }
}

/// Rejects a batch the SQLite schema would reject: repeated ids, or
/// messages owned by unknown users.
fn check_message_batch(users: &HashMap<Uuid, UserRecord>, messages: &[Message]) -> Result<()> {
    let mut seen = HashSet::new();
    for message in messages {
        if !seen.insert(message.id) {
            anyhow::bail!("Duplicate message id {}", message.id);
        }
        if !users.contains_key(&message.user_id) {
            anyhow::bail!("Message {} references unknown user {}", message.id, message.user_id);
        }
    }
    Ok(())
}

fn sorted_messages(messages: &[Message]) -> Vec<Message> {
    let mut sorted = messages.to_vec();
    sorted.sort_by_key(|m| m.timestamp);
    sorted
}

impl Store for MemoryStore {
    fn create_user(&self, user: &UserRecord) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(DuplicateUsername.into());
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    fn add_message(&self, message: &Message) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.messages.iter().any(|m| m.id == message.id) {
            anyhow::bail!("Message {} already exists", message.id);
        }
        check_message_batch(&inner.users, std::slice::from_ref(message))?;
        inner.messages.push(message.clone());
        Ok(())
    }

    fn get_messages(&self, filter: &MessageFilter) -> Result<Vec<Message>> {
        let inner = self.lock()?;
        let matching: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        Ok(sorted_messages(&matching))
    }

    fn delete_message(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.lock()?;
        let before = inner.messages.len();
        inner.messages.retain(|m| m.id != id);
        Ok(inner.messages.len() != before)
    }

    fn clear_messages(&self) -> Result<()> {
        self.lock()?.messages.clear();
        Ok(())
    }

    fn replace_messages(&self, messages: &[Message]) -> Result<()> {
        let mut inner = self.lock()?;
        check_message_batch(&inner.users, messages)?;
        inner.messages = messages.to_vec();
        Ok(())
    }

    fn list_weeks(&self, user_id: Option<Uuid>) -> Result<Vec<WeekCount>> {
        let inner = self.lock()?;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for message in inner
            .messages
            .iter()
            .filter(|m| user_id.is_none_or(|id| m.user_id == id))
        {
            *counts.entry(message.week_of.as_str()).or_default() += 1;
        }

        let mut weeks: Vec<WeekCount> = counts
            .into_iter()
            .map(|(week_of, count)| WeekCount {
                week_of: week_of.to_string(),
                count,
            })
            .collect();
        weeks.sort_by(|a, b| b.week_of.cmp(&a.week_of));
        Ok(weeks)
    }

    fn add_email(&self, email: &GeneratedEmail) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.emails.iter().any(|e| e.id == email.id) {
            anyhow::bail!("Email {} already exists", email.id);
        }
        inner.emails.push(email.clone());
        Ok(())
    }

    fn get_emails(&self) -> Result<Vec<GeneratedEmail>> {
        let mut emails = self.lock()?.emails.clone();
        emails.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        Ok(emails)
    }

    fn get_email(&self, id: Uuid) -> Result<Option<GeneratedEmail>> {
        Ok(self.lock()?.emails.iter().find(|e| e.id == id).cloned())
    }

    fn update_email(
        &self,
        id: Uuid,
        subject: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<GeneratedEmail>> {
        let mut inner = self.lock()?;
        let Some(email) = inner.emails.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        if let Some(subject) = subject {
            email.subject = subject.to_string();
        }
        if let Some(content) = content {
            email.content = content.to_string();
        }
        Ok(Some(email.clone()))
    }

    fn delete_email(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.lock()?;
        let before = inner.emails.len();
        inner.emails.retain(|e| e.id != id);
        Ok(inner.emails.len() != before)
    }

    fn clear_emails(&self) -> Result<()> {
        self.lock()?.emails.clear();
        Ok(())
    }

    fn replace_emails(&self, emails: &[GeneratedEmail]) -> Result<()> {
        let mut seen = HashSet::new();
        if let Some(dup) = emails.iter().find(|e| !seen.insert(e.id)) {
            anyhow::bail!("Duplicate email id {}", dup.id);
        }
        self.lock()?.emails = emails.to_vec();
        Ok(())
    }

    fn get_api_key(&self) -> Result<Option<String>> {
        Ok(self.lock()?.api_key.clone())
    }

    fn set_api_key(&self, api_key: &str) -> Result<()> {
        self.lock()?.api_key = Some(api_key.to_string());
        Ok(())
    }

    fn clear_api_key(&self) -> Result<()> {
        self.lock()?.api_key = None;
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        let mut inner = self.lock()?;
        inner.messages.clear();
        inner.emails.clear();
        inner.api_key = None;
        Ok(())
    }
}
