use crate::models::{EmailRow, MessageRow, UserRow, encode_timestamp};
use crate::store::{DuplicateUsername, MessageFilter, Store, WeekCount};
use crate::Database;
use anyhow::Result;
use recap_types::models::{GeneratedEmail, Message, UserRecord};
use rusqlite::{Connection, ErrorCode, Transaction};
use uuid::Uuid;

const API_KEY_SETTING: &str = "gemini_api_key";

const MESSAGE_COLUMNS: &str = "id, user_id, content, tag, timestamp, week_of";
const EMAIL_COLUMNS: &str =
    "id, kind, subject, content, generated_at, week_of, month_of, raw_message_ids, sections";

impl Store for Database {
    // -- Users --

    fn create_user(&self, user: &UserRecord) -> Result<()> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                (
                    user.id.to_string(),
                    &user.username,
                    &user.password_hash,
                    encode_timestamp(user.created_at),
                ),
            );
            match inserted {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation
                        && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Err(DuplicateUsername.into())
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }

    // -- Messages --

    fn add_message(&self, message: &Message) -> Result<()> {
        self.with_conn(|conn| insert_message(conn, message))
    }

    fn get_messages(&self, filter: &MessageFilter) -> Result<Vec<Message>> {
        self.with_conn(|conn| query_messages(conn, filter))
    }

    fn delete_message(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM messages WHERE id = ?1", [id.to_string()])?;
            Ok(removed > 0)
        })
    }

    fn clear_messages(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM messages", [])?;
            Ok(())
        })
    }

    fn replace_messages(&self, messages: &[Message]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM messages", [])?;
            for message in messages {
                insert_message(&tx, message)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn list_weeks(&self, user_id: Option<Uuid>) -> Result<Vec<WeekCount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT week_of, COUNT(*) FROM messages
                 WHERE ?1 IS NULL OR user_id = ?1
                 GROUP BY week_of
                 ORDER BY week_of DESC",
            )?;

            let rows = stmt
                .query_map([user_id.map(|id| id.to_string())], |row| {
                    Ok(WeekCount {
                        week_of: row.get(0)?,
                        count: row.get::<_, i64>(1)? as usize,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Emails --

    fn add_email(&self, email: &GeneratedEmail) -> Result<()> {
        self.with_conn(|conn| insert_email(conn, email))
    }

    fn get_emails(&self) -> Result<Vec<GeneratedEmail>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {EMAIL_COLUMNS} FROM emails ORDER BY generated_at DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], email_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(GeneratedEmail::try_from).collect()
        })
    }

    fn get_email(&self, id: Uuid) -> Result<Option<GeneratedEmail>> {
        self.with_conn(|conn| query_email(conn, id))
    }

    fn update_email(
        &self,
        id: Uuid,
        subject: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<GeneratedEmail>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE emails
                 SET subject = COALESCE(?2, subject), content = COALESCE(?3, content)
                 WHERE id = ?1",
                (id.to_string(), subject, content),
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_email(conn, id)
        })
    }

    fn delete_email(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM emails WHERE id = ?1", [id.to_string()])?;
            Ok(removed > 0)
        })
    }

    fn clear_emails(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM emails", [])?;
            Ok(())
        })
    }

    fn replace_emails(&self, emails: &[GeneratedEmail]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM emails", [])?;
            for email in emails {
                insert_email(&tx, email)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    // -- Settings --

    fn get_api_key(&self) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [API_KEY_SETTING],
                |row| row.get(0),
            )
            .optional()
        })
    }

    fn set_api_key(&self, api_key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                (API_KEY_SETTING, api_key),
            )?;
            Ok(())
        })
    }

    fn clear_api_key(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM settings WHERE key = ?1", [API_KEY_SETTING])?;
            Ok(())
        })
    }

    fn clear_all(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx: Transaction<'_> = conn.transaction()?;
            tx.execute("DELETE FROM messages", [])?;
            tx.execute("DELETE FROM emails", [])?;
            tx.execute("DELETE FROM settings WHERE key = ?1", [API_KEY_SETTING])?;
            tx.commit()?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRecord>> {
    let sql = format!("SELECT id, username, password, created_at FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    row.map(UserRecord::try_from).transpose()
}

fn insert_message(conn: &Connection, message: &Message) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (id, user_id, content, tag, timestamp, week_of)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            message.id.to_string(),
            message.user_id.to_string(),
            &message.content,
            message.tag.as_str(),
            encode_timestamp(message.timestamp),
            &message.week_of,
        ),
    )?;
    Ok(())
}

fn query_messages(conn: &Connection, filter: &MessageFilter) -> Result<Vec<Message>> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE (?1 IS NULL OR user_id = ?1) AND (?2 IS NULL OR week_of = ?2)
         ORDER BY timestamp ASC, rowid ASC"
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map(
            (filter.user_id.map(|id| id.to_string()), filter.week_of.as_deref()),
            |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    content: row.get(2)?,
                    tag: row.get(3)?,
                    timestamp: row.get(4)?,
                    week_of: row.get(5)?,
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(Message::try_from).collect()
}

fn insert_email(conn: &Connection, email: &GeneratedEmail) -> Result<()> {
    conn.execute(
        "INSERT INTO emails
            (id, kind, subject, content, generated_at, week_of, month_of, raw_message_ids, sections)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            email.id.to_string(),
            email.kind.as_str(),
            email.subject,
            email.content,
            encode_timestamp(email.generated_at),
            email.week_of,
            email.month_of,
            serde_json::to_string(&email.raw_message_ids)?,
            serde_json::to_string(&email.sections)?,
        ],
    )?;
    Ok(())
}

fn query_email(conn: &Connection, id: Uuid) -> Result<Option<GeneratedEmail>> {
    let sql = format!("SELECT {EMAIL_COLUMNS} FROM emails WHERE id = ?1");
    let row = conn
        .query_row(&sql, [id.to_string()], email_row)
        .optional()?;

    row.map(GeneratedEmail::try_from).transpose()
}

fn email_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EmailRow> {
    Ok(EmailRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        subject: row.get(2)?,
        content: row.get(3)?,
        generated_at: row.get(4)?,
        week_of: row.get(5)?,
        month_of: row.get(6)?,
        raw_message_ids: row.get(7)?,
        sections: row.get(8)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
