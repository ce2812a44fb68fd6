//! SQLite conversation store.
//!
//! Implements `ConversationStore` from `parley-core` with raw sqlx queries,
//! private Row structs and the split reader/writer pools. Every write runs in
//! one transaction on the single-connection writer and is committed before
//! the call returns.

use chrono::{DateTime, Utc};
use sqlx::Row;

use parley_core::store::ConversationStore;
use parley_types::chat::{ChatTurn, MessageRole, Session, SessionExport, StoredMessage};
use parley_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationStore`.
#[derive(Clone)]
pub struct SqliteConversationStore {
    pool: DatabasePool,
}

impl SqliteConversationStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct SessionRow {
    id: String,
    system_prompt: Option<String>,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            system_prompt: row.try_get("system_prompt")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_session(self) -> Result<Session, RepositoryError> {
        Ok(Session {
            id: self.id,
            system_prompt: self.system_prompt,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

struct MessageRow {
    seq: i64,
    session_id: String,
    role: String,
    content: String,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            seq: row.try_get("seq")?,
            session_id: row.try_get("session_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<StoredMessage, RepositoryError> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(StoredMessage {
            seq: self.seq,
            session_id: self.session_id,
            role,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn require_id(session_id: &str) -> Result<&str, RepositoryError> {
    if session_id.trim().is_empty() {
        return Err(RepositoryError::InvalidArgument(
            "session id must not be empty".to_string(),
        ));
    }
    Ok(session_id)
}

const UPSERT_SESSION: &str = r#"INSERT INTO sessions (id, system_prompt, created_at, updated_at)
       VALUES (?, NULL, ?, ?)
       ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at"#;

// ---------------------------------------------------------------------------
// ConversationStore implementation
// ---------------------------------------------------------------------------

impl ConversationStore for SqliteConversationStore {
    async fn get_or_create_session(&self, session_id: &str) -> Result<(), RepositoryError> {
        let session_id = require_id(session_id)?;
        let now = now();

        sqlx::query(UPSERT_SESSION)
            .bind(session_id)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn set_system_prompt(
        &self,
        session_id: &str,
        prompt: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let session_id = require_id(session_id)?;
        let now = now();

        sqlx::query(
            r#"INSERT INTO sessions (id, system_prompt, created_at, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   system_prompt = excluded.system_prompt,
                   updated_at = excluded.updated_at"#,
        )
        .bind(session_id)
        .bind(prompt)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_system_prompt(&self, session_id: &str) -> Result<Option<String>, RepositoryError> {
        if session_id.trim().is_empty() {
            return Ok(None);
        }

        let row = sqlx::query("SELECT system_prompt FROM sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => row
                .try_get::<Option<String>, _>("system_prompt")
                .map_err(|e| RepositoryError::Query(e.to_string())),
            None => Ok(None),
        }
    }

    async fn append_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), RepositoryError> {
        let session_id = require_id(session_id)?;
        let now = now();

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(UPSERT_SESSION)
            .bind(session_id)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            "INSERT INTO messages (session_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(role.as_str())
        .bind(content)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_recent_messages(
        &self,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        if limit <= 0 || session_id.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"SELECT seq, session_id, role, content, created_at FROM messages
               WHERE session_id = ?
               ORDER BY seq DESC
               LIMIT ?"#,
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows.iter().rev() {
            let message_row =
                MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(message_row.into_message()?);
        }

        Ok(messages)
    }

    async fn export_session(
        &self,
        session_id: &str,
        limit: i64,
    ) -> Result<SessionExport, RepositoryError> {
        let system_prompt = self.get_system_prompt(session_id).await?;
        let messages = self
            .get_recent_messages(session_id, limit)
            .await?
            .into_iter()
            .map(ChatTurn::from)
            .collect();

        Ok(SessionExport {
            session_id: session_id.to_string(),
            system_prompt,
            messages,
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, system_prompt, created_at, updated_at FROM sessions WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let session_row =
                    SessionRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(session_row.into_session()?))
            }
            None => Ok(None),
        }
    }
}
