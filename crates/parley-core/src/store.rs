//! ConversationStore trait definition.
//!
//! Durable per-session history and prompt overrides. Every write is committed
//! before the returned future resolves.

use parley_types::chat::{MessageRole, Session, SessionExport, StoredMessage};
use parley_types::error::RepositoryError;

/// Repository trait for sessions and their messages.
///
/// Implementations live in parley-infra (e.g., `SqliteConversationStore`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ConversationStore: Send + Sync {
    /// Idempotent upsert. Fails with `InvalidArgument` for a blank id.
    fn get_or_create_session(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Upsert the session and overwrite its prompt. `None` stores NULL.
    fn set_system_prompt(
        &self,
        session_id: &str,
        prompt: Option<&str>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The stored override, or `None` for an unknown session or no override.
    fn get_system_prompt(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, RepositoryError>> + Send;

    /// Upsert the session and append one message in a single transaction.
    fn append_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// At most `limit` most recent messages, oldest first.
    fn get_recent_messages(
        &self,
        session_id: &str,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<StoredMessage>, RepositoryError>> + Send;

    /// Stored prompt plus recent history.
    fn export_session(
        &self,
        session_id: &str,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<SessionExport, RepositoryError>> + Send;

    fn get_session(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Session>, RepositoryError>> + Send;
}
