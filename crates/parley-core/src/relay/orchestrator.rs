//! Conversation orchestrator.
//!
//! Turns an inbound message into a model request. The user message is
//! persisted before the model is called, the context is rebuilt from storage
//! on every turn, and model failures become persisted fallback replies
//! instead of errors.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use parley_types::chat::{ChatTurn, MessageRole, SessionExport, TurnOutcome};
use parley_types::config::RelayConfig;
use parley_types::error::{ModelError, RelayError, RepositoryError};

use crate::gateway::BoxModelGateway;
use crate::store::ConversationStore;

/// Reply text used when the gateway fails.
pub fn fallback_reply(error: &ModelError, content: &str) -> String {
    let content = content.trim();
    let mut reply = format!("(model unavailable: {})", error.code());
    if !content.is_empty() {
        reply.push_str(" You said: ");
        reply.push_str(content);
    }
    reply
}

/// A streaming turn in progress.
///
/// `chunks` is lazy and finite. Its concatenation is the reply that
/// [`Orchestrator::complete_stream`] persists once the stream is drained.
pub struct TurnStream {
    pub session_id: String,
    pub chunks: Pin<Box<dyn Stream<Item = String> + Send + 'static>>,
}

/// Coordinates the conversation store and the model gateway for one turn.
pub struct Orchestrator<S: ConversationStore> {
    store: S,
    gateway: BoxModelGateway,
    default_system_prompt: String,
    history_window: i64,
}

impl<S: ConversationStore> Orchestrator<S> {
    pub fn new(store: S, gateway: BoxModelGateway, relay: &RelayConfig) -> Self {
        Self {
            store,
            gateway,
            default_system_prompt: relay.system_prompt.trim().to_string(),
            history_window: relay.history_window(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    pub fn default_system_prompt(&self) -> &str {
        &self.default_system_prompt
    }

    pub fn history_window(&self) -> i64 {
        self.history_window
    }

    /// Fresh random (v4) session identifier.
    pub fn new_session_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Stored prompt when non-blank, else the process default.
    pub async fn effective_system_prompt(&self, session_id: &str) -> Result<String, RepositoryError> {
        let stored = self.store.get_system_prompt(session_id).await?;
        Ok(match stored {
            Some(prompt) if !prompt.trim().is_empty() => prompt.trim().to_string(),
            _ => self.default_system_prompt.clone(),
        })
    }

    /// System turn (if any) followed by the recent-message window, oldest first.
    pub async fn build_context(&self, session_id: &str) -> Result<Vec<ChatTurn>, RepositoryError> {
        let prompt = self.effective_system_prompt(session_id).await?;
        let history = self
            .store
            .get_recent_messages(session_id, self.history_window)
            .await?;

        let mut turns = Vec::with_capacity(history.len() + 1);
        if !prompt.is_empty() {
            turns.push(ChatTurn::system(prompt));
        }
        turns.extend(history.into_iter().map(ChatTurn::from));
        Ok(turns)
    }

    /// Shared setup for both turn styles: resolve the id, apply the prompt
    /// override, persist the user message and build the context.
    async fn begin_turn(
        &self,
        session_id: &str,
        content: &str,
        prompt_override: Option<&str>,
    ) -> Result<(String, String, Vec<ChatTurn>), RelayError> {
        let session_id = match session_id.trim() {
            "" => self.new_session_id(),
            id => id.to_string(),
        };
        let content = content.trim().to_string();

        self.store.get_or_create_session(&session_id).await?;
        if let Some(prompt) = prompt_override {
            self.store.set_system_prompt(&session_id, Some(prompt)).await?;
        }
        self.store
            .append_message(&session_id, MessageRole::User, &content)
            .await?;

        let context = self.build_context(&session_id).await?;
        Ok((session_id, content, context))
    }

    /// Run one complete turn and persist the reply.
    pub async fn handle_turn(
        &self,
        session_id: &str,
        content: &str,
        prompt_override: Option<&str>,
    ) -> Result<TurnOutcome, RelayError> {
        let (session_id, content, context) =
            self.begin_turn(session_id, content, prompt_override).await?;

        let reply = match self.gateway.generate(&context).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(
                    session_id = %session_id,
                    provider = self.gateway.name(),
                    code = %err.code(),
                    "Model call failed, replying with fallback: {err}"
                );
                fallback_reply(&err, &content)
            }
        };

        self.store
            .append_message(&session_id, MessageRole::Assistant, &reply)
            .await?;
        tracing::debug!(session_id = %session_id, reply_len = reply.len(), "Turn complete");

        Ok(TurnOutcome { session_id, reply })
    }

    /// Start a streaming turn. The assistant reply is NOT persisted here;
    /// call [`complete_stream`](Self::complete_stream) once `chunks` is drained.
    ///
    /// Cancelling `cancel` ends the chunk sequence early and drops the
    /// upstream request.
    pub async fn stream_turn(
        &self,
        session_id: &str,
        content: &str,
        prompt_override: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<TurnStream, RelayError> {
        let (session_id, content, context) =
            self.begin_turn(session_id, content, prompt_override).await?;

        let mut upstream = self.gateway.stream_generate(context);
        let provider = self.gateway.name().to_string();
        let log_session_id = session_id.clone();

        let chunks = async_stream::stream! {
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!(session_id = %log_session_id, "Stream cancelled");
                        None
                    }
                    next = upstream.next() => next,
                };

                match next {
                    None => break,
                    Some(Ok(chunk)) => {
                        if !chunk.is_empty() {
                            yield chunk;
                        }
                    }
                    Some(Err(err)) => {
                        tracing::warn!(
                            session_id = %log_session_id,
                            provider = %provider,
                            code = %err.code(),
                            "Model stream failed, replying with fallback: {err}"
                        );
                        for c in fallback_reply(&err, &content).chars() {
                            yield c.to_string();
                        }
                        break;
                    }
                }
            }
        };

        Ok(TurnStream {
            session_id,
            chunks: Box::pin(chunks),
        })
    }

    /// Persist the concatenated reply of a fully drained stream.
    pub async fn complete_stream(&self, session_id: &str, full_reply: &str) -> Result<(), RelayError> {
        self.store
            .append_message(session_id, MessageRole::Assistant, full_reply)
            .await?;
        tracing::debug!(session_id = %session_id, reply_len = full_reply.len(), "Stream complete");
        Ok(())
    }

    pub async fn export_session(&self, session_id: &str) -> Result<SessionExport, RelayError> {
        Ok(self
            .store
            .export_session(session_id.trim(), self.history_window)
            .await?)
    }
}
