//! In-memory store and scripted gateway shared by the relay tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use futures_util::{StreamExt, stream};

use parley_types::chat::{ChatTurn, MessageRole, Session, SessionExport, StoredMessage};
use parley_types::error::{ModelError, RepositoryError};

use crate::gateway::{ChunkStream, ModelGateway};
use crate::store::ConversationStore;

#[derive(Default)]
struct MemoryState {
    sessions: HashMap<String, Session>,
    messages: Vec<StoredMessage>,
    next_seq: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn messages(&self, session_id: &str) -> Vec<(MessageRole, String)> {
        let state = self.state.lock().unwrap();
        state
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .map(|m| (m.role, m.content.clone()))
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    fn check_write(&self, session_id: &str) -> Result<(), RepositoryError> {
        if session_id.trim().is_empty() {
            return Err(RepositoryError::InvalidArgument("session id is empty".into()));
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("disk I/O error".into()));
        }
        Ok(())
    }

    fn upsert<'a>(state: &'a mut MemoryState, session_id: &str) -> &'a mut Session {
        let now = Utc::now();
        let session = state
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session {
                id: session_id.to_string(),
                system_prompt: None,
                created_at: now,
                updated_at: now,
            });
        session.updated_at = now;
        session
    }
}

impl ConversationStore for MemoryStore {
    async fn get_or_create_session(&self, session_id: &str) -> Result<(), RepositoryError> {
        self.check_write(session_id)?;
        Self::upsert(&mut self.state.lock().unwrap(), session_id);
        Ok(())
    }

    async fn set_system_prompt(
        &self,
        session_id: &str,
        prompt: Option<&str>,
    ) -> Result<(), RepositoryError> {
        self.check_write(session_id)?;
        let mut state = self.state.lock().unwrap();
        Self::upsert(&mut state, session_id).system_prompt = prompt.map(str::to_string);
        Ok(())
    }

    async fn get_system_prompt(&self, session_id: &str) -> Result<Option<String>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .sessions
            .get(session_id)
            .and_then(|s| s.system_prompt.clone()))
    }

    async fn append_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), RepositoryError> {
        self.check_write(session_id)?;
        let mut state = self.state.lock().unwrap();
        Self::upsert(&mut state, session_id);
        state.next_seq += 1;
        let seq = state.next_seq;
        state.messages.push(StoredMessage {
            seq,
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn get_recent_messages(
        &self,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        let state = self.state.lock().unwrap();
        let all: Vec<StoredMessage> = state
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        let skip = all.len().saturating_sub(limit as usize);
        Ok(all.into_iter().skip(skip).collect())
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
        Ok(self.state.lock().unwrap().sessions.get(session_id).cloned())
    }
}

/// What a [`ScriptedGateway`] does on every call.
#[derive(Clone)]
pub enum Script {
    /// Emit these chunks, then end.
    Chunks(Vec<&'static str>),
    /// Emit these chunks, then fail.
    ChunksThenError(Vec<&'static str>, ModelError),
    /// Emit these chunks, then never resolve again.
    ChunksThenHang(Vec<&'static str>),
    /// Fail immediately.
    Fail(ModelError),
}

/// Gateway that replays a fixed script and records every context it saw.
pub struct ScriptedGateway {
    script: Script,
    pub seen: std::sync::Arc<Mutex<Vec<Vec<ChatTurn>>>>,
}

impl ScriptedGateway {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            seen: Default::default(),
        }
    }
}

fn ok_chunks(chunks: &[&'static str]) -> Vec<Result<String, ModelError>> {
    chunks.iter().map(|c| Ok(c.to_string())).collect()
}

impl ModelGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, turns: &[ChatTurn]) -> Result<String, ModelError> {
        self.seen.lock().unwrap().push(turns.to_vec());
        match &self.script {
            Script::Chunks(chunks) | Script::ChunksThenHang(chunks) => Ok(chunks.concat()),
            Script::ChunksThenError(_, err) | Script::Fail(err) => Err(err.clone()),
        }
    }

    fn stream_generate(&self, turns: Vec<ChatTurn>) -> ChunkStream {
        self.seen.lock().unwrap().push(turns);
        match self.script.clone() {
            Script::Chunks(chunks) => Box::pin(stream::iter(ok_chunks(&chunks))),
            Script::ChunksThenError(chunks, err) => Box::pin(
                stream::iter(ok_chunks(&chunks)).chain(stream::once(async move { Err(err) })),
            ),
            Script::ChunksThenHang(chunks) => {
                Box::pin(stream::iter(ok_chunks(&chunks)).chain(stream::pending()))
            }
            Script::Fail(err) => Box::pin(stream::once(async move { Err(err) })),
        }
    }
}
