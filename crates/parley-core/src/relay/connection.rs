//! Transport-agnostic connection driver.
//!
//! Speaks the frame protocol from `parley_types::wire` over anything that can
//! receive and send text frames. The WebSocket adapter in parley-api and the
//! in-memory channel in the tests share this one implementation.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use parley_types::error::RelayError;
use parley_types::wire::{ServerFrame, TurnRequest, parse_client_frame};

use super::orchestrator::Orchestrator;
use crate::store::ConversationStore;

/// The peer is gone; nothing more can be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

impl std::fmt::Display for ChannelClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("channel closed")
    }
}

impl std::error::Error for ChannelClosed {}

/// A persistent bidirectional text connection.
pub trait DuplexChannel: Send {
    /// Next inbound text frame, or `None` once the peer has gone away.
    fn recv_text(&mut self) -> impl std::future::Future<Output = Option<String>> + Send;

    fn send_text(
        &mut self,
        text: String,
    ) -> impl std::future::Future<Output = Result<(), ChannelClosed>> + Send;
}

enum TurnFailure {
    Disconnected,
    Relay(RelayError),
}

impl From<RelayError> for TurnFailure {
    fn from(err: RelayError) -> Self {
        TurnFailure::Relay(err)
    }
}

impl From<ChannelClosed> for TurnFailure {
    fn from(_: ChannelClosed) -> Self {
        TurnFailure::Disconnected
    }
}

/// Runs one connection: announces a session, then handles turns one at a time.
pub struct ConnectionDriver<S: ConversationStore> {
    orchestrator: Arc<Orchestrator<S>>,
}

impl<S: ConversationStore> ConnectionDriver<S> {
    pub fn new(orchestrator: Arc<Orchestrator<S>>) -> Self {
        Self { orchestrator }
    }

    /// Drive `channel` until the peer disconnects or `cancel` fires.
    ///
    /// `cancel` is cancelled on return so that whoever feeds the channel can
    /// stop as well.
    pub async fn run<C: DuplexChannel>(&self, mut channel: C, cancel: CancellationToken) {
        let mut session_id = self.orchestrator.new_session_id();
        tracing::debug!(session_id = %session_id, "Connection opened");

        let hello = ServerFrame::Session {
            session_id: session_id.clone(),
        };
        if channel.send_text(hello.to_json()).await.is_ok() {
            self.serve_turns(&mut channel, &mut session_id, &cancel).await;
        }

        cancel.cancel();
        tracing::debug!(session_id = %session_id, "Connection closed");
    }

    async fn serve_turns<C: DuplexChannel>(
        &self,
        channel: &mut C,
        session_id: &mut String,
        cancel: &CancellationToken,
    ) {
        loop {
            let text = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                next = channel.recv_text() => match next {
                    Some(text) => text,
                    None => return,
                },
            };

            let request = match parse_client_frame(&text) {
                Ok(request) => request,
                Err(err) => {
                    tracing::debug!(session_id = %session_id, code = err.code(), "Rejected frame");
                    let frame = ServerFrame::Error {
                        message: err.code().to_string(),
                        session_id: session_id.clone(),
                    };
                    if channel.send_text(frame.to_json()).await.is_err() {
                        return;
                    }
                    continue;
                }
            };

            if let Some(id) = request.session_id.as_deref().map(str::trim)
                && !id.is_empty()
            {
                *session_id = id.to_string();
            }

            let result = if request.stream {
                self.stream_reply(channel, session_id, &request, cancel).await
            } else {
                self.single_reply(channel, session_id, &request, cancel).await
            };

            match result {
                Ok(()) => {}
                Err(TurnFailure::Disconnected) => return,
                Err(TurnFailure::Relay(err)) => {
                    tracing::error!(session_id = %session_id, "Turn failed: {err}");
                    let frame = ServerFrame::Error {
                        message: "storage_failure".to_string(),
                        session_id: session_id.clone(),
                    };
                    if channel.send_text(frame.to_json()).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    async fn stream_reply<C: DuplexChannel>(
        &self,
        channel: &mut C,
        session_id: &mut String,
        request: &TurnRequest,
        cancel: &CancellationToken,
    ) -> Result<(), TurnFailure> {
        let mut stream = self
            .orchestrator
            .stream_turn(
                session_id.as_str(),
                &request.content,
                request.system_prompt.as_deref(),
                cancel.child_token(),
            )
            .await?;
        *session_id = stream.session_id.clone();

        let mut full_reply = String::new();
        while let Some(chunk) = stream.chunks.next().await {
            full_reply.push_str(&chunk);
            let frame = ServerFrame::Partial {
                content: chunk,
                session_id: session_id.clone(),
            };
            channel.send_text(frame.to_json()).await?;
        }

        // A cancelled stream ends early; its partial reply is never persisted.
        if cancel.is_cancelled() {
            tracing::debug!(session_id = %session_id, "Peer left mid-stream, reply discarded");
            return Err(TurnFailure::Disconnected);
        }

        self.orchestrator
            .complete_stream(session_id.as_str(), &full_reply)
            .await?;
        let frame = ServerFrame::Final {
            content: full_reply,
            session_id: session_id.clone(),
        };
        channel.send_text(frame.to_json()).await?;
        Ok(())
    }

    async fn single_reply<C: DuplexChannel>(
        &self,
        channel: &mut C,
        session_id: &mut String,
        request: &TurnRequest,
        cancel: &CancellationToken,
    ) -> Result<(), TurnFailure> {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TurnFailure::Disconnected),
            outcome = self.orchestrator.handle_turn(
                session_id.as_str(),
                &request.content,
                request.system_prompt.as_deref(),
            ) => outcome?,
        };
        *session_id = outcome.session_id;

        let frame = ServerFrame::Final {
            content: outcome.reply,
            session_id: session_id.clone(),
        };
        channel.send_text(frame.to_json()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{BoxModelGateway, PlaceholderGateway};
    use crate::test_support::{MemoryStore, Script, ScriptedGateway};
    use parley_types::chat::MessageRole;
    use parley_types::config::RelayConfig;
    use parley_types::error::ModelError;
    use serde_json::Value;
    use tokio::sync::mpsc;

    struct MemoryChannel {
        inbound: mpsc::UnboundedReceiver<String>,
        outbound: mpsc::UnboundedSender<String>,
    }

    impl DuplexChannel for MemoryChannel {
        async fn recv_text(&mut self) -> Option<String> {
            self.inbound.recv().await
        }

        async fn send_text(&mut self, text: String) -> Result<(), ChannelClosed> {
            self.outbound.send(text).map_err(|_| ChannelClosed)
        }
    }

    struct Peer {
        to_driver: mpsc::UnboundedSender<String>,
        from_driver: mpsc::UnboundedReceiver<String>,
    }

    impl Peer {
        fn send(&self, text: &str) {
            self.to_driver.send(text.to_string()).unwrap();
        }

        async fn next_frame(&mut self) -> Value {
            let text = self.from_driver.recv().await.expect("driver closed");
            serde_json::from_str(&text).unwrap()
        }
    }

    fn channel_pair() -> (MemoryChannel, Peer) {
        let (to_driver, inbound) = mpsc::unbounded_channel();
        let (outbound, from_driver) = mpsc::unbounded_channel();
        (
            MemoryChannel { inbound, outbound },
            Peer {
                to_driver,
                from_driver,
            },
        )
    }

    fn orchestrator(gateway: BoxModelGateway) -> Arc<Orchestrator<MemoryStore>> {
        Arc::new(Orchestrator::new(
            MemoryStore::new(),
            gateway,
            &RelayConfig::default(),
        ))
    }

    /// Run the driver to completion over a scripted list of inbound frames.
    async fn run_script(
        orchestrator: Arc<Orchestrator<MemoryStore>>,
        frames: &[&str],
    ) -> Vec<Value> {
        let (channel, mut peer) = channel_pair();
        for frame in frames {
            peer.send(frame);
        }
        drop(peer.to_driver);

        ConnectionDriver::new(orchestrator)
            .run(channel, CancellationToken::new())
            .await;

        let mut out = Vec::new();
        while let Ok(text) = peer.from_driver.try_recv() {
            out.push(serde_json::from_str(&text).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_session_frame_comes_first() {
        let frames = run_script(orchestrator(BoxModelGateway::new(PlaceholderGateway)), &[]).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["kind"], "session");
        assert!(!frames[0]["session_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_streaming_turn_sends_partials_then_final() {
        let orch = orchestrator(BoxModelGateway::new(ScriptedGateway::new(Script::Chunks(vec![
            "Hel", "lo",
        ]))));
        let frames = run_script(orch.clone(), &[r#"{"kind":"turn","content":"hi"}"#]).await;

        let session_id = frames[0]["session_id"].as_str().unwrap().to_string();
        let kinds: Vec<&str> = frames.iter().map(|f| f["kind"].as_str().unwrap()).collect();
        assert_eq!(kinds, vec!["session", "partial", "partial", "final"]);
        assert_eq!(frames[1]["content"], "Hel");
        assert_eq!(frames[2]["content"], "lo");
        assert_eq!(frames[3]["content"], "Hello");
        assert!(frames.iter().all(|f| f["session_id"] == session_id.as_str()));

        assert_eq!(
            orch.store().messages(&session_id),
            vec![
                (MessageRole::User, "hi".to_string()),
                (MessageRole::Assistant, "Hello".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_non_streaming_turn_sends_only_final() {
        let orch = orchestrator(BoxModelGateway::new(PlaceholderGateway));
        let frames = run_script(
            orch.clone(),
            &[r#"{"kind":"turn","content":"hi","stream":false,"session_id":" mine "}"#],
        )
        .await;

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1]["kind"], "final");
        assert_eq!(frames[1]["session_id"], "mine");
        assert_eq!(orch.store().messages("mine").len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_frames_get_errors_and_connection_survives() {
        let orch = orchestrator(BoxModelGateway::new(PlaceholderGateway));
        let frames = run_script(
            orch,
            &[
                "{not json",
                r#"{"kind":"ping"}"#,
                r#"{"kind":"turn"}"#,
                r#"{"kind":"turn","content":"still here","stream":false}"#,
            ],
        )
        .await;

        let summary: Vec<(String, String)> = frames
            .iter()
            .skip(1)
            .map(|f| {
                (
                    f["kind"].as_str().unwrap().to_string(),
                    f["message"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("error".to_string(), "invalid_json".to_string()),
                ("error".to_string(), "unknown_kind".to_string()),
                ("error".to_string(), "invalid_turn".to_string()),
                ("final".to_string(), String::new()),
            ]
        );
        assert!(frames[4]["content"].as_str().unwrap().contains("still here"));
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported_as_error_frame() {
        let orch = orchestrator(BoxModelGateway::new(PlaceholderGateway));
        orch.store().fail_writes(true);
        let frames = run_script(orch, &[r#"{"kind":"turn","content":"hi"}"#]).await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1]["kind"], "error");
        assert_eq!(frames[1]["message"], "storage_failure");
    }

    #[tokio::test]
    async fn test_gateway_failure_streams_fallback_and_persists_it() {
        let orch = orchestrator(BoxModelGateway::new(ScriptedGateway::new(Script::Fail(
            ModelError::MissingCredential,
        ))));
        let frames = run_script(orch.clone(), &[r#"{"kind":"turn","content":"yo"}"#]).await;

        let last = frames.last().unwrap();
        assert_eq!(last["kind"], "final");
        assert_eq!(last["content"], "(model unavailable: missing_credential) You said: yo");
        let session_id = frames[0]["session_id"].as_str().unwrap();
        assert_eq!(orch.store().messages(session_id).len(), 2);
    }

    #[tokio::test]
    async fn test_turn_session_id_sticks_for_later_turns() {
        let orch = orchestrator(BoxModelGateway::new(PlaceholderGateway));
        let frames = run_script(
            orch.clone(),
            &[
                r#"{"kind":"turn","content":"a","session_id":"room-1","stream":false}"#,
                r#"{"kind":"turn","content":"b","stream":false}"#,
            ],
        )
        .await;
        assert_eq!(frames[2]["session_id"], "room-1");
        assert_eq!(orch.store().messages("room-1").len(), 4);
    }

    #[tokio::test]
    async fn test_disconnect_mid_stream_persists_only_user_message() {
        let orch = orchestrator(BoxModelGateway::new(ScriptedGateway::new(
            Script::ChunksThenHang(vec!["A"]),
        )));
        let (channel, mut peer) = channel_pair();
        let cancel = CancellationToken::new();

        let driver = ConnectionDriver::new(orch.clone());
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move { driver.run(channel, task_cancel).await });

        let hello = peer.next_frame().await;
        let session_id = hello["session_id"].as_str().unwrap().to_string();
        peer.send(r#"{"kind":"turn","content":"hi"}"#);

        let partial = peer.next_frame().await;
        assert_eq!(partial["kind"], "partial");

        // The transport noticed the peer leaving.
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(
            orch.store().messages(&session_id),
            vec![(MessageRole::User, "hi".to_string())]
        );
        assert!(peer.from_driver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_cancels_token_on_return() {
        let (channel, peer) = channel_pair();
        drop(peer.to_driver);
        let cancel = CancellationToken::new();
        ConnectionDriver::new(orchestrator(BoxModelGateway::new(PlaceholderGateway)))
            .run(channel, cancel.clone())
            .await;
        assert!(cancel.is_cancelled());
    }
}
