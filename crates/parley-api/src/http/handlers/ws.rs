//! WebSocket relay endpoint.
//!
//! `/ws` upgrades the connection and hands it to the shared
//! [`ConnectionDriver`]. Inbound frames are read on their own task so a
//! disconnect is noticed while a reply is still streaming: the reader
//! cancels the connection token as soon as the socket closes.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use parley_core::relay::{ChannelClosed, ConnectionDriver, DuplexChannel};

use crate::state::AppState;

/// Inbound frames buffered between the reader task and the driver.
const INBOUND_CAPACITY: usize = 32;

/// Upgrade an HTTP request to a relay connection.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    let (sender, receiver) = socket.split();
    let cancel = state.shutdown.child_token();
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);

    let reader = tokio::spawn(read_frames(receiver, inbound_tx, cancel.clone()));

    let channel = WebSocketChannel {
        sender,
        inbound: inbound_rx,
    };
    ConnectionDriver::new(state.orchestrator.clone())
        .run(channel, cancel)
        .await;

    reader.abort();
    tracing::debug!("WebSocket connection closed");
}

/// Forward text frames until the peer goes away, then cancel the connection.
///
/// Binary frames are decoded as UTF-8 and forwarded like text, so the driver
/// answers them with the usual error frame when they are not a turn. The
/// socket is polled continuously: when the driver's queue is full the frame
/// is dropped rather than waiting, so a close is never missed.
async fn read_frames<S>(mut receiver: S, inbound: mpsc::Sender<String>, cancel: CancellationToken)
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = receiver.next() => msg,
        };

        let text = match msg {
            Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
            Some(Ok(Message::Binary(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
            Some(Ok(Message::Close(_))) | None => break,
            Some(Err(err)) => {
                tracing::debug!("WebSocket receive error: {err}");
                break;
            }
            // Ping/pong are answered by axum.
            Some(Ok(_)) => continue,
        };

        match inbound.try_send(text) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    capacity = INBOUND_CAPACITY,
                    "Inbound queue full, dropping WebSocket frame"
                );
            }
            Err(TrySendError::Closed(_)) => break,
        }
    }
    cancel.cancel();
}

/// The sending half of the socket plus the reader task's queue.
struct WebSocketChannel {
    sender: SplitSink<WebSocket, Message>,
    inbound: mpsc::Receiver<String>,
}

impl DuplexChannel for WebSocketChannel {
    async fn recv_text(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    async fn send_text(&mut self, text: String) -> Result<(), ChannelClosed> {
        self.sender
            .send(Message::Text(text.into()))
            .await
            .map_err(|_| ChannelClosed)
    }
}
