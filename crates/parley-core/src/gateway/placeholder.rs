//! Offline gateway used when no remote model is configured.

use futures_util::stream;

use parley_types::chat::ChatTurn;
use parley_types::error::ModelError;

use super::provider::{ChunkStream, ModelGateway, last_user_content};

pub const EMPTY_INPUT_REPLY: &str = "You haven't said anything yet.";

/// Replies with a canned notice that echoes the last user turn.
/// Never touches the network and never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderGateway;

impl PlaceholderGateway {
    pub fn reply_for(turns: &[ChatTurn]) -> String {
        let text = last_user_content(turns).unwrap_or_default().trim();
        if text.is_empty() {
            return EMPTY_INPUT_REPLY.to_string();
        }
        format!(
            "(no model configured) I received your message: {text}\n\n\
             To get real replies, set provider = \"deepseek\" and an api_key, \
             then restart the server."
        )
    }
}

impl ModelGateway for PlaceholderGateway {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn generate(&self, turns: &[ChatTurn]) -> Result<String, ModelError> {
        Ok(Self::reply_for(turns))
    }

    fn stream_generate(&self, turns: Vec<ChatTurn>) -> ChunkStream {
        let chunks: Vec<Result<String, ModelError>> = Self::reply_for(&turns)
            .chars()
            .map(|c| Ok(c.to_string()))
            .collect();
        Box::pin(stream::iter(chunks))
    }
}
