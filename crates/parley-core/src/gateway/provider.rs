//! ModelGateway trait definition.
//!
//! Uses RPITIT for `generate` and `Pin<Box<dyn Stream>>` for
//! `stream_generate` (streams need to be object-safe for the
//! BoxModelGateway wrapper).

use std::pin::Pin;

use futures_util::Stream;

use parley_types::chat::ChatTurn;
use parley_types::error::ModelError;

/// Lazily produced reply chunks. Ends after the last chunk or the first error.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ModelError>> + Send + 'static>>;

/// Trait for conversational model backends.
///
/// Implementations: `PlaceholderGateway` here, `RemoteGateway` in parley-infra.
pub trait ModelGateway: Send + Sync {
    /// Short name for logs and the health endpoint.
    fn name(&self) -> &str;

    /// Produce the complete reply for the given context.
    fn generate(
        &self,
        turns: &[ChatTurn],
    ) -> impl std::future::Future<Output = Result<String, ModelError>> + Send;

    /// Produce the reply as a sequence of text chunks.
    ///
    /// Takes the context by value so the returned stream owns everything it
    /// needs; dropping the stream abandons the upstream request.
    fn stream_generate(&self, turns: Vec<ChatTurn>) -> ChunkStream;
}

/// Content of the last user turn, if any.
pub fn last_user_content(turns: &[ChatTurn]) -> Option<&str> {
    turns
        .iter()
        .rev()
        .find(|turn| turn.role == parley_types::chat::MessageRole::User)
        .map(|turn| turn.content.as_str())
}
