//! BoxModelGateway -- object-safe dynamic dispatch wrapper for ModelGateway.
//!
//! 1. `ModelGatewayDyn` is an object-safe mirror with boxed futures
//! 2. Blanket impl of `ModelGatewayDyn` for all `T: ModelGateway`
//! 3. `BoxModelGateway` wraps `Box<dyn ModelGatewayDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use parley_types::chat::ChatTurn;
use parley_types::error::ModelError;

use super::provider::{ChunkStream, ModelGateway};

/// Object-safe version of [`ModelGateway`] with boxed futures.
pub trait ModelGatewayDyn: Send + Sync {
    fn name(&self) -> &str;

    fn generate_boxed<'a>(
        &'a self,
        turns: &'a [ChatTurn],
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>>;

    fn stream_generate_boxed(&self, turns: Vec<ChatTurn>) -> ChunkStream;
}

impl<T: ModelGateway> ModelGatewayDyn for T {
    fn name(&self) -> &str {
        ModelGateway::name(self)
    }

    fn generate_boxed<'a>(
        &'a self,
        turns: &'a [ChatTurn],
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>> {
        Box::pin(self.generate(turns))
    }

    fn stream_generate_boxed(&self, turns: Vec<ChatTurn>) -> ChunkStream {
        self.stream_generate(turns)
    }
}

/// Type-erased gateway chosen at startup from configuration.
///
/// `ModelGateway` uses RPITIT and cannot be a trait object directly, so this
/// wrapper exposes the same operations over `dyn ModelGatewayDyn`.
pub struct BoxModelGateway {
    inner: Box<dyn ModelGatewayDyn + Send + Sync>,
}

impl BoxModelGateway {
    pub fn new<T: ModelGateway + 'static>(gateway: T) -> Self {
        Self {
            inner: Box::new(gateway),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn generate(&self, turns: &[ChatTurn]) -> Result<String, ModelError> {
        self.inner.generate_boxed(turns).await
    }

    pub fn stream_generate(&self, turns: Vec<ChatTurn>) -> ChunkStream {
        self.inner.stream_generate_boxed(turns)
    }
}

impl std::fmt::Debug for BoxModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxModelGateway")
            .field("name", &self.name())
            .finish()
    }
}
