//! RemoteGateway -- OpenAI-compatible chat completions (DeepSeek and friends).
//!
//! Sends `POST {base_url}/chat/completions` with bearer auth. Supports both
//! a single JSON reply (`generate`) and a server-sent event stream
//! (`stream_generate`).
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

pub mod streaming;
pub mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use parley_core::gateway::{ChunkStream, ModelGateway};
use parley_types::chat::ChatTurn;
use parley_types::config::ModelConfig;
use parley_types::error::ModelError;

use self::streaming::decode_event_stream;
use self::types::{ChatCompletionRequest, extract_message_content};

/// Remote chat-completions gateway.
///
/// `timeout` bounds a whole `generate` call. For streams it bounds the wait
/// for response headers and each gap between body reads, not the total reply.
///
/// Does NOT derive Debug. The credential is only exposed when building the
/// Authorization header.
pub struct RemoteGateway {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl RemoteGateway {
    pub fn new(config: &ModelConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_seconds.max(1));
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!("Failed to build HTTP client ({err}), using defaults");
                reqwest::Client::new()
            });

        Self {
            client,
            api_key: SecretString::from(config.api_key.trim().to_string()),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Checked on every call so a missing key degrades each turn, not startup.
    fn credential(&self) -> Result<&str, ModelError> {
        let key = self.api_key.expose_secret();
        if key.is_empty() {
            return Err(ModelError::MissingCredential);
        }
        Ok(key)
    }

    fn request_body(&self, turns: Vec<ChatTurn>, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: turns,
            temperature: self.temperature,
            stream,
        }
    }
}

/// Send the request and turn transport failures and non-2xx statuses into
/// [`ModelError`]s.
async fn post_completion(
    request: reqwest::RequestBuilder,
    api_key: &str,
    body: &ChatCompletionRequest,
) -> Result<reqwest::Response, ModelError> {
    let response = request
        .header("Authorization", format!("Bearer {api_key}"))
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| ModelError::NetworkFailure(format!("HTTP request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %error_body, "Model API error response");
        return Err(ModelError::UpstreamStatus(status.as_u16()));
    }
    Ok(response)
}

impl ModelGateway for RemoteGateway {
    fn name(&self) -> &str {
        "remote"
    }

    async fn generate(&self, turns: &[ChatTurn]) -> Result<String, ModelError> {
        let api_key = self.credential()?;
        let body = self.request_body(turns.to_vec(), false);
        let request = self.client.post(&self.endpoint).timeout(self.timeout);

        let response = post_completion(request, api_key, &body).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ModelError::NetworkFailure(format!("response body read: {e}")))?;
        let json: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|_| ModelError::MalformedUpstreamBody)?;

        extract_message_content(&json)
    }

    fn stream_generate(&self, turns: Vec<ChatTurn>) -> ChunkStream {
        let api_key = match self.credential() {
            Ok(key) => key.to_string(),
            Err(err) => return Box::pin(futures_util::stream::once(async move { Err(err) })),
        };
        let body = self.request_body(turns, true);
        let request = self.client.post(&self.endpoint);

        let idle_timeout = self.timeout;

        Box::pin(async_stream::try_stream! {
            let response = tokio::time::timeout(idle_timeout, post_completion(request, &api_key, &body))
                .await
                .map_err(|_| ModelError::NetworkFailure(format!("no response headers within {idle_timeout:?}")))?;
            let response = response?;
            let mut chunks = decode_event_stream(response.bytes_stream(), idle_timeout);
            while let Some(chunk) = futures_util::StreamExt::next(&mut chunks).await {
                yield chunk?;
            }
        })
    }
}
