//! Chat-completions request body and response extraction.

use serde::Serialize;
use serde_json::Value;

use parley_types::chat::ChatTurn;
use parley_types::error::ModelError;

/// Body of `POST {base_url}/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    pub temperature: f64,
    pub stream: bool,
}

/// Pull `choices[0].message.content` out of a non-streaming response.
///
/// A JSON `null` content counts as an empty reply. The result is trimmed.
pub fn extract_message_content(body: &Value) -> Result<String, ModelError> {
    let content = body
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .ok_or(ModelError::UnexpectedUpstreamShape)?;

    match content {
        Value::Null => Ok(String::new()),
        Value::String(text) => Ok(text.trim().to_string()),
        _ => Err(ModelError::UnexpectedUpstreamShape),
    }
}

/// Pull `choices[0].delta.content` out of one streamed event payload.
pub fn extract_delta_content(event: &Value) -> Option<&str> {
    event
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let body = ChatCompletionRequest {
            model: "deepseek-chat".to_string(),
            messages: vec![ChatTurn::system("sys"), ChatTurn::user("hi")],
            temperature: 0.7,
            stream: true,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "model": "deepseek-chat",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hi"}
                ],
                "temperature": 0.7,
                "stream": true
            })
        );
    }

    #[test]
    fn test_extract_message_content() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "  hello \n"}}]});
        assert_eq!(extract_message_content(&body).unwrap(), "hello");

        let null_content = json!({"choices": [{"message": {"content": null}}]});
        assert_eq!(extract_message_content(&null_content).unwrap(), "");
    }

    #[test]
    fn test_extract_message_content_bad_shapes() {
        for body in [
            json!({}),
            json!({"choices": []}),
            json!({"choices": [{"delta": {"content": "x"}}]}),
            json!({"choices": [{"message": {"content": 5}}]}),
        ] {
            assert_eq!(
                extract_message_content(&body),
                Err(ModelError::UnexpectedUpstreamShape)
            );
        }
    }

    #[test]
    fn test_extract_delta_content() {
        let event = json!({"choices": [{"delta": {"content": "A"}}]});
        assert_eq!(extract_delta_content(&event), Some("A"));

        let empty = json!({"choices": [{"delta": {"content": ""}}]});
        assert_eq!(extract_delta_content(&empty), None);

        let role_only = json!({"choices": [{"delta": {"role": "assistant"}}]});
        assert_eq!(extract_delta_content(&role_only), None);
    }
}
