//! OpenAI-compatible Chat Completions client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

use super::{ChatMessage, ChatModel};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// `ChatModel` backed by a `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiChatModel {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAiChatModel {
    /// A client for the default model and endpoint. A missing key is only
    /// reported when a completion is requested.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::provider("OPENAI_API_KEY is not set"))?;

        let request = CompletionRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::provider(format!("Chat completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_error(status, &body));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::provider(format!("Failed to parse chat completion: {e}")))?;

        debug!("Completion from {} ({} choices)", self.model, parsed.choices.len());
        first_choice(parsed)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn first_choice(response: CompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::provider("Chat completion returned no content"))
}

fn http_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.to_string());
    Error::provider(format!("Chat completion failed ({}): {}", status.as_u16(), message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn test_request_shape() {
        let messages = vec![
            ChatMessage::new(Role::System, "be brief"),
            ChatMessage::new(Role::User, "hi"),
        ];
        let request = CompletionRequest {
            model: "gpt-4o-mini",
            messages: &messages,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ]
            })
        );
    }

    #[test]
    fn test_first_choice() {
        let parsed: CompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "hello"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice(parsed).unwrap(), "hello");

        let empty: CompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(first_choice(empty).unwrap_err().is_provider());

        let null_content: CompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(first_choice(null_content).is_err());
    }

    #[test]
    fn test_http_error_prefers_api_message() {
        let err = http_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error": {"message": "Incorrect API key", "type": "invalid_request_error"}}"#,
        );
        assert!(err.to_string().contains("Incorrect API key"));
        assert!(err.to_string().contains("401"));

        let err = http_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn test_endpoint_and_builders() {
        let model = OpenAiChatModel::new(Some("sk-test".into()))
            .unwrap()
            .with_model("gpt-4o")
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(model.name(), "gpt-4o");
        assert_eq!(model.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert!(model.has_api_key());
    }

    #[tokio::test]
    async fn test_missing_key_is_provider_error() {
        let model = OpenAiChatModel::new(Some("  ".into())).unwrap();
        assert!(!model.has_api_key());

        let err = model
            .complete(&[ChatMessage::new(Role::User, "hi")])
            .await
            .unwrap_err();
        assert!(err.is_provider());
    }
}
