//! OpenAI-compatible chat completions backend
//!
//! Works against `api.openai.com` and any server exposing the same
//! `/v1/chat/completions` request and response shape.

use crate::LlmError;
use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
use async_trait::async_trait;
use promptpack_config::{
    Config, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const PROVIDER: &str = "openai";

#[derive(Clone)]
pub(crate) struct OpenAiBackend {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
    org_id: Option<String>,
    default_model: String,
    default_params: HttpParams,
}

/// HTTP request parameters
#[derive(Debug, Clone)]
pub(crate) struct HttpParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for HttpParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl OpenAiBackend {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        org_id: Option<String>,
        default_model: String,
        default_params: HttpParams,
    ) -> Result<Self, LlmError> {
        let client = HttpClient::new()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            org_id,
            default_model,
            default_params,
        })
    }

    /// Create a backend from the `[llm]` section.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the API key environment
    /// variable is not set or the HTTP client cannot be constructed.
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        let api_key_env = config
            .llm
            .api_key_env
            .as_deref()
            .unwrap_or(DEFAULT_API_KEY_ENV);

        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                LlmError::Misconfiguration(format!(
                    "API key not found in environment variable '{api_key_env}'. \
                     Please set this variable or configure a different api_key_env in [llm]."
                ))
            })?;

        let default_params = HttpParams {
            max_tokens: config.llm.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: config.llm.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        };

        Self::new(
            api_key,
            config.llm.base_url.clone(),
            config.llm.org_id.clone(),
            config.model().to_string(),
            default_params,
        )
    }

    /// Resolve parameters for this invocation
    ///
    /// `inv.model` overrides the default model. `temperature` in
    /// `inv.metadata` overrides the default; `max_tokens` there can only
    /// lower the configured reply size.
    fn resolve_params(&self, inv: &LlmInvocation) -> (String, HttpParams) {
        let model = if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        };

        // The configured size caps every reply; the caller's room can only lower it
        let max_tokens = inv
            .metadata
            .get("max_tokens")
            .and_then(serde_json::Value::as_u64)
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .map_or(self.default_params.max_tokens, |room| {
                room.min(self.default_params.max_tokens)
            });

        let temperature = inv
            .metadata
            .get("temperature")
            .and_then(serde_json::Value::as_f64)
            .map(|v| v as f32)
            .unwrap_or(self.default_params.temperature);

        (
            model,
            HttpParams {
                max_tokens,
                temperature,
            },
        )
    }

    fn convert_messages(messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|msg| OpenAiMessage {
                role: match msg.role {
                    Role::System => "system".to_string(),
                    Role::User => "user".to_string(),
                    Role::Assistant => "assistant".to_string(),
                },
                content: msg.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let (model, params) = self.resolve_params(&inv);

        debug!(
            provider = PROVIDER,
            purpose = %inv.purpose,
            model = %model,
            max_tokens = params.max_tokens,
            temperature = params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking completion backend"
        );

        let request_body = ChatRequest {
            model: model.clone(),
            messages: Self::convert_messages(&inv.messages),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let mut request = self
            .client
            .inner()
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body);
        if let Some(org) = &self.org_id {
            request = request.header("OpenAI-Organization", org);
        }

        let response = self.client.execute(request, inv.timeout, PROVIDER).await?;

        let response_body: ChatResponse = response.json().await.map_err(|e| {
            LlmError::Transport(format!("Failed to parse completion response: {e}"))
        })?;

        let choice = response_body.choices.into_iter().next().ok_or_else(|| {
            LlmError::Transport("Completion response missing choices[0]".to_string())
        })?;

        let content = choice.message.content.ok_or_else(|| {
            LlmError::Transport("Completion response missing content in choices[0]".to_string())
        })?;

        let mut result = LlmResult::new(content, PROVIDER, model);
        if let Some(usage) = response_body.usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }

        debug!(
            provider = PROVIDER,
            purpose = %inv.purpose,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Completion finished"
        );

        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;

    fn backend(base_url: Option<String>) -> OpenAiBackend {
        OpenAiBackend::new(
            "test-key".to_string(),
            base_url,
            Some("org-test".to_string()),
            "default-model".to_string(),
            HttpParams {
                max_tokens: 256,
                temperature: 0.5,
            },
        )
        .unwrap()
    }

    fn invocation(model: &str) -> LlmInvocation {
        LlmInvocation::new(
            "test",
            model,
            Duration::from_secs(10),
            vec![Message::system("be brief"), Message::user("hello")],
        )
    }

    const ENDPOINT: &str = "/v1/chat/completions";

    fn endpoint(server: &Server) -> Option<String> {
        Some(format!("{}{ENDPOINT}", server.url()))
    }

    #[test]
    fn test_resolve_params_uses_defaults() {
        let (model, params) = backend(None).resolve_params(&invocation(""));
        assert_eq!(model, "default-model");
        assert_eq!(params.max_tokens, 256);
        assert_eq!(params.temperature, 0.5);
    }

    #[test]
    fn test_resolve_params_metadata_overrides() {
        let inv = invocation("gpt-4")
            .with_metadata("max_tokens", serde_json::json!(120))
            .with_metadata("temperature", serde_json::json!(0.0));
        let (model, params) = backend(None).resolve_params(&inv);
        assert_eq!(model, "gpt-4");
        assert_eq!(params.max_tokens, 120);
        assert_eq!(params.temperature, 0.0);
    }

    #[test]
    fn test_resolve_params_room_never_raises_configured_size() {
        let inv = invocation("gpt-4").with_metadata("max_tokens", serde_json::json!(3_000));
        let (_, params) = backend(None).resolve_params(&inv);
        assert_eq!(params.max_tokens, 256);
    }

    #[test]
    fn test_convert_messages() {
        let converted = OpenAiBackend::convert_messages(&[
            Message::system("sys"),
            Message::user("usr"),
            Message::assistant("asst"),
        ]);
        let roles: Vec<&str> = converted.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
        assert_eq!(converted[1].content, "usr");
    }

    #[test]
    fn test_new_from_config_missing_api_key() {
        let config = Config::builder()
            .api_key_env("PROMPTPACK_TEST_KEY_THAT_IS_NEVER_SET")
            .build()
            .unwrap();

        match OpenAiBackend::new_from_config(&config) {
            Err(LlmError::Misconfiguration(msg)) => {
                assert!(msg.contains("PROMPTPACK_TEST_KEY_THAT_IS_NEVER_SET"));
                assert!(msg.contains("not found"));
            }
            Err(other) => panic!("Expected Misconfiguration, got {other:?}"),
            Ok(_) => panic!("Expected Misconfiguration, got a backend"),
        }
    }

    #[tokio::test]
    async fn test_invoke_parses_completion() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", ENDPOINT)
            .match_header("authorization", "Bearer test-key")
            .match_header("openai-organization", "org-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4",
                "max_tokens": 64,
                "stream": false
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{ "message": { "role": "assistant", "content": "Hi there" } }],
                    "usage": { "prompt_tokens": 12, "completion_tokens": 3 }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let result = backend(endpoint(&server))
            .invoke(invocation("gpt-4").with_metadata("max_tokens", json!(64)))
            .await
            .unwrap();

        assert_eq!(result.raw_response, "Hi there");
        assert_eq!(result.model_used, "gpt-4");
        assert_eq!(result.tokens_input, Some(12));
        assert_eq!(result.tokens_output, Some(3));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invoke_maps_server_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", ENDPOINT)
            .with_status(503)
            .with_body("{}")
            .create_async()
            .await;

        let err = backend(endpoint(&server)).invoke(invocation("")).await.unwrap_err();
        assert!(matches!(err, LlmError::ProviderOutage(_)));
    }

    #[tokio::test]
    async fn test_invoke_rejects_empty_choices() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", ENDPOINT)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = backend(endpoint(&server)).invoke(invocation("")).await.unwrap_err();
        assert!(matches!(err, LlmError::Transport(ref msg) if msg.contains("choices[0]")));
    }
}
