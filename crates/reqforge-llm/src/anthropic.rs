//! Anthropic Messages API backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use reqforge_config::Config;
use reqforge_utils::error::LlmError;

use crate::http_client::{HttpClient, HttpParams};
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

const ANTHROPIC_VERSION: &str = "2023-06-01";

const DEFAULT_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Clone)]
pub(crate) struct AnthropicBackend {
    client: HttpClient,
    base_url: String,
    api_key: String,
    default_model: String,
    default_params: HttpParams,
}

impl AnthropicBackend {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be constructed
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        default_model: String,
        default_params: HttpParams,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            default_model,
            default_params,
        })
    }

    /// Build from `[llm]` and `[llm.anthropic]`.
    ///
    /// The model is `[llm] model` if set, otherwise `[llm.anthropic] model`.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the API key variable is unset
    /// or no model is configured.
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        let section = config.llm.anthropic.clone().unwrap_or_default();

        let api_key_env = section.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
        let api_key = std::env::var(api_key_env).map_err(|_| {
            LlmError::Misconfiguration(format!(
                "Anthropic API key not found in environment variable '{api_key_env}'. \
                 Set it or configure a different api_key_env in [llm.anthropic]."
            ))
        })?;

        let default_model = config
            .llm
            .model
            .clone()
            .or(section.model)
            .ok_or_else(|| {
                LlmError::Misconfiguration(
                    "Anthropic model not specified. Set [llm] model or [llm.anthropic] model."
                        .to_string(),
                )
            })?;

        let defaults = HttpParams::default();
        let default_params = HttpParams {
            max_tokens: section.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: section.temperature.unwrap_or(defaults.temperature),
        };

        Self::new(api_key, section.base_url, default_model, default_params)
    }

    #[cfg(test)]
    fn with_client(mut self, client: HttpClient) -> Self {
        self.client = client;
        self
    }

    fn resolve_model(&self, inv: &LlmInvocation) -> String {
        if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        }
    }

    /// Split system messages into the top-level `system` field.
    ///
    /// Multiple system messages are joined with a blank line.
    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system_prompt: Option<String> = None;
        let mut converted = Vec::new();

        for msg in messages {
            let role = match msg.role {
                Role::System => {
                    match system_prompt.as_mut() {
                        Some(existing) => {
                            existing.push_str("\n\n");
                            existing.push_str(&msg.content);
                        }
                        None => system_prompt = Some(msg.content.clone()),
                    }
                    continue;
                }
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            converted.push(AnthropicMessage {
                role: role.to_string(),
                content: msg.content.clone(),
            });
        }

        (system_prompt, converted)
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let model = self.resolve_model(&inv);
        let params = self.default_params.resolve(&inv.metadata);

        debug!(
            provider = "anthropic",
            purpose = %inv.purpose,
            model = %model,
            max_tokens = params.max_tokens,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Anthropic backend"
        );

        let (system, messages) = Self::convert_messages(&inv.messages);
        let body = AnthropicRequest {
            model: model.clone(),
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system,
        };

        let request = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let response = self
            .client
            .execute_with_retry(request, inv.timeout, "anthropic")
            .await?;

        let response_body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("Failed to parse Anthropic response: {e}")))?;

        let content: String = response_body
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        let mut result = LlmResult::new(content, "anthropic", model);
        if let Some(usage) = response_body.usage {
            result = result.with_tokens(usage.input_tokens, usage.output_tokens);
        }
        if let Some(stop_reason) = response_body.stop_reason {
            result = result.with_extension("stop_reason", serde_json::Value::String(stop_reason));
        }

        debug!(
            provider = "anthropic",
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Anthropic invocation completed"
        );

        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqforge_config::AnthropicConfig;
    use serial_test::serial;
    use std::time::Duration;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(base_url: Option<String>) -> AnthropicBackend {
        AnthropicBackend::new(
            "test-key".to_string(),
            base_url,
            "default-model".to_string(),
            HttpParams::default(),
        )
        .unwrap()
        .with_client(
            HttpClient::new()
                .unwrap()
                .with_retry_policy(0, Duration::from_millis(1)),
        )
    }

    #[test]
    fn test_convert_messages_separates_system() {
        let messages = vec![
            Message::system("first"),
            Message::system("second"),
            Message::user("Hello"),
            Message::assistant("Hi"),
        ];

        let (system, converted) = AnthropicBackend::convert_messages(&messages);

        assert_eq!(system.as_deref(), Some("first\n\nsecond"));
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0].role, "user");
        assert_eq!(converted[1].role, "assistant");
    }

    #[test]
    fn test_empty_invocation_model_uses_default() {
        let backend = backend(None);
        let inv = LlmInvocation::new("judge", "", Duration::from_secs(1), vec![]);
        assert_eq!(backend.resolve_model(&inv), "default-model");

        let inv = LlmInvocation::new("judge", "other", Duration::from_secs(1), vec![]);
        assert_eq!(backend.resolve_model(&inv), "other");
    }

    #[test]
    #[serial]
    fn test_new_from_config_missing_api_key() {
        let env_name = "REQFORGE_TEST_ANTHROPIC_KEY_MISSING";
        unsafe {
            std::env::remove_var(env_name);
        }
        let config = Config::builder()
            .model("m")
            .anthropic(AnthropicConfig {
                api_key_env: Some(env_name.to_string()),
                ..AnthropicConfig::default()
            })
            .build()
            .unwrap();

        match AnthropicBackend::new_from_config(&config) {
            Err(LlmError::Misconfiguration(msg)) => assert!(msg.contains(env_name)),
            Err(other) => panic!("expected Misconfiguration, got {other:?}"),
            Ok(_) => panic!("expected Misconfiguration, got a backend"),
        }
    }

    #[test]
    #[serial]
    fn test_new_from_config_requires_model() {
        let env_name = "REQFORGE_TEST_ANTHROPIC_KEY_MODEL";
        unsafe {
            std::env::set_var(env_name, "key");
        }
        let config = Config::builder()
            .anthropic(AnthropicConfig {
                api_key_env: Some(env_name.to_string()),
                ..AnthropicConfig::default()
            })
            .build()
            .unwrap();

        let result = AnthropicBackend::new_from_config(&config);
        unsafe {
            std::env::remove_var(env_name);
        }

        assert!(matches!(result, Err(LlmError::Misconfiguration(msg)) if msg.contains("model")));
    }

    #[tokio::test]
    async fn test_invoke_concatenates_text_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [
                    {"type": "text", "text": "YES"},
                    {"type": "tool_use", "id": "x"},
                    {"type": "text", "text": "."}
                ],
                "usage": {"input_tokens": 12, "output_tokens": 2},
                "stop_reason": "end_turn"
            })))
            .mount(&server)
            .await;

        let backend = backend(Some(server.uri()));
        let inv = LlmInvocation::new(
            "judge",
            "",
            Duration::from_secs(5),
            vec![Message::user("Is it done?")],
        );

        let result = backend.invoke(inv).await.unwrap();

        assert_eq!(result.raw_response, "YES.");
        assert_eq!(result.provider, "anthropic");
        assert_eq!(result.model_used, "default-model");
        assert_eq!(result.tokens_input, Some(12));
        assert_eq!(result.extensions["stop_reason"], "end_turn");
    }

    #[tokio::test]
    async fn test_invoke_rejects_undecodable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let backend = backend(Some(server.uri()));
        let inv = LlmInvocation::new("judge", "", Duration::from_secs(5), vec![]);

        assert!(matches!(
            backend.invoke(inv).await,
            Err(LlmError::Transport(msg)) if msg.contains("Anthropic")
        ));
    }
}
