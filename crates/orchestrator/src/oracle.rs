//! Decision oracle boundary.
//!
//! The oracle is the external text-generation collaborator consulted by the
//! plan, select-tool, interpret-output, handle-error, and finalize stages.
//! The pipeline only consumes the returned text; whether it contains
//! well-formed structured data is the decision parser's concern. A transport
//! or API failure here is fatal to the run and propagates out of the runner.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use pilot_core::{Message, Role};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.2;

const ENDPOINT_VAR: &str = "PILOT_ORACLE_ENDPOINT";
const API_KEY_VAR: &str = "PILOT_ORACLE_API_KEY";
const MODEL_VAR: &str = "PILOT_ORACLE_MODEL";

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Oracle API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Oracle returned an empty response")]
    EmptyResponse,

    #[error("Missing oracle configuration: {0}")]
    MissingConfig(&'static str),
}

/// One oracle consultation: prior narration plus a role-tagged instruction.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub system: String,
    pub history: Vec<Message>,
    pub instruction: String,
}

impl OracleRequest {
    pub fn new(
        system: impl Into<String>,
        history: Vec<Message>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            system: system.into(),
            history,
            instruction: instruction.into(),
        }
    }
}

#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn complete(&self, request: OracleRequest) -> Result<String, OracleError>;
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
}

impl OracleConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Read configuration from `PILOT_ORACLE_*` environment variables.
    pub fn from_env() -> Result<Self, OracleError> {
        let endpoint =
            std::env::var(ENDPOINT_VAR).map_err(|_| OracleError::MissingConfig(ENDPOINT_VAR))?;
        let api_key =
            std::env::var(API_KEY_VAR).map_err(|_| OracleError::MissingConfig(API_KEY_VAR))?;
        let mut config = Self::new(endpoint, api_key);
        if let Ok(model) = std::env::var(MODEL_VAR) {
            config.model = model;
        }
        Ok(config)
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Oracle backed by an OpenAI-compatible chat-completions endpoint.
pub struct ChatOracle {
    client: reqwest::Client,
    config: OracleConfig,
}

impl ChatOracle {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self, OracleError> {
        Ok(Self::new(OracleConfig::from_env()?))
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_messages<'a>(&'a self, request: &'a OracleRequest) -> Vec<ChatMessage<'a>> {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(ChatMessage {
            role: "system",
            content: &request.system,
        });
        for message in &request.history {
            messages.push(ChatMessage {
                role: match message.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: &message.content,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.instruction,
        });
        messages
    }
}

#[async_trait]
impl DecisionOracle for ChatOracle {
    async fn complete(&self, request: OracleRequest) -> Result<String, OracleError> {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: self.build_messages(&request),
        };

        debug!(
            model = %self.config.model,
            history_len = request.history.len(),
            "Sending oracle request"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Oracle API error");
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(OracleError::EmptyResponse)
    }
}

/// Oracle that replays a fixed queue of responses, for tests and dry runs.
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<String>>,
    /// Number of completions served so far.
    calls: Mutex<usize>,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(0),
        }
    }

    pub fn from_slices(responses: &[&str]) -> Self {
        Self::new(responses.iter().map(|s| s.to_string()).collect())
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("calls lock poisoned")
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn complete(&self, _request: OracleRequest) -> Result<String, OracleError> {
        *self.calls.lock().expect("calls lock poisoned") += 1;
        self.responses
            .lock()
            .expect("responses lock poisoned")
            .pop_front()
            .ok_or(OracleError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_config_builder() {
        let config = OracleConfig::new("https://example.test/v1/chat/completions", "secret")
            .with_model("gpt-4o")
            .with_temperature(0.0);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn test_chat_oracle_message_order() {
        let oracle = ChatOracle::new(OracleConfig::new("https://example.test", "secret"));
        let request = OracleRequest::new(
            "system prompt",
            vec![Message::user("hi"), Message::assistant("hello")],
            "do the thing",
        );
        let messages = oracle.build_messages(&request);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[3].role, "user");
        assert_eq!(messages[3].content, "do the thing");
    }

    #[tokio::test]
    async fn test_scripted_oracle_replays_in_order() {
        let oracle = ScriptedOracle::from_slices(&["first", "second"]);
        let request = OracleRequest::new("s", vec![], "i");

        assert_eq!(oracle.complete(request.clone()).await.unwrap(), "first");
        assert_eq!(oracle.complete(request.clone()).await.unwrap(), "second");
        assert!(matches!(
            oracle.complete(request).await,
            Err(OracleError::EmptyResponse)
        ));
        assert_eq!(oracle.calls(), 3);
    }
}
