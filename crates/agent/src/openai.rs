//! Reasoning backend for any provider that speaks the OpenAI
//! chat-completions protocol (Gemini's compatibility endpoint, OpenAI,
//! Ollama).
//!
//! Each specialist is advertised as a function tool; the provider either
//! calls one of them or answers in plain text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use supportdesk_core::config::LlmConfig;
use supportdesk_core::errors::BackendError;
use tracing::{debug, warn};

use crate::handoff::HandoffDescriptor;
use crate::llm::{ReasoningBackend, RoutingDecision, RoutingRequest};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(5);
const PROVIDER_MESSAGE_LIMIT: usize = 200;

#[derive(Debug)]
pub struct OpenAiCompatibleBackend {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
    max_retries: u32,
}

impl OpenAiCompatibleBackend {
    pub fn from_config(config: &LlmConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| BackendError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            endpoint: completions_endpoint(config.effective_base_url()),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_once(
        &self,
        body: &ChatCompletionRequest<'_>,
    ) -> Result<RoutingDecision, BackendError> {
        let mut builder = self.client.post(&self.endpoint).json(body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response =
            builder.send().await.map_err(|error| BackendError::Transport(error.to_string()))?;
        let status = response.status();
        let text =
            response.text().await.map_err(|error| BackendError::Transport(error.to_string()))?;

        if !status.is_success() {
            return Err(BackendError::Provider {
                status: status.as_u16(),
                message: provider_message(&text),
            });
        }

        parse_completion_body(&text)
    }
}

#[async_trait]
impl ReasoningBackend for OpenAiCompatibleBackend {
    async fn route(&self, request: &RoutingRequest<'_>) -> Result<RoutingDecision, BackendError> {
        let body = build_request_body(&self.model, request);
        let mut attempt = 0;

        loop {
            match self.send_once(&body).await {
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = retry_delay(attempt);
                    warn!(
                        event_name = "backend.retry",
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying reasoning backend call"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => {
                    debug!(
                        event_name = "backend.completed",
                        attempts = attempt + 1,
                        ok = result.is_ok(),
                        "reasoning backend call finished"
                    );
                    return result;
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    tools: Vec<ToolDefinition>,
    tool_choice: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ToolDefinition {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionDefinition,
}

#[derive(Debug, Serialize)]
struct FunctionDefinition {
    name: &'static str,
    description: &'static str,
    parameters: Value,
}

impl From<&HandoffDescriptor> for ToolDefinition {
    fn from(descriptor: &HandoffDescriptor) -> Self {
        Self {
            kind: "function",
            function: FunctionDefinition {
                name: descriptor.tool_name,
                description: descriptor.description,
                parameters: descriptor.input_schema(),
            },
        }
    }
}

pub fn build_request_body<'a>(
    model: &'a str,
    request: &RoutingRequest<'a>,
) -> ChatCompletionRequest<'a> {
    ChatCompletionRequest {
        model,
        messages: vec![
            ChatMessage { role: "system", content: request.instructions },
            ChatMessage { role: "user", content: request.utterance },
        ],
        tools: request.handoffs.iter().map(ToolDefinition::from).collect(),
        tool_choice: "auto",
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Turns a successful chat-completions payload into a routing decision.
/// A tool call wins over text content; blank arguments mean `{}`.
pub fn parse_completion_body(body: &str) -> Result<RoutingDecision, BackendError> {
    let completion: ChatCompletion = serde_json::from_str(body).map_err(|error| {
        BackendError::MalformedResponse(format!("completion is not valid JSON: {error}"))
    })?;
    let message = completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| BackendError::MalformedResponse("completion has no choices".to_string()))?;

    if let Some(call) = message.tool_calls.and_then(|calls| calls.into_iter().next()) {
        let arguments = if call.function.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&call.function.arguments).map_err(|error| {
                BackendError::MalformedResponse(format!(
                    "arguments for `{}` are not valid JSON: {error}",
                    call.function.name
                ))
            })?
        };
        return Ok(RoutingDecision::Handoff { tool_name: call.function.name, arguments });
    }

    message.content.map(RoutingDecision::Reply).ok_or_else(|| {
        BackendError::MalformedResponse("completion has neither content nor tool call".to_string())
    })
}

fn completions_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn provider_message(body: &str) -> String {
    let from_error_object = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value.pointer("/error/message").and_then(Value::as_str).map(str::to_string)
    });

    from_error_object
        .unwrap_or_else(|| body.trim().chars().take(PROVIDER_MESSAGE_LIMIT).collect())
}

fn retry_delay(attempt: u32) -> Duration {
    let mut delay = RETRY_BASE_DELAY;
    for _ in 1..attempt {
        delay = delay.saturating_mul(2);
    }
    delay.min(RETRY_MAX_DELAY)
}
