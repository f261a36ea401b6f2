pub mod ask;
pub mod chat;
pub mod config;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use supportdesk_agent::openai::OpenAiCompatibleBackend;
use supportdesk_agent::runtime::SupportRouter;
use supportdesk_core::config::{AppConfig, LoadOptions};
use tokio::runtime::Runtime;
use tracing::info;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(
    command: &str,
    options: LoadOptions,
) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn build_router(
    command: &str,
    config: &AppConfig,
) -> Result<SupportRouter, CommandResult> {
    let backend = OpenAiCompatibleBackend::from_config(&config.llm).map_err(|error| {
        CommandResult::failure(
            command,
            "backend_init",
            format!("failed to initialize reasoning backend: {error}"),
            3,
        )
    })?;

    let endpoint = backend.endpoint().to_string();
    let router = SupportRouter::from_config(config, Arc::new(backend));
    let tools = router
        .dispatch_table()
        .descriptors()
        .iter()
        .map(|descriptor| descriptor.tool_name)
        .collect::<Vec<_>>();

    info!(
        event_name = "router.ready",
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        endpoint = %endpoint,
        timeout_secs = config.llm.timeout_secs,
        tools = ?tools,
        "support router ready"
    );

    Ok(router)
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}
