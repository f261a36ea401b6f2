use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use supportdesk_core::config::{AppConfig, LlmProvider, LoadOptions, DEFAULT_CONFIG_FILE};
use toml::Value;

pub fn run(options: LoadOptions) -> String {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, doc.as_ref(), config_file_path.as_deref())
    };

    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_api_key(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    let sensitive_categories = if config.escalation.sensitive_categories.is_empty() {
        "none".to_string()
    } else {
        config
            .escalation
            .sensitive_categories
            .iter()
            .map(|category| category.as_str())
            .collect::<Vec<_>>()
            .join(",")
    };

    let lines = vec![
        "effective config (source precedence: env > file > default):".to_string(),
        render_line(
            "llm.provider",
            config.llm.provider.as_str(),
            source("llm.provider", &["SUPPORTDESK_LLM_PROVIDER"]),
        ),
        render_line(
            "llm.model",
            &config.llm.model,
            source("llm.model", &["SUPPORTDESK_LLM_MODEL"]),
        ),
        render_line(
            "llm.base_url",
            config.llm.effective_base_url(),
            source("llm.base_url", &["SUPPORTDESK_LLM_BASE_URL"]),
        ),
        render_line(
            "llm.api_key",
            &api_key,
            api_key_source(&config, doc.as_ref(), config_file_path.as_deref()),
        ),
        render_line(
            "llm.timeout_secs",
            &config.llm.timeout_secs.to_string(),
            source("llm.timeout_secs", &["SUPPORTDESK_LLM_TIMEOUT_SECS"]),
        ),
        render_line(
            "llm.max_retries",
            &config.llm.max_retries.to_string(),
            source("llm.max_retries", &["SUPPORTDESK_LLM_MAX_RETRIES"]),
        ),
        render_line(
            "escalation.sensitive_categories",
            &sensitive_categories,
            source(
                "escalation.sensitive_categories",
                &["SUPPORTDESK_ESCALATION_SENSITIVE_CATEGORIES"],
            ),
        ),
        render_line(
            "logging.level",
            &config.logging.level,
            source("logging.level", &["SUPPORTDESK_LOGGING_LEVEL", "SUPPORTDESK_LOG_LEVEL"]),
        ),
        render_line(
            "logging.format",
            &format!("{:?}", config.logging.format).to_lowercase(),
            source("logging.format", &["SUPPORTDESK_LOGGING_FORMAT", "SUPPORTDESK_LOG_FORMAT"]),
        ),
    ];

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    toml::from_str::<Value>(&raw).ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    explicit_source(key_path, env_keys, config_file_doc, config_file_path)
        .unwrap_or_else(|| "default".to_string())
}

fn explicit_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> Option<String> {
    if let Some(env_key) = env_keys.iter().find(|key| env_is_set(key)) {
        return Some(format!("env ({env_key})"));
    }

    let doc = config_file_doc?;
    contains_path(doc, key_path).then(|| {
        let file_path = config_file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        format!("file ({file_path})")
    })
}

/// `GEMINI_API_KEY` only counts when nothing else supplied a key for the
/// Gemini provider.
fn api_key_source(
    config: &AppConfig,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(source) = explicit_source(
        "llm.api_key",
        &["SUPPORTDESK_LLM_API_KEY"],
        config_file_doc,
        config_file_path,
    ) {
        return source;
    }

    if config.llm.api_key.is_some()
        && config.llm.provider == LlmProvider::Gemini
        && env_is_set("GEMINI_API_KEY")
    {
        return "env (GEMINI_API_KEY)".to_string();
    }

    "default".to_string()
}

fn env_is_set(key: &str) -> bool {
    env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false)
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a short vendor prefix such as `sk-` so operators can tell keys
/// apart; everything else is hidden.
fn redact_api_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.split_once('-') {
        Some((prefix, _)) if !prefix.is_empty() && prefix.len() <= 4 => format!("{prefix}-***"),
        _ => "<redacted>".to_string(),
    }
}
