//! Per-turn transcript handed to specialist handlers, plus the filters that
//! trim it before a handoff.

use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum TranscriptItem {
    UserMessage(String),
    AssistantMessage(String),
    ToolCall { tool_name: String, arguments: Value },
    ToolResult { tool_name: String, output: String },
}

impl TranscriptItem {
    pub fn is_tool_item(&self) -> bool {
        matches!(self, Self::ToolCall { .. } | Self::ToolResult { .. })
    }
}

/// Shapes the transcript a specialist sees once a route is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputFilter {
    #[default]
    KeepAll,
    /// Drops every tool call and tool result so the specialist only sees
    /// the conversational messages.
    RemoveAllTools,
}

impl InputFilter {
    pub fn apply(&self, items: Vec<TranscriptItem>) -> Vec<TranscriptItem> {
        match self {
            Self::KeepAll => items,
            Self::RemoveAllTools => items.into_iter().filter(|item| !item.is_tool_item()).collect(),
        }
    }
}

/// What a specialist handler receives alongside its validated input.
#[derive(Clone, Debug, PartialEq)]
pub struct HandoffContext {
    pub correlation_id: String,
    pub transcript: Vec<TranscriptItem>,
}

impl HandoffContext {
    pub fn new(correlation_id: impl Into<String>, transcript: Vec<TranscriptItem>) -> Self {
        Self { correlation_id: correlation_id.into(), transcript }
    }
}
