use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use supportdesk_core::errors::BackendError;

use crate::handoff::HandoffDescriptor;

/// Everything the backend needs to pick a route for one utterance.
#[derive(Clone, Copy, Debug)]
pub struct RoutingRequest<'a> {
    pub instructions: &'a str,
    pub utterance: &'a str,
    pub handoffs: &'a [HandoffDescriptor],
}

#[derive(Clone, Debug, PartialEq)]
pub enum RoutingDecision {
    Reply(String),
    Handoff { tool_name: String, arguments: Value },
}

impl RoutingDecision {
    pub fn handoff(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self::Handoff { tool_name: tool_name.into(), arguments }
    }
}

#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    async fn route(&self, request: &RoutingRequest<'_>) -> Result<RoutingDecision, BackendError>;
}

/// Replays a fixed queue of decisions; the last one repeats once the queue
/// drains.
#[derive(Debug)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<RoutingDecision, BackendError>>>,
}

impl ScriptedBackend {
    pub fn new(script: impl IntoIterator<Item = Result<RoutingDecision, BackendError>>) -> Self {
        Self { script: Mutex::new(script.into_iter().collect()) }
    }

    pub fn always(decision: RoutingDecision) -> Self {
        Self::new([Ok(decision)])
    }
}

#[async_trait]
impl ReasoningBackend for ScriptedBackend {
    async fn route(&self, _request: &RoutingRequest<'_>) -> Result<RoutingDecision, BackendError> {
        let mut script = match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if script.len() > 1 {
            if let Some(next) = script.pop_front() {
                return next;
            }
        }
        script.front().cloned().unwrap_or_else(|| {
            Err(BackendError::MalformedResponse("scripted backend has no responses".to_string()))
        })
    }
}
