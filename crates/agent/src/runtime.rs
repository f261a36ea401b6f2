use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use supportdesk_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink};
use supportdesk_core::config::AppConfig;
use supportdesk_core::errors::{BackendError, TurnError, ValidationError};
use supportdesk_core::intent::{IntentCategory, StructuredInput};
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::conversation::{HandoffContext, TranscriptItem};
use crate::escalation::{EscalationDecision, EscalationPolicy};
use crate::handlers::{self, HandlerResponse};
use crate::handoff::DispatchTable;
use crate::llm::{ReasoningBackend, RoutingDecision, RoutingRequest};

pub const MAIN_AGENT_INSTRUCTIONS: &str = "You are MainSupportAgent. Greet the user warmly, ask how you can assist, and use specialized agents/tools to handle requests about billing, refunds, general info, or technical support. If unsure, ask clarifying questions or escalate politely.";

pub const GREETING_PROMPT: &str = "Hello! Welcome to ACME Corp support. How can I help you today?";

const ROUTER_ACTOR: &str = "support_router";
const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can turn one customer utterance into one reply.
#[async_trait]
pub trait TurnProcessor: Send + Sync {
    async fn process_turn(&self, user_text: &str) -> String;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouterSettings {
    pub backend_timeout: Duration,
    pub instructions: String,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
            instructions: MAIN_AGENT_INSTRUCTIONS.to_string(),
        }
    }
}

impl RouterSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            backend_timeout: Duration::from_secs(config.llm.timeout_secs),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
    Greeting,
    DirectReply(String),
    /// `context` is the transcript the specialist received after its input
    /// filter ran.
    Handled { category: IntentCategory, response: HandlerResponse, context: HandoffContext },
    Escalated { category: IntentCategory, reason_code: &'static str, message: String },
    ClarificationRequested(ValidationError),
    Degraded(BackendError),
}

impl TurnOutcome {
    pub fn reply(&self) -> String {
        match self {
            Self::Greeting => GREETING_PROMPT.to_string(),
            Self::DirectReply(text) => text.clone(),
            Self::Handled { response, .. } => response.render(),
            Self::Escalated { message, .. } => message.clone(),
            Self::ClarificationRequested(error) => {
                TurnError::Validation(error.clone()).user_message().to_string()
            }
            Self::Degraded(error) => TurnError::Backend(error.clone()).user_message().to_string(),
        }
    }

    pub fn category(&self) -> Option<IntentCategory> {
        match self {
            Self::Handled { category, .. } | Self::Escalated { category, .. } => Some(*category),
            Self::ClarificationRequested(error) => Some(error.category()),
            Self::Greeting | Self::DirectReply(_) | Self::Degraded(_) => None,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Greeting => "turn.greeting",
            Self::DirectReply(_) => "turn.direct_reply",
            Self::Handled { .. } => "turn.handled",
            Self::Escalated { .. } => "turn.escalated",
            Self::ClarificationRequested(_) => "turn.clarification_requested",
            Self::Degraded(_) => "turn.degraded",
        }
    }

    fn audit_classification(&self) -> (AuditCategory, AuditOutcome) {
        match self {
            Self::Greeting | Self::DirectReply(_) => {
                (AuditCategory::Routing, AuditOutcome::Success)
            }
            Self::Handled { .. } => (AuditCategory::Dispatch, AuditOutcome::Success),
            Self::Escalated { .. } => (AuditCategory::Escalation, AuditOutcome::Success),
            Self::ClarificationRequested(_) => (AuditCategory::Validation, AuditOutcome::Rejected),
            Self::Degraded(_) => (AuditCategory::Backend, AuditOutcome::Failed),
        }
    }

    fn reason_code(&self) -> Option<&'static str> {
        match self {
            Self::Escalated { reason_code, .. } => Some(*reason_code),
            Self::ClarificationRequested(error) => {
                Some(TurnError::Validation(error.clone()).reason_code())
            }
            Self::Degraded(error) => Some(TurnError::Backend(error.clone()).reason_code()),
            Self::Greeting | Self::DirectReply(_) | Self::Handled { .. } => None,
        }
    }
}

/// Routes each utterance to at most one specialist. Holds only immutable
/// state, so one instance can serve many sessions at once.
#[derive(Clone)]
pub struct SupportRouter {
    backend: Arc<dyn ReasoningBackend>,
    dispatch: Arc<DispatchTable>,
    escalation: EscalationPolicy,
    audit: Arc<dyn AuditSink>,
    settings: RouterSettings,
}

impl SupportRouter {
    pub fn new(backend: Arc<dyn ReasoningBackend>) -> Self {
        Self {
            backend,
            dispatch: Arc::new(DispatchTable::standard()),
            escalation: EscalationPolicy::default(),
            audit: Arc::new(NoopAuditSink),
            settings: RouterSettings::default(),
        }
    }

    pub fn from_config(config: &AppConfig, backend: Arc<dyn ReasoningBackend>) -> Self {
        Self::new(backend)
            .with_escalation_policy(EscalationPolicy::from_config(&config.escalation))
            .with_settings(RouterSettings::from_config(config))
    }

    pub fn with_dispatch_table(mut self, dispatch: Arc<DispatchTable>) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_escalation_policy(mut self, escalation: EscalationPolicy) -> Self {
        self.escalation = escalation;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_settings(mut self, settings: RouterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn dispatch_table(&self) -> &DispatchTable {
        &self.dispatch
    }

    pub async fn process_turn(&self, user_text: &str) -> String {
        self.run_turn(user_text).await.reply()
    }

    /// Never fails: routing, validation and backend errors all become a
    /// recoverable outcome with a customer-facing reply.
    pub async fn run_turn(&self, user_text: &str) -> TurnOutcome {
        let correlation_id = Uuid::new_v4().to_string();
        info!(
            event_name = "turn.received",
            correlation_id = %correlation_id,
            utterance_chars = user_text.chars().count(),
            "customer turn received"
        );

        let outcome = if user_text.trim().is_empty() {
            TurnOutcome::Greeting
        } else {
            match self.route_and_dispatch(&correlation_id, user_text).await {
                Ok(outcome) => outcome,
                Err(TurnError::Validation(error)) => TurnOutcome::ClarificationRequested(error),
                Err(TurnError::Backend(error)) => TurnOutcome::Degraded(error),
            }
        };

        self.record(&correlation_id, &outcome);
        outcome
    }

    async fn route_and_dispatch(
        &self,
        correlation_id: &str,
        utterance: &str,
    ) -> Result<TurnOutcome, TurnError> {
        let request = RoutingRequest {
            instructions: &self.settings.instructions,
            utterance,
            handoffs: self.dispatch.descriptors(),
        };
        let decision = timeout(self.settings.backend_timeout, self.backend.route(&request))
            .await
            .map_err(|_| BackendError::Timeout {
                after_secs: self.settings.backend_timeout.as_secs(),
            })??;

        let (tool_name, arguments) = match decision {
            RoutingDecision::Reply(text) => {
                return Ok(TurnOutcome::DirectReply(sanitize_reply(&text)?));
            }
            RoutingDecision::Handoff { tool_name, arguments } => (tool_name, arguments),
        };

        let descriptor = self.dispatch.resolve(&tool_name)?;
        let input = StructuredInput::from_arguments(descriptor.category, &arguments)?;

        if let EscalationDecision::EscalateToHuman { category, reason_code, user_message } =
            self.escalation.evaluate(descriptor.category)
        {
            return Ok(TurnOutcome::Escalated { category, reason_code, message: user_message });
        }

        let transcript = descriptor.input_filter.apply(vec![
            TranscriptItem::UserMessage(utterance.to_string()),
            TranscriptItem::ToolCall { tool_name: descriptor.tool_name.to_string(), arguments },
        ]);
        let context = HandoffContext::new(correlation_id, transcript);
        let response = handlers::dispatch(&context, input);

        Ok(TurnOutcome::Handled { category: descriptor.category, response, context })
    }

    fn record(&self, correlation_id: &str, outcome: &TurnOutcome) {
        let intent = outcome.category();
        let reason_code = outcome.reason_code();

        match outcome {
            TurnOutcome::Degraded(error) => warn!(
                event_name = outcome.event_type(),
                correlation_id = %correlation_id,
                reason_code = reason_code.unwrap_or_default(),
                error = %error,
                "turn degraded"
            ),
            _ => info!(
                event_name = outcome.event_type(),
                correlation_id = %correlation_id,
                intent = intent.map(|category| category.as_str()).unwrap_or("none"),
                reason_code = reason_code.unwrap_or_default(),
                "turn completed"
            ),
        }

        let (category, audit_outcome) = outcome.audit_classification();
        let mut event = AuditEvent::new(
            correlation_id,
            outcome.event_type(),
            category,
            ROUTER_ACTOR,
            audit_outcome,
        );
        if let Some(intent) = intent {
            event = event.with_intent(intent);
        }
        if let Some(reason_code) = reason_code {
            event = event.with_metadata("reason_code", reason_code);
        }
        if let TurnOutcome::Handled { category, context, .. } = outcome {
            if let Some(descriptor) = self.dispatch.get(*category) {
                event = event.with_metadata("tool_name", descriptor.tool_name);
            }
            event = event.with_metadata("context_items", context.transcript.len().to_string());
        }
        self.audit.emit(event);
    }
}

#[async_trait]
impl TurnProcessor for SupportRouter {
    async fn process_turn(&self, user_text: &str) -> String {
        SupportRouter::process_turn(self, user_text).await
    }
}

/// Drops control characters other than newlines; a reply with nothing left
/// is treated as a malformed backend response.
fn sanitize_reply(text: &str) -> Result<String, BackendError> {
    let cleaned = text.chars().filter(|ch| *ch == '\n' || !ch.is_control()).collect::<String>();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return Err(BackendError::MalformedResponse("backend returned an empty reply".to_string()));
    }

    Ok(cleaned.to_string())
}
