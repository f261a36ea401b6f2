use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use supportdesk_agent::conversation::TranscriptItem;
use supportdesk_agent::escalation::{EscalationPolicy, ESCALATION_MESSAGE};
use supportdesk_agent::llm::{ReasoningBackend, RoutingDecision, RoutingRequest, ScriptedBackend};
use supportdesk_agent::runtime::{
    RouterSettings, SupportRouter, TurnOutcome, TurnProcessor, GREETING_PROMPT,
    MAIN_AGENT_INSTRUCTIONS,
};
use supportdesk_core::audit::{AuditCategory, AuditOutcome, InMemoryAuditSink};
use supportdesk_core::errors::{BackendError, CLARIFICATION_MESSAGE, DEGRADED_MESSAGE};
use supportdesk_core::intent::IntentCategory;

const REFUND_REPLY: &str = "Let me process your refund... Refund for Order ID 123 has been processed successfully due to: damaged.";

fn router_with(decision: RoutingDecision) -> SupportRouter {
    SupportRouter::new(Arc::new(ScriptedBackend::always(decision)))
}

fn refund_handoff() -> RoutingDecision {
    RoutingDecision::handoff(
        "refund_status_tool",
        json!({ "order_id": "123", "refund_reason": "damaged" }),
    )
}

#[derive(Default)]
struct CountingBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl ReasoningBackend for CountingBackend {
    async fn route(&self, _request: &RoutingRequest<'_>) -> Result<RoutingDecision, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RoutingDecision::Reply("How can I help?".to_string()))
    }
}

struct SlowBackend {
    delay: Duration,
}

#[async_trait]
impl ReasoningBackend for SlowBackend {
    async fn route(&self, _request: &RoutingRequest<'_>) -> Result<RoutingDecision, BackendError> {
        tokio::time::sleep(self.delay).await;
        Ok(refund_handoff())
    }
}

#[derive(Default)]
struct RecordingBackend {
    seen: Mutex<Vec<(String, String, Vec<String>)>>,
}

#[async_trait]
impl ReasoningBackend for RecordingBackend {
    async fn route(&self, request: &RoutingRequest<'_>) -> Result<RoutingDecision, BackendError> {
        let tools = request.handoffs.iter().map(|handoff| handoff.tool_name.to_string()).collect();
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((request.instructions.to_string(), request.utterance.to_string(), tools));
        }
        Ok(refund_handoff())
    }
}

/// Routes by keyword so concurrent sessions get different intents.
struct KeywordBackend;

#[async_trait]
impl ReasoningBackend for KeywordBackend {
    async fn route(&self, request: &RoutingRequest<'_>) -> Result<RoutingDecision, BackendError> {
        tokio::task::yield_now().await;
        let decision = if request.utterance.contains("refund") {
            refund_handoff()
        } else {
            RoutingDecision::handoff(
                "general_info_tool",
                json!({ "topic": request.utterance.to_string() }),
            )
        };
        Ok(decision)
    }
}

#[tokio::test]
async fn refund_request_runs_refund_specialist() {
    let router = router_with(refund_handoff());

    let reply = router.process_turn("My order 123 arrived damaged, I want a refund").await;

    assert_eq!(reply, REFUND_REPLY);
}

#[tokio::test]
async fn billing_request_by_category_name_is_handled() {
    let router = router_with(RoutingDecision::handoff(
        "Billing",
        json!({ "customer_id": "C-42", "billing_issue": "double charge" }),
    ));

    let outcome = router.run_turn("I was charged twice").await;

    assert!(matches!(outcome, TurnOutcome::Handled { category: IntentCategory::Billing, .. }));
    assert_eq!(
        outcome.reply(),
        "Let me check your billing status... Billing for Customer ID C-42 regarding 'double charge' has been cleared successfully."
    );
}

#[tokio::test]
async fn general_info_request_is_handled() {
    let router = router_with(RoutingDecision::handoff(
        "general_info_tool",
        json!({ "topic": "opening hours" }),
    ));

    assert_eq!(
        router.process_turn("When are you open?").await,
        "Let me get that information for you... Here is the information you requested about 'opening hours'."
    );
}

#[tokio::test]
async fn refund_specialist_does_not_see_the_routing_tool_call() {
    let router = router_with(refund_handoff());

    let context = match router.run_turn("refund order 123, it arrived damaged").await {
        TurnOutcome::Handled { context, .. } => context,
        other => panic!("expected a handled turn, got {other:?}"),
    };

    assert_eq!(
        context.transcript,
        vec![TranscriptItem::UserMessage("refund order 123, it arrived damaged".to_string())]
    );
}

#[tokio::test]
async fn general_info_specialist_keeps_the_routing_tool_call() {
    let router =
        router_with(RoutingDecision::handoff("general_info_tool", json!({ "topic": "returns" })));

    let context = match router.run_turn("what is your returns policy?").await {
        TurnOutcome::Handled { context, .. } => context,
        other => panic!("expected a handled turn, got {other:?}"),
    };

    assert_eq!(
        context.transcript,
        vec![
            TranscriptItem::UserMessage("what is your returns policy?".to_string()),
            TranscriptItem::ToolCall {
                tool_name: "general_info_tool".to_string(),
                arguments: json!({ "topic": "returns" }),
            },
        ]
    );
}

#[tokio::test]
async fn missing_field_asks_for_clarification() {
    let router = router_with(RoutingDecision::handoff(
        "refund_status_tool",
        json!({ "refund_reason": "damaged" }),
    ));

    let outcome = router.run_turn("refund please").await;

    assert!(matches!(outcome, TurnOutcome::ClarificationRequested(_)));
    assert_eq!(outcome.reply(), CLARIFICATION_MESSAGE);
}

#[tokio::test]
async fn billing_with_blank_customer_and_no_issue_asks_for_clarification() {
    let router =
        router_with(RoutingDecision::handoff("billing_status_tool", json!({ "customer_id": "" })));

    assert_eq!(router.process_turn("billing problem").await, CLARIFICATION_MESSAGE);
}

#[tokio::test]
async fn malformed_arguments_never_reach_a_tool() {
    let cases: Vec<Value> = vec![
        json!("order 123"),
        json!({ "order_id": 123, "refund_reason": "damaged" }),
        json!({ "order_id": "   ", "refund_reason": "damaged" }),
        json!({ "order_id": "12\u{0}3", "refund_reason": "damaged" }),
    ];

    for arguments in cases {
        let router = router_with(RoutingDecision::handoff("refund_status_tool", arguments.clone()));
        let reply = router.process_turn("refund").await;
        assert_eq!(reply, CLARIFICATION_MESSAGE, "arguments: {arguments}");
    }
}

#[tokio::test]
async fn blank_input_greets_without_calling_backend() {
    let backend = Arc::new(CountingBackend::default());
    let router = SupportRouter::new(backend.clone());

    for text in ["", "   ", "\n\t"] {
        assert_eq!(router.process_turn(text).await, GREETING_PROMPT);
    }

    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    assert_eq!(router.process_turn("hi").await, "How can I help?");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn direct_reply_is_sanitized() {
    let router =
        router_with(RoutingDecision::Reply("Hello!\u{7} How can I\r\nhelp?\u{1b}".to_string()));

    assert_eq!(router.process_turn("hello").await, "Hello! How can I\nhelp?");
}

#[tokio::test]
async fn empty_direct_reply_degrades() {
    let router = router_with(RoutingDecision::Reply("\u{0}  ".to_string()));

    let outcome = router.run_turn("hello").await;

    assert!(matches!(outcome, TurnOutcome::Degraded(BackendError::MalformedResponse(_))));
    assert_eq!(outcome.reply(), DEGRADED_MESSAGE);
}

#[tokio::test]
async fn unknown_tool_degrades() {
    let router =
        router_with(RoutingDecision::handoff("legal_agent", json!({ "matter": "lawsuit" })));

    let outcome = router.run_turn("I want to sue you").await;

    assert_eq!(
        outcome,
        TurnOutcome::Degraded(BackendError::UnhandledCategory { name: "legal_agent".to_string() })
    );
    assert_eq!(outcome.reply(), DEGRADED_MESSAGE);
}

#[tokio::test]
async fn backend_errors_degrade() {
    let errors = [
        BackendError::Transport("connection reset".to_string()),
        BackendError::Provider { status: 503, message: "overloaded".to_string() },
        BackendError::MalformedResponse("no choices".to_string()),
    ];

    for error in errors {
        let router = SupportRouter::new(Arc::new(ScriptedBackend::new([Err(error.clone())])));
        assert_eq!(router.run_turn("help").await, TurnOutcome::Degraded(error));
    }
}

#[tokio::test(start_paused = true)]
async fn slow_backend_times_out_and_degrades() {
    let router = SupportRouter::new(Arc::new(SlowBackend { delay: Duration::from_secs(5) }))
        .with_settings(RouterSettings {
            backend_timeout: Duration::from_secs(1),
            ..RouterSettings::default()
        });

    let outcome = router.run_turn("refund order 123").await;

    assert_eq!(outcome, TurnOutcome::Degraded(BackendError::Timeout { after_secs: 1 }));
    assert_eq!(outcome.reply(), DEGRADED_MESSAGE);
}

#[tokio::test]
async fn tech_support_escalates_without_running_the_tool() {
    let router = router_with(RoutingDecision::handoff(
        "tech_support_tool",
        json!({ "issue": "router keeps rebooting" }),
    ));

    let outcome = router.run_turn("my router keeps rebooting").await;

    assert!(matches!(
        outcome,
        TurnOutcome::Escalated { category: IntentCategory::TechSupport, .. }
    ));
    let reply = outcome.reply();
    assert_eq!(reply, ESCALATION_MESSAGE);
    assert!(!reply.contains("troubleshoot"));
    assert!(!reply.contains("router keeps rebooting"));
}

#[tokio::test]
async fn invalid_tech_support_input_is_clarified_before_escalation() {
    let router = router_with(RoutingDecision::handoff("tech_support_tool", json!({})));

    assert_eq!(router.process_turn("it broke").await, CLARIFICATION_MESSAGE);
}

#[tokio::test]
async fn disabling_escalation_lets_tech_support_run() {
    let router = router_with(RoutingDecision::handoff(
        "tech_support_tool",
        json!({ "issue": "wifi drops" }),
    ))
    .with_escalation_policy(EscalationPolicy::new([]));

    assert_eq!(
        router.process_turn("wifi keeps dropping").await,
        "Let me assist with your technical issue... Here are some steps to troubleshoot your issue with 'wifi drops'."
    );
}

#[tokio::test]
async fn configured_sensitive_category_escalates() {
    let router = router_with(refund_handoff())
        .with_escalation_policy(EscalationPolicy::new([IntentCategory::Refund]));

    assert_eq!(router.process_turn("refund order 123").await, ESCALATION_MESSAGE);
}

#[tokio::test]
async fn backend_sees_instructions_utterance_and_every_handoff() {
    let backend = Arc::new(RecordingBackend::default());
    let router = SupportRouter::new(backend.clone());

    router.process_turn("refund order 123").await;

    let seen = backend.seen.lock().map(|seen| seen.clone()).unwrap_or_default();
    assert_eq!(seen.len(), 1);
    let (instructions, utterance, tools) = &seen[0];
    assert_eq!(instructions, MAIN_AGENT_INSTRUCTIONS);
    assert_eq!(utterance, "refund order 123");
    assert_eq!(
        tools,
        &vec![
            "billing_status_tool".to_string(),
            "refund_status_tool".to_string(),
            "general_info_tool".to_string(),
            "tech_support_tool".to_string(),
        ]
    );
}

#[tokio::test]
async fn one_audit_event_per_turn() {
    let audit = InMemoryAuditSink::default();
    let router = SupportRouter::new(Arc::new(ScriptedBackend::new([
        Ok(refund_handoff()),
        Ok(RoutingDecision::handoff("tech_support_tool", json!({ "issue": "crash" }))),
        Ok(RoutingDecision::handoff("refund_status_tool", json!({}))),
        Err(BackendError::Transport("reset".to_string())),
    ])))
    .with_audit_sink(Arc::new(audit.clone()));

    for text in ["refund", "it crashes", "refund again", "anything"] {
        router.process_turn(text).await;
    }

    let events = audit.events();
    let event_types = events.iter().map(|event| event.event_type.as_str()).collect::<Vec<_>>();
    assert_eq!(
        event_types,
        vec!["turn.handled", "turn.escalated", "turn.clarification_requested", "turn.degraded"]
    );

    assert_eq!(events[0].category, AuditCategory::Dispatch);
    assert_eq!(events[0].intent, Some(IntentCategory::Refund));
    assert_eq!(
        events[0].metadata.get("tool_name").map(String::as_str),
        Some("refund_status_tool")
    );
    assert_eq!(events[0].metadata.get("context_items").map(String::as_str), Some("1"));
    assert_eq!(events[1].category, AuditCategory::Escalation);
    assert_eq!(
        events[1].metadata.get("reason_code").map(String::as_str),
        Some("sensitive_category")
    );
    assert_eq!(events[2].outcome, AuditOutcome::Rejected);
    assert_eq!(events[3].outcome, AuditOutcome::Failed);
    assert_eq!(events[3].intent, None);

    let correlation_ids =
        events.iter().map(|event| event.correlation_id.clone()).collect::<BTreeSet<_>>();
    assert_eq!(correlation_ids.len(), events.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn router_serves_concurrent_sessions() {
    let router = Arc::new(SupportRouter::new(Arc::new(KeywordBackend)));

    let mut handles = Vec::new();
    for session in 0..16 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            let text =
                if session % 2 == 0 { "refund".to_string() } else { format!("topic {session}") };
            (session, router.process_turn(&text).await)
        }));
    }

    for handle in handles {
        let (session, reply) = match handle.await {
            Ok(result) => result,
            Err(error) => panic!("session task failed: {error}"),
        };
        if session % 2 == 0 {
            assert_eq!(reply, REFUND_REPLY);
        } else {
            assert!(reply.ends_with(&format!("'topic {session}'.")), "unexpected reply: {reply}");
        }
    }
}

#[tokio::test]
async fn router_is_usable_as_a_turn_processor() {
    let processor: Arc<dyn TurnProcessor> = Arc::new(router_with(refund_handoff()));

    assert_eq!(processor.process_turn("refund").await, REFUND_REPLY);
}
