//! Specialist handlers. Each one narrates what it is doing and runs the
//! matching action tool; none of them decides which intent applies.

use serde::Serialize;
use supportdesk_core::intent::{
    BillingInput, GeneralInfoInput, IntentCategory, RefundInput, StructuredInput,
    TechSupportInput,
};
use tracing::debug;

use crate::conversation::HandoffContext;
use crate::tools;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HandlerResponse {
    pub narration: &'static str,
    pub tool_result: String,
}

impl HandlerResponse {
    pub fn render(&self) -> String {
        format!("{} {}", self.narration, self.tool_result)
    }
}

pub fn narration(category: IntentCategory) -> &'static str {
    match category {
        IntentCategory::Billing => "Let me check your billing status...",
        IntentCategory::Refund => "Let me process your refund...",
        IntentCategory::GeneralInfo => "Let me get that information for you...",
        IntentCategory::TechSupport => "Let me assist with your technical issue...",
    }
}

pub fn handle_billing(context: &HandoffContext, data: BillingInput) -> HandlerResponse {
    respond(context, IntentCategory::Billing, tools::billing_status_tool(&data))
}

pub fn handle_refund(context: &HandoffContext, data: RefundInput) -> HandlerResponse {
    respond(context, IntentCategory::Refund, tools::refund_status_tool(&data))
}

pub fn handle_general_info(context: &HandoffContext, data: GeneralInfoInput) -> HandlerResponse {
    respond(context, IntentCategory::GeneralInfo, tools::general_info_tool(&data))
}

pub fn handle_tech_support(context: &HandoffContext, data: TechSupportInput) -> HandlerResponse {
    respond(context, IntentCategory::TechSupport, tools::tech_support_tool(&data))
}

/// Consumes the validated input; it is not reused after this call.
pub fn dispatch(context: &HandoffContext, input: StructuredInput) -> HandlerResponse {
    match input {
        StructuredInput::Billing(data) => handle_billing(context, data),
        StructuredInput::Refund(data) => handle_refund(context, data),
        StructuredInput::GeneralInfo(data) => handle_general_info(context, data),
        StructuredInput::TechSupport(data) => handle_tech_support(context, data),
    }
}

fn respond(
    context: &HandoffContext,
    category: IntentCategory,
    tool_result: String,
) -> HandlerResponse {
    debug!(
        event_name = "handoff.handler_invoked",
        correlation_id = %context.correlation_id,
        intent = %category,
        context_items = context.transcript.len(),
        "specialist handler invoked"
    );
    HandlerResponse { narration: narration(category), tool_result }
}
