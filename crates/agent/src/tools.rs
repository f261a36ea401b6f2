//! Action tools: one canned confirmation per intent.
//!
//! Every tool is a pure function over already validated input, so the
//! outputs below are the exact strings a customer sees after the handler's
//! narration. [`ToolRegistry`] is where the dispatch table gets each tool's
//! advertised name and description.

use std::collections::BTreeMap;

use supportdesk_core::intent::{
    BillingInput, GeneralInfoInput, IntentCategory, RefundInput, StructuredInput,
    TechSupportInput,
};

pub trait Tool: Send + Sync {
    fn category(&self) -> IntentCategory;
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// `None` when `input` belongs to another category.
    fn execute(&self, input: &StructuredInput) -> Option<String>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BillingStatusTool;

#[derive(Clone, Copy, Debug, Default)]
pub struct RefundStatusTool;

#[derive(Clone, Copy, Debug, Default)]
pub struct GeneralInfoTool;

#[derive(Clone, Copy, Debug, Default)]
pub struct TechSupportTool;

impl Tool for BillingStatusTool {
    fn category(&self) -> IntentCategory {
        IntentCategory::Billing
    }

    fn name(&self) -> &'static str {
        "billing_status_tool"
    }

    fn description(&self) -> &'static str {
        "Handles customer billing inquiries."
    }

    fn execute(&self, input: &StructuredInput) -> Option<String> {
        match input {
            StructuredInput::Billing(data) => Some(billing_status_tool(data)),
            _ => None,
        }
    }
}

impl Tool for RefundStatusTool {
    fn category(&self) -> IntentCategory {
        IntentCategory::Refund
    }

    fn name(&self) -> &'static str {
        "refund_status_tool"
    }

    fn description(&self) -> &'static str {
        "Handles refund requests."
    }

    fn execute(&self, input: &StructuredInput) -> Option<String> {
        match input {
            StructuredInput::Refund(data) => Some(refund_status_tool(data)),
            _ => None,
        }
    }
}

impl Tool for GeneralInfoTool {
    fn category(&self) -> IntentCategory {
        IntentCategory::GeneralInfo
    }

    fn name(&self) -> &'static str {
        "general_info_tool"
    }

    fn description(&self) -> &'static str {
        "Provides general FAQs and information."
    }

    fn execute(&self, input: &StructuredInput) -> Option<String> {
        match input {
            StructuredInput::GeneralInfo(data) => Some(general_info_tool(data)),
            _ => None,
        }
    }
}

impl Tool for TechSupportTool {
    fn category(&self) -> IntentCategory {
        IntentCategory::TechSupport
    }

    fn name(&self) -> &'static str {
        "tech_support_tool"
    }

    fn description(&self) -> &'static str {
        "Handles technical support queries."
    }

    fn execute(&self, input: &StructuredInput) -> Option<String> {
        match input {
            StructuredInput::TechSupport(data) => Some(tech_support_tool(data)),
            _ => None,
        }
    }
}

/// At most one tool per category, iterated in category order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<IntentCategory, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn standard() -> Self {
        let mut registry = Self::default();
        registry.register(BillingStatusTool);
        registry.register(RefundStatusTool);
        registry.register(GeneralInfoTool);
        registry.register(TechSupportTool);
        registry
    }

    /// Replaces any tool already registered for the same category.
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.category(), Box::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, category: IntentCategory) -> Option<&dyn Tool> {
        self.tools.get(&category).map(Box::as_ref)
    }

    pub fn tools(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.values().map(Box::as_ref)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools().map(|tool| tool.name()).collect()
    }

    pub fn missing_categories(&self) -> Vec<IntentCategory> {
        IntentCategory::ALL
            .into_iter()
            .filter(|category| !self.tools.contains_key(category))
            .collect()
    }

    pub fn execute(&self, input: &StructuredInput) -> Option<String> {
        self.get(input.category())?.execute(input)
    }
}

pub fn billing_status_tool(data: &BillingInput) -> String {
    format!(
        "Billing for Customer ID {} regarding '{}' has been cleared successfully.",
        data.customer_id, data.billing_issue
    )
}

pub fn refund_status_tool(data: &RefundInput) -> String {
    format!(
        "Refund for Order ID {} has been processed successfully due to: {}.",
        data.order_id, data.refund_reason
    )
}

pub fn general_info_tool(data: &GeneralInfoInput) -> String {
    format!("Here is the information you requested about '{}'.", data.topic)
}

pub fn tech_support_tool(data: &TechSupportInput) -> String {
    format!("Here are some steps to troubleshoot your issue with '{}'.", data.issue)
}
