//! The router's dispatch table: one [`HandoffDescriptor`] per intent.

use std::collections::BTreeSet;

use serde_json::Value;
use supportdesk_core::errors::BackendError;
use supportdesk_core::intent::{FieldSpec, IntentCategory};
use thiserror::Error;

use crate::conversation::InputFilter;
use crate::tools::{Tool, ToolRegistry};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandoffDescriptor {
    pub category: IntentCategory,
    pub tool_name: &'static str,
    pub agent_name: &'static str,
    pub description: &'static str,
    pub input_filter: InputFilter,
}

impl HandoffDescriptor {
    /// Takes the advertised name and description from `tool`.
    pub fn from_tool(tool: &dyn Tool) -> Self {
        let category = tool.category();
        let (agent_name, input_filter) = match category {
            IntentCategory::Billing => ("billing_agent", InputFilter::RemoveAllTools),
            IntentCategory::Refund => ("refund_agent", InputFilter::RemoveAllTools),
            IntentCategory::GeneralInfo => ("info_agent", InputFilter::KeepAll),
            IntentCategory::TechSupport => ("tech_support_agent", InputFilter::RemoveAllTools),
        };

        Self {
            category,
            tool_name: tool.name(),
            agent_name,
            description: tool.description(),
            input_filter,
        }
    }

    pub fn required_fields(&self) -> &'static [FieldSpec] {
        self.category.required_fields()
    }

    pub fn input_schema(&self) -> Value {
        self.category.input_schema()
    }

    fn answers_to(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(self.tool_name)
            || name.eq_ignore_ascii_case(self.category.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DispatchTableError {
    #[error("category `{0}` is registered more than once")]
    DuplicateCategory(IntentCategory),
    #[error("tool name `{0}` is registered more than once")]
    DuplicateToolName(String),
    #[error("category `{0}` has no handoff")]
    MissingCategory(IntentCategory),
}

/// Immutable after construction; shared across sessions behind an `Arc`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchTable {
    descriptors: Vec<HandoffDescriptor>,
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl DispatchTable {
    /// Requires exactly one descriptor per category and unique tool names.
    pub fn new(descriptors: Vec<HandoffDescriptor>) -> Result<Self, DispatchTableError> {
        let mut categories = BTreeSet::new();
        let mut tool_names = BTreeSet::new();
        for descriptor in &descriptors {
            if !categories.insert(descriptor.category) {
                return Err(DispatchTableError::DuplicateCategory(descriptor.category));
            }
            if !tool_names.insert(descriptor.tool_name.to_ascii_lowercase()) {
                return Err(DispatchTableError::DuplicateToolName(descriptor.tool_name.to_string()));
            }
        }

        if let Some(missing) =
            IntentCategory::ALL.into_iter().find(|category| !categories.contains(category))
        {
            return Err(DispatchTableError::MissingCategory(missing));
        }

        Ok(Self { descriptors })
    }

    pub fn standard() -> Self {
        Self { descriptors: descriptors_for(&ToolRegistry::standard()) }
    }

    pub fn from_registry(registry: &ToolRegistry) -> Result<Self, DispatchTableError> {
        Self::new(descriptors_for(registry))
    }

    pub fn descriptors(&self) -> &[HandoffDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, category: IntentCategory) -> Option<&HandoffDescriptor> {
        self.descriptors.iter().find(|descriptor| descriptor.category == category)
    }

    /// Maps the route name chosen by the backend (tool name or canonical
    /// category name) onto its descriptor.
    pub fn resolve(&self, name: &str) -> Result<&HandoffDescriptor, BackendError> {
        let name = name.trim();
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.answers_to(name))
            .ok_or_else(|| BackendError::UnhandledCategory { name: name.to_string() })
    }
}

fn descriptors_for(registry: &ToolRegistry) -> Vec<HandoffDescriptor> {
    registry.tools().map(HandoffDescriptor::from_tool).collect()
}
