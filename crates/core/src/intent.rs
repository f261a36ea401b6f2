//! Intent categories and the typed inputs each one requires.
//!
//! The reasoning backend proposes a category plus a loose JSON object of
//! extracted fields. [`StructuredInput::from_arguments`] is the single gate
//! that turns that proposal into a typed record; handlers only ever see values
//! that passed it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::{BackendError, ValidationError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Billing,
    Refund,
    GeneralInfo,
    TechSupport,
}

/// Describes one required input field for the backend's extraction step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
}

const BILLING_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "customer_id", description: "Identifier of the customer account" },
    FieldSpec { name: "billing_issue", description: "Short description of the billing problem" },
];

const REFUND_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "order_id", description: "Identifier of the order to refund" },
    FieldSpec { name: "refund_reason", description: "Why the customer wants a refund" },
];

const GENERAL_INFO_FIELDS: &[FieldSpec] = &[FieldSpec {
    name: "topic",
    description: "Subject of the question, e.g. shipping, accounts, policies",
}];

const TECH_SUPPORT_FIELDS: &[FieldSpec] =
    &[FieldSpec { name: "issue", description: "Description of the technical problem" }];

impl IntentCategory {
    pub const ALL: [IntentCategory; 4] =
        [Self::Billing, Self::Refund, Self::GeneralInfo, Self::TechSupport];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Billing => "billing",
            Self::Refund => "refund",
            Self::GeneralInfo => "general_info",
            Self::TechSupport => "tech_support",
        }
    }

    pub fn required_fields(&self) -> &'static [FieldSpec] {
        match self {
            Self::Billing => BILLING_FIELDS,
            Self::Refund => REFUND_FIELDS,
            Self::GeneralInfo => GENERAL_INFO_FIELDS,
            Self::TechSupport => TECH_SUPPORT_FIELDS,
        }
    }

    /// Whether requests in this category go to a human unless configured
    /// otherwise. Technical problems are the only sensitive category we route.
    pub fn sensitive_by_default(&self) -> bool {
        match self {
            Self::Billing | Self::Refund | Self::GeneralInfo => false,
            Self::TechSupport => true,
        }
    }

    /// JSON schema advertised to the reasoning backend for field extraction.
    pub fn input_schema(&self) -> Value {
        let fields = self.required_fields();
        let properties = fields
            .iter()
            .map(|field| {
                (
                    field.name.to_string(),
                    json!({ "type": "string", "description": field.description }),
                )
            })
            .collect::<Map<String, Value>>();
        let required = fields.iter().map(|field| field.name).collect::<Vec<_>>();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentCategory {
    type Err = BackendError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| BackendError::UnhandledCategory { name: value.to_string() })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingInput {
    pub customer_id: String,
    pub billing_issue: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundInput {
    pub order_id: String,
    pub refund_reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralInfoInput {
    pub topic: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechSupportInput {
    pub issue: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum StructuredInput {
    Billing(BillingInput),
    Refund(RefundInput),
    GeneralInfo(GeneralInfoInput),
    TechSupport(TechSupportInput),
}

impl StructuredInput {
    pub fn category(&self) -> IntentCategory {
        match self {
            Self::Billing(_) => IntentCategory::Billing,
            Self::Refund(_) => IntentCategory::Refund,
            Self::GeneralInfo(_) => IntentCategory::GeneralInfo,
            Self::TechSupport(_) => IntentCategory::TechSupport,
        }
    }

    /// Builds the typed input for `category` from best-effort extracted
    /// arguments. Unknown keys are ignored; every declared field must be a
    /// non-blank string free of control characters.
    pub fn from_arguments(
        category: IntentCategory,
        arguments: &Value,
    ) -> Result<Self, ValidationError> {
        let object = arguments.as_object().ok_or(ValidationError::NotAnObject { category })?;
        let fields = FieldReader { category, object };

        let input = match category {
            IntentCategory::Billing => Self::Billing(BillingInput {
                customer_id: fields.required("customer_id")?,
                billing_issue: fields.required("billing_issue")?,
            }),
            IntentCategory::Refund => Self::Refund(RefundInput {
                order_id: fields.required("order_id")?,
                refund_reason: fields.required("refund_reason")?,
            }),
            IntentCategory::GeneralInfo => {
                Self::GeneralInfo(GeneralInfoInput { topic: fields.required("topic")? })
            }
            IntentCategory::TechSupport => {
                Self::TechSupport(TechSupportInput { issue: fields.required("issue")? })
            }
        };

        Ok(input)
    }
}

struct FieldReader<'a> {
    category: IntentCategory,
    object: &'a Map<String, Value>,
}

impl FieldReader<'_> {
    fn required(&self, field: &'static str) -> Result<String, ValidationError> {
        let category = self.category;
        match self.object.get(field) {
            None | Some(Value::Null) => Err(ValidationError::MissingField { category, field }),
            Some(Value::String(value)) => {
                if value.trim().is_empty() {
                    return Err(ValidationError::EmptyField { category, field });
                }
                if value.chars().any(char::is_control) {
                    return Err(ValidationError::ControlCharacter { category, field });
                }
                Ok(value.clone())
            }
            Some(other) => Err(ValidationError::WrongType {
                category,
                field,
                expected: "string",
                found: json_type_name(other),
            }),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
