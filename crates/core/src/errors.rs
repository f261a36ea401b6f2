use thiserror::Error;

use crate::intent::IntentCategory;

/// Reply used whenever the extracted fields for a route fail validation.
pub const CLARIFICATION_MESSAGE: &str = "I couldn't understand that request, could you rephrase?";

/// Reply used whenever the reasoning backend fails in any way.
pub const DEGRADED_MESSAGE: &str =
    "I'm sorry, I'm having trouble handling your request right now. Please try again in a moment.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{category} input must be a JSON object")]
    NotAnObject { category: IntentCategory },
    #[error("{category} input is missing required field `{field}`")]
    MissingField { category: IntentCategory, field: &'static str },
    #[error("{category} input field `{field}` must be a {expected}, got {found}")]
    WrongType {
        category: IntentCategory,
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("{category} input field `{field}` must not be empty")]
    EmptyField { category: IntentCategory, field: &'static str },
    #[error("{category} input field `{field}` contains control characters")]
    ControlCharacter { category: IntentCategory, field: &'static str },
}

impl ValidationError {
    pub fn category(&self) -> IntentCategory {
        match self {
            Self::NotAnObject { category }
            | Self::MissingField { category, .. }
            | Self::WrongType { category, .. }
            | Self::EmptyField { category, .. }
            | Self::ControlCharacter { category, .. } => *category,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("reasoning backend timed out after {after_secs}s")]
    Timeout { after_secs: u64 },
    #[error("reasoning backend transport failure: {0}")]
    Transport(String),
    #[error("reasoning backend returned status {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("malformed reasoning backend response: {0}")]
    MalformedResponse(String),
    #[error("reasoning backend selected unknown route `{name}`")]
    UnhandledCategory { name: String },
}

impl BackendError {
    /// Transport hiccups and server-side failures are worth another attempt;
    /// anything the backend said deliberately is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Provider { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout { .. } | Self::MalformedResponse(_) | Self::UnhandledCategory { .. } => {
                false
            }
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl TurnError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => CLARIFICATION_MESSAGE,
            Self::Backend(_) => DEGRADED_MESSAGE,
        }
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::NotAnObject { .. }) => "validation_not_an_object",
            Self::Validation(ValidationError::MissingField { .. }) => "validation_missing_field",
            Self::Validation(ValidationError::WrongType { .. }) => "validation_wrong_type",
            Self::Validation(ValidationError::EmptyField { .. }) => "validation_empty_field",
            Self::Validation(ValidationError::ControlCharacter { .. }) => {
                "validation_control_character"
            }
            Self::Backend(BackendError::Timeout { .. }) => "backend_timeout",
            Self::Backend(BackendError::Transport(_)) => "backend_transport",
            Self::Backend(BackendError::Provider { .. }) => "backend_provider_status",
            Self::Backend(BackendError::MalformedResponse(_)) => "backend_malformed_response",
            Self::Backend(BackendError::UnhandledCategory { .. }) => "backend_unhandled_category",
        }
    }
}
