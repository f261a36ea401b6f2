//! Domain types shared by the support router and its front ends.

pub mod audit;
pub mod config;
pub mod errors;
pub mod intent;

pub use audit::{
    AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink, NoopAuditSink,
};
pub use errors::{
    BackendError, TurnError, ValidationError, CLARIFICATION_MESSAGE, DEGRADED_MESSAGE,
};
pub use intent::{
    BillingInput, FieldSpec, GeneralInfoInput, IntentCategory, RefundInput, StructuredInput,
    TechSupportInput,
};
