//! Support routing runtime.
//!
//! One [`runtime::SupportRouter`] turn runs a constrained loop:
//! 1. **Routing** (`llm`, `openai`) - the reasoning backend either answers
//!    directly or names one handoff from the [`handoff::DispatchTable`]
//! 2. **Validation** - backend arguments become a typed `StructuredInput`
//! 3. **Escalation** (`escalation`) - sensitive categories go to a human
//! 4. **Dispatch** (`handlers`, `tools`) - one specialist runs its action tool
//!
//! The backend only chooses a route and extracts fields. Validation,
//! escalation and the canned tool outcomes are deterministic.

pub mod conversation;
pub mod escalation;
pub mod handlers;
pub mod handoff;
pub mod llm;
pub mod openai;
pub mod runtime;
pub mod tools;

pub use escalation::{EscalationDecision, EscalationPolicy};
pub use handoff::{DispatchTable, HandoffDescriptor};
pub use llm::{ReasoningBackend, RoutingDecision, RoutingRequest, ScriptedBackend};
pub use openai::OpenAiCompatibleBackend;
pub use runtime::{SupportRouter, TurnOutcome, TurnProcessor};
pub use tools::{Tool, ToolRegistry};
