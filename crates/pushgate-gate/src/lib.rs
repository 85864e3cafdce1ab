//! Push gate orchestration for pre-push validation

pub mod hook_input;
pub mod json;
pub mod orchestrator;
pub mod report;

// Re-exports for convenience
pub use hook_input::{RefUpdate, parse_ref_update, read_ref_updates};
pub use json::{emit_jcs, emit_push_json};
pub use orchestrator::{GateContext, PushGate};
pub use report::{BlockCause, GateCondition, PushReport, RefReport};
