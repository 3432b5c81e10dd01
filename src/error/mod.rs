//! Error types for rule failures, validation results and engine faults.
//!
//! The taxonomy has three layers:
//! - [`RuleError`]: what a single rule returns when it does not pass
//! - [`ValidationError`] / [`ValidationFailure`]: captured failures and their
//!   aggregate, raised only by `throw_if_invalid`
//! - [`EngineError`] / [`CycleError`]: problems with the rule set itself or
//!   with the run (cancellation), kept distinct from invalid input

mod engine_error;
mod rule_error;
mod validation_error;

pub use engine_error::{CycleError, EngineError};
pub use rule_error::RuleError;
pub use validation_error::{FailureScope, ValidationError, ValidationFailure};
