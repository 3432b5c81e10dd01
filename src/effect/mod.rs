//! Async integration for ruleflow validation.
//!
//! This module provides an async façade over the same planner and executor
//! the synchronous [`Validator`](crate::Validator) uses. Each rule is
//! scheduled onto tokio's blocking pool and awaited before the next rule
//! starts, so the caller's task is never blocked while outcomes are still
//! recorded strictly in plan order.
//!
//! # Feature Flag
//!
//! This module is only available when the `effect` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ruleflow::{FnRule, Validator};
//! use ruleflow::effect::AsyncValidator;
//!
//! let validator = Validator::builder()
//!     .rule(FnRule::predicate(|n: &i32| *n > 0).with_id("positive"))
//!     .build()?;
//!
//! let validator = AsyncValidator::new(validator);
//! let result = validator.collect_results(Arc::new(5)).await?;
//! assert!(result.is_valid());
//! ```

pub mod async_validator;

pub use async_validator::AsyncValidator;
