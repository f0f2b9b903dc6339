//! Rant - Ant-style conditions for YAML build files
//!
//! Rant evaluates boolean condition trees (`and`, `or`, `not` over leaf
//! predicates) and drives them from build steps: `condition` sets a property
//! from a single evaluation, `waitfor` polls until a condition holds or a
//! timeout elapses.

// Public modules
pub mod cli;
pub mod condition;
pub mod config;
pub mod error;
pub mod runner;
pub mod ui;

// Re-export commonly used types
pub use condition::{Condition, ConditionContainer, EvalContext, Predicate};
pub use error::{RantError, Result};

/// Current version of Rant
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
