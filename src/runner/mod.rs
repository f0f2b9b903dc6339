//! Build execution engine
//!
//! This module holds the property store, the condition-driven steps, and
//! target scheduling.

pub mod condition_task;
pub mod context;
pub mod interpolate;
pub mod project;
pub mod properties;
pub mod target;
pub mod waitfor;

// Re-export main types
pub use condition_task::*;
pub use context::*;
pub use interpolate::*;
pub use project::*;
pub use properties::*;
pub use target::*;
pub use waitfor::*;
