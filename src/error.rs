//! Error types for Rant

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Rant operations
pub type Result<T> = std::result::Result<T, RantError>;

/// Main error type for Rant
#[derive(Error, Debug)]
pub enum RantError {
    /// Build file errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Condition construction and evaluation errors
    #[error("{0}")]
    Condition(#[from] ConditionError),

    /// Step execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Property expansion errors
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Build file parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find build file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Target '{0}' does not exist in the project")]
    TargetNotFound(String),

    #[error("No target specified and the project has no default target")]
    NoDefaultTarget,

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Step {index} of target '{target}' {problem}")]
    InvalidStep {
        target: String,
        index: usize,
        problem: String,
    },

    #[error("Failed to load property file '{path}': {error}")]
    PropertyFile { path: PathBuf, error: String },
}

/// Errors raised while building or evaluating a condition tree
#[derive(Error, Debug)]
pub enum ConditionError {
    /// A single-condition slot was left empty
    #[error("You must nest a condition into <{owner}>")]
    MissingCondition { owner: String },

    /// A single-condition slot received more than one condition
    #[error("You must not nest more than one condition into <{owner}>")]
    TooManyConditions { owner: String },

    /// Missing, conflicting or malformed attributes
    #[error("{0}")]
    Config(String),

    /// Failure inside a leaf predicate that is not downgraded to `false`
    #[error("{0}")]
    Evaluation(String),
}

impl ConditionError {
    /// Build a configuration error from any message
    pub fn config(message: impl Into<String>) -> Self {
        ConditionError::Config(message.into())
    }

    /// Build an evaluation error from any message
    pub fn evaluation(message: impl Into<String>) -> Self {
        ConditionError::Evaluation(message.into())
    }

    /// Whether this error was detected before any predicate ran
    pub fn is_configuration(&self) -> bool {
        !matches!(self, ConditionError::Evaluation(_))
    }
}

/// Step execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("{0}")]
    Fail(String),

    #[error("<{step}> requires the {name} attribute")]
    MissingAttribute { step: String, name: String },

    #[error("Invalid value '{value}' for attribute '{name}': {error}")]
    InvalidAttribute {
        name: String,
        value: String,
        error: String,
    },
}

/// Property expansion errors
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Recursive property reference in '{0}'")]
    Recursive(String),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for condition operations
pub type ConditionResult<T> = std::result::Result<T, ConditionError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Specialized result type for interpolation operations
pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;

impl From<InterpolationError> for ConditionError {
    fn from(err: InterpolationError) -> Self {
        ConditionError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_messages() {
        let missing = ConditionError::MissingCondition {
            owner: "not".to_string(),
        };
        assert_eq!(missing.to_string(), "You must nest a condition into <not>");

        let many = ConditionError::TooManyConditions {
            owner: "condition".to_string(),
        };
        assert_eq!(
            many.to_string(),
            "You must not nest more than one condition into <condition>"
        );
    }

    #[test]
    fn test_is_configuration() {
        let missing = ConditionError::config("both arg1 and arg2 are required in equals");
        assert!(missing.is_configuration());
        assert!(ConditionError::MissingCondition {
            owner: "waitfor".to_string()
        }
        .is_configuration());
        assert!(!ConditionError::evaluation("boom").is_configuration());
    }
}
