//! Execution context for a build
//!
//! The context carries the state that steps read and write while targets run:
//! the property store, the host description and the set of targets already
//! executed.

use crate::condition::{ConditionBuilder, Environment, EvalContext};
use crate::runner::Properties;
use std::collections::HashSet;
use std::path::Path;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    #[default]
    Normal = 2,
    Verbose = 3,
    Debug = 4,
}

impl Verbosity {
    /// Log level matching this verbosity
    pub fn log_level(&self) -> log::LevelFilter {
        match self {
            Verbosity::Silent => log::LevelFilter::Error,
            Verbosity::Quiet => log::LevelFilter::Warn,
            Verbosity::Normal => log::LevelFilter::Info,
            Verbosity::Verbose => log::LevelFilter::Debug,
            Verbosity::Debug => log::LevelFilter::Trace,
        }
    }
}

/// State shared by every step of one build invocation
#[derive(Debug, Clone)]
pub struct Context {
    pub properties: Properties,

    pub environment: Environment,

    pub verbosity: Verbosity,

    /// Targets that already ran in this invocation
    executed: HashSet<String>,
}

impl Context {
    pub fn new(properties: Properties, environment: Environment) -> Self {
        Context {
            properties,
            environment,
            verbosity: Verbosity::Normal,
            executed: HashSet::new(),
        }
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn basedir(&self) -> &Path {
        &self.environment.basedir
    }

    /// Builder for condition elements against the current properties
    pub fn builder(&self) -> ConditionBuilder<'_> {
        ConditionBuilder::new(&self.properties, &self.environment.basedir)
    }

    /// View used to evaluate conditions against the current properties
    pub fn eval_context(&self) -> EvalContext<'_> {
        EvalContext::new(&self.properties, &self.environment)
    }

    /// Record a target as executed; false if it already ran
    pub fn mark_executed(&mut self, target: &str) -> bool {
        self.executed.insert(target.to_string())
    }

    pub fn has_executed(&self, target: &str) -> bool {
        self.executed.contains(target)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Properties::new(), Environment::default())
    }
}
