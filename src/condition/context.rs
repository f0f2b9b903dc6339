//! Evaluation context
//!
//! Everything a predicate may look at besides its own attributes: the
//! property store, the project base directory and the host description.

use crate::condition::os::OsInfo;
use crate::runner::Properties;
use std::env;
use std::path::{Path, PathBuf};

/// The host a build runs on
#[derive(Debug, Clone)]
pub struct Environment {
    /// Directory relative paths are resolved against
    pub basedir: PathBuf,

    /// Operating system description for `<os>`
    pub os: OsInfo,
}

impl Environment {
    /// Describe the running host with the given base directory
    pub fn new(basedir: PathBuf) -> Self {
        Environment {
            basedir,
            os: OsInfo::current(),
        }
    }

    /// Replace the operating system description
    pub fn with_os(mut self, os: OsInfo) -> Self {
        self.os = os;
        self
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

/// Read-only view handed to every predicate for one evaluation
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub properties: &'a Properties,
    pub environment: &'a Environment,
}

impl<'a> EvalContext<'a> {
    pub fn new(properties: &'a Properties, environment: &'a Environment) -> Self {
        EvalContext {
            properties,
            environment,
        }
    }

    pub fn basedir(&self) -> &'a Path {
        &self.environment.basedir
    }

    pub fn os(&self) -> &'a OsInfo {
        &self.environment.os
    }

    pub fn property(&self, name: &str) -> Option<&'a str> {
        self.properties.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_with_os() {
        let env = Environment::new(PathBuf::from("/work"))
            .with_os(OsInfo::new("Linux", "amd64", "6.1", ':'));
        assert_eq!(env.basedir, PathBuf::from("/work"));
        assert_eq!(env.os.name, "linux");
    }

    #[test]
    fn test_context_accessors() {
        let mut props = Properties::new();
        props.set("a", "1");
        let env = Environment::new(PathBuf::from("/work"));

        let ctx = EvalContext::new(&props, &env);
        assert_eq!(ctx.property("a"), Some("1"));
        assert_eq!(ctx.property("b"), None);
        assert_eq!(ctx.basedir(), Path::new("/work"));
    }
}
