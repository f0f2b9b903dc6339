//! Project loading and target scheduling

use crate::condition::Environment;
use crate::config::{parse_config_file, validate_config, Config};
use crate::error::{ConfigError, ConfigResult, Result};
use crate::runner::{Context, Properties, Target, Verbosity};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};

/// A loaded build file, ready to run targets
#[derive(Debug, Clone)]
pub struct Project {
    pub name: Option<String>,
    pub description: Option<String>,
    pub default_target: Option<String>,

    /// Directory relative paths resolve against
    pub basedir: PathBuf,

    pub build_file: Option<PathBuf>,
    pub targets: HashMap<String, Target>,

    /// Properties defined before any target runs
    properties: Properties,
}

impl Project {
    /// Parse, validate and load a build file
    pub fn load(build_file: &Path, defines: &[(String, String)]) -> Result<Self> {
        let config = parse_config_file(build_file)?;
        Self::from_config(config, Some(build_file), defines)
    }

    /// Create a project from parsed configuration
    ///
    /// Properties are defined in this order, first definition wins:
    /// `defines` (the command line), the built-in properties, the imported
    /// environment, property files, then the `properties` map.
    pub fn from_config(
        config: Config,
        build_file: Option<&Path>,
        defines: &[(String, String)],
    ) -> Result<Self> {
        validate_config(&config)?;

        let build_dir = match build_file.and_then(Path::parent) {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let build_dir = if build_dir.is_absolute() {
            build_dir
        } else {
            env::current_dir()?.join(build_dir)
        };
        let basedir = match &config.basedir {
            Some(dir) => build_dir.join(dir),
            None => build_dir,
        };

        let mut properties = Properties::new();
        for (name, value) in defines {
            properties.set_new(name.as_str(), value.as_str());
        }

        properties.set_new("basedir", basedir.display().to_string());
        if let Some(file) = build_file {
            properties.set_new("rant.file", file.display().to_string());
        }
        if let Some(name) = &config.name {
            properties.set_new("rant.project.name", name.as_str());
        }

        if let Some(prefix) = &config.environment {
            properties.import_environment(prefix);
        }

        for file in &config.property_files {
            let path = basedir.join(properties.expand(file)?);
            properties.load_file(&path)?;
        }

        load_property_map(&mut properties, &config.properties)?;

        let targets = config
            .targets
            .into_iter()
            .map(|(name, target)| (name.clone(), Target::from_config(name, target)))
            .collect();

        Ok(Project {
            name: config.name,
            description: config.description,
            default_target: config.default,
            basedir,
            build_file: build_file.map(Path::to_path_buf),
            targets,
            properties,
        })
    }

    /// Properties defined before any target runs
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn target(&self, name: &str) -> ConfigResult<&Target> {
        self.targets
            .get(name)
            .ok_or_else(|| ConfigError::TargetNotFound(name.to_string()))
    }

    /// Target names, sorted
    pub fn target_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    /// Sorted target names with their descriptions
    pub fn target_descriptions(&self) -> Vec<(&str, Option<&str>)> {
        self.target_names()
            .into_iter()
            .map(|name| {
                let description = self
                    .targets
                    .get(name)
                    .and_then(|target| target.description.as_deref());
                (name, description)
            })
            .collect()
    }

    /// The requested targets, or the default target when none are requested
    pub fn resolve_targets(&self, requested: &[String]) -> ConfigResult<Vec<String>> {
        if !requested.is_empty() {
            return Ok(requested.to_vec());
        }
        match &self.default_target {
            Some(default) => Ok(vec![default.clone()]),
            None => Err(ConfigError::NoDefaultTarget),
        }
    }

    /// Dependency closure of the requested targets, dependencies first
    ///
    /// Each target appears once, at its first position in a depth-first walk.
    pub fn execution_order(&self, requested: &[String]) -> ConfigResult<Vec<String>> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        for name in self.resolve_targets(requested)? {
            self.visit(&name, &mut visited, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) -> ConfigResult<()> {
        if !visited.insert(name.to_string()) {
            return Ok(());
        }
        let target = self.target(name)?;
        for dependency in &target.depends {
            self.visit(dependency, visited, order)?;
        }
        order.push(name.to_string());
        Ok(())
    }

    /// Fresh execution context seeded with the project properties
    pub fn context(&self) -> Context {
        Context::new(
            self.properties.clone(),
            Environment::new(self.basedir.clone()),
        )
    }

    /// Run the requested targets and their dependencies in `ctx`
    pub fn execute(&self, requested: &[String], ctx: &mut Context) -> Result<()> {
        for name in self.execution_order(requested)? {
            self.target(&name)?.execute(ctx)?;
        }
        Ok(())
    }

    /// Run targets in a fresh context and return it
    pub fn run(&self, requested: &[String], verbosity: Verbosity) -> Result<Context> {
        let mut ctx = self.context().with_verbosity(verbosity);
        self.execute(requested, &mut ctx)?;
        Ok(ctx)
    }
}

/// Define the inline properties
///
/// Values may reference each other regardless of their order in the file.
fn load_property_map(
    properties: &mut Properties,
    map: &BTreeMap<String, String>,
) -> Result<()> {
    let mut defined = Vec::new();
    for (name, value) in map {
        if properties.set_new(name.as_str(), value.as_str()) {
            defined.push(name);
        }
    }
    for name in defined {
        if let Some(raw) = map.get(name.as_str()) {
            let value = properties.expand(raw)?;
            properties.set(name.as_str(), value);
        }
    }
    Ok(())
}
