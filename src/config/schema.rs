//! Build file validation
//!
//! This module checks the structure of a build file before anything runs.
//! Condition attributes are validated later, when the owning step builds its
//! condition tree, because they may reference properties set at run time.

use crate::config::types::{Condition, Config, Step};
use crate::error::{ConfigError, ConfigResult};
use std::collections::HashSet;

/// Validate a complete build file
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    if let Some(default) = &config.default {
        if !config.targets.contains_key(default) {
            return Err(ConfigError::TargetNotFound(default.clone()));
        }
    }

    for (name, target) in &config.targets {
        for dependency in &target.depends {
            if !config.targets.contains_key(dependency) {
                return Err(ConfigError::Invalid(format!(
                    "Target '{}' does not exist in the project, it is used from target '{}'",
                    dependency, name
                )));
            }
        }

        for (index, step) in target.steps.iter().enumerate() {
            validate_step(name, index + 1, step)?;
        }
    }

    detect_circular_dependencies(config)?;

    Ok(())
}

/// Validate a single step: exactly one kind, and well-formed nested conditions
pub fn validate_step(target: &str, index: usize, step: &Step) -> ConfigResult<()> {
    let invalid = |problem: String| ConfigError::InvalidStep {
        target: target.to_string(),
        index,
        problem,
    };

    let kinds = step.kinds();
    match kinds.len() {
        0 => return Err(invalid("does not name a step kind".to_string())),
        1 => {}
        _ => {
            return Err(invalid(format!(
                "names more than one step kind: {}",
                kinds.join(", ")
            )))
        }
    }

    let nested = if let Some(task) = &step.condition {
        &task.test
    } else if let Some(task) = &step.waitfor {
        &task.test
    } else if let Some(task) = &step.fail {
        &task.test
    } else {
        return Ok(());
    };

    for condition in nested {
        validate_condition(condition).map_err(invalid)?;
    }

    Ok(())
}

/// Check that every element of a condition tree names exactly one tag
fn validate_condition(condition: &Condition) -> Result<(), String> {
    let tags = condition.tags();
    match tags.len() {
        0 => return Err("contains a condition element without a tag".to_string()),
        1 => {}
        _ => {
            return Err(format!(
                "contains a condition element with several tags: {}",
                tags.join(", ")
            ))
        }
    }

    let children = [&condition.and, &condition.or, &condition.xor, &condition.not];
    for child in children.into_iter().flatten().flatten() {
        validate_condition(child)?;
    }

    Ok(())
}

/// Detect circular dependencies between targets
fn detect_circular_dependencies(config: &Config) -> ConfigResult<()> {
    let mut names: Vec<&String> = config.targets.keys().collect();
    names.sort();

    let mut visited = HashSet::new();
    for name in names {
        let mut stack = Vec::new();
        check_target_cycle(config, name, &mut visited, &mut stack)?;
    }
    Ok(())
}

/// Recursively check for cycles in target dependencies
fn check_target_cycle(
    config: &Config,
    target_name: &str,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
) -> ConfigResult<()> {
    if stack.iter().any(|name| name == target_name) {
        stack.push(target_name.to_string());
        return Err(ConfigError::CircularDependency(stack.join(" -> ")));
    }

    if visited.contains(target_name) {
        return Ok(());
    }

    let target = config
        .targets
        .get(target_name)
        .ok_or_else(|| ConfigError::TargetNotFound(target_name.to_string()))?;

    stack.push(target_name.to_string());

    for dependency in &target.depends {
        check_target_cycle(config, dependency, visited, stack)?;
    }

    stack.pop();
    visited.insert(target_name.to_string());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_validate_valid_config() {
        let config = parse_config(
            r#"
default: build
targets:
  init:
    steps:
      - property: { name: ready, value: "yes" }
  build:
    depends: init
    steps:
      - condition:
          property: ok
          test:
            and:
              - isset: { property: ready }
              - not:
                  - istrue: { value: "${skip}" }
"#,
        )
        .unwrap();

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_missing_default_target() {
        let config = parse_config(
            r#"
default: nope
targets:
  build: {}
"#,
        )
        .unwrap();

        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::TargetNotFound(name)) if name == "nope"));
    }

    #[test]
    fn test_unknown_dependency() {
        let config = parse_config(
            r#"
targets:
  build:
    depends: [compile]
"#,
        )
        .unwrap();

        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_detect_circular_dependency() {
        let config = parse_config(
            r#"
targets:
  a:
    depends: b
  b:
    depends: a
"#,
        )
        .unwrap();

        let result = validate_config(&config);
        assert!(matches!(
            result,
            Err(ConfigError::CircularDependency(ref chain)) if chain == "a -> b -> a"
        ));
    }

    #[test]
    fn test_step_without_kind() {
        let config = parse_config(
            r#"
targets:
  build:
    steps:
      - {}
"#,
        )
        .unwrap();

        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidStep { index: 1, .. })
        ));
    }

    #[test]
    fn test_step_with_two_kinds() {
        let config = parse_config(
            r#"
targets:
  build:
    steps:
      - echo: hi
        property: { name: a, value: b }
"#,
        )
        .unwrap();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("more than one step kind"));
    }

    #[test]
    fn test_condition_element_with_two_tags() {
        let config = parse_config(
            r#"
targets:
  build:
    steps:
      - condition:
          property: x
          test:
            or:
              - isset: { property: a }
                istrue: { value: "true" }
"#,
        )
        .unwrap();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("several tags: isset, istrue"));
    }
}
