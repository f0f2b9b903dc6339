//! Integration tests for YAML parsing

mod common;

use common::{create_test_config, create_test_config_in_subdir};
use rant::config::{find_config_file_from, parse_config, parse_config_file, validate_config};
use rant::error::ConfigError;

#[test]
fn test_parse_complete_config() {
    let yaml = r#"
name: my-app
description: Build with conditions
default: dist
basedir: .
environment: env
property-files: [ build.properties ]
properties:
  version: 1.0
  debug: false

targets:
  init:
    description: Detect the platform
    steps:
      - condition:
          property: is.unix
          test:
            os: { family: unix }
      - echo: "Building ${version}"

  wait:
    depends: init
    if: server.url
    steps:
      - waitfor:
          maxwait: 30
          maxwaitunit: second
          timeoutproperty: server.timeout
          test:
            http: { url: "${server.url}" }

  dist:
    depends: "init, wait"
    unless: skip.dist
    steps:
      - fail:
          message: Server did not start
          if: server.timeout
      - property: { name: dist.done, value: true }
"#;

    let config = parse_config(yaml).unwrap();
    validate_config(&config).unwrap();

    assert_eq!(config.name.as_deref(), Some("my-app"));
    assert_eq!(config.environment.as_deref(), Some("env"));
    assert_eq!(config.property_files, vec!["build.properties"]);
    assert_eq!(config.properties.get("version").map(String::as_str), Some("1.0"));
    assert_eq!(config.properties.get("debug").map(String::as_str), Some("false"));

    let dist = &config.targets["dist"];
    assert_eq!(dist.depends, vec!["init", "wait"]);
    assert_eq!(dist.unless_property.as_deref(), Some("skip.dist"));
    assert_eq!(dist.steps[0].kinds(), vec!["fail"]);

    let wait = config.targets["wait"].steps[0].waitfor.as_ref().unwrap();
    assert_eq!(wait.maxwait.as_deref(), Some("30"));
    assert_eq!(wait.test[0].tags(), vec!["http"]);

    let echo = config.targets["init"].steps[1].echo.as_ref().unwrap();
    assert_eq!(echo.message.as_deref(), Some("Building ${version}"));
}

#[test]
fn test_unknown_condition_tag_is_rejected() {
    let yaml = r#"
targets:
  a:
    steps:
      - condition:
          property: p
          test:
            javaversion: { atleast: 9 }
"#;
    assert!(parse_config(yaml).is_err());
}

#[test]
fn test_step_with_two_kinds_is_invalid() {
    let yaml = r#"
targets:
  a:
    steps:
      - echo: hi
        property: { name: p, value: v }
"#;
    let config = parse_config(yaml).unwrap();
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidStep { index: 1, .. }));
}

#[test]
fn test_nested_element_with_two_tags_is_invalid() {
    let yaml = r#"
targets:
  a:
    steps:
      - condition:
          property: p
          test:
            and:
              - isset: { property: a }
                istrue: { value: yes }
"#;
    let config = parse_config(yaml).unwrap();
    let err = validate_config(&config).unwrap_err();
    assert!(err.to_string().contains("isset, istrue"));
}

#[test]
fn test_circular_dependency() {
    let yaml = r#"
targets:
  a: { depends: b }
  b: { depends: c }
  c: { depends: a }
"#;
    let config = parse_config(yaml).unwrap();
    let err = validate_config(&config).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Circular dependency detected: a -> b -> c -> a"
    );
}

#[test]
fn test_parse_config_file_and_discovery() {
    let (_dir, path, sub_dir) = create_test_config_in_subdir("default: a\ntargets: { a: {} }\n");

    let config = parse_config_file(&path).unwrap();
    assert_eq!(config.default.as_deref(), Some("a"));

    let found = find_config_file_from(sub_dir).unwrap();
    assert_eq!(found, path);
}

#[test]
fn test_invalid_yaml() {
    let (_dir, path) = create_test_config("targets: [ this is not a map");
    assert!(parse_config_file(&path).is_err());
}
