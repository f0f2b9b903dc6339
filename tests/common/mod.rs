//! Common test utilities
#![allow(dead_code)]

use rant::config::parse_config;
use rant::runner::{Context, Project, Verbosity};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory with a rant.yml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("rant.yml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Create a test config with an empty subdirectory next to it
pub fn create_test_config_in_subdir(content: &str) -> (TempDir, PathBuf, PathBuf) {
    let (temp_dir, config_path) = create_test_config(content);
    let sub_dir = temp_dir.path().join("subdir");
    fs::create_dir(&sub_dir).unwrap();
    (temp_dir, config_path, sub_dir)
}

/// Load a project from YAML with no build file on disk
pub fn project(yaml: &str) -> Project {
    Project::from_config(parse_config(yaml).unwrap(), None, &[]).unwrap()
}

/// Run targets silently and return the final context
pub fn run_targets(project: &Project, targets: &[&str]) -> rant::Result<Context> {
    let targets: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
    project.run(&targets, Verbosity::Silent)
}
