//! Main CLI application

use crate::config::find_config_file;
use crate::runner::{Project, Verbosity};
use crate::ui;
use anyhow::{bail, Context as _};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("rant")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run targets of a YAML build file with Ant-style conditions")
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Use the given build file instead of searching for rant.yml"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print warnings and errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print nothing but task output and failures")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Print debugging information")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("define")
                .short('D')
                .value_name("NAME=VALUE")
                .help("Define a property; takes precedence over the build file")
                .action(ArgAction::Append)
                .value_parser(parse_define),
        )
        .arg(
            Arg::new("projecthelp")
                .short('p')
                .long("projecthelp")
                .help("List the targets of the project")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .help("Print a shell completion script")
                .value_parser(value_parser!(Shell)),
        )
        .arg(
            Arg::new("targets")
                .value_name("TARGET")
                .help("Targets to run; the default target when omitted")
                .num_args(0..),
        )
}

/// Parse `-D name=value`
fn parse_define(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, _)) if name.is_empty() => Err(format!("missing property name in '{}'", raw)),
        Some((name, value)) => Ok((name.to_string(), value.to_string())),
        None if raw.is_empty() => Err("missing property name".to_string()),
        None => Ok((raw.to_string(), String::new())),
    }
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("debug") {
        Verbosity::Debug
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Install the logger; `RUST_LOG` overrides the verbosity flags
fn init_logging(verbosity: Verbosity) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(verbosity.log_level())
        .format_timestamp(None)
        .format_target(false)
        .parse_env("RUST_LOG");
    let _ = builder.try_init();
}

fn load_project(matches: &ArgMatches) -> anyhow::Result<Project> {
    let build_file = match matches.get_one::<PathBuf>("file") {
        Some(path) => {
            if !path.is_file() {
                bail!("Buildfile: {} does not exist!", path.display());
            }
            path.clone()
        }
        None => find_config_file()?,
    };

    let defines: Vec<(String, String)> = matches
        .get_many::<(String, String)>("define")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    Project::load(&build_file, &defines)
        .with_context(|| format!("Failed to load build file {}", build_file.display()))
}

fn print_project_help(project: &Project) {
    if let Some(description) = &project.description {
        println!("{}", description);
    }
    println!("{}", "Targets:".bold());
    let width = project
        .target_names()
        .iter()
        .map(|name| name.len())
        .max()
        .unwrap_or(0);
    for (name, description) in project.target_descriptions() {
        println!(" {:width$}  {}", name, description.unwrap_or(""), width = width);
    }
    if let Some(default) = &project.default_target {
        println!("Default target: {}", default);
    }
}

/// Run against already parsed arguments; returns the exit status
pub fn run_with(matches: &ArgMatches) -> i32 {
    if let Some(shell) = matches.get_one::<Shell>("completions") {
        clap_complete::generate(*shell, &mut build_command(), "rant", &mut io::stdout());
        return 0;
    }

    let verbosity = get_verbosity(matches);
    init_logging(verbosity);
    let start = Instant::now();

    let result = load_project(matches).and_then(|project| {
        if matches.get_flag("projecthelp") {
            print_project_help(&project);
            return Ok(false);
        }

        if verbosity >= Verbosity::Normal {
            if let Some(file) = &project.build_file {
                println!("Buildfile: {}", file.display());
            }
        }

        let targets: Vec<String> = matches
            .get_many::<String>("targets")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        project.run(&targets, verbosity)?;
        Ok(true)
    });

    match result {
        Ok(true) => {
            ui::build_successful(start.elapsed(), verbosity);
            0
        }
        Ok(false) => 0,
        Err(e) => {
            ui::build_failed(&format!("{:#}", e), start.elapsed());
            1
        }
    }
}

/// Run the CLI application with the process arguments
pub fn run() -> i32 {
    run_with(&build_command().get_matches())
}
