//! Console output for builds
//!
//! Diagnostics go through `log`; this module prints what the user asked the
//! build to say, gated by [`Verbosity`].

use crate::runner::Verbosity;
use colored::Colorize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// `level` attribute of `<echo>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoLevel {
    Error,
    Warning,
    #[default]
    Info,
    Verbose,
    Debug,
}

impl EchoLevel {
    /// Lowest verbosity at which messages of this level are shown
    pub fn threshold(&self) -> Verbosity {
        match self {
            EchoLevel::Error | EchoLevel::Warning => Verbosity::Quiet,
            EchoLevel::Info => Verbosity::Normal,
            EchoLevel::Verbose => Verbosity::Verbose,
            EchoLevel::Debug => Verbosity::Debug,
        }
    }
}

impl FromStr for EchoLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(EchoLevel::Error),
            "warning" | "warn" => Ok(EchoLevel::Warning),
            "info" => Ok(EchoLevel::Info),
            "verbose" => Ok(EchoLevel::Verbose),
            "debug" => Ok(EchoLevel::Debug),
            _ => Err(format!("{} is not a legal value for this attribute", s)),
        }
    }
}

impl fmt::Display for EchoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EchoLevel::Error => "error",
            EchoLevel::Warning => "warning",
            EchoLevel::Info => "info",
            EchoLevel::Verbose => "verbose",
            EchoLevel::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// Print the header that opens a target
pub fn target_header(name: &str, verbosity: Verbosity) {
    if verbosity >= Verbosity::Normal {
        println!("\n{}:", name.bold());
    }
}

/// Print an `<echo>` message
pub fn echo(level: EchoLevel, message: &str, verbosity: Verbosity) {
    if verbosity < level.threshold() {
        return;
    }
    let prefix = "     [echo]".dimmed();
    match level {
        EchoLevel::Error => eprintln!("{} {}", prefix, message.red()),
        EchoLevel::Warning => eprintln!("{} {}", prefix, message.yellow()),
        _ => println!("{} {}", prefix, message),
    }
}

/// Print the closing banner of a successful build
pub fn build_successful(elapsed: Duration, verbosity: Verbosity) {
    if verbosity >= Verbosity::Normal {
        println!("\n{}", "BUILD SUCCESSFUL".green().bold());
        println!("Total time: {}", format_duration(elapsed));
    }
}

/// Print the closing banner of a failed build; shown at every verbosity
pub fn build_failed(error: &str, elapsed: Duration) {
    eprintln!("\n{}", "BUILD FAILED".red().bold());
    eprintln!("{}", error);
    eprintln!("\nTotal time: {}", format_duration(elapsed));
}

/// `1 second`, `2.35 seconds`, `1 minute 5 seconds`
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 60 {
        let minutes = secs / 60;
        let rest = secs % 60;
        format!(
            "{} minute{} {} second{}",
            minutes,
            plural(minutes),
            rest,
            plural(rest)
        )
    } else if elapsed.subsec_millis() == 0 {
        format!("{} second{}", secs, plural(secs))
    } else {
        format!("{:.2} seconds", elapsed.as_secs_f64())
    }
}

fn plural(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
