//! The `waitfor` step
//!
//! Polls one nested condition until it holds or the maximum wait elapses.
//! Polling happens on the calling thread; the build blocks while waiting.

use crate::condition::{Condition, ConditionBuilder, ConditionContainer, Environment, EvalContext};
use crate::config;
use crate::error::{ConditionError, ConditionResult};
use crate::runner::Properties;
use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};

/// Default maximum wait, in `maxwaitunit`
pub const DEFAULT_MAX_WAIT: u64 = 180_000;

/// Default interval between polls, in `checkeveryunit`
pub const DEFAULT_CHECK_EVERY: u64 = 500;

/// Unit of `maxwait` and `checkevery`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    #[default]
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl TimeUnit {
    pub fn millis(&self) -> u64 {
        match self {
            TimeUnit::Millisecond => 1,
            TimeUnit::Second => 1_000,
            TimeUnit::Minute => 60_000,
            TimeUnit::Hour => 3_600_000,
            TimeUnit::Day => 86_400_000,
            TimeUnit::Week => 604_800_000,
        }
    }

    /// `amount` of this unit, saturating on overflow
    pub fn duration(&self, amount: u64) -> Duration {
        Duration::from_millis(amount.saturating_mul(self.millis()))
    }

    fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Millisecond => "millisecond",
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "millisecond" => Ok(TimeUnit::Millisecond),
            "second" => Ok(TimeUnit::Second),
            "minute" => Ok(TimeUnit::Minute),
            "hour" => Ok(TimeUnit::Hour),
            "day" => Ok(TimeUnit::Day),
            "week" => Ok(TimeUnit::Week),
            _ => Err(ConditionError::config(format!(
                "{} is not a legal value for this attribute",
                s
            ))),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The condition held on poll number `polls`
    Satisfied { polls: u32 },
    /// The deadline passed after `polls` evaluations
    TimedOut { polls: u32 },
}

impl WaitOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied { .. })
    }

    pub fn polls(&self) -> u32 {
        match self {
            WaitOutcome::Satisfied { polls } | WaitOutcome::TimedOut { polls } => *polls,
        }
    }
}

/// Polling driver
#[derive(Debug, Clone)]
pub struct WaitFor {
    pub max_wait: Duration,
    pub check_every: Duration,
    pub timeout_property: Option<String>,
    pub condition: Condition,
}

impl WaitFor {
    /// Exactly one nested condition is required
    pub fn new(conditions: ConditionContainer) -> ConditionResult<Self> {
        Ok(WaitFor {
            max_wait: TimeUnit::Millisecond.duration(DEFAULT_MAX_WAIT),
            check_every: TimeUnit::Millisecond.duration(DEFAULT_CHECK_EVERY),
            timeout_property: None,
            condition: conditions.into_single("waitfor")?,
        })
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_check_every(mut self, check_every: Duration) -> Self {
        self.check_every = check_every;
        self
    }

    pub fn with_timeout_property(mut self, property: impl Into<String>) -> Self {
        self.timeout_property = Some(property.into());
        self
    }

    /// Build the step from its configuration, expanding attributes first
    pub fn from_config(
        step: &config::WaitFor,
        builder: &ConditionBuilder<'_>,
        properties: &Properties,
    ) -> ConditionResult<Self> {
        let expand = |value: &Option<String>| -> ConditionResult<Option<String>> {
            match value {
                Some(raw) => Ok(Some(properties.expand(raw)?)),
                None => Ok(None),
            }
        };
        let unit = |value: &Option<String>| -> ConditionResult<TimeUnit> {
            match expand(value)? {
                Some(name) => name.parse(),
                None => Ok(TimeUnit::default()),
            }
        };
        let amount = |value: &Option<String>, name: &str, default: u64| -> ConditionResult<u64> {
            match expand(value)? {
                Some(number) => number.trim().parse().map_err(|_| {
                    ConditionError::config(format!(
                        "Invalid value '{}' for attribute {} of <waitfor>",
                        number, name
                    ))
                }),
                None => Ok(default),
            }
        };

        let max_wait = unit(&step.maxwaitunit)?
            .duration(amount(&step.maxwait, "maxwait", DEFAULT_MAX_WAIT)?);
        let check_every = unit(&step.checkeveryunit)?
            .duration(amount(&step.checkevery, "checkevery", DEFAULT_CHECK_EVERY)?);

        let mut waitfor = WaitFor::new(builder.container(&step.test)?)?
            .with_max_wait(max_wait)
            .with_check_every(check_every);
        if let Some(property) = expand(&step.timeoutproperty)?.filter(|p| !p.is_empty()) {
            waitfor = waitfor.with_timeout_property(property);
        }
        Ok(waitfor)
    }

    /// Poll until the condition holds or `max_wait` has elapsed
    ///
    /// The condition is evaluated, then the driver sleeps `check_every`, for
    /// as long as the deadline lies in the future. A zero `max_wait` times
    /// out without evaluating at all.
    pub fn wait(&self, ctx: &EvalContext<'_>) -> ConditionResult<WaitOutcome> {
        let start = Instant::now();
        // an unrepresentable deadline waits forever
        let deadline = start.checked_add(self.max_wait);
        let mut polls = 0;

        while deadline.map_or(true, |deadline| Instant::now() < deadline) {
            polls += 1;
            if self.condition.evaluate(ctx)? {
                log::debug!(
                    "waitfor: condition was met after {} ms ({} polls)",
                    start.elapsed().as_millis(),
                    polls
                );
                return Ok(WaitOutcome::Satisfied { polls });
            }
            thread::sleep(self.check_every);
        }

        log::debug!("waitfor: timeout after {} polls", polls);
        Ok(WaitOutcome::TimedOut { polls })
    }

    /// Wait, then set the timeout property if the deadline passed
    pub fn execute(
        &self,
        properties: &mut Properties,
        environment: &Environment,
    ) -> ConditionResult<WaitOutcome> {
        let outcome = self.wait(&EvalContext::new(properties, environment))?;
        if let (WaitOutcome::TimedOut { .. }, Some(property)) = (outcome, &self.timeout_property) {
            properties.set_new(property.as_str(), "true");
        }
        Ok(outcome)
    }
}
