//! Target and step execution
//!
//! Steps keep their configuration form until they run: attribute values may
//! reference properties that earlier steps define.

use crate::config;
use crate::error::{ExecutionError, Result};
use crate::runner::{ConditionTask, Context, Properties, WaitFor};
use crate::ui::{self, EchoLevel};

/// Runtime target representation
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,

    /// Description shown by `--projecthelp`
    pub description: Option<String>,

    /// Targets that must run first, in declaration order
    pub depends: Vec<String>,

    /// Only run when this property is set
    pub if_property: Option<String>,

    /// Skip when this property is set
    pub unless_property: Option<String>,

    pub steps: Vec<config::Step>,
}

impl Target {
    /// Create a target from configuration
    pub fn from_config(name: impl Into<String>, config: config::Target) -> Self {
        Target {
            name: name.into(),
            description: config.description,
            depends: config.depends,
            if_property: config.if_property,
            unless_property: config.unless_property,
            steps: config.steps,
        }
    }

    /// Why the target would be skipped with the given properties, if at all
    pub fn skip_reason(&self, properties: &Properties) -> Result<Option<String>> {
        skip_reason(
            self.if_property.as_deref(),
            self.unless_property.as_deref(),
            properties,
        )
    }

    /// Run the steps of this target, unless it already ran or is gated off
    pub fn execute(&self, ctx: &mut Context) -> Result<()> {
        if !ctx.mark_executed(&self.name) {
            log::debug!("Target '{}' has already been executed", self.name);
            return Ok(());
        }

        ui::target_header(&self.name, ctx.verbosity);

        if let Some(reason) = self.skip_reason(&ctx.properties)? {
            log::info!("Skipped target '{}' because {}", self.name, reason);
            return Ok(());
        }

        for step in &self.steps {
            execute_step(step, ctx)?;
        }
        Ok(())
    }
}

/// Evaluate `if`/`unless` property gates
fn skip_reason(
    if_property: Option<&str>,
    unless_property: Option<&str>,
    properties: &Properties,
) -> Result<Option<String>> {
    if let Some(name) = if_property {
        let name = properties.expand(name)?;
        if !properties.contains(&name) {
            return Ok(Some(format!("property '{}' not set", name)));
        }
    }
    if let Some(name) = unless_property {
        let name = properties.expand(name)?;
        if properties.contains(&name) {
            return Ok(Some(format!("property '{}' set", name)));
        }
    }
    Ok(None)
}

/// Execute a single step
pub fn execute_step(step: &config::Step, ctx: &mut Context) -> Result<()> {
    if let Some(task) = &step.condition {
        let task = ConditionTask::from_config(task, &ctx.builder(), &ctx.properties)?;
        task.execute(&mut ctx.properties, &ctx.environment)?;
    } else if let Some(waitfor) = &step.waitfor {
        let waitfor = WaitFor::from_config(waitfor, &ctx.builder(), &ctx.properties)?;
        let outcome = waitfor.execute(&mut ctx.properties, &ctx.environment)?;
        if !outcome.is_satisfied() {
            log::warn!(
                "waitfor timed out after {} checks (max wait {:?})",
                outcome.polls(),
                waitfor.max_wait
            );
        }
    } else if let Some(property) = &step.property {
        execute_property(property, &mut ctx.properties)?;
    } else if let Some(echo) = &step.echo {
        execute_echo(echo, ctx)?;
    } else if let Some(fail) = &step.fail {
        execute_fail(fail, ctx)?;
    }
    Ok(())
}

fn execute_property(property: &config::PropertyDef, properties: &mut Properties) -> Result<()> {
    let name = properties.expand(&property.name)?;
    let value = match &property.value {
        Some(value) => properties.expand(value)?,
        None => {
            return Err(ExecutionError::MissingAttribute {
                step: "property".to_string(),
                name: "value".to_string(),
            }
            .into())
        }
    };
    properties.set_new(name, value);
    Ok(())
}

fn execute_echo(echo: &config::Echo, ctx: &Context) -> Result<()> {
    let message = match &echo.message {
        Some(message) => ctx.properties.expand(message)?,
        None => String::new(),
    };
    let level = match &echo.level {
        Some(level) => {
            let level = ctx.properties.expand(level)?;
            level
                .parse::<EchoLevel>()
                .map_err(|error| ExecutionError::InvalidAttribute {
                    name: "level".to_string(),
                    value: level.clone(),
                    error,
                })?
        }
        None => EchoLevel::default(),
    };
    ui::echo(level, &message, ctx.verbosity);
    Ok(())
}

fn execute_fail(fail: &config::Fail, ctx: &Context) -> Result<()> {
    let gates = skip_reason(
        fail.if_property.as_deref(),
        fail.unless_property.as_deref(),
        &ctx.properties,
    )?;
    if gates.is_some() {
        return Ok(());
    }

    if !fail.test.is_empty() {
        let condition = ctx.builder().container(&fail.test)?.into_single("fail")?;
        if !condition.evaluate(&ctx.eval_context())? {
            return Ok(());
        }
    }

    let message = match &fail.message {
        Some(message) => ctx.properties.expand(message)?,
        None => "No message".to_string(),
    };
    Err(ExecutionError::Fail(message).into())
}
