//! The `condition` step
//!
//! Evaluates one nested condition and records the outcome as a property.

use crate::condition::{Condition, ConditionBuilder, ConditionContainer, Environment, EvalContext};
use crate::config;
use crate::error::{ConditionError, ConditionResult};
use crate::runner::Properties;

/// Single-shot driver: evaluate once, write `value` or `else`
#[derive(Debug, Clone)]
pub struct ConditionTask {
    pub property: String,
    pub value: String,
    pub else_value: Option<String>,
    pub condition: Condition,
}

impl ConditionTask {
    /// Exactly one nested condition and a property name are required
    pub fn new(
        property: impl Into<String>,
        conditions: ConditionContainer,
    ) -> ConditionResult<Self> {
        let condition = conditions.into_single("condition")?;
        let property = property.into();
        if property.is_empty() {
            return Err(ConditionError::config("The property attribute is required."));
        }

        Ok(ConditionTask {
            property,
            value: "true".to_string(),
            else_value: None,
            condition,
        })
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_else(mut self, value: impl Into<String>) -> Self {
        self.else_value = Some(value.into());
        self
    }

    /// Build the step from its configuration, expanding attributes first
    pub fn from_config(
        step: &config::ConditionTask,
        builder: &ConditionBuilder<'_>,
        properties: &Properties,
    ) -> ConditionResult<Self> {
        let conditions = builder.container(&step.test)?;
        let property = match &step.property {
            Some(name) => properties.expand(name)?,
            None => String::new(),
        };

        let mut task = ConditionTask::new(property, conditions)?;
        if let Some(value) = &step.value {
            task = task.with_value(properties.expand(value)?);
        }
        if let Some(value) = &step.else_value {
            task = task.with_else(properties.expand(value)?);
        }
        Ok(task)
    }

    /// Evaluate without touching the property store
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> ConditionResult<bool> {
        self.condition.evaluate(ctx)
    }

    /// Evaluate, then set the property (write-once) from the outcome
    pub fn execute(
        &self,
        properties: &mut Properties,
        environment: &Environment,
    ) -> ConditionResult<bool> {
        let holds = self.evaluate(&EvalContext::new(properties, environment))?;

        let value = if holds {
            Some(self.value.as_str())
        } else {
            self.else_value.as_deref()
        };

        match value {
            Some(value) => {
                log::debug!(
                    "Condition {}; setting {} to {}",
                    if holds { "true" } else { "false" },
                    self.property,
                    value
                );
                properties.set_new(self.property.as_str(), value);
            }
            None => log::debug!("Condition false; not setting {}", self.property),
        }
        Ok(holds)
    }
}
