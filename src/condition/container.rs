//! Ordered holder of nested conditions
//!
//! A container only accumulates conditions. Whoever owns it decides how many
//! are allowed and how they combine.

use crate::condition::Condition;
use crate::error::{ConditionError, ConditionResult};
use std::slice;

#[derive(Debug, Clone, Default)]
pub struct ConditionContainer {
    conditions: Vec<Condition>,
}

impl ConditionContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a condition; registration order is evaluation order
    pub fn add(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn count(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Condition> {
        self.conditions.iter()
    }

    /// The only condition, for owners that accept exactly one
    pub fn single(&self, owner: &str) -> ConditionResult<&Condition> {
        check_single(self.count(), owner)?;
        Ok(&self.conditions[0])
    }

    /// Consuming variant of [`single`](Self::single)
    pub fn into_single(self, owner: &str) -> ConditionResult<Condition> {
        check_single(self.count(), owner)?;
        let mut conditions = self.conditions;
        Ok(conditions.remove(0))
    }

    pub fn into_vec(self) -> Vec<Condition> {
        self.conditions
    }
}

fn check_single(count: usize, owner: &str) -> ConditionResult<()> {
    match count {
        0 => Err(ConditionError::MissingCondition {
            owner: owner.to_string(),
        }),
        1 => Ok(()),
        _ => Err(ConditionError::TooManyConditions {
            owner: owner.to_string(),
        }),
    }
}

impl FromIterator<Condition> for ConditionContainer {
    fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
        ConditionContainer {
            conditions: iter.into_iter().collect(),
        }
    }
}

impl Extend<Condition> for ConditionContainer {
    fn extend<I: IntoIterator<Item = Condition>>(&mut self, iter: I) {
        self.conditions.extend(iter);
    }
}

impl<'a> IntoIterator for &'a ConditionContainer {
    type Item = &'a Condition;
    type IntoIter = slice::Iter<'a, Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for ConditionContainer {
    type Item = Condition;
    type IntoIter = std::vec::IntoIter<Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.conditions.into_iter()
    }
}
