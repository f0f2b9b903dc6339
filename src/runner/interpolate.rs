//! Property expansion for strings
//!
//! This module replaces `${name}` references with property values.

use crate::error::{InterpolationError, InterpolationResult};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Matches `${name}` references
static PROPERTY_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("property reference pattern is valid"));

/// Expansion passes before a reference chain is treated as a cycle
const MAX_DEPTH: usize = 64;

/// Expand `${name}` references in a string
///
/// - References to unknown properties are left in place, as Ant does.
/// - Values that contain references are expanded in turn.
pub fn expand(s: &str, properties: &HashMap<String, String>) -> InterpolationResult<String> {
    let mut result = s.to_string();

    for _ in 0..MAX_DEPTH {
        let mut changed = false;

        let next = PROPERTY_REF
            .replace_all(&result, |caps: &Captures<'_>| {
                match properties.get(&caps[1]) {
                    Some(value) => {
                        changed = true;
                        value.clone()
                    }
                    None => caps[0].to_string(),
                }
            })
            .into_owned();

        if !changed {
            return Ok(next);
        }
        result = next;
    }

    Err(InterpolationError::Recursive(s.to_string()))
}
