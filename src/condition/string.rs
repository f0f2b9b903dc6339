//! String and property predicates
//!
//! `<equals>`, `<contains>`, `<matches>`, `<isset>`, `<istrue>` and `<isfalse>`.

use crate::error::{ConditionError, ConditionResult};
use crate::runner::Properties;
use regex::{Regex, RegexBuilder};

/// Ant's notion of a true attribute value: `on`, `true` or `yes`
pub fn to_boolean(value: &str) -> bool {
    value.eq_ignore_ascii_case("on")
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
}

/// `<equals>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equals {
    pub arg1: String,
    pub arg2: String,
    pub trim: bool,
    pub case_sensitive: bool,
}

impl Equals {
    pub fn new(arg1: impl Into<String>, arg2: impl Into<String>) -> Self {
        Equals {
            arg1: arg1.into(),
            arg2: arg2.into(),
            trim: false,
            case_sensitive: true,
        }
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn evaluate(&self) -> bool {
        let (a, b) = if self.trim {
            (self.arg1.trim(), self.arg2.trim())
        } else {
            (self.arg1.as_str(), self.arg2.as_str())
        };

        if self.case_sensitive {
            a == b
        } else {
            a.to_lowercase() == b.to_lowercase()
        }
    }
}

/// `<contains>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contains {
    pub string: String,
    pub substring: String,
    pub case_sensitive: bool,
}

impl Contains {
    pub fn new(string: impl Into<String>, substring: impl Into<String>) -> Self {
        Contains {
            string: string.into(),
            substring: substring.into(),
            case_sensitive: true,
        }
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn evaluate(&self) -> bool {
        if self.case_sensitive {
            self.string.contains(&self.substring)
        } else {
            self.string
                .to_lowercase()
                .contains(&self.substring.to_lowercase())
        }
    }
}

/// Options for `<matches>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    pub case_sensitive: bool,
    pub multiline: bool,
    pub singleline: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            case_sensitive: true,
            multiline: false,
            singleline: false,
        }
    }
}

/// `<matches>`: the pattern is compiled once, when the node is built
#[derive(Debug, Clone)]
pub struct Matches {
    pub string: String,
    regex: Regex,
}

impl Matches {
    pub fn new(
        string: impl Into<String>,
        pattern: &str,
        options: MatchOptions,
    ) -> ConditionResult<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(!options.case_sensitive)
            .multi_line(options.multiline)
            .dot_matches_new_line(options.singleline)
            .build()
            .map_err(|e| {
                ConditionError::config(format!("Invalid pattern '{}' in matches: {}", pattern, e))
            })?;

        Ok(Matches {
            string: string.into(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn evaluate(&self) -> bool {
        self.regex.is_match(&self.string)
    }
}

/// `<isset>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsSet {
    pub property: String,
}

impl IsSet {
    pub fn new(property: impl Into<String>) -> Self {
        IsSet {
            property: property.into(),
        }
    }

    pub fn evaluate(&self, properties: &Properties) -> bool {
        properties.contains(&self.property)
    }
}

/// `<istrue>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsTrue {
    pub value: String,
}

impl IsTrue {
    pub fn new(value: impl Into<String>) -> Self {
        IsTrue {
            value: value.into(),
        }
    }

    pub fn evaluate(&self) -> bool {
        to_boolean(&self.value)
    }
}

/// `<isfalse>`: anything that is not a true value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsFalse {
    pub value: String,
}

impl IsFalse {
    pub fn new(value: impl Into<String>) -> Self {
        IsFalse {
            value: value.into(),
        }
    }

    pub fn evaluate(&self) -> bool {
        !to_boolean(&self.value)
    }
}
