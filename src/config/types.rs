//! Core configuration types
//!
//! This module defines the data structures that represent a rant.yml build file.
//! Attribute values are kept as raw strings so that `${name}` references can be
//! expanded when the owning step runs.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Top-level build file structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Project description (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Target to run when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Base directory, relative to the build file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basedir: Option<String>,

    /// Prefix under which environment variables are imported as properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// KEY=VALUE files loaded as properties
    #[serde(
        rename = "property-files",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub property_files: Vec<String>,

    /// Properties defined inline
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_scalar_map"
    )]
    pub properties: BTreeMap<String, String>,

    /// Targets defined in the build file
    #[serde(default)]
    pub targets: HashMap<String, Target>,
}

/// A target definition
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    /// Description shown by `--projecthelp`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Targets that must run first
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_depends"
    )]
    pub depends: Vec<String>,

    /// Only run when this property is set
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub if_property: Option<String>,

    /// Skip when this property is set
    #[serde(rename = "unless", default, skip_serializing_if = "Option::is_none")]
    pub unless_property: Option<String>,

    /// Steps to execute
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
}

/// A step inside a target; exactly one field must be set
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Set a property from a condition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionTask>,

    /// Poll a condition until it holds or a timeout elapses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waitfor: Option<WaitFor>,

    /// Define a property
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertyDef>,

    /// Print a message
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_echo"
    )]
    pub echo: Option<Echo>,

    /// Abort the build
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail: Option<Fail>,
}

impl Step {
    /// Tag names of the step kinds that are set
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        if self.condition.is_some() {
            kinds.push("condition");
        }
        if self.waitfor.is_some() {
            kinds.push("waitfor");
        }
        if self.property.is_some() {
            kinds.push("property");
        }
        if self.echo.is_some() {
            kinds.push("echo");
        }
        if self.fail.is_some() {
            kinds.push("fail");
        }
        kinds
    }
}

/// `<condition>` step
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionTask {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub property: Option<String>,

    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub value: Option<String>,

    #[serde(rename = "else", default, deserialize_with = "deserialize_scalar")]
    pub else_value: Option<String>,

    /// Nested conditions (exactly one is required)
    #[serde(default, deserialize_with = "deserialize_conditions")]
    pub test: Vec<Condition>,
}

/// `<waitfor>` step
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WaitFor {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub maxwait: Option<String>,

    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub maxwaitunit: Option<String>,

    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub checkevery: Option<String>,

    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub checkeveryunit: Option<String>,

    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub timeoutproperty: Option<String>,

    /// Nested conditions (exactly one is required)
    #[serde(default, deserialize_with = "deserialize_conditions")]
    pub test: Vec<Condition>,
}

/// `<property>` step
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyDef {
    pub name: String,

    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub value: Option<String>,
}

/// `<echo>` step
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Echo {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub message: Option<String>,

    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub level: Option<String>,
}

/// `<fail>` step
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Fail {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub message: Option<String>,

    #[serde(rename = "if", default, deserialize_with = "deserialize_scalar")]
    pub if_property: Option<String>,

    #[serde(rename = "unless", default, deserialize_with = "deserialize_scalar")]
    pub unless_property: Option<String>,

    /// Optional nested condition; the build fails when it holds
    #[serde(default, deserialize_with = "deserialize_conditions")]
    pub test: Vec<Condition>,
}

/// A condition element; exactly one tag must be set
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_nested"
    )]
    pub and: Option<Vec<Condition>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_nested"
    )]
    pub or: Option<Vec<Condition>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_nested"
    )]
    pub xor: Option<Vec<Condition>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_nested"
    )]
    pub not: Option<Vec<Condition>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub equals: Option<Equals>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<Contains>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<Matches>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub isset: Option<IsSet>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub istrue: Option<Truth>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub isfalse: Option<Truth>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<Os>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<Available>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesmatch: Option<FilesMatch>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub islastmodified: Option<IsLastModified>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptodate: Option<UpToDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket: Option<Socket>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<Http>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub isreachable: Option<IsReachable>,
}

impl Condition {
    /// Tag names that are set on this element
    pub fn tags(&self) -> Vec<&'static str> {
        let present = [
            ("and", self.and.is_some()),
            ("or", self.or.is_some()),
            ("xor", self.xor.is_some()),
            ("not", self.not.is_some()),
            ("equals", self.equals.is_some()),
            ("contains", self.contains.is_some()),
            ("matches", self.matches.is_some()),
            ("isset", self.isset.is_some()),
            ("istrue", self.istrue.is_some()),
            ("isfalse", self.isfalse.is_some()),
            ("os", self.os.is_some()),
            ("available", self.available.is_some()),
            ("filesmatch", self.filesmatch.is_some()),
            ("islastmodified", self.islastmodified.is_some()),
            ("uptodate", self.uptodate.is_some()),
            ("socket", self.socket.is_some()),
            ("http", self.http.is_some()),
            ("isreachable", self.isreachable.is_some()),
        ];
        present
            .iter()
            .filter(|(_, set)| *set)
            .map(|(tag, _)| *tag)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Equals {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub arg1: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub arg2: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub trim: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub casesensitive: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Contains {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub string: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub substring: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub casesensitive: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Matches {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub string: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub pattern: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub casesensitive: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub multiline: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub singleline: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IsSet {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub property: Option<String>,
}

/// Shared shape of `istrue` and `isfalse`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Truth {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Os {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub family: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub arch: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Available {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub file: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "deserialize_scalar")]
    pub file_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub filepath: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub searchparents: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FilesMatch {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub file1: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub file2: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub textfile: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IsLastModified {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub file: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub millis: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub datetime: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub pattern: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpToDate {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub srcfile: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub srcfiles: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub targetfile: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Socket {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub server: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub port: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Http {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub errorsbeginat: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub requestmethod: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub followredirects: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub readtimeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IsReachable {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub host: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub timeout: Option<String>,
}

/// Render a YAML scalar as the attribute string it stands for
fn scalar_to_string(value: serde_yaml::Value) -> Result<Option<String>, String> {
    use serde_yaml::Value;

    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err("attribute values must be strings, numbers or booleans".to_string()),
    }
}

/// Custom deserializer for attributes that accepts any YAML scalar
fn deserialize_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_yaml::Value::deserialize(deserializer)?;
    scalar_to_string(value).map_err(D::Error::custom)
}

/// Custom deserializer for the inline property map
fn deserialize_scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw = BTreeMap::<String, serde_yaml::Value>::deserialize(deserializer)?;
    let mut properties = BTreeMap::new();
    for (name, value) in raw {
        let value = scalar_to_string(value)
            .map_err(|e| D::Error::custom(format!("property '{}': {}", name, e)))?
            .unwrap_or_default();
        properties.insert(name, value);
    }
    Ok(properties)
}

/// Custom deserializer for `depends` that handles lists and comma-separated strings
fn deserialize_depends<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect()),
        Value::Sequence(seq) => {
            let mut names = Vec::new();
            for item in seq {
                let name = String::deserialize(item).map_err(D::Error::custom)?;
                names.push(name);
            }
            Ok(names)
        }
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("depends must be a string or array")),
    }
}

/// Custom deserializer for echo that handles a bare message or a mapping
fn deserialize_echo<'de, D>(deserializer: D) -> Result<Option<Echo>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::Mapping(_) => Echo::deserialize(value)
            .map(Some)
            .map_err(D::Error::custom),
        Value::Null => Ok(Some(Echo::default())),
        other => {
            let message = scalar_to_string(other).map_err(D::Error::custom)?;
            Ok(Some(Echo {
                message,
                level: None,
            }))
        }
    }
}

/// Custom deserializer for nested conditions that handles a single mapping or an array
fn deserialize_conditions<'de, D>(deserializer: D) -> Result<Vec<Condition>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::Mapping(_) => {
            let condition = Condition::deserialize(value).map_err(D::Error::custom)?;
            Ok(vec![condition])
        }
        Value::Sequence(seq) => {
            let mut conditions = Vec::new();
            for item in seq {
                let condition = Condition::deserialize(item).map_err(D::Error::custom)?;
                conditions.push(condition);
            }
            Ok(conditions)
        }
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("a condition must be a mapping or an array of mappings")),
    }
}

/// Same as `deserialize_conditions`, for the optional children of a composite
fn deserialize_nested<'de, D>(deserializer: D) -> Result<Option<Vec<Condition>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_conditions(deserializer).map(Some)
}
