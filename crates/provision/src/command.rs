//! Commands as written in `bootcmd` and `runcmd`.
//!
//! A command is either a shell script (a YAML string, fed to `/bin/sh` on
//! stdin) or an argument vector (a YAML sequence, executed directly with no
//! shell involved). Sequences may mix scalars; numbers and booleans are
//! converted to their textual form, so `["echo", 1]` runs `echo 1`.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;
use std::fmt;

/// A single command to run on the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Script text passed to `/bin/sh` on standard input
    Script(String),
    /// Program and arguments, `args[0]` being the program
    Args(Vec<String>),
}

impl Command {
    /// Create a script command.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::Script(script.into())
    }

    /// Create an argument-vector command.
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Args(args.into_iter().map(Into::into).collect())
    }

    /// The script text, if this is a script command.
    pub fn script(&self) -> Option<&str> {
        match self {
            Self::Script(script) => Some(script),
            Self::Args(_) => None,
        }
    }

    /// The argument vector, if this is an argument-vector command.
    pub fn args(&self) -> Option<&[String]> {
        match self {
            Self::Script(_) => None,
            Self::Args(args) => Some(args),
        }
    }

    /// Resolve a YAML value into a command.
    ///
    /// A string is a script; a sequence of scalars is an argument vector.
    /// Anything else is rejected.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(script) => Ok(Self::Script(script.clone())),
            Value::Sequence(items) => items
                .iter()
                .map(scalar_to_string)
                .collect::<Option<Vec<_>>>()
                .map(Self::Args)
                .ok_or_else(|| {
                    Error::InvalidCommand(format!(
                        "argument list must contain only scalars: {}",
                        describe(value)
                    ))
                }),
            other => Err(Error::InvalidCommand(format!(
                "expected a string or a list, found {}",
                describe(other)
            ))),
        }
    }
}

/// Canonical text of a scalar argument.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn describe(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("{value:?}"))
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script(script) => write!(f, "{script}"),
            Self::Args(args) => write!(f, "{}", args.join(" ")),
        }
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Command {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Script(script) => serializer.serialize_str(script),
            Self::Args(args) => serializer.collect_seq(args),
        }
    }
}
