//! Privilege escalation for provisioned users (sudo and doas).
//!
//! The `sudo` key of a user accepts `false`, `true`, a single rule, or a
//! list of rules. The value is resolved once when the config is parsed.
//!
//! Rule files are written by a shell script that checks, on the target,
//! which of `/etc/sudoers.d` and `/etc/doas.d` exists. The script is safe to
//! run when either, both, or neither directory is present.

use crate::error::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;
use std::fmt::Write as _;

/// Directory holding per-user sudoers rule files.
pub const SUDOERS_DIR: &str = "/etc/sudoers.d";

/// Directory holding per-user doas rule files.
pub const DOAS_DIR: &str = "/etc/doas.d";

/// Rule written for `sudo: true` when sudo is installed.
pub const DEFAULT_SUDO_RULE: &str = "ALL=(ALL) NOPASSWD:ALL";

/// Rule written for `sudo: true` when doas is installed.
pub const DEFAULT_DOAS_RULE: &str = "permit nopass";

/// The `sudo` value of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Sudo {
    /// Key not present
    #[default]
    Absent,
    /// `true` grants full passwordless privilege, `false` grants nothing
    Bool(bool),
    /// A single literal rule
    Rule(String),
    /// A list of literal rules
    Rules(Vec<String>),
}

impl Sudo {
    /// Whether the key was omitted.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Whether any privilege should be configured.
    pub fn is_granted(&self) -> bool {
        !matches!(self, Self::Absent | Self::Bool(false))
    }

    /// The literal rules for this value.
    ///
    /// An empty list means "the default full-privilege rule". Callers must
    /// check [`Sudo::is_granted`] first: `Absent` and `false` also yield an
    /// empty list.
    pub fn rules(&self) -> Vec<String> {
        match self {
            Self::Absent | Self::Bool(_) => Vec::new(),
            Self::Rule(rule) => vec![rule.clone()],
            Self::Rules(rules) => rules.clone(),
        }
    }

    /// Resolve a YAML value into a sudo value.
    ///
    /// Lists must contain only strings; a list with any other element is
    /// rejected as a whole.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(Self::Absent),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::String(rule) => Ok(Self::Rule(rule.clone())),
            Value::Sequence(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(rule) => Ok(rule.clone()),
                    other => Err(Error::InvalidSudo(format!(
                        "rule list must contain only strings, found {other:?}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Rules),
            other => Err(Error::InvalidSudo(format!(
                "cannot convert to string list: {other:?}"
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Sudo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Sudo {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Rule(rule) => serializer.serialize_str(rule),
            Self::Rules(rules) => serializer.collect_seq(rules),
        }
    }
}

/// Path of the sudoers rule file for a user.
pub fn sudoers_file(user: &str) -> String {
    format!("{SUDOERS_DIR}/{user}")
}

/// Path of the doas rule file for a user.
pub fn doas_file(user: &str) -> String {
    format!("{DOAS_DIR}/{user}.conf")
}

/// Render the sudoers lines (`{user} {rule}`) for a user.
pub fn sudoers_lines(user: &str, rules: &[String]) -> String {
    let mut out = String::new();
    if rules.is_empty() {
        let _ = writeln!(out, "{user} {DEFAULT_SUDO_RULE}");
    }
    for rule in rules {
        let _ = writeln!(out, "{user} {rule}");
    }
    out
}

/// Render the doas lines (`{rule} {user}`) for a user.
pub fn doas_lines(user: &str, rules: &[String]) -> String {
    let mut out = String::new();
    if rules.is_empty() {
        let _ = writeln!(out, "{DEFAULT_DOAS_RULE} {user}");
    }
    for rule in rules {
        let _ = writeln!(out, "{rule} {user}");
    }
    out
}

/// Build the script that writes a user's sudo and doas rule files.
///
/// Each block is guarded by a test for its directory, so the choice is
/// made on the target when the script runs. Files are created with mode 0600.
pub fn privilege_script(user: &str, rules: &[String]) -> String {
    let mut script = String::new();
    guarded_block(
        &mut script,
        SUDOERS_DIR,
        &sudoers_file(user),
        &sudoers_lines(user, rules),
    );
    guarded_block(
        &mut script,
        DOAS_DIR,
        &doas_file(user),
        &doas_lines(user, rules),
    );
    script
}

fn guarded_block(script: &mut String, dir: &str, file: &str, lines: &str) {
    let _ = writeln!(script, "if [ -d {dir} ]; then");
    // Quoted delimiter: rules are written literally, no expansion.
    let _ = writeln!(script, "cat <<'END' > {file}");
    script.push_str(lines);
    let _ = writeln!(script, "END");
    let _ = writeln!(script, "chmod 600 {file}");
    let _ = writeln!(script, "fi");
}
