//! The cloud-config data model.
//!
//! Sections are listed in the order in which they are applied. Every key is
//! optional; absent collections are empty and absent scalars are empty
//! strings or `false`.

use crate::command::Command;
use crate::sudo::Sudo;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::HashSet;

/// A cloud-config document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Commands run before anything else
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bootcmd: Vec<Command>,

    /// Refresh the package index before installing packages
    #[serde(skip_serializing_if = "is_false")]
    pub package_update: bool,

    /// Upgrade installed packages before installing packages
    #[serde(skip_serializing_if = "is_false")]
    pub package_upgrade: bool,

    /// Packages to install; duplicates collapse
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,

    /// Files to write
    #[serde(rename = "write_files", skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,

    /// Users to create
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<User>,

    /// Timezone name, e.g. `Europe/Athens`; empty leaves it unset
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timezone: String,

    /// Commands run last
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub runcmd: Vec<Command>,
}

/// A file to write on the target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    /// Absolute target path
    pub path: String,

    /// `user:group`, applied with chown after the write
    #[serde(skip_serializing_if = "String::is_empty")]
    pub owner: String,

    /// Octal mode, e.g. `0600`; 0644 when empty
    #[serde(
        deserialize_with = "mode_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub permissions: String,

    /// File content
    pub content: String,

    /// Append instead of overwrite
    #[serde(skip_serializing_if = "is_false")]
    pub append: bool,

    /// Write after packages, users and timezone instead of before
    #[serde(skip_serializing_if = "is_false")]
    pub defer: bool,
}

/// A user account to create on the target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// Account name
    pub name: String,

    /// Numeric user id
    #[serde(
        deserialize_with = "scalar_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub uid: String,

    /// Login shell
    #[serde(skip_serializing_if = "String::is_empty")]
    pub shell: String,

    /// Home directory; the OS default when empty
    #[serde(skip_serializing_if = "String::is_empty")]
    pub homedir: String,

    /// Do not create the home directory
    #[serde(skip_serializing_if = "is_false")]
    pub no_create_home: bool,

    /// Primary group
    #[serde(skip_serializing_if = "String::is_empty")]
    pub primary_group: String,

    /// Comma-separated supplementary groups
    #[serde(skip_serializing_if = "String::is_empty")]
    pub groups: String,

    /// Full name or comment field
    #[serde(skip_serializing_if = "String::is_empty")]
    pub gecos: String,

    /// Public keys written to `~/.ssh/authorized_keys`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_authorized_keys: Vec<String>,

    /// Privilege escalation rules
    #[serde(skip_serializing_if = "Sudo::is_absent")]
    pub sudo: Sudo,
}

impl User {
    /// Supplementary groups, split on commas and trimmed, empty tokens dropped.
    pub fn group_list(&self) -> Vec<&str> {
        self.groups
            .split(',')
            .map(str::trim)
            .filter(|group| !group.is_empty())
            .collect()
    }
}

impl Config {
    /// Merge another config into this one.
    ///
    /// Scalars keep this config's value unless it is empty. Collections are
    /// appended, and packages are deduplicated in first-seen order.
    pub fn merge(&mut self, other: Config) {
        self.bootcmd.extend(other.bootcmd);
        self.package_update |= other.package_update;
        self.package_upgrade |= other.package_upgrade;
        self.packages.extend(other.packages);
        self.packages = unique(std::mem::take(&mut self.packages));
        self.files.extend(other.files);
        self.users.extend(other.users);
        if self.timezone.is_empty() {
            self.timezone = other.timezone;
        }
        self.runcmd.extend(other.runcmd);
    }

    /// Whether applying this config would do nothing.
    pub fn is_empty(&self) -> bool {
        *self == Config::default()
    }

    /// Files written before packages and users.
    pub fn immediate_files(&self) -> impl Iterator<Item = &File> {
        self.files.iter().filter(|f| !f.defer)
    }

    /// Files written after packages, users and timezone.
    pub fn deferred_files(&self) -> impl Iterator<Item = &File> {
        self.files.iter().filter(|f| f.defer)
    }
}

/// Remove duplicates, keeping the first occurrence of each item.
pub fn unique(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Accept a string or any other scalar (`uid: 1000`) as a string.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a scalar, found {other:?}"
        ))),
    }
}

/// Accept permissions only as text.
///
/// YAML turns `0o644` into the integer 420 and `644` into 644, so an integer
/// no longer says which digits were written. `0644` stays a string.
fn mode_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        other => Err(serde::de::Error::custom(format!(
            "permissions must be an octal string such as \"0644\", found {}",
            serde_yaml::to_string(&other).unwrap_or_default().trim_end()
        ))),
    }
}
