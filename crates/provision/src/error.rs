//! Error types for provisioning operations.
//!
//! Errors fall into two categories: configuration errors, detected before
//! or at the point of use, and execution errors, reported by the backend
//! while effects are being applied. Neither is retried.

use std::path::PathBuf;
use thiserror::Error;

/// Categories of provisioning errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The configuration (or the OS selection) cannot be applied as written
    Configuration,
    /// A subprocess or file-system operation failed on the target
    Execution,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration error",
            Self::Execution => "Execution error",
        }
    }
}

/// Errors that can occur while parsing or applying a cloud-config.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation needs an OS provider but none was selected
    #[error("{action}.  Missing OS")]
    MissingOs {
        /// What could not be done, e.g. "cannot install packages"
        action: &'static str,
    },

    /// The OS name is not one of the built-in providers
    #[error("unrecognized OS: {0:?}.  accepted values are alpine, debian")]
    UnknownOs(String),

    /// A command is neither a script nor an argument list
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// A command argument list has no program
    #[error("empty command")]
    EmptyCommand,

    /// A file owner is not of the form `user:group`
    #[error("invalid owner (user:group): {0}")]
    InvalidOwner(String),

    /// A sudo value cannot be turned into privilege rules
    #[error("invalid sudo value: {0}")]
    InvalidSudo(String),

    /// A file permission string is not an octal mode
    #[error("invalid permissions {value:?}: {source}")]
    InvalidPermissions {
        /// The permission string as written in the config
        value: String,
        /// Why it failed to parse
        #[source]
        source: std::num::ParseIntError,
    },

    /// The document does not start with the `#cloud-config` line
    #[error("does not start with {}", crate::parse::COMMENT)]
    MissingComment,

    /// YAML syntax or shape error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A process could not be started
    #[error("failed to execute {command}: {source}")]
    Spawn {
        /// The program that failed to start
        command: String,
        /// The underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// A process ran but exited unsuccessfully
    #[error("command failed: {command}: {status}")]
    CommandFailed {
        /// The command line (or "sh" for scripts)
        command: String,
        /// The exit status as reported by the OS
        status: String,
    },

    /// A user account is not present in the password database
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// An error while reading or applying a specific config file
    #[error("{}: {source}", .path.display())]
    ConfigFile {
        /// The config file being processed
        path: PathBuf,
        /// The wrapped error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::MissingOs { .. }
            | Error::UnknownOs(_)
            | Error::InvalidCommand(_)
            | Error::EmptyCommand
            | Error::InvalidOwner(_)
            | Error::InvalidSudo(_)
            | Error::InvalidPermissions { .. }
            | Error::MissingComment
            | Error::Yaml(_) => ErrorCategory::Configuration,
            Error::Io(_)
            | Error::Spawn { .. }
            | Error::CommandFailed { .. }
            | Error::UnknownUser(_) => ErrorCategory::Execution,
            Error::ConfigFile { source, .. } => source.category(),
        }
    }

    /// Wrap this error with the config file it came from.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Error::ConfigFile {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;
