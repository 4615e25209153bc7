//! In-memory backend that records operations instead of performing them.
//!
//! Used as the test double for the configurer and for `apply --dry-run`.

use crate::backend::Backend;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// A single recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `run_script`
    Script(String),
    /// `run_command`
    Command(Vec<String>),
    /// `write_file`
    Write {
        /// Target path
        path: PathBuf,
        /// File content
        data: Vec<u8>,
        /// File mode
        mode: u32,
    },
    /// `append_file`
    Append {
        /// Target path
        path: PathBuf,
        /// Appended content
        data: Vec<u8>,
        /// File mode
        mode: u32,
    },
}

impl Operation {
    /// The argument vector, if this is a command.
    pub fn args(&self) -> Option<&[String]> {
        match self {
            Self::Command(args) => Some(args),
            _ => None,
        }
    }

    /// The path written, if this is a file operation.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Write { path, .. } | Self::Append { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script(script) => {
                let newline = if script.ends_with('\n') { "" } else { "\n" };
                write!(f, "script << ---\n{script}{newline}---")
            }
            Self::Command(args) => write!(f, "{}", args.join(" ")),
            Self::Write { path, data, mode } => {
                let size = data.len();
                write!(f, "write {} ({mode:04o}, {size} bytes)", path.display())
            }
            Self::Append { path, data, mode } => {
                let size = data.len();
                write!(f, "append {} ({mode:04o}, {size} bytes)", path.display())
            }
        }
    }
}

/// Backend that records every call.
///
/// Written paths are remembered, so `file_exists` reports them as present
/// afterwards, the way a real file system would.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    operations: Mutex<Vec<Operation>>,
    existing: Mutex<HashSet<PathBuf>>,
    fail_on: Option<String>,
}

impl RecordingBackend {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `path` as already present on the target.
    #[must_use]
    pub fn with_existing(self, path: impl Into<PathBuf>) -> Self {
        lock(&self.existing).insert(path.into());
        self
    }

    /// Fail any operation whose rendering contains `needle`.
    ///
    /// The failing operation is still recorded.
    #[must_use]
    pub fn fail_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    /// All operations recorded so far.
    pub fn operations(&self) -> Vec<Operation> {
        lock(&self.operations).clone()
    }

    /// Recorded operations, rendered one per entry.
    pub fn rendered(&self) -> Vec<String> {
        lock(&self.operations).iter().map(ToString::to_string).collect()
    }

    /// Drop the recorded operations, keeping the known paths.
    pub fn clear(&self) {
        lock(&self.operations).clear();
    }

    fn record(&self, operation: Operation) -> Result<()> {
        let rendered = operation.to_string();
        lock(&self.operations).push(operation);
        match &self.fail_on {
            Some(needle) if rendered.contains(needle.as_str()) => Err(Error::CommandFailed {
                command: rendered,
                status: "simulated failure".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl Backend for RecordingBackend {
    fn run_script(&self, script: &str) -> Result<()> {
        self.record(Operation::Script(script.to_string()))
    }

    fn run_command(&self, args: &[String]) -> Result<()> {
        self.record(Operation::Command(args.to_vec()))
    }

    fn write_file(&self, path: &Path, data: &[u8], mode: u32) -> Result<()> {
        self.record(Operation::Write {
            path: path.to_path_buf(),
            data: data.to_vec(),
            mode,
        })?;
        lock(&self.existing).insert(path.to_path_buf());
        Ok(())
    }

    fn append_file(&self, path: &Path, data: &[u8], mode: u32) -> Result<()> {
        self.record(Operation::Append {
            path: path.to_path_buf(),
            data: data.to_vec(),
            mode,
        })?;
        lock(&self.existing).insert(path.to_path_buf());
        Ok(())
    }

    fn file_exists(&self, path: &Path) -> Result<bool> {
        Ok(lock(&self.existing).contains(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let backend = RecordingBackend::new();
        backend.run_script("echo hi\n").unwrap();
        backend.run_command(&["ls".to_string(), "/".to_string()]).unwrap();

        assert_eq!(
            backend.operations(),
            vec![
                Operation::Script("echo hi\n".to_string()),
                Operation::Command(vec!["ls".to_string(), "/".to_string()]),
            ]
        );
        assert_eq!(backend.rendered()[1], "ls /");
    }

    #[test]
    fn test_written_paths_exist() {
        let backend = RecordingBackend::new().with_existing("/etc/hosts");
        let path = Path::new("/etc/motd");

        assert!(backend.file_exists(Path::new("/etc/hosts")).unwrap());
        assert!(!backend.file_exists(path).unwrap());
        backend.write_file(path, b"hi", 0o644).unwrap();
        assert!(backend.file_exists(path).unwrap());
    }

    #[test]
    fn test_fail_on() {
        let backend = RecordingBackend::new().fail_on("apk");
        backend.run_script("echo ok").unwrap();
        let err = backend.run_script("apk add git").unwrap_err();

        assert!(matches!(err, Error::CommandFailed { .. }));
        assert_eq!(backend.operations().len(), 2);
    }

    #[test]
    fn test_display() {
        let write = Operation::Write {
            path: PathBuf::from("/etc/motd"),
            data: b"hello".to_vec(),
            mode: 0o600,
        };
        assert_eq!(write.to_string(), "write /etc/motd (0600, 5 bytes)");
        assert_eq!(write.path(), Some(Path::new("/etc/motd")));
        assert_eq!(write.args(), None);
    }
}
