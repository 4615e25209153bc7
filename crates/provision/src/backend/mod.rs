//! Backend abstraction for side effects on the target.
//!
//! The [`Backend`] trait is the only way the configurer touches the system:
//! running scripts and programs, writing files and checking for them. This
//! allows for different implementations (the local host, an in-memory
//! recorder for tests and dry runs).

pub mod local;
pub mod recording;

pub use local::LocalBackend;
pub use recording::{Operation, RecordingBackend};

use crate::error::Result;
use crate::sudo;
use std::path::{Path, PathBuf};

/// Backend trait for provisioning effects.
///
/// File primitives never create parent directories; the configurer
/// creates them explicitly before writing.
pub trait Backend {
    /// Run a script with `/bin/sh`, passing the text on standard input.
    fn run_script(&self, script: &str) -> Result<()>;

    /// Run `args[0]` with the remaining arguments, without a shell.
    ///
    /// Callers guarantee that `args` is not empty.
    fn run_command(&self, args: &[String]) -> Result<()>;

    /// Create or truncate a file and write `data` to it.
    ///
    /// `mode` applies when the file is created.
    fn write_file(&self, path: &Path, data: &[u8], mode: u32) -> Result<()>;

    /// Append `data` to a file, creating it with `mode` if needed.
    fn append_file(&self, path: &Path, data: &[u8], mode: u32) -> Result<()>;

    /// Check whether a file exists.
    ///
    /// A missing file is `Ok(false)`; only unexpected failures are errors.
    fn file_exists(&self, path: &Path) -> Result<bool>;

    /// Resolve a user's home directory.
    ///
    /// The default assumes the usual layout: `/root` for root and
    /// `/home/{username}` for everyone else.
    fn user_home_dir(&self, username: &str) -> Result<PathBuf> {
        Ok(default_home_dir(username))
    }

    /// Install sudo and doas rules for a user.
    ///
    /// An empty `rules` list means full passwordless privilege. The default
    /// runs [`sudo::privilege_script`], which decides on the target which
    /// rule directories to populate.
    fn apply_sudo(&self, username: &str, rules: &[String]) -> Result<()> {
        self.run_script(&sudo::privilege_script(username, rules))
    }
}

impl<B: Backend + ?Sized> Backend for &B {
    fn run_script(&self, script: &str) -> Result<()> {
        (**self).run_script(script)
    }

    fn run_command(&self, args: &[String]) -> Result<()> {
        (**self).run_command(args)
    }

    fn write_file(&self, path: &Path, data: &[u8], mode: u32) -> Result<()> {
        (**self).write_file(path, data, mode)
    }

    fn append_file(&self, path: &Path, data: &[u8], mode: u32) -> Result<()> {
        (**self).append_file(path, data, mode)
    }

    fn file_exists(&self, path: &Path) -> Result<bool> {
        (**self).file_exists(path)
    }

    fn user_home_dir(&self, username: &str) -> Result<PathBuf> {
        (**self).user_home_dir(username)
    }

    fn apply_sudo(&self, username: &str, rules: &[String]) -> Result<()> {
        (**self).apply_sudo(username, rules)
    }
}

/// Home directory assumed when the backend cannot look one up.
pub fn default_home_dir(username: &str) -> PathBuf {
    if username == "root" {
        PathBuf::from("/root")
    } else {
        Path::new("/home").join(username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_home_dir() {
        assert_eq!(default_home_dir("root"), PathBuf::from("/root"));
        assert_eq!(default_home_dir("alice"), PathBuf::from("/home/alice"));
    }

    #[test]
    fn test_default_apply_sudo_runs_privilege_script() {
        let backend = RecordingBackend::new();
        let rules = vec!["permit persist".to_string()];
        backend.apply_sudo("bob", &rules).unwrap();

        assert_eq!(
            backend.operations(),
            vec![Operation::Script(sudo::privilege_script("bob", &rules))]
        );
    }

    #[test]
    fn test_reference_forwards() {
        let backend = RecordingBackend::new();
        let by_ref = &backend;
        by_ref.run_script("true").unwrap();
        assert_eq!(
            by_ref.user_home_dir("carol").unwrap(),
            PathBuf::from("/home/carol")
        );
        assert_eq!(backend.operations().len(), 1);
    }
}
