//! Backend that applies effects to the local host.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::sudo::{self, DOAS_DIR, SUDOERS_DIR};
use log::debug;
use std::ffi::{CStr, CString, OsStr};
use std::fs::{OpenOptions, Permissions};
use std::io::{self, Write};
use std::mem::MaybeUninit;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::ptr;

const SHELL: &str = "/bin/sh";

/// Mode of rule files written by [`LocalBackend::apply_sudo`].
const RULE_FILE_MODE: u32 = 0o400;

/// Backend that runs commands and writes files on the running host.
///
/// Commands inherit stdin, stdout and stderr. Scripts get their text on stdin.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    sudoers_dir: PathBuf,
    doas_dir: PathBuf,
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBackend {
    /// Create a backend using the standard rule directories.
    pub fn new() -> Self {
        Self {
            sudoers_dir: PathBuf::from(SUDOERS_DIR),
            doas_dir: PathBuf::from(DOAS_DIR),
        }
    }

    /// Use different sudoers and doas rule directories.
    pub fn with_privilege_dirs(
        sudoers_dir: impl Into<PathBuf>,
        doas_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sudoers_dir: sudoers_dir.into(),
            doas_dir: doas_dir.into(),
        }
    }

    fn open(&self, path: &Path, append: bool, mode: u32) -> Result<std::fs::File> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).mode(mode);
        if append {
            options.append(true);
        } else {
            options.truncate(true);
        }
        Ok(options.open(path)?)
    }
}

impl Backend for LocalBackend {
    fn run_script(&self, script: &str) -> Result<()> {
        let mut child = Command::new(SHELL)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                command: SHELL.to_string(),
                source,
            })?;

        // A script that exits before reading all of its input closes the pipe
        let written = match child.stdin.take() {
            Some(mut stdin) => match stdin.write_all(script.as_bytes()) {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            },
            None => Ok(()),
        };
        let status = child.wait()?;
        check_status(SHELL, status)?;
        written.map_err(Error::from)
    }

    fn run_command(&self, args: &[String]) -> Result<()> {
        let (program, rest) = args.split_first().ok_or(Error::EmptyCommand)?;
        let status = Command::new(program)
            .args(rest)
            .status()
            .map_err(|source| Error::Spawn {
                command: program.clone(),
                source,
            })?;
        check_status(&args.join(" "), status)
    }

    /// The mode is also set on files that already exist.
    fn write_file(&self, path: &Path, data: &[u8], mode: u32) -> Result<()> {
        let mut file = self.open(path, false, mode)?;
        file.write_all(data)?;
        file.set_permissions(Permissions::from_mode(mode))?;
        Ok(())
    }

    fn append_file(&self, path: &Path, data: &[u8], mode: u32) -> Result<()> {
        self.open(path, true, mode)?.write_all(data)?;
        Ok(())
    }

    fn file_exists(&self, path: &Path) -> Result<bool> {
        match path.metadata() {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn user_home_dir(&self, username: &str) -> Result<PathBuf> {
        lookup_home_dir(username)
    }

    /// Write the rule files directly instead of through a script.
    ///
    /// sudo and doas rules have incompatible syntax, so explicit rules are
    /// refused when both rule directories exist.
    fn apply_sudo(&self, username: &str, rules: &[String]) -> Result<()> {
        let has_sudoers = self.sudoers_dir.is_dir();
        let has_doas = self.doas_dir.is_dir();
        if has_sudoers && has_doas && !rules.is_empty() {
            return Err(Error::InvalidSudo(format!(
                "both {} and {} exist, cannot tell which syntax the rules for {username} use",
                self.sudoers_dir.display(),
                self.doas_dir.display()
            )));
        }
        if has_sudoers {
            let path = self.sudoers_dir.join(username);
            debug!("write file: {}", path.display());
            let lines = sudo::sudoers_lines(username, rules);
            self.write_file(&path, lines.as_bytes(), RULE_FILE_MODE)?;
        }
        if has_doas {
            let path = self.doas_dir.join(format!("{username}.conf"));
            debug!("write file: {}", path.display());
            let lines = sudo::doas_lines(username, rules);
            self.write_file(&path, lines.as_bytes(), RULE_FILE_MODE)?;
        }
        Ok(())
    }
}

fn check_status(command: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(Error::CommandFailed {
            command: command.to_string(),
            status: status.to_string(),
        })
    }
}

/// Look up a home directory in the password database.
fn lookup_home_dir(username: &str) -> Result<PathBuf> {
    let name =
        CString::new(username).map_err(|_| Error::UnknownUser(username.to_string()))?;
    let mut buf: Vec<libc::c_char> = vec![0; 1024];
    let mut pwd: MaybeUninit<libc::passwd> = MaybeUninit::uninit();
    let mut result: *mut libc::passwd = ptr::null_mut();

    loop {
        // SAFETY: every pointer refers to live storage of the stated size
        let rc = unsafe {
            libc::getpwnam_r(
                name.as_ptr(),
                pwd.as_mut_ptr(),
                buf.as_mut_ptr(),
                buf.len(),
                &mut result,
            )
        };
        if rc == libc::ERANGE && buf.len() < 1 << 20 {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        if rc != 0 {
            return Err(io::Error::from_raw_os_error(rc).into());
        }
        if result.is_null() {
            return Err(Error::UnknownUser(username.to_string()));
        }
        // SAFETY: on success `result` points at `pwd`, whose strings live in `buf`
        let dir = unsafe { CStr::from_ptr((*result).pw_dir) };
        return Ok(PathBuf::from(OsStr::from_bytes(dir.to_bytes())));
    }
}
