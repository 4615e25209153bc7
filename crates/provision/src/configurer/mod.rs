//! The provisioning engine.
//!
//! A [`Configurer`] expands a [`Config`] into backend calls, using an
//! [`OsType`] to render the commands that differ between distributions.
//! [`Configurer::apply`] runs the phases in a fixed order and stops at the
//! first error; effects already applied are not undone.
//!
//! 1. `bootcmd`
//! 2. files without `defer`
//! 3. package index update and upgrade, then `packages`
//! 4. `users`, including group membership, sudo rules and ssh keys
//! 5. `timezone`
//! 6. files with `defer`
//! 7. `runcmd`

mod users;

use crate::backend::Backend;
use crate::command::Command;
use crate::config::{self, Config, File};
use crate::error::{Error, Result};
use crate::ostype::OsType;
use crate::parse;
use log::{debug, info};
use std::collections::HashSet;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Mode of files written without explicit permissions.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Applies cloud-configs through a backend.
#[derive(Debug)]
pub struct Configurer<B> {
    backend: B,
    os: Option<Box<dyn OsType>>,
    /// Directories already created by this configurer
    created_dirs: HashSet<PathBuf>,
}

impl<B: Backend> Configurer<B> {
    /// Create a configurer with no OS provider.
    ///
    /// Without an OS provider, configs that install packages, add users or
    /// set the timezone fail with [`Error::MissingOs`].
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            os: None,
            created_dirs: HashSet::new(),
        }
    }

    /// Set the OS provider.
    #[must_use]
    pub fn with_os(mut self, os: Option<Box<dyn OsType>>) -> Self {
        self.os = os;
        self
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Consume the configurer, returning the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// The OS provider, if any.
    pub fn os(&self) -> Option<&dyn OsType> {
        self.os.as_deref()
    }

    fn require_os(&self, action: &'static str) -> Result<&dyn OsType> {
        self.os.as_deref().ok_or(Error::MissingOs { action })
    }

    /// Apply a config.
    pub fn apply(&mut self, config: &Config) -> Result<()> {
        self.run_commands(&config.bootcmd)?;
        self.write_files(config.immediate_files())?;
        self.refresh_packages(config.package_update, config.package_upgrade)?;
        self.install_packages(&config.packages)?;
        self.add_users(&config.users)?;
        self.set_timezone(&config.timezone)?;
        self.write_files(config.deferred_files())?;
        self.run_commands(&config.runcmd)
    }

    /// Parse every file, then apply each config in order.
    ///
    /// Nothing is applied unless all files parse. An apply error is
    /// wrapped with the path of the file that caused it.
    pub fn apply_config_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<()> {
        let configs = parse::read_config_files(paths)?;
        for (path, config) in paths.iter().zip(&configs) {
            info!("apply {}", path.as_ref().display());
            self.apply(config).map_err(|e| e.in_file(path.as_ref()))?;
        }
        Ok(())
    }

    /// Parse every file, merge the configs in order and apply the result.
    pub fn apply_merged<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<()> {
        let mut merged = Config::default();
        for config in parse::read_config_files(paths)? {
            merged.merge(config);
        }
        self.apply(&merged)
    }

    /// Read a whole config from `reader` and apply it.
    pub fn apply_reader(&mut self, mut reader: impl Read) -> Result<()> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let config = parse::parse_config(&data)?;
        self.apply(&config)
    }

    /// Read a whole config from standard input and apply it.
    pub fn apply_stdin(&mut self) -> Result<()> {
        self.apply_reader(io::stdin().lock())
    }

    /// Run commands in order.
    pub fn run_commands(&self, commands: &[Command]) -> Result<()> {
        commands.iter().try_for_each(|command| self.run_command(command))
    }

    /// Run a single command.
    pub fn run_command(&self, command: &Command) -> Result<()> {
        match command {
            Command::Script(script) => {
                info!("script << ---");
                debug!("{}\n---", script.trim_end());
                self.backend.run_script(script)
            }
            Command::Args(args) => {
                if args.is_empty() {
                    return Err(Error::EmptyCommand);
                }
                info!("{}", args.join(" "));
                self.backend.run_command(args)
            }
        }
    }

    fn refresh_packages(&self, update: bool, upgrade: bool) -> Result<()> {
        if update {
            let command = self
                .require_os("cannot update packages")?
                .update_packages_command();
            self.run_command(&command)?;
        }
        if upgrade {
            let command = self
                .require_os("cannot upgrade packages")?
                .upgrade_packages_command();
            self.run_command(&command)?;
        }
        Ok(())
    }

    /// Install packages in order, skipping duplicates.
    pub fn install_packages(&self, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let os = self.require_os("cannot install packages")?;
        for package in config::unique(packages.to_vec()) {
            self.run_command(&os.install_package_command(&package))?;
        }
        Ok(())
    }

    /// Set the timezone; an empty name does nothing.
    pub fn set_timezone(&self, timezone: &str) -> Result<()> {
        if timezone.is_empty() {
            return Ok(());
        }
        let command = self
            .require_os("cannot set timezone")?
            .set_timezone_command(timezone);
        self.run_command(&command)
    }

    /// Write files in order.
    pub fn write_files<'a>(&mut self, files: impl IntoIterator<Item = &'a File>) -> Result<()> {
        files.into_iter().try_for_each(|file| self.write_file(file))
    }

    /// Write a single file, creating its directory and setting its owner.
    pub fn write_file(&mut self, file: &File) -> Result<()> {
        let mode = parse_mode(&file.permissions)?;
        if !file.owner.is_empty() {
            check_owner(&file.owner)?;
        }
        let path = Path::new(&file.path);
        if let Some(dir) = path.parent() {
            self.ensure_dir_exists(dir)?;
        }

        info!("write file: {}", path.display());
        if file.append {
            self.backend.append_file(path, file.content.as_bytes(), mode)?;
        } else {
            self.backend.write_file(path, file.content.as_bytes(), mode)?;
        }

        if !file.owner.is_empty() {
            self.run_command(&Command::argv([
                "chown".to_string(),
                file.owner.clone(),
                file.path.clone(),
            ]))?;
        }
        Ok(())
    }

    /// Create a directory and its parents, once per configurer.
    pub fn ensure_dir_exists(&mut self, dir: &Path) -> Result<()> {
        if is_root_or_current(dir) {
            return Ok(());
        }
        if self.created_dirs.contains(dir) {
            debug!("directory already created: {}", dir.display());
            return Ok(());
        }
        self.run_command(&Command::argv([
            "mkdir".to_string(),
            "-p".to_string(),
            dir.to_string_lossy().into_owned(),
        ]))?;
        for ancestor in dir.ancestors().take_while(|a| !is_root_or_current(a)) {
            self.created_dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }
}

fn is_root_or_current(dir: &Path) -> bool {
    dir.as_os_str().is_empty() || dir == Path::new("/") || dir == Path::new(".")
}

/// Parse an octal permission string; empty means [`DEFAULT_FILE_MODE`].
pub fn parse_mode(permissions: &str) -> Result<u32> {
    let permissions = permissions.trim();
    if permissions.is_empty() {
        return Ok(DEFAULT_FILE_MODE);
    }
    u32::from_str_radix(permissions, 8).map_err(|source| Error::InvalidPermissions {
        value: permissions.to_string(),
        source,
    })
}

/// Check that an owner has the form `user:group`.
fn check_owner(owner: &str) -> Result<()> {
    let valid = match owner.split_once(':') {
        Some((user, group)) => !user.is_empty() && !group.is_empty() && !group.contains(':'),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidOwner(owner.to_string()))
    }
}
