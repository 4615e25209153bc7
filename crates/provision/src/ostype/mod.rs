//! OS-specific command generation.
//!
//! An [`OsType`] renders the commands that differ between distributions:
//! installing packages, creating users and setting the timezone. It never
//! runs anything itself; the configurer hands its commands to the backend.

pub mod alpine;
pub mod debian;

pub use alpine::Alpine;
pub use debian::Debian;

use crate::command::Command;
use crate::config::User;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Distribution-specific capabilities used by the configurer.
pub trait OsType: Send + Sync + fmt::Debug {
    /// Short name of the distribution family.
    fn name(&self) -> &'static str;

    /// Command that installs one package.
    fn install_package_command(&self, package: &str) -> Command;

    /// Command that refreshes the package index.
    fn update_packages_command(&self) -> Command;

    /// Command that upgrades installed packages.
    fn upgrade_packages_command(&self) -> Command;

    /// Command that creates a user.
    ///
    /// It must not configure sudo, supplementary groups or ssh keys; the
    /// configurer does that separately.
    fn add_user_command(&self, user: &User) -> Command;

    /// Whether new users must be given a password.
    ///
    /// Distributions that refuse ssh logins on disabled accounts keep new
    /// accounts enabled, so the configurer assigns them an unusable
    /// encrypted password to keep password login impossible.
    fn need_user_passwords(&self) -> bool;

    /// Command that sets the system timezone.
    fn set_timezone_command(&self, timezone: &str) -> Command;
}

/// The built-in OS types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsName {
    /// Alpine Linux (apk, busybox adduser)
    Alpine,
    /// Debian and derivatives (apt-get, adduser)
    Debian,
}

impl OsName {
    /// All built-in OS names.
    pub const ALL: [OsName; 2] = [OsName::Alpine, OsName::Debian];

    /// The provider for this OS.
    pub fn os_type(self) -> Box<dyn OsType> {
        match self {
            OsName::Alpine => Box::new(Alpine),
            OsName::Debian => Box::new(Debian),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            OsName::Alpine => "alpine",
            OsName::Debian => "debian",
        }
    }
}

impl fmt::Display for OsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        OsName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownOs(s.to_string()))
    }
}

/// Select an OS provider by name.
///
/// An empty name selects no provider, which is valid for configs that
/// install no packages, add no users and set no timezone.
pub fn from_name(name: &str) -> Result<Option<Box<dyn OsType>>> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    Ok(Some(name.parse::<OsName>()?.os_type()))
}
