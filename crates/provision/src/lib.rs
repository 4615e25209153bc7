//! # provision
//!
//! Apply cloud-config documents to a machine.
//!
//! This crate provides functionality for:
//! - Parsing `#cloud-config` YAML into a [`Config`] and merging configs
//! - Rendering distribution-specific commands ([`ostype`])
//! - Writing files, installing packages, creating users with sudo rules
//!   and ssh keys, and running commands through a pluggable [`Backend`]
//!
//! ## Example
//!
//! ```no_run
//! use provision::{Configurer, LocalBackend, ostype};
//!
//! let os = ostype::from_name("alpine").expect("known OS");
//! let mut configurer = Configurer::new(LocalBackend::new()).with_os(os);
//! configurer
//!     .apply_config_files(&["/etc/cloud/base.yaml", "/etc/cloud/site.yaml"])
//!     .expect("apply failed");
//! ```
//!
//! ## Dry runs
//!
//! [`RecordingBackend`] records what would be done instead of doing it.
//!
//! ```
//! use provision::{Configurer, RecordingBackend, parse_config};
//!
//! let config = parse_config(b"#cloud-config\nruncmd:\n  - [echo, hello]\n").unwrap();
//! let mut configurer = Configurer::new(RecordingBackend::new());
//! configurer.apply(&config).unwrap();
//! assert_eq!(configurer.backend().rendered(), vec!["echo hello"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod command;
pub mod config;
pub mod configurer;
pub mod error;
pub mod ostype;
pub mod parse;
pub mod sudo;

pub use backend::{Backend, LocalBackend, Operation, RecordingBackend};
pub use command::Command;
pub use config::{Config, File, User};
pub use configurer::Configurer;
pub use error::{Error, ErrorCategory, Result};
pub use ostype::{OsName, OsType};
pub use parse::{parse_config, read_config_file, read_config_files, to_yaml};
pub use sudo::Sudo;
