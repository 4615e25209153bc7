//! Reading and writing cloud-config documents.
//!
//! A document must begin with the exact line `#cloud-config`, optionally
//! followed by `\r` or `\n`. Everything after it is YAML.

use crate::config::Config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// The comment that marks a YAML file as a cloud-config document.
pub const COMMENT: &str = "#cloud-config";

/// Check that the first line of `data` is exactly `line`.
pub fn first_line_is(data: &[u8], line: &str) -> bool {
    let Some(rest) = data.strip_prefix(line.as_bytes()) else {
        return false;
    };
    matches!(rest.first(), None | Some(b'\r' | b'\n'))
}

/// Check that `data` starts with the cloud-config comment.
pub fn has_comment(data: &[u8]) -> bool {
    first_line_is(data, COMMENT)
}

/// Parse a cloud-config document.
pub fn parse_config(data: &[u8]) -> Result<Config> {
    if !has_comment(data) {
        return Err(Error::MissingComment);
    }
    // Comments only, or an explicit null document: nothing to do.
    if is_blank(data) {
        return Ok(Config::default());
    }
    let config: Option<Config> = serde_yaml::from_slice(data)?;
    Ok(config.unwrap_or_default())
}

fn is_blank(data: &[u8]) -> bool {
    data.split(|b| *b == b'\n').all(|line| {
        let line = line.trim_ascii();
        line.is_empty() || line.starts_with(b"#")
    })
}

/// Read and parse a cloud-config file.
pub fn read_config_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|e| Error::from(e).in_file(path))?;
    parse_config(&data).map_err(|e| e.in_file(path))
}

/// Read and parse several cloud-config files, failing on the first error.
pub fn read_config_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Config>> {
    paths.iter().map(|path| read_config_file(path)).collect()
}

/// Serialize a config as a cloud-config document.
pub fn to_yaml(config: &Config) -> Result<String> {
    let body = serde_yaml::to_string(config)?;
    let body = if config.is_empty() { "" } else { body.as_str() };
    Ok(format!("{COMMENT}\n{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::sudo::Sudo;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"#cloud-config
bootcmd:
  - echo boot
package_update: true
packages:
  - git
  - curl
write_files:
  - path: /etc/motd
    content: |
      hello
    permissions: "0600"
    owner: root:root
  - path: /etc/later
    content: later
    defer: true
users:
  - name: alice
    groups: wheel, docker
    sudo: true
    ssh_authorized_keys:
      - ssh-ed25519 AAAA alice@host
timezone: Europe/Athens
runcmd:
  - [echo, 1]
  - echo done
"#;

    #[test]
    fn test_first_line_is() {
        assert!(first_line_is(b"#cloud-config", COMMENT));
        assert!(first_line_is(b"#cloud-config\n", COMMENT));
        assert!(first_line_is(b"#cloud-config\r\n", COMMENT));
        assert!(!first_line_is(b"#cloud-configx\n", COMMENT));
        assert!(!first_line_is(b"#cloud", COMMENT));
        assert!(!first_line_is(b"packages: []\n", COMMENT));
        assert!(!first_line_is(b" #cloud-config\n", COMMENT));
    }

    #[test]
    fn test_missing_comment_is_error() {
        let err = parse_config(b"packages:\n  - git\n").unwrap_err();
        assert!(matches!(err, Error::MissingComment));
    }

    #[test]
    fn test_empty_document() {
        let config = parse_config(b"#cloud-config\n").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_parse_full_document() {
        let config = parse_config(FULL.as_bytes()).unwrap();

        assert_eq!(config.bootcmd, vec![Command::shell("echo boot")]);
        assert!(config.package_update);
        assert_eq!(config.packages, vec!["git", "curl"]);
        assert_eq!(config.files.len(), 2);
        assert_eq!(config.files[0].content, "hello\n");
        assert_eq!(config.files[0].permissions, "0600");
        assert!(config.files[1].defer);
        assert_eq!(config.users[0].sudo, Sudo::Bool(true));
        assert_eq!(config.users[0].group_list(), vec!["wheel", "docker"]);
        assert_eq!(config.timezone, "Europe/Athens");
        assert_eq!(
            config.runcmd,
            vec![Command::argv(["echo", "1"]), Command::shell("echo done")]
        );
    }

    #[test]
    fn test_invalid_command_is_parse_error() {
        let err = parse_config(b"#cloud-config\nruncmd:\n  - {a: b}\n").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn test_to_yaml_reparses() {
        let config = parse_config(FULL.as_bytes()).unwrap();
        let yaml = to_yaml(&config).unwrap();
        assert!(yaml.starts_with("#cloud-config\n"));
        assert_eq!(parse_config(yaml.as_bytes()).unwrap(), config);
    }

    #[test]
    fn test_to_yaml_empty() {
        assert_eq!(to_yaml(&Config::default()).unwrap(), "#cloud-config\n");
    }

    #[test]
    fn test_read_config_file_wraps_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"packages: []\n").unwrap();

        let err = read_config_file(file.path()).unwrap_err();
        assert!(err.to_string().starts_with(&file.path().display().to_string()));
        assert!(matches!(
            err,
            Error::ConfigFile { ref source, .. } if matches!(**source, Error::MissingComment)
        ));
    }

    #[test]
    fn test_read_config_files_fails_fast() {
        let mut good = NamedTempFile::new().unwrap();
        good.write_all(b"#cloud-config\npackages: [git]\n").unwrap();

        let configs = read_config_files(&[good.path()]).unwrap();
        assert_eq!(configs[0].packages, vec!["git"]);

        let missing = good.path().with_extension("missing");
        assert!(read_config_files(&[good.path(), missing.as_path()]).is_err());
    }
}
