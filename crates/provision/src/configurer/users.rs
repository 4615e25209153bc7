//! User accounts: creation, group membership, sudo rules and ssh keys.

use super::Configurer;
use crate::backend::Backend;
use crate::command::Command;
use crate::config::User;
use crate::error::Result;
use log::{debug, info};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Mode of a provisioned `authorized_keys` file.
const AUTHORIZED_KEYS_MODE: u32 = 0o600;

/// Encrypted password that matches no input.
const LOCKED_PASSWORD: &str = "*";

impl<B: Backend> Configurer<B> {
    /// Create users, then configure passwords, sudo rules and ssh keys.
    pub fn add_users(&mut self, users: &[User]) -> Result<()> {
        if users.is_empty() {
            return Ok(());
        }
        let os = self.require_os("cannot create users")?;
        let need_passwords = os.need_user_passwords();
        let commands: Vec<Command> = users.iter().map(|u| os.add_user_command(u)).collect();

        for (user, command) in users.iter().zip(&commands) {
            self.run_command(command)?;
            for group in user.group_list() {
                self.run_command(&Command::argv(["adduser", user.name.as_str(), group]))?;
            }
        }

        if need_passwords {
            self.run_command(&Command::Script(password_script(users)))?;
        }

        for user in users.iter().filter(|u| u.sudo.is_granted()) {
            info!("sudo rules for {}", user.name);
            self.backend.apply_sudo(&user.name, &user.sudo.rules())?;
        }

        for user in users {
            self.set_authorized_keys(user)?;
        }
        Ok(())
    }

    /// Write a user's `~/.ssh/authorized_keys`, unless it already exists.
    pub fn set_authorized_keys(&mut self, user: &User) -> Result<()> {
        if user.ssh_authorized_keys.is_empty() {
            return Ok(());
        }
        let home = if user.homedir.is_empty() {
            self.backend.user_home_dir(&user.name)?
        } else {
            PathBuf::from(&user.homedir)
        };
        let ssh_dir = home.join(".ssh");
        let keys_file = ssh_dir.join("authorized_keys");
        if self.backend.file_exists(&keys_file)? {
            debug!("{} exists, leaving it alone", keys_file.display());
            return Ok(());
        }

        self.ensure_dir_exists(&ssh_dir)?;
        let mut data = user.ssh_authorized_keys.join("\n");
        data.push('\n');
        info!("write file: {}", keys_file.display());
        self.backend
            .write_file(&keys_file, data.as_bytes(), AUTHORIZED_KEYS_MODE)?;

        let owner = format!("{0}:{0}", user.name);
        let ssh_dir = ssh_dir.to_string_lossy().into_owned();
        let keys_file = keys_file.to_string_lossy().into_owned();
        self.run_command(&Command::argv(["chmod", "0755", ssh_dir.as_str()]))?;
        self.run_command(&Command::argv(["chown", owner.as_str(), ssh_dir.as_str()]))?;
        self.run_command(&Command::argv(["chown", owner.as_str(), keys_file.as_str()]))
    }
}

/// One `chpasswd -e` call locking the password of every user.
fn password_script(users: &[User]) -> String {
    let mut script = String::from("chpasswd -e << END\n");
    for user in users {
        let _ = writeln!(script, "{}:{LOCKED_PASSWORD}", user.name);
    }
    script.push_str("END\n");
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Operation, RecordingBackend};
    use crate::config::Config;
    use crate::error::Error;
    use crate::ostype::{Alpine, Debian, OsType};
    use crate::sudo::{self, Sudo};
    use std::path::Path;

    fn configurer(os: impl OsType + 'static) -> Configurer<RecordingBackend> {
        Configurer::new(RecordingBackend::new()).with_os(Some(Box::new(os)))
    }

    fn user(name: &str) -> User {
        User {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn with_keys(name: &str) -> User {
        User {
            ssh_authorized_keys: vec![
                "ssh-ed25519 AAAA one".to_string(),
                "ssh-rsa BBBB two".to_string(),
            ],
            ..user(name)
        }
    }

    fn password_scripts(ops: &[Operation]) -> Vec<&str> {
        ops.iter()
            .filter_map(|op| match op {
                Operation::Script(s) if s.starts_with("chpasswd") => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_users_without_os() {
        let mut configurer = Configurer::new(RecordingBackend::new());
        configurer.add_users(&[]).unwrap();
        assert!(configurer.backend().operations().is_empty());
    }

    #[test]
    fn test_missing_os() {
        let mut configurer = Configurer::new(RecordingBackend::new());
        let err = configurer.add_users(&[user("alice")]).unwrap_err();
        assert!(matches!(err, Error::MissingOs { action: "cannot create users" }));
    }

    #[test]
    fn test_groups_after_each_user() {
        let mut configurer = configurer(Debian);
        configurer
            .add_users(&[
                User {
                    groups: "wheel, docker".to_string(),
                    ..user("alice")
                },
                user("bob"),
            ])
            .unwrap();

        let rendered = configurer.backend().rendered();
        assert!(rendered[0].starts_with("adduser alice --disabled-password"));
        assert_eq!(rendered[1], "adduser alice wheel");
        assert_eq!(rendered[2], "adduser alice docker");
        assert!(rendered[3].starts_with("adduser bob"));
        assert_eq!(rendered.len(), 4);
    }

    #[test]
    fn test_single_password_script_on_alpine() {
        let mut configurer = configurer(Alpine);
        configurer.add_users(&[user("alice"), user("bob")]).unwrap();

        let ops = configurer.backend().operations();
        assert_eq!(
            password_scripts(&ops),
            vec!["chpasswd -e << END\nalice:*\nbob:*\nEND\n"]
        );
        // after both users were created
        assert!(matches!(ops[2], Operation::Script(_)));
    }

    #[test]
    fn test_no_password_script_on_debian() {
        let mut configurer = configurer(Debian);
        configurer.add_users(&[user("alice"), user("bob")]).unwrap();
        assert!(password_scripts(&configurer.backend().operations()).is_empty());
    }

    #[test]
    fn test_sudo_only_for_granted_users() {
        let mut configurer = configurer(Debian);
        configurer
            .add_users(&[
                User {
                    sudo: Sudo::Bool(true),
                    ..user("alice")
                },
                User {
                    sudo: Sudo::Bool(false),
                    ..user("bob")
                },
                User {
                    sudo: Sudo::Rule("ALL=(ALL) ALL".to_string()),
                    ..user("carol")
                },
            ])
            .unwrap();

        let ops = configurer.backend().operations();
        let scripts: Vec<&Operation> = ops
            .iter()
            .filter(|op| matches!(op, Operation::Script(_)))
            .collect();
        assert_eq!(
            scripts,
            vec![
                &Operation::Script(sudo::privilege_script("alice", &[])),
                &Operation::Script(sudo::privilege_script(
                    "carol",
                    &["ALL=(ALL) ALL".to_string()]
                )),
            ]
        );
    }

    #[test]
    fn test_authorized_keys_written_and_owned() {
        let mut configurer = configurer(Debian);
        configurer.add_users(&[with_keys("alice")]).unwrap();

        let ops = configurer.backend().operations();
        let rendered = configurer.backend().rendered();
        assert_eq!(rendered[1], "mkdir -p /home/alice/.ssh");
        assert_eq!(
            ops[2],
            Operation::Write {
                path: PathBuf::from("/home/alice/.ssh/authorized_keys"),
                data: b"ssh-ed25519 AAAA one\nssh-rsa BBBB two\n".to_vec(),
                mode: 0o600,
            }
        );
        assert_eq!(rendered[3], "chmod 0755 /home/alice/.ssh");
        assert_eq!(rendered[4], "chown alice:alice /home/alice/.ssh");
        assert_eq!(
            rendered[5],
            "chown alice:alice /home/alice/.ssh/authorized_keys"
        );
        assert_eq!(ops.len(), 6);
    }

    #[test]
    fn test_authorized_keys_uses_homedir() {
        let mut configurer = configurer(Debian);
        configurer
            .set_authorized_keys(&User {
                homedir: "/srv/git".to_string(),
                ..with_keys("git")
            })
            .unwrap();

        let ops = configurer.backend().operations();
        assert_eq!(
            ops[1].path(),
            Some(Path::new("/srv/git/.ssh/authorized_keys"))
        );
    }

    #[test]
    fn test_authorized_keys_root_home() {
        let mut configurer = configurer(Debian);
        configurer.set_authorized_keys(&with_keys("root")).unwrap();
        assert_eq!(configurer.backend().rendered()[0], "mkdir -p /root/.ssh");
    }

    #[test]
    fn test_existing_authorized_keys_untouched() {
        let backend = RecordingBackend::new().with_existing("/home/alice/.ssh/authorized_keys");
        let mut configurer = Configurer::new(backend).with_os(Some(Box::new(Debian)));
        configurer.set_authorized_keys(&with_keys("alice")).unwrap();
        assert!(configurer.backend().operations().is_empty());
    }

    #[test]
    fn test_second_apply_leaves_keys_alone() {
        let config = Config {
            users: vec![with_keys("alice")],
            ..Default::default()
        };
        let mut configurer = configurer(Debian);
        configurer.apply(&config).unwrap();
        configurer.backend().clear();

        configurer.apply(&config).unwrap();

        let ops = configurer.backend().operations();
        assert!(ops.iter().all(|op| op.path().is_none()));
        assert!(
            !configurer
                .backend()
                .rendered()
                .iter()
                .any(|r| r.starts_with("chown") || r.starts_with("chmod"))
        );
    }

    #[test]
    fn test_no_keys_no_effects() {
        let mut configurer = configurer(Debian);
        configurer.set_authorized_keys(&user("alice")).unwrap();
        assert!(configurer.backend().operations().is_empty());
    }
}
