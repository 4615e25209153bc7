//! Debian family: apt-get, adduser, timedatectl.

use super::OsType;
use crate::command::Command;
use crate::config::User;

const APT_GET: &str = "DEBIAN_FRONTEND=noninteractive apt-get -y";

/// Debian and its derivatives.
#[derive(Debug, Clone, Copy, Default)]
pub struct Debian;

impl OsType for Debian {
    fn name(&self) -> &'static str {
        "debian"
    }

    fn install_package_command(&self, package: &str) -> Command {
        Command::shell(format!("{APT_GET} install {package}"))
    }

    fn update_packages_command(&self) -> Command {
        Command::shell(format!("{APT_GET} update"))
    }

    fn upgrade_packages_command(&self) -> Command {
        Command::shell(format!("{APT_GET} upgrade"))
    }

    fn add_user_command(&self, user: &User) -> Command {
        let mut args = vec![
            "adduser".to_string(),
            user.name.clone(),
            "--disabled-password".to_string(),
            "--gecos".to_string(),
            user.gecos.clone(),
        ];
        if !user.uid.is_empty() {
            args.extend(["--uid".to_string(), user.uid.clone()]);
        }
        if !user.shell.is_empty() {
            args.extend(["--shell".to_string(), user.shell.clone()]);
        }
        if user.no_create_home {
            args.push("--no-create-home".to_string());
        } else if !user.homedir.is_empty() {
            args.extend(["--home".to_string(), user.homedir.clone()]);
        }
        if !user.primary_group.is_empty() {
            args.extend(["--ingroup".to_string(), user.primary_group.clone()]);
        }
        Command::Args(args)
    }

    /// A disabled account can still log in with ssh keys.
    fn need_user_passwords(&self) -> bool {
        false
    }

    fn set_timezone_command(&self, timezone: &str) -> Command {
        Command::argv(["timedatectl", "set-timezone", timezone])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_package() {
        assert_eq!(
            Debian.install_package_command("git"),
            Command::shell("DEBIAN_FRONTEND=noninteractive apt-get -y install git")
        );
    }

    #[test]
    fn test_add_user_minimal() {
        let user = User {
            name: "alice".to_string(),
            ..Default::default()
        };
        assert_eq!(
            Debian.add_user_command(&user),
            Command::argv(["adduser", "alice", "--disabled-password", "--gecos", ""])
        );
    }

    #[test]
    fn test_add_user_full() {
        let user = User {
            name: "alice".to_string(),
            uid: "1001".to_string(),
            shell: "/bin/bash".to_string(),
            homedir: "/srv/alice".to_string(),
            primary_group: "staff".to_string(),
            gecos: "Alice".to_string(),
            ..Default::default()
        };
        assert_eq!(
            Debian.add_user_command(&user),
            Command::argv([
                "adduser",
                "alice",
                "--disabled-password",
                "--gecos",
                "Alice",
                "--uid",
                "1001",
                "--shell",
                "/bin/bash",
                "--home",
                "/srv/alice",
                "--ingroup",
                "staff",
            ])
        );
    }

    #[test]
    fn test_no_create_home_wins_over_homedir() {
        let user = User {
            name: "svc".to_string(),
            homedir: "/var/lib/svc".to_string(),
            no_create_home: true,
            ..Default::default()
        };
        let command = Debian.add_user_command(&user);
        let args = command.args().unwrap();
        assert!(args.contains(&"--no-create-home".to_string()));
        assert!(!args.contains(&"--home".to_string()));
    }

    #[test]
    fn test_timezone_and_passwords() {
        assert!(!Debian.need_user_passwords());
        assert_eq!(
            Debian.set_timezone_command("UTC"),
            Command::argv(["timedatectl", "set-timezone", "UTC"])
        );
    }
}
