//! Alpine Linux: apk, busybox adduser, setup-timezone.

use super::OsType;
use crate::command::Command;
use crate::config::User;

/// Alpine Linux.
#[derive(Debug, Clone, Copy, Default)]
pub struct Alpine;

impl OsType for Alpine {
    fn name(&self) -> &'static str {
        "alpine"
    }

    fn install_package_command(&self, package: &str) -> Command {
        Command::shell(format!("apk add {package}"))
    }

    fn update_packages_command(&self) -> Command {
        Command::shell("apk update")
    }

    fn upgrade_packages_command(&self) -> Command {
        Command::shell("apk upgrade")
    }

    fn add_user_command(&self, user: &User) -> Command {
        let mut args = vec![
            "adduser".to_string(),
            "-g".to_string(),
            user.gecos.clone(),
            "-D".to_string(),
        ];
        if !user.uid.is_empty() {
            args.extend(["-u".to_string(), user.uid.clone()]);
        }
        if !user.shell.is_empty() {
            args.extend(["-s".to_string(), user.shell.clone()]);
        }
        if user.no_create_home {
            args.push("-H".to_string());
        } else if !user.homedir.is_empty() {
            args.extend(["-h".to_string(), user.homedir.clone()]);
        }
        if !user.primary_group.is_empty() {
            args.extend(["-G".to_string(), user.primary_group.clone()]);
        }
        args.push(user.name.clone());
        Command::Args(args)
    }

    /// Alpine refuses ssh logins on disabled accounts, so accounts stay
    /// enabled and need a (deliberately unusable) password.
    fn need_user_passwords(&self) -> bool {
        true
    }

    fn set_timezone_command(&self, timezone: &str) -> Command {
        Command::argv(["setup-timezone", "-z", timezone])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_package() {
        assert_eq!(
            Alpine.install_package_command("openssh"),
            Command::shell("apk add openssh")
        );
    }

    #[test]
    fn test_add_user_name_last() {
        let user = User {
            name: "alice".to_string(),
            uid: "1001".to_string(),
            shell: "/bin/ash".to_string(),
            primary_group: "users".to_string(),
            ..Default::default()
        };
        assert_eq!(
            Alpine.add_user_command(&user),
            Command::argv([
                "adduser", "-g", "", "-D", "-u", "1001", "-s", "/bin/ash", "-G", "users", "alice",
            ])
        );
    }

    #[test]
    fn test_add_user_without_home() {
        let user = User {
            name: "svc".to_string(),
            no_create_home: true,
            ..Default::default()
        };
        assert_eq!(
            Alpine.add_user_command(&user),
            Command::argv(["adduser", "-g", "", "-D", "-H", "svc"])
        );
    }

    #[test]
    fn test_timezone_and_passwords() {
        assert!(Alpine.need_user_passwords());
        assert_eq!(
            Alpine.set_timezone_command("Europe/Athens"),
            Command::argv(["setup-timezone", "-z", "Europe/Athens"])
        );
    }
}
