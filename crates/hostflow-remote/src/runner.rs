//! Privileged command execution with OS-aware package checks

use crate::error::{RemoteError, Result};
use crate::shell::{CommandOutput, RemoteShell, shell_quote};
use tokio::sync::OnceCell;

/// Package manager family of the remote host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    /// CentOS, RHEL, Fedora, Amazon Linux
    Rpm,
    /// Debian, Ubuntu
    Debian,
    Unknown,
}

impl OsFamily {
    /// Detect from the contents of `/etc/os-release`
    pub fn from_os_release(content: &str) -> Self {
        let mut ids = Vec::new();
        for line in content.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            if key.trim() == "ID" || key.trim() == "ID_LIKE" {
                let value = value.trim().trim_matches('"').to_ascii_lowercase();
                ids.extend(value.split_whitespace().map(|s| s.to_string()));
            }
        }

        for id in &ids {
            match id.as_str() {
                "rhel" | "centos" | "fedora" | "redhat" | "amzn" | "rocky" | "almalinux" => {
                    return OsFamily::Rpm;
                }
                "debian" | "ubuntu" => return OsFamily::Debian,
                _ => {}
            }
        }
        OsFamily::Unknown
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsFamily::Rpm => write!(f, "rpm"),
            OsFamily::Debian => write!(f, "debian"),
            OsFamily::Unknown => write!(f, "unknown"),
        }
    }
}

/// Runs provisioning commands on the reachable host.
///
/// The OS family is read once from `/etc/os-release` and cached.
pub struct RemoteCommandRunner<'a> {
    shell: &'a dyn RemoteShell,
    os_family: OnceCell<OsFamily>,
}

impl<'a> RemoteCommandRunner<'a> {
    pub fn new(shell: &'a dyn RemoteShell) -> Self {
        Self {
            shell,
            os_family: OnceCell::new(),
        }
    }

    /// Run as root; non-zero exit is an error
    pub async fn run_privileged(&self, command: &str) -> Result<CommandOutput> {
        let output = self.shell.exec_privileged(command).await?;
        check(command, output)
    }

    /// Run as the login user; non-zero exit is an error
    pub async fn run(&self, command: &str) -> Result<CommandOutput> {
        let output = self.shell.exec(command).await?;
        check(command, output)
    }

    /// Run as root and hand back the output whatever the exit code
    pub async fn probe_privileged(&self, command: &str) -> Result<CommandOutput> {
        self.shell.exec_privileged(command).await
    }

    /// Run as the login user and hand back the output whatever the exit code
    pub async fn probe(&self, command: &str) -> Result<CommandOutput> {
        self.shell.exec(command).await
    }

    pub async fn os_family(&self) -> Result<OsFamily> {
        let family = self
            .os_family
            .get_or_try_init(|| async {
                let output = self.run("cat /etc/os-release").await?;
                let family = OsFamily::from_os_release(&output.stdout);
                tracing::debug!(%family, "Detected OS family");
                Ok::<_, RemoteError>(family)
            })
            .await?;
        Ok(*family)
    }

    /// Like [`Self::os_family`] but `Unknown` is an error
    pub async fn supported_os_family(&self) -> Result<OsFamily> {
        match self.os_family().await? {
            OsFamily::Unknown => Err(RemoteError::UnsupportedOs(
                "no rpm or debian entry in /etc/os-release".to_string(),
            )),
            family => Ok(family),
        }
    }

    /// Whether `name` is installed. Exit code 0 means yes, 1 means no.
    pub async fn is_package_installed(&self, name: &str) -> Result<bool> {
        let command = match self.supported_os_family().await? {
            OsFamily::Rpm => format!("rpm -q {}", shell_quote(name)),
            _ => format!("dpkg -s {}", shell_quote(name)),
        };

        let output = self.shell.exec_privileged(&command).await?;
        match output.exit_code {
            0 => Ok(true),
            1 => Ok(false),
            exit_code => Err(RemoteError::UnmappedExitCode {
                command,
                exit_code,
                output: output.combined(),
            }),
        }
    }

    /// Start the service and optionally enable it at boot
    pub async fn ensure_service_running(&self, name: &str, enabled: bool) -> Result<()> {
        self.systemd(name, true, enabled, false).await
    }

    /// Drive a systemd unit into the requested start / enable state
    pub async fn systemd(&self, service: &str, start: bool, enabled: bool, unmask: bool) -> Result<()> {
        let unit = shell_quote(service);

        // A masked unit refuses to start
        if unmask {
            self.run_privileged(&format!("systemctl unmask {}", unit))
                .await?;
        }

        let action = if start { "start" } else { "stop" };
        self.run_privileged(&format!("systemctl {} {}", action, unit))
            .await?;

        let boot = if enabled { "enable" } else { "disable" };
        self.run_privileged(&format!("systemctl {} {}", boot, unit))
            .await?;

        tracing::info!(service, action, boot, "systemd unit updated");
        Ok(())
    }
}

fn check(command: &str, output: CommandOutput) -> Result<CommandOutput> {
    if output.success() {
        Ok(output)
    } else {
        Err(RemoteError::RemoteCommand {
            command: command.to_string(),
            exit_code: output.exit_code,
            output: output.combined(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Shell that answers by the first matching command prefix and records
    /// every command it receives. Unmatched commands succeed with no output.
    pub struct FakeShell {
        responses: Vec<(String, CommandOutput)>,
        pub commands: Mutex<Vec<String>>,
    }

    impl FakeShell {
        pub fn new() -> Self {
            Self {
                responses: Vec::new(),
                commands: Mutex::new(Vec::new()),
            }
        }

        pub fn rpm() -> Self {
            Self::new().respond("cat /etc/os-release", 0, "ID=\"centos\"\nID_LIKE=\"rhel fedora\"\n")
        }

        pub fn debian() -> Self {
            Self::new().respond("cat /etc/os-release", 0, "ID=ubuntu\nID_LIKE=debian\n")
        }

        pub fn respond(mut self, prefix: &str, exit_code: i32, stdout: &str) -> Self {
            self.responses
                .push((prefix.to_string(), CommandOutput::new(exit_code, stdout)));
            self
        }

        pub fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteShell for FakeShell {
        async fn exec(&self, command: &str) -> Result<CommandOutput> {
            self.commands.lock().unwrap().push(command.to_string());
            Ok(self
                .responses
                .iter()
                .find(|(prefix, _)| command.starts_with(prefix.as_str()))
                .map(|(_, output)| output.clone())
                .unwrap_or_default())
        }

        // Record the bare command so assertions stay readable
        async fn exec_privileged(&self, command: &str) -> Result<CommandOutput> {
            self.exec(command).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeShell;
    use super::*;

    #[test]
    fn test_os_family_detection() {
        assert_eq!(
            OsFamily::from_os_release("NAME=\"CentOS Linux\"\nID=\"centos\"\nID_LIKE=\"rhel fedora\"\n"),
            OsFamily::Rpm
        );
        assert_eq!(
            OsFamily::from_os_release("ID=amzn\nID_LIKE=\"centos rhel fedora\"\n"),
            OsFamily::Rpm
        );
        assert_eq!(
            OsFamily::from_os_release("ID=linuxmint\nID_LIKE=\"ubuntu debian\"\n"),
            OsFamily::Debian
        );
        assert_eq!(OsFamily::from_os_release("ID=alpine\n"), OsFamily::Unknown);
        assert_eq!(OsFamily::from_os_release(""), OsFamily::Unknown);
    }

    #[tokio::test]
    async fn test_os_family_is_detected_once() {
        let shell = FakeShell::rpm();
        let runner = RemoteCommandRunner::new(&shell);

        assert_eq!(runner.os_family().await.unwrap(), OsFamily::Rpm);
        assert_eq!(runner.os_family().await.unwrap(), OsFamily::Rpm);

        let reads = shell
            .commands()
            .iter()
            .filter(|c| c.as_str() == "cat /etc/os-release")
            .count();
        assert_eq!(reads, 1);
    }

    #[tokio::test]
    async fn test_package_installed_exit_codes() {
        let shell = FakeShell::rpm()
            .respond("rpm -q git", 0, "git-2.x")
            .respond("rpm -q zfs", 1, "package zfs is not installed");
        let runner = RemoteCommandRunner::new(&shell);

        assert!(runner.is_package_installed("git").await.unwrap());
        assert!(!runner.is_package_installed("zfs").await.unwrap());
    }

    #[tokio::test]
    async fn test_package_check_unmapped_exit_code() {
        let shell = FakeShell::debian().respond("dpkg -s docker.io", 2, "dpkg: error");
        let runner = RemoteCommandRunner::new(&shell);

        match runner.is_package_installed("docker.io").await {
            Err(RemoteError::UnmappedExitCode { exit_code, .. }) => assert_eq!(exit_code, 2),
            other => panic!("Expected UnmappedExitCode, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_os_is_unsupported() {
        let shell = FakeShell::new().respond("cat /etc/os-release", 0, "ID=alpine\n");
        let runner = RemoteCommandRunner::new(&shell);

        let result = runner.is_package_installed("git").await;
        assert!(matches!(result, Err(RemoteError::UnsupportedOs(_))));
    }

    #[tokio::test]
    async fn test_run_privileged_reports_exit_code_and_output() {
        let shell = FakeShell::new().respond("false", 3, "boom");
        let runner = RemoteCommandRunner::new(&shell);

        match runner.run_privileged("false").await {
            Err(RemoteError::RemoteCommand {
                exit_code, output, ..
            }) => {
                assert_eq!(exit_code, 3);
                assert_eq!(output, "boom");
            }
            other => panic!("Expected RemoteCommand, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ensure_service_running() {
        let shell = FakeShell::new();
        let runner = RemoteCommandRunner::new(&shell);

        runner.ensure_service_running("docker.service", true).await.unwrap();

        assert_eq!(
            shell.commands(),
            vec!["systemctl start docker.service", "systemctl enable docker.service"]
        );
    }

    #[tokio::test]
    async fn test_systemd_unmask_stop_disable() {
        let shell = FakeShell::new();
        let runner = RemoteCommandRunner::new(&shell);

        runner.systemd("firewalld", false, false, true).await.unwrap();

        assert_eq!(
            shell.commands(),
            vec![
                "systemctl unmask firewalld",
                "systemctl stop firewalld",
                "systemctl disable firewalld"
            ]
        );
    }
}
