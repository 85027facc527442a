//! Command execution on the remote host
//!
//! Wraps the system `ssh` binary. Every command runs non-interactively and
//! its output is captured.

use crate::error::{RemoteError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Captured result of one remote command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Something that can run shell commands on the managed host
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Run as the login user. Non-zero exit codes are not errors here.
    async fn exec(&self, command: &str) -> Result<CommandOutput>;

    /// Run through `sudo`
    async fn exec_privileged(&self, command: &str) -> Result<CommandOutput> {
        self.exec(&format!("sudo -n sh -c {}", shell_quote(command)))
            .await
    }
}

/// Where and as whom to connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub user: String,
    pub host: String,
    pub port: u16,
    pub key_file: Option<PathBuf>,
}

impl SshTarget {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            port: 22,
            key_file: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_key_file(mut self, key_file: Option<PathBuf>) -> Self {
        self.key_file = key_file;
        self
    }

    /// `user@host`
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Identity and port options shared by ssh, rsync and the interactive session
    pub fn identity_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(key) = &self.key_file {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }
        args
    }

    /// Full argument list for a batch command
    pub fn batch_args(&self, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
        ];
        args.extend(self.identity_args());
        args.push(self.destination());
        args.push(command.to_string());
        args
    }
}

impl std::fmt::Display for SshTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.destination(), self.port)
    }
}

/// [`RemoteShell`] backed by the `ssh` binary
pub struct SshShell {
    target: SshTarget,
}

impl SshShell {
    pub fn new(target: SshTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &SshTarget {
        &self.target
    }
}

#[async_trait]
impl RemoteShell for SshShell {
    async fn exec(&self, command: &str) -> Result<CommandOutput> {
        let mut cmd = Command::new("ssh");
        cmd.args(self.target.batch_args(command));
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running on {}: {}", self.target, command);

        let output = cmd.output().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RemoteError::SshNotFound("ssh".to_string()),
            _ => RemoteError::Io(e),
        })?;

        let result = CommandOutput {
            // Killed by a signal
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        tracing::debug!(exit_code = result.exit_code, "Remote command finished");
        Ok(result)
    }
}

/// Quote a string for POSIX `sh`
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r#"'\''"#))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("docker.service"), "docker.service");
        assert_eq!(shell_quote("8080/tcp"), "8080/tcp");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), r#"'it'\''s'"#);
        assert_eq!(shell_quote("$(reboot)"), "'$(reboot)'");
    }

    #[test]
    fn test_batch_args() {
        let target = SshTarget::new("centos", "203.0.113.5")
            .with_port(2222)
            .with_key_file(Some(PathBuf::from("/keys/id.pem")));

        let args = target.batch_args("uptime");
        assert!(args.contains(&"BatchMode=yes".to_string()));
        let tail: Vec<&str> = args.iter().rev().take(6).rev().map(|s| s.as_str()).collect();
        assert_eq!(
            tail,
            vec!["-i", "/keys/id.pem", "-p", "2222", "centos@203.0.113.5", "uptime"]
        );
    }

    #[test]
    fn test_default_port_is_omitted() {
        let target = SshTarget::new("centos", "host");
        assert!(target.identity_args().is_empty());
        assert_eq!(target.to_string(), "centos@host:22");
    }

    #[test]
    fn test_combined_output() {
        let mut output = CommandOutput::new(1, "out");
        assert_eq!(output.combined(), "out");
        output.stderr = "err".to_string();
        assert_eq!(output.combined(), "out\nerr");
        output.stdout.clear();
        assert_eq!(output.combined(), "err");
        assert!(!output.success());
    }
}
