//! Remote provisioning for HostFlow
//!
//! Everything that happens on the host once it answers on SSH: privileged
//! commands, package installation, systemd units, firewalld, SELinux, docker,
//! language packages and git. Commands go through the system `ssh` binary.
//!
//! # Layers
//!
//! - [`RemoteShell`]: runs one command and captures its output
//! - [`RemoteCommandRunner`]: turns exit codes into errors and knows the OS family
//! - [`Provisioner`]: idempotent provisioning steps
//! - [`local`]: `rsync` and interactive `ssh` sessions from the operator's machine

pub mod error;
pub mod local;
pub mod provision;
pub mod runner;
pub mod shell;

pub use error::{RemoteError, Result};
pub use local::{install_python_modules_locally, open_shell, rsync_source, source_path_from_env};
pub use provision::Provisioner;
pub use runner::{OsFamily, RemoteCommandRunner};
pub use shell::{CommandOutput, RemoteShell, SshShell, SshTarget, shell_quote};
