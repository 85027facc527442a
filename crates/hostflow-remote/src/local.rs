//! Local helpers that hand the terminal to `rsync` / `ssh` / `pip`

use crate::error::{RemoteError, Result};
use crate::shell::SshTarget;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Paths never synced to the host
pub const RSYNC_EXCLUDES: &[&str] = &[".git", ".tox", ".vagrant", "venv"];

/// Resolve the source directory from `SOURCE_PATH`
pub fn source_path_from_env() -> Result<PathBuf> {
    let path = std::env::var_os("SOURCE_PATH")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or(RemoteError::MissingSourcePath(None))?;

    if !path.is_dir() {
        return Err(RemoteError::MissingSourcePath(Some(path)));
    }
    Ok(path)
}

/// Arguments for `rsync`, run from inside the source directory
pub fn rsync_args(target: &SshTarget) -> Vec<String> {
    let mut args = vec!["-a".to_string(), "--info=progress2".to_string()];
    for exclude in RSYNC_EXCLUDES {
        args.push("--exclude".to_string());
        args.push(exclude.to_string());
    }
    args.push(".".to_string());

    let mut ssh = vec!["ssh".to_string(), "-C".to_string()];
    ssh.extend(target.identity_args());
    args.push("-e".to_string());
    args.push(ssh.join(" "));

    args.push(format!("{}:", target.destination()));
    args
}

/// Arguments for an interactive `ssh -t` session
pub fn shell_args(target: &SshTarget, extra: &[String]) -> Vec<String> {
    let mut args = vec!["-t".to_string()];
    args.extend(target.identity_args());
    args.push(target.destination());
    args.extend(extra.iter().cloned());
    args
}

/// Copy `source_dir` into the login user's home on the host
pub async fn rsync_source(source_dir: &Path, target: &SshTarget) -> Result<()> {
    if !source_dir.is_dir() {
        return Err(RemoteError::MissingSourcePath(Some(source_dir.to_path_buf())));
    }

    let args = rsync_args(target);
    tracing::info!("Syncing {} to {}", source_dir.display(), target.destination());
    tracing::debug!("rsync {}", args.join(" "));

    let status = Command::new("rsync")
        .args(&args)
        .current_dir(source_dir)
        .status()
        .await
        .map_err(|e| not_found_as(e, "rsync"))?;

    if !status.success() {
        return Err(RemoteError::RemoteCommand {
            command: format!("rsync {}", args.join(" ")),
            exit_code: status.code().unwrap_or(-1),
            output: String::new(),
        });
    }
    Ok(())
}

/// Attach the terminal to an ssh session; returns the session's exit code
pub async fn open_shell(target: &SshTarget, extra: &[String]) -> Result<i32> {
    let args = shell_args(target, extra);
    tracing::debug!("ssh {}", args.join(" "));

    let status = Command::new("ssh")
        .args(&args)
        .status()
        .await
        .map_err(|e| not_found_as(e, "ssh"))?;

    Ok(status.code().unwrap_or(-1))
}

/// Arguments for `pip` installing `modules` on the operator's machine
pub fn pip_install_args(modules: &[String]) -> Vec<String> {
    let mut args = vec!["--quiet".to_string(), "install".to_string()];
    args.extend(modules.iter().cloned());
    args
}

/// `pip install` on the operator's machine
pub async fn install_python_modules_locally(modules: &[String]) -> Result<()> {
    let args = pip_install_args(modules);
    tracing::debug!("pip {}", args.join(" "));

    let output = Command::new("pip")
        .args(&args)
        .output()
        .await
        .map_err(RemoteError::Io)?;

    if !output.status.success() {
        return Err(RemoteError::RemoteCommand {
            command: format!("pip {}", args.join(" ")),
            exit_code: output.status.code().unwrap_or(-1),
            output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    tracing::info!(?modules, "Python modules installed locally");
    Ok(())
}

fn not_found_as(err: std::io::Error, binary: &str) -> RemoteError {
    if err.kind() == std::io::ErrorKind::NotFound {
        RemoteError::SshNotFound(binary.to_string())
    } else {
        RemoteError::Io(err)
    }
}
