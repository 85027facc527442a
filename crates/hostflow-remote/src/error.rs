//! Remote provisioning error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Remote command failed with exit code {exit_code}: {command}\n{output}")]
    RemoteCommand {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("Unexpected exit code {exit_code} from: {command}\n{output}")]
    UnmappedExitCode {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("Unsupported operating system: {0}")]
    UnsupportedOs(String),

    #[error("{0} not found. Please install OpenSSH / rsync")]
    SshNotFound(String),

    #[error("SOURCE_PATH is not set or does not exist: {}", .0.as_ref().map(|p| p.display().to_string()).unwrap_or_default())]
    MissingSourcePath(Option<PathBuf>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RemoteError>;
