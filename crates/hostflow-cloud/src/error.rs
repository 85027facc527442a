//! Cloud lifecycle error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reconciling the managed instance
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("No instance is tracked (state file not found)")]
    NoState,

    #[error("Resource not found upstream: {0}")]
    NotFound(String),

    #[error("Provisioning failed: {resource} reported state '{state}'")]
    ProvisioningFailed { resource: String, state: String },

    #[error("State file is corrupt: {}\nReason: {reason}", path.display())]
    CorruptState { path: PathBuf, reason: String },

    #[error("{host}:{port} was not reachable within {timeout_secs}s")]
    ReachabilityTimeout {
        host: String,
        port: u16,
        timeout_secs: u64,
    },

    #[error("{resource} did not reach '{desired}' after {attempts} polls (last state: '{last_state}')")]
    ReconciliationTimeout {
        resource: String,
        desired: String,
        attempts: u32,
        last_state: String,
    },

    #[error("Operation not supported by {provider}: {operation}")]
    Unsupported {
        provider: String,
        operation: String,
    },

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Lock acquisition failed: {0}")]
    Lock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }

    /// Instance named by a failed or timed-out instance transition
    pub fn instance_id(&self) -> Option<&str> {
        match self {
            CloudError::ProvisioningFailed { resource, .. }
            | CloudError::ReconciliationTimeout { resource, .. } => {
                resource.strip_prefix("instance ")
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
