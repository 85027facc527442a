//! Results of lifecycle operations

use crate::record::InstanceRecord;

/// What a lifecycle operation ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new instance was created and is running
    Created(InstanceRecord),
    /// A stopped instance was powered on
    Started(InstanceRecord),
    /// The instance was already running; only the record was refreshed
    AlreadyRunning(InstanceRecord),
    /// The instance is powered off
    Stopped(InstanceRecord),
    /// The instance (and its volume) no longer exist
    Destroyed {
        id: String,
        volume_id: Option<String>,
    },
    /// No instance is tracked, nothing to do
    NothingTracked,
}

impl Outcome {
    /// The persisted record after the operation, if one remains
    pub fn record(&self) -> Option<&InstanceRecord> {
        match self {
            Outcome::Created(r)
            | Outcome::Started(r)
            | Outcome::AlreadyRunning(r)
            | Outcome::Stopped(r) => Some(r),
            Outcome::Destroyed { .. } | Outcome::NothingTracked => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Created(r) => write!(f, "created {} ({})", r.id, r.state),
            Outcome::Started(r) => write!(f, "started {} ({})", r.id, r.state),
            Outcome::AlreadyRunning(r) => write!(f, "{} already running", r.id),
            Outcome::Stopped(r) => write!(f, "stopped {} ({})", r.id, r.state),
            Outcome::Destroyed { id, .. } => write!(f, "destroyed {}", id),
            Outcome::NothingTracked => write!(f, "no instance tracked"),
        }
    }
}
