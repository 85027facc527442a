//! Cloud provider trait definition

use crate::error::Result;
use crate::record::CloudKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capability set every cloud backend exposes to the reconciler.
///
/// Mutating calls are fire-and-forget: they return once the provider accepted
/// the request. The caller polls [`ProviderClient::describe_instance`] to see
/// the effect.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Which cloud this client talks to
    fn kind(&self) -> CloudKind;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Polling cadence for instance state changes
    fn poll_policy(&self) -> PollPolicy;

    /// Polling cadence for image builds
    fn image_poll_policy(&self) -> PollPolicy {
        PollPolicy::new(Duration::from_secs(60), 90)
    }

    /// Map a raw provider status string onto a lifecycle phase
    fn phase(&self, state: &str) -> InstancePhase;

    /// Map a raw image status string onto an image phase
    fn image_phase(&self, state: &str) -> ImagePhase;

    /// Issue a create call; does not wait for the instance to boot
    async fn create_instance(&self, spec: &InstanceSpec) -> Result<String>;

    /// Point-in-time snapshot; `CloudError::NotFound` if the id is gone
    async fn describe_instance(&self, id: &str) -> Result<InstanceSnapshot>;

    /// Power on
    async fn start(&self, id: &str) -> Result<()>;

    /// Power off
    async fn stop(&self, id: &str) -> Result<()>;

    /// Terminate and release the instance
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete a detached volume
    async fn delete_volume(&self, volume_id: &str) -> Result<()>;

    /// Snapshot the instance into a bootable image
    async fn create_image(&self, id: &str, name: &str, description: &str) -> Result<String>;

    /// Raw status of an image build
    async fn describe_image(&self, image_id: &str) -> Result<String>;
}

/// Provider-neutral request to create an instance.
///
/// Each client fills the blanks from its own settings; the fields here only
/// override them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Display name / Name tag
    pub name: Option<String>,

    /// Image (AMI id or image name) override
    pub image: Option<String>,

    /// Instance type / flavor override
    pub size: Option<String>,
}

impl InstanceSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// What the provider reports about an instance right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub state: String,
    pub ip_address: Option<String>,
    pub volume_id: Option<String>,
    pub public_dns_name: Option<String>,
}

impl InstanceSnapshot {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            ip_address: None,
            volume_id: None,
            public_dns_name: None,
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_volume(mut self, volume_id: impl Into<String>) -> Self {
        self.volume_id = Some(volume_id.into());
        self
    }
}

/// Provider-neutral lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstancePhase {
    Pending,
    Running,
    Stopping,
    Stopped,
    ShuttingDown,
    Terminated,
    Failed,
    Other,
}

impl std::fmt::Display for InstancePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstancePhase::Pending => write!(f, "pending"),
            InstancePhase::Running => write!(f, "running"),
            InstancePhase::Stopping => write!(f, "stopping"),
            InstancePhase::Stopped => write!(f, "stopped"),
            InstancePhase::ShuttingDown => write!(f, "shutting-down"),
            InstancePhase::Terminated => write!(f, "terminated"),
            InstancePhase::Failed => write!(f, "failed"),
            InstancePhase::Other => write!(f, "other"),
        }
    }
}

/// Image build phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagePhase {
    Building,
    Available,
    Failed,
}

/// Bounded fixed-interval polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between two status queries
    pub interval: Duration,

    /// Give up after this many queries
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Upper bound on the time spent waiting
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 90,
        }
    }
}
