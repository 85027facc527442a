//! HostFlow Cloud Lifecycle
//!
//! This crate keeps exactly one remote instance in a desired lifecycle
//! state and remembers it in a local state file.
//!
//! # Supported Providers
//!
//! - **Amazon EC2**: via `hostflow-cloud-aws`
//! - **Rackspace / OpenStack Nova**: via `hostflow-cloud-rackspace`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  HostFlow CLI                    │
//! │           (hostflow up/halt/destroy)             │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                hostflow-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │          LifecycleReconciler              │   │
//! │  │  trait ProviderClient { ... }             │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │  TCP Probe   │  │  State File  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │      ec2      │ │   rackspace   │
//! │   provider    │ │   provider    │
//! └───────────────┘ └───────────────┘
//! ```

pub mod error;
pub mod outcome;
pub mod probe;
pub mod provider;
pub mod reconciler;
pub mod record;
pub mod state;

// Re-exports
pub use error::{CloudError, Result};
pub use outcome::Outcome;
pub use probe::{DEFAULT_REACHABILITY_TIMEOUT, DEFAULT_SSH_PORT, ReachabilityProbe, TcpProbe};
pub use provider::{
    ImagePhase, InstancePhase, InstanceSnapshot, InstanceSpec, PollPolicy, ProviderClient,
};
pub use reconciler::{LifecycleReconciler, ReconcileOptions};
pub use record::{CloudKind, InstanceRecord};
pub use state::{DEFAULT_STATE_PATH, JsonStateFile, StateLock, StateStore};
