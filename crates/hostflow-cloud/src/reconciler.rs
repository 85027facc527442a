//! Drives the tracked instance toward a desired lifecycle state
//!
//! Every operation follows the same shape: issue one mutating call, poll the
//! provider at a fixed interval until the observed phase matches, then
//! persist what the provider reported. Nothing is persisted when a
//! transition fails or times out.

use crate::error::{CloudError, Result};
use crate::outcome::Outcome;
use crate::probe::{DEFAULT_REACHABILITY_TIMEOUT, DEFAULT_SSH_PORT, ReachabilityProbe};
use crate::provider::{
    ImagePhase, InstancePhase, InstanceSnapshot, InstanceSpec, PollPolicy, ProviderClient,
};
use crate::record::{InstanceRecord, non_empty};
use crate::state::StateStore;
use std::time::Duration;
use tokio::time::sleep;

/// Knobs shared by every operation
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Port probed after boot
    pub ssh_port: u16,

    /// Wall-clock limit for the reachability probe
    pub reachability_timeout: Duration,

    /// Overrides the provider's own instance polling cadence
    pub poll: Option<PollPolicy>,

    /// Overrides the provider's own image polling cadence
    pub image_poll: Option<PollPolicy>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            ssh_port: DEFAULT_SSH_PORT,
            reachability_timeout: DEFAULT_REACHABILITY_TIMEOUT,
            poll: None,
            image_poll: None,
        }
    }
}

/// Converges the single tracked instance
pub struct LifecycleReconciler<'a> {
    provider: &'a dyn ProviderClient,
    store: &'a dyn StateStore,
    probe: &'a dyn ReachabilityProbe,
    options: ReconcileOptions,
}

impl<'a> LifecycleReconciler<'a> {
    pub fn new(
        provider: &'a dyn ProviderClient,
        store: &'a dyn StateStore,
        probe: &'a dyn ReachabilityProbe,
    ) -> Self {
        Self {
            provider,
            store,
            probe,
            options: ReconcileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    fn poll_policy(&self) -> PollPolicy {
        self.options
            .poll
            .unwrap_or_else(|| self.provider.poll_policy())
    }

    fn image_poll_policy(&self) -> PollPolicy {
        self.options
            .image_poll
            .unwrap_or_else(|| self.provider.image_poll_policy())
    }

    /// The tracked record, or `NoState`
    pub async fn tracked(&self) -> Result<InstanceRecord> {
        let record = self.store.load().await?.ok_or(CloudError::NoState)?;
        self.check_kind(&record)?;
        Ok(record)
    }

    fn check_kind(&self, record: &InstanceRecord) -> Result<()> {
        if record.cloud_kind != self.provider.kind() {
            return Err(CloudError::InvalidConfig(format!(
                "tracked instance {} belongs to {}, not {}",
                record.id,
                record.cloud_kind,
                self.provider.kind()
            )));
        }
        Ok(())
    }

    /// Create an instance when none is tracked, otherwise make sure the
    /// tracked one is running.
    pub async fn up(&self, spec: &InstanceSpec) -> Result<Outcome> {
        match self.store.load().await? {
            None => self.create(spec).await,
            Some(record) => {
                self.check_kind(&record)?;
                self.boot(record).await
            }
        }
    }

    async fn create(&self, spec: &InstanceSpec) -> Result<Outcome> {
        tracing::info!(
            provider = self.provider.display_name(),
            "Creating instance"
        );
        let id = self.provider.create_instance(spec).await?;
        tracing::info!(id = %id, "Create request accepted");

        let snapshot = self.converge(&id, InstancePhase::Running).await?;
        let record = record_from(&id, self.provider.kind(), snapshot);
        let record = self.settle(record).await?;

        Ok(Outcome::Created(record))
    }

    async fn boot(&self, record: InstanceRecord) -> Result<Outcome> {
        let current = self.provider.describe_instance(&record.id).await?;

        if self.provider.phase(&current.state) == InstancePhase::Running {
            tracing::info!(id = %record.id, "Instance already running");
            let record = self.settle(refresh(record, current)).await?;
            return Ok(Outcome::AlreadyRunning(record));
        }

        tracing::info!(id = %record.id, state = %current.state, "Starting instance");
        self.provider.start(&record.id).await?;

        let snapshot = self.converge(&record.id, InstancePhase::Running).await?;
        let record = self.settle(refresh(record, snapshot)).await?;

        Ok(Outcome::Started(record))
    }

    /// Probe the running instance, then persist it.
    ///
    /// The record is saved even when the probe gives up, so a later command
    /// can still find the instance.
    async fn settle(&self, record: InstanceRecord) -> Result<InstanceRecord> {
        let Some(host) = record
            .ip_address
            .clone()
            .or_else(|| record.public_dns_name.clone())
        else {
            self.store.save(&record).await?;
            return Err(CloudError::Api(format!(
                "instance {} has no public address",
                record.id
            )));
        };

        let port = self.options.ssh_port;
        let limit = self.options.reachability_timeout;
        tracing::info!(host = %host, port, "Waiting for SSH");
        let reachable = self.probe.wait_until_reachable(&host, port, limit).await;

        self.store.save(&record).await?;

        if !reachable {
            return Err(CloudError::ReachabilityTimeout {
                host,
                port,
                timeout_secs: limit.as_secs(),
            });
        }
        Ok(record)
    }

    /// Power off the tracked instance. Succeeds without any call when
    /// nothing is tracked.
    pub async fn halt(&self) -> Result<Outcome> {
        let Some(record) = self.store.load().await? else {
            tracing::info!("No instance tracked, nothing to halt");
            return Ok(Outcome::NothingTracked);
        };
        self.check_kind(&record)?;

        tracing::info!(id = %record.id, "Stopping instance");
        self.provider.stop(&record.id).await?;

        let snapshot = self.converge(&record.id, InstancePhase::Stopped).await?;
        let record = refresh(record, snapshot);
        self.store.save(&record).await?;

        Ok(Outcome::Stopped(record))
    }

    /// Delete the tracked instance and its volume, then forget it
    pub async fn destroy(&self) -> Result<Outcome> {
        let Some(record) = self.store.load().await? else {
            tracing::info!("No instance tracked, nothing to destroy");
            return Ok(Outcome::NothingTracked);
        };
        self.check_kind(&record)?;

        let volume_id = match self.provider.describe_instance(&record.id).await {
            Ok(current) => {
                let volume_id =
                    non_empty(current.volume_id).or_else(|| record.volume_id.clone());
                tracing::info!(id = %record.id, "Deleting instance");
                self.provider.delete(&record.id).await?;
                self.wait_until_gone(&record.id).await?;
                volume_id
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(id = %record.id, "Instance already gone upstream");
                record.volume_id.clone()
            }
            Err(e) => return Err(e),
        };

        if let Some(volume) = &volume_id {
            match self.provider.delete_volume(volume).await {
                Ok(()) => tracing::info!(volume = %volume, "Deleted volume"),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(volume = %volume, "Volume already deleted")
                }
                Err(e) => return Err(e),
            }
        }

        self.store.clear().await?;

        Ok(Outcome::Destroyed {
            id: record.id,
            volume_id,
        })
    }

    /// Read-only view of the tracked instance.
    ///
    /// The returned record carries the provider's current state but is not
    /// persisted.
    pub async fn status(&self) -> Result<(InstanceRecord, InstancePhase)> {
        let record = self.tracked().await?;
        let snapshot = self.provider.describe_instance(&record.id).await?;
        let phase = self.provider.phase(&snapshot.state);
        Ok((refresh(record, snapshot), phase))
    }

    /// Snapshot the tracked instance into an image and wait until the
    /// provider marks it available.
    pub async fn create_image(&self, name: &str, description: &str) -> Result<String> {
        let record = self.tracked().await?;

        tracing::info!(id = %record.id, name, "Creating image");
        let image_id = self
            .provider
            .create_image(&record.id, name, description)
            .await?;

        let policy = self.image_poll_policy();
        let mut last_state = String::new();

        for attempt in 1..=policy.max_attempts {
            last_state = self.provider.describe_image(&image_id).await?;
            tracing::info!(image = %image_id, state = %last_state, attempt, "Image state");

            match self.provider.image_phase(&last_state) {
                ImagePhase::Available => return Ok(image_id),
                ImagePhase::Failed => {
                    return Err(CloudError::ProvisioningFailed {
                        resource: format!("image {}", image_id),
                        state: last_state,
                    });
                }
                ImagePhase::Building => {}
            }

            if attempt < policy.max_attempts {
                sleep(policy.interval).await;
            }
        }

        Err(CloudError::ReconciliationTimeout {
            resource: format!("image {}", image_id),
            desired: "available".to_string(),
            attempts: policy.max_attempts,
            last_state,
        })
    }

    /// Poll until the instance reports `desired`
    async fn converge(&self, id: &str, desired: InstancePhase) -> Result<InstanceSnapshot> {
        let policy = self.poll_policy();
        let mut last_state = String::new();

        for attempt in 1..=policy.max_attempts {
            let snapshot = self.provider.describe_instance(id).await?;
            let phase = self.provider.phase(&snapshot.state);
            tracing::info!(id, state = %snapshot.state, attempt, "Instance state");

            if phase == desired {
                return Ok(snapshot);
            }
            if phase == InstancePhase::Failed || phase == InstancePhase::Terminated {
                return Err(CloudError::ProvisioningFailed {
                    resource: format!("instance {}", id),
                    state: snapshot.state,
                });
            }

            last_state = snapshot.state;
            if attempt < policy.max_attempts {
                sleep(policy.interval).await;
            }
        }

        Err(CloudError::ReconciliationTimeout {
            resource: format!("instance {}", id),
            desired: desired.to_string(),
            attempts: policy.max_attempts,
            last_state,
        })
    }

    /// Poll until the instance is terminated or unknown to the provider.
    ///
    /// Every other phase counts as still deleting, `Failed` included: Nova
    /// reports `ERROR` on a broken server until the delete lands.
    async fn wait_until_gone(&self, id: &str) -> Result<()> {
        let policy = self.poll_policy();
        let mut last_state = String::new();

        for attempt in 1..=policy.max_attempts {
            match self.provider.describe_instance(id).await {
                Ok(snapshot) => {
                    tracing::info!(id, state = %snapshot.state, attempt, "Instance state");
                    if self.provider.phase(&snapshot.state) == InstancePhase::Terminated {
                        return Ok(());
                    }
                    last_state = snapshot.state;
                }
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e),
            }

            if attempt < policy.max_attempts {
                sleep(policy.interval).await;
            }
        }

        Err(CloudError::ReconciliationTimeout {
            resource: format!("instance {}", id),
            desired: InstancePhase::Terminated.to_string(),
            attempts: policy.max_attempts,
            last_state,
        })
    }
}

fn record_from(
    id: &str,
    kind: crate::record::CloudKind,
    snapshot: InstanceSnapshot,
) -> InstanceRecord {
    refresh(InstanceRecord::new(id, kind, String::new()), snapshot)
}

/// Overwrite every mutable field with what the provider just reported
fn refresh(mut record: InstanceRecord, snapshot: InstanceSnapshot) -> InstanceRecord {
    record.state = snapshot.state;
    record.ip_address = snapshot.ip_address;
    record.volume_id = non_empty(snapshot.volume_id);
    record.public_dns_name = non_empty(snapshot.public_dns_name);
    record
}
