//! EC2 implementation of [`ProviderClient`]

use crate::error::classify;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::types::{
    BlockDeviceMapping, EbsBlockDevice, InstanceType, ResourceType, Tag, TagSpecification,
};
use hostflow_cloud::{
    CloudError, CloudKind, ImagePhase, InstancePhase, InstanceSnapshot, InstanceSpec, PollPolicy,
    ProviderClient, Result,
};
use hostflow_config::Ec2Settings;
use std::time::Duration;
use tracing::{debug, info};

/// Root device every instance boots from
const ROOT_DEVICE: &str = "/dev/sda1";

/// EC2 API client bound to one region
pub struct Ec2Client {
    client: aws_sdk_ec2::Client,
    settings: Ec2Settings,
}

impl Ec2Client {
    /// Build a client from the default AWS credential chain
    pub async fn new(settings: Ec2Settings) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .load()
            .await;

        debug!(region = %settings.region, "EC2 client initialised");
        Self::from_client(aws_sdk_ec2::Client::new(&config), settings)
    }

    pub fn from_client(client: aws_sdk_ec2::Client, settings: Ec2Settings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &Ec2Settings {
        &self.settings
    }
}

/// Map an EC2 instance state name onto a lifecycle phase
pub fn instance_phase(state: &str) -> InstancePhase {
    match state {
        "pending" => InstancePhase::Pending,
        "running" => InstancePhase::Running,
        "stopping" => InstancePhase::Stopping,
        "stopped" => InstancePhase::Stopped,
        "shutting-down" => InstancePhase::ShuttingDown,
        "terminated" => InstancePhase::Terminated,
        _ => InstancePhase::Other,
    }
}

/// Map an AMI state onto an image phase
pub fn image_phase(state: &str) -> ImagePhase {
    match state {
        "available" => ImagePhase::Available,
        "failed" | "error" | "invalid" | "deregistered" => ImagePhase::Failed,
        _ => ImagePhase::Building,
    }
}

#[async_trait]
impl ProviderClient for Ec2Client {
    fn kind(&self) -> CloudKind {
        CloudKind::Ec2
    }

    fn display_name(&self) -> &str {
        "Amazon EC2"
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(Duration::from_secs(10), 90)
    }

    fn phase(&self, state: &str) -> InstancePhase {
        instance_phase(state)
    }

    fn image_phase(&self, state: &str) -> ImagePhase {
        image_phase(state)
    }

    async fn create_instance(&self, spec: &InstanceSpec) -> Result<String> {
        let ami = spec.image.as_deref().unwrap_or(&self.settings.ami);
        let instance_type = spec
            .size
            .as_deref()
            .unwrap_or(&self.settings.instance_type);
        let name = spec.name.as_deref().unwrap_or(&self.settings.name);

        info!(
            ami = %ami,
            instance_type = %instance_type,
            name = %name,
            "Launching instance"
        );

        let mut request = self
            .client
            .run_instances()
            .image_id(ami)
            .instance_type(InstanceType::from(instance_type))
            .min_count(1)
            .max_count(1)
            .block_device_mappings(
                BlockDeviceMapping::builder()
                    .device_name(ROOT_DEVICE)
                    .ebs(
                        EbsBlockDevice::builder()
                            .volume_size(self.settings.root_volume_gib)
                            .delete_on_termination(false)
                            .build(),
                    )
                    .build(),
            )
            .tag_specifications(
                TagSpecification::builder()
                    .resource_type(ResourceType::Instance)
                    .tags(Tag::builder().key("Name").value(name).build())
                    .build(),
            );

        if let Some(key_pair) = &self.settings.key_pair {
            request = request.key_name(key_pair);
        }

        for group in &self.settings.security_groups {
            request = request.security_groups(group);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify("RunInstances", ami, e))?;

        let instance_id = response
            .instances()
            .first()
            .and_then(|i| i.instance_id())
            .ok_or_else(|| CloudError::Api("RunInstances returned no instance".to_string()))?
            .to_string();

        info!(instance_id = %instance_id, "Instance launched");
        Ok(instance_id)
    }

    async fn describe_instance(&self, id: &str) -> Result<InstanceSnapshot> {
        debug!(instance_id = %id, "DescribeInstances");
        let response = self
            .client
            .describe_instances()
            .instance_ids(id)
            .send()
            .await
            .map_err(|e| classify("DescribeInstances", id, e))?;

        let instance = response
            .reservations()
            .first()
            .and_then(|r| r.instances().first())
            .ok_or_else(|| CloudError::NotFound(id.to_string()))?;

        let state = instance
            .state()
            .and_then(|s| s.name())
            .map(|n| n.as_str().to_string())
            .unwrap_or_else(|| "pending".to_string());

        // Prefer the root device; fall back to whatever EBS volume is attached
        let mappings = instance.block_device_mappings();
        let root = instance.root_device_name();
        let volume_id = mappings
            .iter()
            .find(|m| root.is_some() && m.device_name() == root)
            .or_else(|| mappings.first())
            .and_then(|m| m.ebs())
            .and_then(|ebs| ebs.volume_id())
            .map(|v| v.to_string());

        Ok(InstanceSnapshot {
            state,
            ip_address: instance.public_ip_address().map(|s| s.to_string()),
            volume_id,
            public_dns_name: instance
                .public_dns_name()
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
        })
    }

    async fn start(&self, id: &str) -> Result<()> {
        debug!(instance_id = %id, "StartInstances");
        self.client
            .start_instances()
            .instance_ids(id)
            .send()
            .await
            .map_err(|e| classify("StartInstances", id, e))?;
        Ok(())
    }

    async fn stop(&self, id: &str) -> Result<()> {
        debug!(instance_id = %id, "StopInstances");
        self.client
            .stop_instances()
            .instance_ids(id)
            .send()
            .await
            .map_err(|e| classify("StopInstances", id, e))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        debug!(instance_id = %id, "TerminateInstances");
        self.client
            .terminate_instances()
            .instance_ids(id)
            .send()
            .await
            .map_err(|e| classify("TerminateInstances", id, e))?;
        Ok(())
    }

    async fn delete_volume(&self, volume_id: &str) -> Result<()> {
        debug!(volume_id = %volume_id, "DeleteVolume");
        self.client
            .delete_volume()
            .volume_id(volume_id)
            .send()
            .await
            .map_err(|e| classify("DeleteVolume", volume_id, e))?;
        Ok(())
    }

    async fn create_image(&self, id: &str, name: &str, description: &str) -> Result<String> {
        debug!(instance_id = %id, name = %name, "CreateImage");
        let response = self
            .client
            .create_image()
            .instance_id(id)
            .name(name)
            .description(description)
            .send()
            .await
            .map_err(|e| classify("CreateImage", id, e))?;

        response
            .image_id()
            .map(|s| s.to_string())
            .ok_or_else(|| CloudError::Api("CreateImage returned no image id".to_string()))
    }

    async fn describe_image(&self, image_id: &str) -> Result<String> {
        debug!(image_id = %image_id, "DescribeImages");
        let response = self
            .client
            .describe_images()
            .image_ids(image_id)
            .send()
            .await
            .map_err(|e| classify("DescribeImages", image_id, e))?;

        response
            .images()
            .first()
            .and_then(|i| i.state())
            .map(|s| s.as_str().to_string())
            .ok_or_else(|| CloudError::NotFound(image_id.to_string()))
    }
}
