//! The locally persisted description of the managed instance

use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Cloud backend an instance lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudKind {
    Ec2,
    Rackspace,
}

impl CloudKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudKind::Ec2 => "ec2",
            CloudKind::Rackspace => "rackspace",
        }
    }
}

impl std::fmt::Display for CloudKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ec2" | "aws" => Ok(CloudKind::Ec2),
            "rackspace" | "openstack" => Ok(CloudKind::Rackspace),
            other => Err(format!(
                "unknown cloud '{}' (expected 'ec2' or 'rackspace')",
                other
            )),
        }
    }
}

/// Single tracked instance.
///
/// `id` never changes once the record exists; every other field is refreshed
/// from the provider on each successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Provider-assigned instance or server id
    pub id: String,

    /// Which provider owns the instance
    #[serde(alias = "cloud_type")]
    pub cloud_kind: CloudKind,

    /// Public IPv4 address, when one is assigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    /// Raw provider status string
    pub state: String,

    /// Attached root volume (EC2 only)
    #[serde(
        default,
        alias = "volume",
        deserialize_with = "empty_as_none",
        skip_serializing_if = "is_blank"
    )]
    pub volume_id: Option<String>,

    /// Public DNS name (EC2 only)
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "is_blank"
    )]
    pub public_dns_name: Option<String>,
}

impl InstanceRecord {
    pub fn new(id: impl Into<String>, cloud_kind: CloudKind, state: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cloud_kind,
            ip_address: None,
            state: state.into(),
            volume_id: None,
            public_dns_name: None,
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// An empty id means "no volume"
    pub fn with_volume(mut self, volume_id: impl Into<String>) -> Self {
        self.volume_id = non_empty(Some(volume_id.into()));
        self
    }
}

/// `Some("")` collapses to `None`
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(str::is_empty)
}

// Older state files stored `""` for "no volume"; treat it as absent.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(non_empty(Option::<String>::deserialize(deserializer)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_kind_parse() {
        assert_eq!("ec2".parse::<CloudKind>().unwrap(), CloudKind::Ec2);
        assert_eq!("Rackspace".parse::<CloudKind>().unwrap(), CloudKind::Rackspace);
        assert!("gce".parse::<CloudKind>().is_err());
    }

    #[test]
    fn test_legacy_record_fields() {
        let json = r#"{
            "id": "i-0abc",
            "cloud_type": "ec2",
            "ip_address": "54.1.2.3",
            "state": "running",
            "volume": "",
            "public_dns_name": "ec2-54-1-2-3.compute-1.amazonaws.com",
            "architecture": "x86_64"
        }"#;

        let record: InstanceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.cloud_kind, CloudKind::Ec2);
        assert_eq!(record.volume_id, None);
        assert_eq!(record.ip_address.as_deref(), Some("54.1.2.3"));
    }

    #[test]
    fn test_record_serializes_without_empty_optionals() {
        let record = InstanceRecord::new("srv-1", CloudKind::Rackspace, "ACTIVE");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["cloud_kind"], "rackspace");
        assert!(json.get("volume_id").is_none());
        assert!(json.get("ip_address").is_none());
    }

    #[test]
    fn test_empty_volume_round_trips() {
        let record = InstanceRecord::new("i-0abc", CloudKind::Ec2, "running").with_volume("");
        assert_eq!(record.volume_id, None);

        let json = serde_json::to_string(&record).unwrap();
        let loaded: InstanceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_blank_optionals_are_not_written() {
        let mut record = InstanceRecord::new("i-0abc", CloudKind::Ec2, "running");
        record.public_dns_name = Some(String::new());

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("public_dns_name").is_none());
    }
}
