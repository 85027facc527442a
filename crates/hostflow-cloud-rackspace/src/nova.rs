//! Nova compute API payloads

use hostflow_cloud::{ImagePhase, InstancePhase};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `{"flavors": [...]}` / `{"images": [...]}` entries
#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct FlavorList {
    pub flavors: Vec<NamedResource>,
}

#[derive(Debug, Deserialize)]
pub struct ImageList {
    pub images: Vec<NamedResource>,
}

/// Body of `POST /servers`
#[derive(Debug, Serialize)]
pub struct CreateServerRequest {
    pub server: CreateServer,
}

#[derive(Debug, Serialize)]
pub struct CreateServer {
    pub name: String,
    #[serde(rename = "imageRef")]
    pub image_ref: String,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ServerEnvelope {
    pub server: Server,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub addresses: HashMap<String, Vec<Address>>,
    #[serde(rename = "accessIPv4", default)]
    pub access_ipv4: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    pub addr: String,
    #[serde(default)]
    pub version: u8,
}

impl Server {
    /// First IPv4 on the `public` network, else `accessIPv4`
    pub fn public_ipv4(&self) -> Option<String> {
        self.addresses
            .get("public")
            .and_then(|addrs| addrs.iter().find(|a| a.version == 4))
            .map(|a| a.addr.clone())
            .or_else(|| self.access_ipv4.clone().filter(|ip| !ip.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageEnvelope {
    pub image: ImageStatus,
}

#[derive(Debug, Deserialize)]
pub struct ImageStatus {
    pub status: String,
}

/// Newer Nova returns the id in the body, older releases only in `Location`
#[derive(Debug, Deserialize)]
pub struct CreateImageResponse {
    pub image_id: String,
}

/// Last path segment of a `Location` header
pub fn id_from_location(location: &str) -> Option<String> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(|id| id.to_string())
}

/// Map a Nova server status onto a lifecycle phase
pub fn server_phase(status: &str) -> InstancePhase {
    match status.to_ascii_uppercase().as_str() {
        "BUILD" | "REBUILD" | "REBOOT" | "HARD_REBOOT" => InstancePhase::Pending,
        "ACTIVE" => InstancePhase::Running,
        "SHUTOFF" | "STOPPED" => InstancePhase::Stopped,
        "DELETED" | "SOFT_DELETED" => InstancePhase::Terminated,
        "ERROR" => InstancePhase::Failed,
        _ => InstancePhase::Other,
    }
}

/// Map a Nova image status onto an image phase
pub fn image_phase(status: &str) -> ImagePhase {
    match status.to_ascii_uppercase().as_str() {
        "ACTIVE" => ImagePhase::Available,
        "ERROR" | "DELETED" | "KILLED" => ImagePhase::Failed,
        _ => ImagePhase::Building,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_ipv4_prefers_public_network() {
        let json = r#"{
            "server": {
                "id": "srv-1",
                "status": "ACTIVE",
                "accessIPv4": "198.51.100.9",
                "addresses": {
                    "private": [{"addr": "10.0.0.2", "version": 4}],
                    "public": [
                        {"addr": "2001:db8::1", "version": 6},
                        {"addr": "203.0.113.5", "version": 4}
                    ]
                }
            }
        }"#;

        let server = serde_json::from_str::<ServerEnvelope>(json).unwrap().server;
        assert_eq!(server.public_ipv4().as_deref(), Some("203.0.113.5"));
    }

    #[test]
    fn test_public_ipv4_falls_back_to_access_ip() {
        let json = r#"{"server": {"id": "srv-1", "status": "BUILD", "accessIPv4": "198.51.100.9", "addresses": {}}}"#;
        let server = serde_json::from_str::<ServerEnvelope>(json).unwrap().server;
        assert_eq!(server.public_ipv4().as_deref(), Some("198.51.100.9"));

        let json = r#"{"server": {"id": "srv-1", "status": "BUILD", "accessIPv4": ""}}"#;
        let server = serde_json::from_str::<ServerEnvelope>(json).unwrap().server;
        assert_eq!(server.public_ipv4(), None);
    }

    #[test]
    fn test_server_phase_mapping() {
        assert_eq!(server_phase("BUILD"), InstancePhase::Pending);
        assert_eq!(server_phase("ACTIVE"), InstancePhase::Running);
        assert_eq!(server_phase("SHUTOFF"), InstancePhase::Stopped);
        assert_eq!(server_phase("ERROR"), InstancePhase::Failed);
        assert_eq!(server_phase("DELETED"), InstancePhase::Terminated);
        assert_eq!(server_phase("HARD_REBOOT"), InstancePhase::Pending);
        assert_eq!(server_phase("MIGRATING"), InstancePhase::Other);
    }

    #[test]
    fn test_image_phase_mapping() {
        assert_eq!(image_phase("SAVING"), ImagePhase::Building);
        assert_eq!(image_phase("active"), ImagePhase::Available);
        assert_eq!(image_phase("ERROR"), ImagePhase::Failed);
    }

    #[test]
    fn test_id_from_location() {
        assert_eq!(
            id_from_location("https://dfw.servers.example/v2/42/images/img-9").as_deref(),
            Some("img-9")
        );
        assert_eq!(id_from_location("").as_deref(), None);
    }

    #[test]
    fn test_create_request_omits_empty_fields() {
        let request = CreateServerRequest {
            server: CreateServer {
                name: "builder".to_string(),
                image_ref: "img-1".to_string(),
                flavor_ref: "2".to_string(),
                key_name: None,
                availability_zone: None,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["server"]["imageRef"], "img-1");
        assert_eq!(json["server"]["flavorRef"], "2");
        assert!(json["server"].get("key_name").is_none());
    }
}
