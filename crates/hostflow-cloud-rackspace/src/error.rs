//! Rackspace provider error types

use hostflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RackspaceError {
    #[error("Rackspace credentials missing: {0}")]
    MissingCredentials(String),

    #[error("Identity authentication failed ({status}): {body}")]
    AuthenticationFailed { status: u16, body: String },

    #[error("No compute endpoint in the service catalog for region {region}")]
    NoComputeEndpoint { region: String },

    #[error("Flavor not found: {0}")]
    FlavorNotFound(String),

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Nova request failed ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<RackspaceError> for CloudError {
    fn from(err: RackspaceError) -> Self {
        match err {
            RackspaceError::NotFound(resource) => CloudError::NotFound(resource),
            RackspaceError::MissingCredentials(_)
            | RackspaceError::NoComputeEndpoint { .. }
            | RackspaceError::FlavorNotFound(_)
            | RackspaceError::ImageNotFound(_) => CloudError::InvalidConfig(err.to_string()),
            other => CloudError::Api(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RackspaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_cloud_not_found() {
        let err: CloudError = RackspaceError::NotFound("server srv-1".to_string()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_configuration_errors_map_to_invalid_config() {
        let err: CloudError = RackspaceError::FlavorNotFound("8 GB".to_string()).into();
        assert!(matches!(err, CloudError::InvalidConfig(ref m) if m.contains("8 GB")));
    }

    #[test]
    fn test_api_errors_keep_status() {
        let err: CloudError = RackspaceError::Api {
            status: 413,
            body: "over limit".to_string(),
        }
        .into();
        assert!(matches!(err, CloudError::Api(ref m) if m.contains("413")));
    }
}
