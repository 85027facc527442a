//! Keystone v2 authentication
//!
//! Exchanges credentials for a token and picks the compute endpoint for the
//! configured region out of the service catalog.

use crate::error::{RackspaceError, Result};
use hostflow_config::RackspaceSettings;
use serde::Deserialize;
use serde_json::{Value, json};

/// Authenticated token plus the compute endpoint it is valid for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub compute_url: String,
}

/// Build the `/tokens` request body for the configured auth system
pub fn auth_body(settings: &RackspaceSettings) -> Result<Value> {
    let username = settings
        .username
        .as_deref()
        .ok_or_else(|| RackspaceError::MissingCredentials("username (OS_USERNAME)".to_string()))?;

    if settings.auth_system.eq_ignore_ascii_case("rackspace") {
        // Rackspace accepts the API key; OS_PASSWORD is the usual place for it
        let api_key = settings
            .api_key
            .as_deref()
            .or(settings.password.as_deref())
            .ok_or_else(|| {
                RackspaceError::MissingCredentials("api key (OS_API_KEY or OS_PASSWORD)".to_string())
            })?;

        Ok(json!({
            "auth": {
                "RAX-KSKEY:apiKeyCredentials": {
                    "username": username,
                    "apiKey": api_key,
                }
            }
        }))
    } else {
        let password = settings
            .password
            .as_deref()
            .ok_or_else(|| RackspaceError::MissingCredentials("password (OS_PASSWORD)".to_string()))?;

        Ok(json!({
            "auth": {
                "passwordCredentials": {
                    "username": username,
                    "password": password,
                }
            }
        }))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    #[serde(default)]
    region: Option<String>,
    #[serde(rename = "publicURL")]
    public_url: String,
}

/// Parse a `/tokens` response into a [`Session`]
pub fn parse_token_response(body: &str, region: Option<&str>) -> Result<Session> {
    let response: TokenResponse = serde_json::from_str(body)?;

    let mut endpoints = response
        .access
        .service_catalog
        .iter()
        .filter(|entry| entry.service_type == "compute")
        .flat_map(|entry| entry.endpoints.iter());

    let endpoint = match region {
        Some(wanted) => endpoints.find(|e| {
            e.region
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case(wanted))
        }),
        None => endpoints.next(),
    }
    .ok_or_else(|| RackspaceError::NoComputeEndpoint {
        region: region.unwrap_or("any").to_string(),
    })?;

    Ok(Session {
        token: response.access.token.id,
        compute_url: endpoint.public_url.trim_end_matches('/').to_string(),
    })
}

/// Authenticate against the identity service
pub async fn authenticate(
    http: &reqwest::Client,
    settings: &RackspaceSettings,
) -> Result<Session> {
    let url = format!("{}/tokens", settings.identity_url.trim_end_matches('/'));
    let body = auth_body(settings)?;

    tracing::debug!("Authenticating against {}", url);
    let response = http.post(&url).json(&body).send().await?;

    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(RackspaceError::AuthenticationFailed {
            status: status.as_u16(),
            body: text,
        });
    }

    let session = parse_token_response(&text, settings.region.as_deref())?;
    tracing::info!(endpoint = %session.compute_url, "Authenticated with Rackspace");
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN_RESPONSE: &str = r#"{
        "access": {
            "token": {"id": "tok-123", "expires": "2030-01-01T00:00:00Z"},
            "serviceCatalog": [
                {
                    "name": "cloudFiles",
                    "type": "object-store",
                    "endpoints": [{"region": "DFW", "publicURL": "https://storage.example/v1"}]
                },
                {
                    "name": "cloudServersOpenStack",
                    "type": "compute",
                    "endpoints": [
                        {"region": "DFW", "publicURL": "https://dfw.servers.example/v2/42/"},
                        {"region": "IAD", "publicURL": "https://iad.servers.example/v2/42"}
                    ]
                }
            ]
        }
    }"#;

    fn settings() -> RackspaceSettings {
        RackspaceSettings {
            username: Some("jenkins".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_api_key_auth_body() {
        let mut settings = settings();
        settings.api_key = Some("key-1".to_string());

        let body = auth_body(&settings).unwrap();
        let creds = &body["auth"]["RAX-KSKEY:apiKeyCredentials"];
        assert_eq!(creds["username"], "jenkins");
        assert_eq!(creds["apiKey"], "key-1");
    }

    #[test]
    fn test_api_key_falls_back_to_password() {
        let mut settings = settings();
        settings.password = Some("from-password".to_string());

        let body = auth_body(&settings).unwrap();
        assert_eq!(
            body["auth"]["RAX-KSKEY:apiKeyCredentials"]["apiKey"],
            "from-password"
        );
    }

    #[test]
    fn test_password_auth_body() {
        let mut settings = settings();
        settings.auth_system = "keystone".to_string();
        settings.password = Some("secret".to_string());

        let body = auth_body(&settings).unwrap();
        assert_eq!(body["auth"]["passwordCredentials"]["password"], "secret");
    }

    #[test]
    fn test_missing_credentials() {
        let result = auth_body(&RackspaceSettings::default());
        assert!(matches!(result, Err(RackspaceError::MissingCredentials(_))));

        let result = auth_body(&settings());
        assert!(matches!(result, Err(RackspaceError::MissingCredentials(_))));
    }

    #[test]
    fn test_parse_token_response_selects_region() {
        let session = parse_token_response(TOKEN_RESPONSE, Some("iad")).unwrap();
        assert_eq!(session.token, "tok-123");
        assert_eq!(session.compute_url, "https://iad.servers.example/v2/42");
    }

    #[test]
    fn test_parse_token_response_trims_trailing_slash() {
        let session = parse_token_response(TOKEN_RESPONSE, None).unwrap();
        assert_eq!(session.compute_url, "https://dfw.servers.example/v2/42");
    }

    #[test]
    fn test_parse_token_response_unknown_region() {
        let result = parse_token_response(TOKEN_RESPONSE, Some("SYD"));
        assert!(matches!(
            result,
            Err(RackspaceError::NoComputeEndpoint { ref region }) if region == "SYD"
        ));
    }
}
