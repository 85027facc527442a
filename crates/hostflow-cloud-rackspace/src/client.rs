//! Rackspace implementation of [`ProviderClient`]

use crate::error::{RackspaceError, Result};
use crate::identity::{Session, authenticate};
use crate::nova::{
    CreateImageResponse, CreateServer, CreateServerRequest, FlavorList, ImageEnvelope, ImageList,
    NamedResource, ServerEnvelope, id_from_location,
};
use async_trait::async_trait;
use hostflow_cloud::{
    CloudError, CloudKind, ImagePhase, InstancePhase, InstanceSnapshot, InstanceSpec, PollPolicy,
    ProviderClient,
};
use hostflow_config::RackspaceSettings;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::OnceCell;

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Nova API client
///
/// Authentication happens lazily on the first request and the token is
/// reused for the rest of the process.
pub struct RackspaceClient {
    http: reqwest::Client,
    settings: RackspaceSettings,
    session: OnceCell<Session>,
}

impl RackspaceClient {
    pub fn new(settings: RackspaceSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
            session: OnceCell::new(),
        }
    }

    /// Client with an already authenticated session
    pub fn with_session(settings: RackspaceSettings, session: Session) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
            session: OnceCell::new_with(Some(session)),
        }
    }

    pub fn settings(&self) -> &RackspaceSettings {
        &self.settings
    }

    async fn session(&self) -> Result<&Session> {
        self.session
            .get_or_try_init(|| authenticate(&self.http, &self.settings))
            .await
    }

    /// Send an authenticated request; 404 becomes `NotFound(resource)`
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        resource: &str,
    ) -> Result<reqwest::Response> {
        let session = self.session().await?;
        let url = format!("{}{}", session.compute_url, path);

        tracing::debug!("{} {}", method, url);
        let mut request = self
            .http
            .request(method, &url)
            .header(AUTH_TOKEN_HEADER, &session.token)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(RackspaceError::NotFound(resource.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RackspaceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, resource: &str) -> Result<T> {
        let response = self.request(Method::GET, path, None, resource).await?;
        Ok(response.json().await?)
    }

    async fn server_action(&self, id: &str, action: Value) -> Result<()> {
        self.request(
            Method::POST,
            &format!("/servers/{}/action", id),
            Some(&action),
            &format!("server {}", id),
        )
        .await?;
        Ok(())
    }

    async fn find_flavor(&self, name: &str) -> Result<NamedResource> {
        let list: FlavorList = self.get_json("/flavors", "flavors").await?;
        find_by_name(list.flavors, name).ok_or_else(|| RackspaceError::FlavorNotFound(name.to_string()))
    }

    async fn find_image(&self, name: &str) -> Result<NamedResource> {
        let list: ImageList = self.get_json("/images/detail", "images").await?;
        find_by_name(list.images, name).ok_or_else(|| RackspaceError::ImageNotFound(name.to_string()))
    }
}

fn find_by_name(resources: Vec<NamedResource>, name: &str) -> Option<NamedResource> {
    resources.into_iter().find(|r| r.name == name || r.id == name)
}

#[async_trait]
impl ProviderClient for RackspaceClient {
    fn kind(&self) -> CloudKind {
        CloudKind::Rackspace
    }

    fn display_name(&self) -> &str {
        "Rackspace"
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(Duration::from_secs(5), 180)
    }

    fn phase(&self, state: &str) -> InstancePhase {
        crate::nova::server_phase(state)
    }

    fn image_phase(&self, state: &str) -> ImagePhase {
        crate::nova::image_phase(state)
    }

    async fn create_instance(&self, spec: &InstanceSpec) -> hostflow_cloud::Result<String> {
        let flavor_name = spec.size.as_deref().unwrap_or(&self.settings.flavor);
        let image_name = spec.image.as_deref().unwrap_or(&self.settings.image);
        let name = spec
            .name
            .clone()
            .unwrap_or_else(|| self.settings.instance_name.clone());

        let flavor = self.find_flavor(flavor_name).await?;
        let image = self.find_image(image_name).await?;

        tracing::info!(
            name = %name,
            flavor = %flavor.name,
            image = %image.name,
            "Creating server"
        );

        let request = CreateServerRequest {
            server: CreateServer {
                name,
                image_ref: image.id,
                flavor_ref: flavor.id,
                key_name: self.settings.key_pair.clone(),
                availability_zone: self.settings.region.clone(),
            },
        };

        let body = serde_json::to_value(&request).map_err(RackspaceError::from)?;
        let response = self
            .request(Method::POST, "/servers", Some(&body), "servers")
            .await?;
        let created: ServerEnvelope = response.json().await.map_err(RackspaceError::from)?;

        tracing::info!(id = %created.server.id, "Server create accepted");
        Ok(created.server.id)
    }

    async fn describe_instance(&self, id: &str) -> hostflow_cloud::Result<InstanceSnapshot> {
        let envelope: ServerEnvelope = self
            .get_json(&format!("/servers/{}", id), &format!("server {}", id))
            .await?;
        let server = envelope.server;

        Ok(InstanceSnapshot {
            ip_address: server.public_ipv4(),
            state: server.status,
            volume_id: None,
            public_dns_name: None,
        })
    }

    async fn start(&self, id: &str) -> hostflow_cloud::Result<()> {
        // Nova has no plain power-on for Rackspace servers; a hard reboot boots it
        self.server_action(id, json!({"reboot": {"type": "HARD"}}))
            .await?;
        Ok(())
    }

    async fn stop(&self, id: &str) -> hostflow_cloud::Result<()> {
        // Nova answers 409 when the server is already SHUTOFF
        match self.server_action(id, json!({"os-stop": null})).await {
            Ok(()) => Ok(()),
            Err(RackspaceError::Api { status: 409, body }) => {
                tracing::debug!(id, %body, "Server already stopped");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &str) -> hostflow_cloud::Result<()> {
        self.request(
            Method::DELETE,
            &format!("/servers/{}", id),
            None,
            &format!("server {}", id),
        )
        .await?;
        Ok(())
    }

    async fn delete_volume(&self, _volume_id: &str) -> hostflow_cloud::Result<()> {
        Err(CloudError::Unsupported {
            provider: self.display_name().to_string(),
            operation: "delete_volume".to_string(),
        })
    }

    async fn create_image(
        &self,
        id: &str,
        name: &str,
        description: &str,
    ) -> hostflow_cloud::Result<String> {
        let action = json!({
            "createImage": {
                "name": name,
                "metadata": {"description": description},
            }
        });

        let response = self
            .request(
                Method::POST,
                &format!("/servers/{}/action", id),
                Some(&action),
                &format!("server {}", id),
            )
            .await?;

        let from_header = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(id_from_location);
        if let Some(image_id) = from_header {
            return Ok(image_id);
        }

        let text = response.text().await.map_err(RackspaceError::from)?;
        let body: CreateImageResponse = serde_json::from_str(&text).map_err(|_| {
            RackspaceError::UnexpectedResponse(format!("createImage returned no image id: {}", text))
        })?;
        Ok(body.image_id)
    }

    async fn describe_image(&self, image_id: &str) -> hostflow_cloud::Result<String> {
        let envelope: ImageEnvelope = self
            .get_json(&format!("/images/{}", image_id), &format!("image {}", image_id))
            .await?;
        Ok(envelope.image.status)
    }
}
