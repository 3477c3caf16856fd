// # Neutron Floating IP API
//
// OpenStack Networking (Neutron) v2.0 implementation of `FloatingIpApi`.
//
// ## Behaviour
//
// - One HTTP request per trait call (one per page for list), no retries
//   (the manager owns polling)
// - 30 second HTTP timeout
// - HTTP status codes mapped onto typed errors (401/403, 404, 409, 429, 5xx)
// - The auth token never appears in logs or Debug output
//
// ## API Reference
//
// - List:   GET    `/v2.0/floatingips?floating_ip_address=...`, following
//           `floatingips_links` while the server paginates
// - Create: POST   `/v2.0/floatingips`
// - Show:   GET    `/v2.0/floatingips/:id`
// - Update: PUT    `/v2.0/floatingips/:id`
// - Delete: DELETE `/v2.0/floatingips/:id`
//
// Authentication is a pre-issued Keystone token sent as `X-Auth-Token`.

use async_trait::async_trait;
use fip_core::config::ApiConfig;
use fip_core::traits::{
    BindRequest, CreateRequest, FloatingIp, FloatingIpApi, FloatingIpApiFactory, ListFilter,
};
use fip_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const AUTH_HEADER: &str = "X-Auth-Token";

/// Neutron floating IP API
///
/// # Security
///
/// The Debug implementation does not expose the auth token.
pub struct NeutronApi {
    /// `<endpoint>/v2.0/floatingips`
    collection: reqwest::Url,

    /// Keystone token
    /// ⚠️ NEVER log this value
    token: String,

    client: reqwest::Client,
}

impl std::fmt::Debug for NeutronApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeutronApi")
            .field("collection", &self.collection.as_str())
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl NeutronApi {
    /// Create a new Neutron API client
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Networking endpoint, e.g. `https://network.example.com:9696`
    /// - `token`: Pre-issued Keystone token
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        let token = token.into();
        if token.is_empty() {
            return Err(Error::config("Neutron token cannot be empty"));
        }

        let mut collection = reqwest::Url::parse(&endpoint)
            .map_err(|e| Error::config(format!("Invalid Neutron endpoint '{}': {}", endpoint, e)))?;
        collection
            .path_segments_mut()
            .map_err(|()| Error::config(format!("Neutron endpoint '{}' cannot be a base URL", endpoint)))?
            .pop_if_empty()
            .extend(["v2.0", "floatingips"]);

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            collection,
            token,
            client,
        })
    }

    fn collection_url(&self) -> reqwest::Url {
        self.collection.clone()
    }

    /// The id is pushed as a single, percent-encoded path segment
    fn resource_url(&self, id: &str) -> reqwest::Url {
        let mut url = self.collection.clone();
        // `collection` was checked to be a base URL in `new`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(id);
        }
        url
    }

    /// Send a request and turn non-2xx responses into typed errors
    async fn execute(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = request
            .header(AUTH_HEADER, &self.token)
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        Err(status_error(status.as_u16(), what, &body))
    }

    async fn read_one(&self, response: reqwest::Response, what: &str) -> Result<FloatingIp> {
        let envelope: SingleEnvelope = response
            .json()
            .await
            .map_err(|e| Error::http(format!("Failed to parse {} response: {}", what, e)))?;
        Ok(envelope.floatingip.into())
    }
}

#[async_trait]
impl FloatingIpApi for NeutronApi {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<FloatingIp>> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(address) = &filter.address {
            query.push(("floating_ip_address", address.as_str()));
        }
        if let Some(port_id) = &filter.port_id {
            query.push(("port_id", port_id.as_str()));
        }

        tracing::debug!(?filter, "Listing floating IPs");

        let mut request = self.client.get(self.collection_url()).query(&query);
        let mut floating_ips = Vec::new();
        loop {
            let response = self.execute(request, "list floating IPs").await?;
            let page: ListEnvelope = response
                .json()
                .await
                .map_err(|e| Error::http(format!("Failed to parse list response: {}", e)))?;

            // An empty page ends the listing even if it links onwards
            let next = match page.next_link() {
                Some(href) if !page.floatingips.is_empty() => Some(
                    self.collection
                        .join(href)
                        .map_err(|e| Error::http(format!("Invalid next link '{}': {}", href, e)))?,
                ),
                _ => None,
            };
            floating_ips.extend(page.floatingips.into_iter().map(FloatingIp::from));

            match next {
                Some(url) => {
                    tracing::debug!(next = %url, "Following floating IP list page");
                    request = self.client.get(url);
                }
                None => return Ok(floating_ips),
            }
        }
    }

    async fn create(&self, request: &CreateRequest) -> Result<FloatingIp> {
        tracing::debug!(
            network_id = %request.network_id,
            address = request.address.as_deref().unwrap_or("<any>"),
            "Creating floating IP"
        );

        let body = CreateBody::from(request);
        let http = self.client.post(self.collection_url()).json(&body);
        let response = self.execute(http, "create floating IP").await?;
        self.read_one(response, "create").await
    }

    async fn update(&self, request: &BindRequest) -> Result<FloatingIp> {
        tracing::debug!(
            id = %request.floating_ip_id,
            port_id = request.port_id.as_deref().unwrap_or("<none>"),
            "Updating floating IP port"
        );

        let body = UpdateBody::from(request);
        let http = self
            .client
            .put(self.resource_url(&request.floating_ip_id))
            .json(&body);
        let response = self.execute(http, "update floating IP").await?;
        self.read_one(response, "update").await
    }

    async fn get(&self, id: &str) -> Result<FloatingIp> {
        let http = self.client.get(self.resource_url(id));
        let response = self.execute(http, "get floating IP").await?;
        self.read_one(response, "get").await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        tracing::debug!(id, "Deleting floating IP");
        let http = self.client.delete(self.resource_url(id));
        self.execute(http, "delete floating IP").await?;
        Ok(())
    }

    fn api_name(&self) -> &'static str {
        "neutron"
    }
}

/// Map a non-2xx status onto a typed error
fn status_error(status: u16, what: &str, body: &str) -> Error {
    let detail = neutron_message(body).unwrap_or_else(|| body.trim().to_string());
    match status {
        401 | 403 => Error::permission_denied(format!("{}: {} ({})", what, detail, status)),
        404 => Error::not_found(format!("{}: {}", what, detail)),
        409 => Error::conflict(format!("{}: {}", what, detail)),
        429 => Error::rate_limited(format!("{}: {}", what, detail)),
        500..=599 => Error::api(format!("{}: server error (transient) {} - {}", what, status, detail)),
        _ => Error::api(format!("{}: {} - {}", what, status, detail)),
    }
}

/// Pull `NeutronError.message` out of an error body, if present
fn neutron_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("NeutronError")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

// Wire types

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    floatingips: Vec<WireFloatingIp>,
    #[serde(default)]
    floatingips_links: Vec<Link>,
}

impl ListEnvelope {
    fn next_link(&self) -> Option<&str> {
        self.floatingips_links
            .iter()
            .find(|link| link.rel == "next")
            .map(|link| link.href.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct SingleEnvelope {
    floatingip: WireFloatingIp,
}

#[derive(Debug, Deserialize)]
struct WireFloatingIp {
    id: String,
    floating_ip_address: String,
    floating_network_id: String,
    #[serde(default)]
    port_id: Option<String>,
    status: String,
    #[serde(default)]
    fixed_ip_address: Option<String>,
    #[serde(default)]
    router_id: Option<String>,
    #[serde(default, alias = "tenant_id")]
    project_id: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl From<WireFloatingIp> for FloatingIp {
    fn from(wire: WireFloatingIp) -> Self {
        let mut fip = FloatingIp::new(
            wire.id,
            wire.floating_ip_address,
            wire.floating_network_id,
            wire.status.into(),
        );
        fip.port_id = wire.port_id;
        fip.fixed_address = wire.fixed_ip_address;
        fip.router_id = wire.router_id;
        fip.project_id = wire.project_id;
        fip.description = wire.description.filter(|d| !d.is_empty());
        fip
    }
}

#[derive(Debug, Serialize)]
struct CreateBody<'a> {
    floatingip: CreateFields<'a>,
}

#[derive(Debug, Serialize)]
struct CreateFields<'a> {
    floating_network_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    floating_ip_address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl<'a> From<&'a CreateRequest> for CreateBody<'a> {
    fn from(request: &'a CreateRequest) -> Self {
        Self {
            floatingip: CreateFields {
                floating_network_id: &request.network_id,
                floating_ip_address: request.address.as_deref(),
                description: request.description.as_deref(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct UpdateBody<'a> {
    floatingip: UpdateFields<'a>,
}

#[derive(Debug, Serialize)]
struct UpdateFields<'a> {
    // Serialized as null to unbind
    port_id: Option<&'a str>,
}

impl<'a> From<&'a BindRequest> for UpdateBody<'a> {
    fn from(request: &'a BindRequest) -> Self {
        Self {
            floatingip: UpdateFields {
                port_id: request.port_id.as_deref(),
            },
        }
    }
}

/// Factory for creating Neutron APIs
pub struct NeutronApiFactory;

impl FloatingIpApiFactory for NeutronApiFactory {
    fn create(&self, config: &ApiConfig) -> Result<Box<dyn FloatingIpApi>> {
        match config {
            ApiConfig::Neutron { endpoint, token } => {
                config.validate()?;
                Ok(Box::new(NeutronApi::new(endpoint.clone(), token.clone())?))
            }
            _ => Err(Error::config("Invalid config for Neutron API")),
        }
    }
}

/// Register the Neutron API with a registry
///
/// # Example
///
/// ```rust
/// use fip_core::ApiRegistry;
///
/// let registry = ApiRegistry::with_builtin();
/// fip_provider_neutron::register(&registry);
/// assert!(registry.has_api("neutron"));
/// ```
pub fn register(registry: &fip_core::ApiRegistry) {
    registry.register_api("neutron", Box::new(NeutronApiFactory));
}
