// # Floating IP API Trait
//
// Defines the interface to the remote service that owns floating IP resources.
//
// ## Implementations
//
// - OpenStack Networking v2.0: `fip-provider-neutron` crate
// - In-process simulation: `fip_core::api::MemoryFloatingIpApi`
//
// ## Usage
//
// ```rust,ignore
// use fip_core::traits::{FloatingIpApi, ListFilter};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let api = /* FloatingIpApi implementation */;
//
//     let matches = api.list(&ListFilter::by_address("203.0.113.7")).await?;
//     println!("{} match(es)", matches.len());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status reported by the remote for a floating IP
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FloatingIpStatus {
    /// Bound and routing traffic
    Active,
    /// Not bound, or binding not yet applied
    Down,
    /// The remote failed to apply the last change
    Error,
    /// Any other (transient) value, kept verbatim
    Other(String),
}

impl FloatingIpStatus {
    /// Upper-case wire form of the status
    pub fn as_str(&self) -> &str {
        match self {
            FloatingIpStatus::Active => "ACTIVE",
            FloatingIpStatus::Down => "DOWN",
            FloatingIpStatus::Error => "ERROR",
            FloatingIpStatus::Other(s) => s,
        }
    }
}

impl From<String> for FloatingIpStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "ACTIVE" => FloatingIpStatus::Active,
            "DOWN" => FloatingIpStatus::Down,
            "ERROR" => FloatingIpStatus::Error,
            _ => FloatingIpStatus::Other(value),
        }
    }
}

impl From<&str> for FloatingIpStatus {
    fn from(value: &str) -> Self {
        FloatingIpStatus::from(value.to_string())
    }
}

impl From<FloatingIpStatus> for String {
    fn from(status: FloatingIpStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for FloatingIpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a remote floating IP
///
/// The remote owns this resource. A value of this type is whatever the last
/// call returned and may already be stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatingIp {
    /// Remote-assigned identifier
    pub id: String,
    /// Dotted-decimal address
    pub address: String,
    /// External network the address was allocated from
    pub network_id: String,
    /// Port the address is bound to, if any
    pub port_id: Option<String>,
    /// Last reported status
    pub status: FloatingIpStatus,
    /// Internal address traffic is forwarded to
    #[serde(default)]
    pub fixed_address: Option<String>,
    /// Router performing the translation
    #[serde(default)]
    pub router_id: Option<String>,
    /// Owning project
    #[serde(default)]
    pub project_id: Option<String>,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
}

impl FloatingIp {
    /// Create a snapshot with the mandatory attributes
    pub fn new(
        id: impl Into<String>,
        address: impl Into<String>,
        network_id: impl Into<String>,
        status: FloatingIpStatus,
    ) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            network_id: network_id.into(),
            port_id: None,
            status,
            fixed_address: None,
            router_id: None,
            project_id: None,
            description: None,
        }
    }

    /// Set the bound port
    pub fn with_port(mut self, port_id: impl Into<String>) -> Self {
        self.port_id = Some(port_id.into());
        self
    }

    /// Whether the snapshot is bound to the given port
    pub fn is_bound_to(&self, port_id: &str) -> bool {
        self.port_id.as_deref() == Some(port_id)
    }
}

/// Filter for listing floating IPs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Exact address match
    pub address: Option<String>,
    /// Bound port match
    pub port_id: Option<String>,
}

impl ListFilter {
    /// Filter on an exact address
    pub fn by_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            port_id: None,
        }
    }

    /// Whether a snapshot passes the filter
    pub fn matches(&self, fip: &FloatingIp) -> bool {
        self.address.as_ref().is_none_or(|a| *a == fip.address)
            && self
                .port_id
                .as_ref()
                .is_none_or(|p| fip.port_id.as_ref() == Some(p))
    }
}

/// Request to allocate a floating IP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// External network to allocate from
    pub network_id: String,
    /// Pinned address; `None` lets the remote choose
    pub address: Option<String>,
    /// Free-form description
    pub description: Option<String>,
}

impl CreateRequest {
    /// Build a request, pinning the address only when it is non-empty
    pub fn new(network_id: impl Into<String>, address: &str) -> Self {
        Self {
            network_id: network_id.into(),
            address: (!address.is_empty()).then(|| address.to_string()),
            description: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Request to change the port a floating IP is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
    /// Floating IP identifier
    pub floating_ip_id: String,
    /// Target port; `None` unbinds
    pub port_id: Option<String>,
}

impl BindRequest {
    /// Bind `floating_ip_id` to `port_id`
    pub fn bind(floating_ip_id: impl Into<String>, port_id: impl Into<String>) -> Self {
        Self {
            floating_ip_id: floating_ip_id.into(),
            port_id: Some(port_id.into()),
        }
    }

    /// Clear the port of `floating_ip_id`
    pub fn unbind(floating_ip_id: impl Into<String>) -> Self {
        Self {
            floating_ip_id: floating_ip_id.into(),
            port_id: None,
        }
    }
}

/// Trait for remote floating IP services
///
/// Each method is a single remote call. Implementations must not retry,
/// sleep, or cache: retry and convergence policy is owned by
/// [`FloatingIpManager`](crate::FloatingIpManager).
///
/// # Errors
///
/// Implementations map remote rejections onto the transport-class variants
/// of [`Error`](crate::Error): `PermissionDenied` for authorization
/// failures, `NotFound`, `Conflict`, `RateLimited`, and `Api`/`Http` for
/// everything else.
#[async_trait]
pub trait FloatingIpApi: Send + Sync {
    /// List floating IPs matching `filter`, in remote order
    async fn list(&self, filter: &ListFilter) -> Result<Vec<FloatingIp>, crate::Error>;

    /// Allocate a floating IP
    async fn create(&self, request: &CreateRequest) -> Result<FloatingIp, crate::Error>;

    /// Change the bound port and return the updated snapshot
    async fn update(&self, request: &BindRequest) -> Result<FloatingIp, crate::Error>;

    /// Fetch a floating IP by identifier
    async fn get(&self, id: &str) -> Result<FloatingIp, crate::Error>;

    /// Release a floating IP by identifier
    async fn delete(&self, id: &str) -> Result<(), crate::Error>;

    /// Name of the implementation (for logging)
    fn api_name(&self) -> &'static str;
}

/// Helper trait for constructing remote APIs from configuration
pub trait FloatingIpApiFactory: Send + Sync {
    /// Create a FloatingIpApi instance from configuration
    fn create(
        &self,
        config: &crate::config::ApiConfig,
    ) -> Result<Box<dyn FloatingIpApi>, crate::Error>;
}
