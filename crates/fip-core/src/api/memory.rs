// # Memory Floating IP API
//
// In-process simulation of a remote floating IP service.
//
// ## Purpose
//
// Gives the manager something realistic to talk to without a cloud:
// - Addresses are handed out sequentially from a /24 pool
// - An address can be held by one floating IP at a time (409 on reuse)
// - Pinned addresses can be refused, as for a non-admin caller
// - Port changes take a configurable number of `get` calls to settle
//
// ## When to Use
//
// - Testing environments
// - Local dry runs of `fipctl`
// - Demonstrating convergence behaviour

use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::ApiConfig;
use crate::traits::floating_ip_api::{
    BindRequest, CreateRequest, FloatingIp, FloatingIpApi, FloatingIpApiFactory,
    FloatingIpStatus, ListFilter,
};
use crate::Error;

/// Default address pool (TEST-NET-3)
const DEFAULT_POOL_PREFIX: &str = "203.0.113.";

#[derive(Debug, Clone)]
struct Entry {
    fip: FloatingIp,
    /// `get` calls that still report the pre-update status
    pending_polls: u32,
}

#[derive(Debug, Default)]
struct State {
    /// Insertion ordered, like a remote listing
    entries: Vec<Entry>,
    next_id: u64,
}

/// In-memory floating IP API
///
/// # Example
///
/// ```rust,no_run
/// use fip_core::api::MemoryFloatingIpApi;
/// use fip_core::traits::{CreateRequest, FloatingIpApi};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let api = MemoryFloatingIpApi::new();
///
///     let fip = api.create(&CreateRequest::new("ext-net", "")).await?;
///     assert_eq!(fip.address, "203.0.113.1");
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryFloatingIpApi {
    inner: Arc<RwLock<State>>,
    pool_prefix: String,
    polls_until_converged: u32,
    allow_pinned: bool,
}

impl MemoryFloatingIpApi {
    /// Create an empty API that settles immediately and accepts pinned addresses
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(State::default())),
            pool_prefix: DEFAULT_POOL_PREFIX.to_string(),
            polls_until_converged: 0,
            allow_pinned: true,
        }
    }

    /// Number of `get` calls after a port change that still report `DOWN`
    pub fn with_polls_until_converged(mut self, polls: u32) -> Self {
        self.polls_until_converged = polls;
        self
    }

    /// Refuse pinned addresses with a permission error
    pub fn with_pinned_addresses_allowed(mut self, allowed: bool) -> Self {
        self.allow_pinned = allowed;
        self
    }

    /// Use a different /24 pool, given as its first three octets plus a dot
    pub fn with_pool_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.pool_prefix = prefix.into();
        self
    }

    /// Insert a pre-existing floating IP, as if created out of band
    pub async fn seed(&self, fip: FloatingIp) {
        let mut guard = self.inner.write().await;
        guard.entries.push(Entry {
            fip,
            pending_polls: 0,
        });
    }

    /// Get the number of floating IPs held
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Check if no floating IPs are held
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    fn allocate(&self, state: &State) -> Option<String> {
        (1..=254)
            .map(|host| format!("{}{}", self.pool_prefix, host))
            .find(|candidate| !state.entries.iter().any(|e| e.fip.address == *candidate))
    }
}

impl Default for MemoryFloatingIpApi {
    fn default() -> Self {
        Self::new()
    }
}

fn settled_status(fip: &FloatingIp) -> FloatingIpStatus {
    if fip.port_id.is_some() {
        FloatingIpStatus::Active
    } else {
        FloatingIpStatus::Down
    }
}

#[async_trait]
impl FloatingIpApi for MemoryFloatingIpApi {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<FloatingIp>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .entries
            .iter()
            .filter(|e| filter.matches(&e.fip))
            .map(|e| e.fip.clone())
            .collect())
    }

    async fn create(&self, request: &CreateRequest) -> Result<FloatingIp, Error> {
        let mut guard = self.inner.write().await;

        let address = match &request.address {
            Some(pinned) => {
                if !self.allow_pinned {
                    return Err(Error::permission_denied(
                        "setting floating_ip_address is restricted to administrators",
                    ));
                }
                if guard.entries.iter().any(|e| e.fip.address == *pinned) {
                    return Err(Error::conflict(format!(
                        "IP address {} already allocated on network {}",
                        pinned, request.network_id
                    )));
                }
                pinned.clone()
            }
            None => self.allocate(&guard).ok_or_else(|| {
                Error::api(format!(
                    "No more IP addresses available on network {}",
                    request.network_id
                ))
            })?,
        };

        guard.next_id += 1;
        let mut fip = FloatingIp::new(
            format!("fip-{}", guard.next_id),
            address,
            request.network_id.clone(),
            FloatingIpStatus::Down,
        );
        fip.description = request.description.clone();

        guard.entries.push(Entry {
            fip: fip.clone(),
            pending_polls: 0,
        });
        Ok(fip)
    }

    async fn update(&self, request: &BindRequest) -> Result<FloatingIp, Error> {
        let mut guard = self.inner.write().await;
        let entry = guard
            .entries
            .iter_mut()
            .find(|e| e.fip.id == request.floating_ip_id)
            .ok_or_else(|| Error::not_found(format!("Floating IP {}", request.floating_ip_id)))?;

        entry.fip.port_id = request.port_id.clone();
        entry.fip.status = FloatingIpStatus::Down;
        entry.pending_polls = self.polls_until_converged;
        if entry.pending_polls == 0 {
            entry.fip.status = settled_status(&entry.fip);
        }
        Ok(entry.fip.clone())
    }

    async fn get(&self, id: &str) -> Result<FloatingIp, Error> {
        let mut guard = self.inner.write().await;
        let entry = guard
            .entries
            .iter_mut()
            .find(|e| e.fip.id == id)
            .ok_or_else(|| Error::not_found(format!("Floating IP {}", id)))?;

        if entry.pending_polls > 0 {
            entry.pending_polls -= 1;
        } else {
            entry.fip.status = settled_status(&entry.fip);
        }
        Ok(entry.fip.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let before = guard.entries.len();
        guard.entries.retain(|e| e.fip.id != id);
        if guard.entries.len() == before {
            return Err(Error::not_found(format!("Floating IP {}", id)));
        }
        Ok(())
    }

    fn api_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for the in-memory API
pub struct MemoryFloatingIpApiFactory;

impl FloatingIpApiFactory for MemoryFloatingIpApiFactory {
    fn create(&self, config: &ApiConfig) -> Result<Box<dyn FloatingIpApi>, Error> {
        match config {
            ApiConfig::Memory => Ok(Box::new(MemoryFloatingIpApi::new())),
            _ => Err(Error::config("Invalid config for memory API")),
        }
    }
}
