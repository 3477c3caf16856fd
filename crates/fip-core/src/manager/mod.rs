//! Floating IP lifecycle manager
//!
//! The FloatingIpManager is responsible for:
//! - Resolving an address to an existing remote floating IP
//! - Allocating a floating IP when none was resolved
//! - Binding a floating IP to a port and waiting for the remote to converge
//! - Releasing a floating IP by address
//!
//! ## Architecture
//!
//! ```text
//!   caller (owns cluster state)
//!        │
//!        ▼
//! ┌────────────────────┐      ┌───────────────┐
//! │ FloatingIpManager  │─────►│ FloatingIpApi │  list / create / update / get / delete
//! │                    │      └───────────────┘
//! │  resolve           │
//! │  ensure            │      ┌───────────────┐
//! │  associate ──wait──│─────►│ EventRecorder │  fire-and-forget audit
//! │  release           │      └───────────────┘
//! └────────────────────┘
//! ```
//!
//! ## Flow
//!
//! 1. `resolve(address)`: skipped for an empty address
//! 2. `ensure(resolved, address, network)`: creates only when nothing resolved
//! 3. `associate(fip, port)`: update, then poll until `ACTIVE`
//!
//! `release(address)` is a separate path: resolve, then delete by identifier.
//!
//! ## Concurrency
//!
//! Nothing here serializes callers. Two tasks calling [`get_or_create`] for
//! the same pinned address at the same moment can both see "absent" and both
//! issue a create. Whether the remote then rejects the second one or hands
//! out a duplicate is up to the remote service.
//!
//! [`get_or_create`]: FloatingIpManager::get_or_create

pub mod convergence;

pub use convergence::{ConvergenceState, ConvergenceWait};

use crate::backoff::BackoffPolicy;
use crate::config::ManagerConfig;
use crate::error::{Error, Result};
use crate::traits::{
    BindRequest, CreateRequest, EventReason, EventRecorder, FloatingIp, FloatingIpApi,
    FloatingIpStatus, LifecycleEvent, ListFilter,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Floating IP lifecycle manager
///
/// Holds the remote API, the audit sink and the polling schedule. All
/// operations take `&self`; the manager can be shared between tasks behind
/// an `Arc`.
pub struct FloatingIpManager {
    /// Remote floating IP service
    api: Box<dyn FloatingIpApi>,

    /// Audit sink for lifecycle events
    recorder: Box<dyn EventRecorder>,

    /// Subject attached to lifecycle events
    subject: String,

    /// Convergence polling schedule
    backoff: BackoffPolicy,
}

impl FloatingIpManager {
    /// Create a new manager
    ///
    /// # Parameters
    ///
    /// - `api`: Remote floating IP service
    /// - `recorder`: Audit sink for lifecycle events
    /// - `config`: Manager configuration (event subject, polling schedule)
    pub fn new(
        api: Box<dyn FloatingIpApi>,
        recorder: Box<dyn EventRecorder>,
        config: ManagerConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            api,
            recorder,
            backoff: config.backoff.to_policy(),
            subject: config.subject,
        })
    }

    /// The polling schedule used by [`associate`](Self::associate)
    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Name of the underlying remote API
    pub fn api_name(&self) -> &'static str {
        self.api.api_name()
    }

    /// Look up the floating IP holding `address`
    ///
    /// An empty address means "no preference" and returns `None` without
    /// calling the remote. If the remote returns several entries for one
    /// address the first is used. Remote errors are returned as-is.
    pub async fn resolve(&self, address: &str) -> Result<Option<FloatingIp>> {
        if address.is_empty() {
            return Ok(None);
        }

        let mut matches = self.api.list(&ListFilter::by_address(address)).await?;
        if matches.is_empty() {
            debug!(address, "No floating IP found for address");
            return Ok(None);
        }

        let fip = matches.swap_remove(0);
        debug!(address, id = %fip.id, status = %fip.status, "Resolved floating IP");
        Ok(Some(fip))
    }

    /// Return `resolved`, or allocate a new floating IP on `network_id`
    ///
    /// A non-empty `address` pins the allocation. Most clouds only allow
    /// that for administrators; a refusal comes back as
    /// [`Error::Create`] wrapping [`Error::PermissionDenied`].
    ///
    /// This is not idempotent on its own: calling it twice with
    /// `resolved = None` creates twice. Use
    /// [`get_or_create`](Self::get_or_create) unless the caller resolved
    /// immediately beforehand.
    pub async fn ensure(
        &self,
        resolved: Option<FloatingIp>,
        address: &str,
        network_id: &str,
    ) -> Result<FloatingIp> {
        if let Some(fip) = resolved {
            return Ok(fip);
        }

        if network_id.is_empty() {
            return Err(Error::invalid_input(
                "an external network ID is required to create a floating IP",
            ));
        }

        let request = CreateRequest::new(network_id, address);
        match self.api.create(&request).await {
            Ok(fip) => {
                info!(address = %fip.address, id = %fip.id, network_id, "Created floating IP");
                self.emit(
                    EventReason::SuccessfulCreateFloatingIp,
                    format!("Created floating IP {} with id {}", fip.address, fip.id),
                );
                Ok(fip)
            }
            Err(e) => {
                let err = Error::create(address, e);
                warn!(address, network_id, error = %err, "Floating IP creation failed");
                self.emit(
                    EventReason::FailedCreateFloatingIp,
                    format!("Failed to create floating IP {}: {}", display_address(address), err),
                );
                Err(err)
            }
        }
    }

    /// Resolve `address`, creating a floating IP when nothing holds it
    pub async fn get_or_create(&self, address: &str, network_id: &str) -> Result<FloatingIp> {
        let resolved = self.resolve(address).await?;
        self.ensure(resolved, address, network_id).await
    }

    /// Bind `fip` to `port_id` and wait until the remote reports `ACTIVE`
    ///
    /// The update is issued exactly once, even for a snapshot that already
    /// shows `port_id`; a failure is wrapped in
    /// [`Error::Associate`] and returned. After a successful update the
    /// floating IP is fetched up to `backoff.steps` times. A fetch error ends
    /// the wait immediately; running out of attempts returns
    /// [`Error::ConvergenceTimeout`].
    ///
    /// The future sleeps between fetches. Dropping it abandons the wait, but
    /// the update already sent is not rolled back.
    pub async fn associate(&self, fip: &FloatingIp, port_id: &str) -> Result<FloatingIp> {
        self.associate_inner(fip, port_id, None).await
    }

    /// Like [`associate`](Self::associate), stopping between fetches once
    /// `cancel` fires
    pub async fn associate_with_cancel(
        &self,
        fip: &FloatingIp,
        port_id: &str,
        cancel: &CancellationToken,
    ) -> Result<FloatingIp> {
        self.associate_inner(fip, port_id, Some(cancel)).await
    }

    async fn associate_inner(
        &self,
        fip: &FloatingIp,
        port_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<FloatingIp> {
        if port_id.is_empty() {
            return Err(Error::invalid_input("port ID cannot be empty"));
        }

        info!(address = %fip.address, id = %fip.id, port_id, "Associating floating IP");

        // The snapshot may be stale, so the update is sent even when it
        // already shows `port_id`
        let id = match self.api.update(&BindRequest::bind(&fip.id, port_id)).await {
            Ok(updated) => updated.id,
            Err(e) => {
                let err = Error::associate(&fip.id, port_id, e);
                self.emit(
                    EventReason::FailedAssociateFloatingIp,
                    format!("Failed to associate floating IP {}: {}", fip.address, err),
                );
                return Err(err);
            }
        };

        info!(id = %id, target_status = %FloatingIpStatus::Active, "Waiting for floating IP");

        let wait = ConvergenceWait::new(id, FloatingIpStatus::Active, &self.backoff);
        match wait.run(self.api.as_ref(), cancel).await {
            Ok(converged) => {
                self.emit(
                    EventReason::SuccessfulAssociateFloatingIp,
                    format!(
                        "Associated floating IP {} with port {}",
                        converged.address, port_id
                    ),
                );
                Ok(converged)
            }
            Err(e) => {
                if !matches!(e, Error::Cancelled { .. }) {
                    self.emit(
                        EventReason::FailedAssociateFloatingIp,
                        format!("Failed to associate floating IP {}: {}", fip.address, e),
                    );
                }
                Err(e)
            }
        }
    }

    /// Unbind `fip` from its port and wait until the remote reports `DOWN`
    ///
    /// The unbind is sent whatever port the snapshot shows.
    pub async fn disassociate(&self, fip: &FloatingIp) -> Result<FloatingIp> {
        self.disassociate_inner(fip, None).await
    }

    /// Like [`disassociate`](Self::disassociate), stopping between fetches
    /// once `cancel` fires
    pub async fn disassociate_with_cancel(
        &self,
        fip: &FloatingIp,
        cancel: &CancellationToken,
    ) -> Result<FloatingIp> {
        self.disassociate_inner(fip, Some(cancel)).await
    }

    async fn disassociate_inner(
        &self,
        fip: &FloatingIp,
        cancel: Option<&CancellationToken>,
    ) -> Result<FloatingIp> {
        info!(
            address = %fip.address,
            id = %fip.id,
            port_id = fip.port_id.as_deref().unwrap_or("<none>"),
            "Disassociating floating IP"
        );

        let updated = self
            .api
            .update(&BindRequest::unbind(&fip.id))
            .await
            .map_err(|e| Error::disassociate(&fip.id, e))?;

        let wait = ConvergenceWait::new(updated.id, FloatingIpStatus::Down, &self.backoff);
        let converged = wait.run(self.api.as_ref(), cancel).await?;

        self.emit(
            EventReason::SuccessfulDisassociateFloatingIp,
            format!("Disassociated floating IP {}", converged.address),
        );
        Ok(converged)
    }

    /// Delete the floating IP holding `address`
    ///
    /// Nothing to delete is a success. Only the identifier returned by the
    /// lookup is deleted; remote errors are returned as-is.
    pub async fn release(&self, address: &str) -> Result<()> {
        let Some(fip) = self.resolve(address).await? else {
            debug!(address, "No floating IP to release");
            return Ok(());
        };

        info!(address = %fip.address, id = %fip.id, "Deleting floating IP");

        match self.api.delete(&fip.id).await {
            Ok(()) => {
                self.emit(
                    EventReason::SuccessfulDeleteFloatingIp,
                    format!("Deleted floating IP {} with id {}", fip.address, fip.id),
                );
                Ok(())
            }
            Err(e) => {
                self.emit(
                    EventReason::FailedDeleteFloatingIp,
                    format!("Failed to delete floating IP {}: {}", fip.address, e),
                );
                Err(e)
            }
        }
    }

    /// Hand an event to the recorder
    fn emit(&self, reason: EventReason, message: String) {
        self.recorder
            .record(LifecycleEvent::new(self.subject.clone(), reason, message));
    }
}

fn display_address(address: &str) -> &str {
    if address.is_empty() { "<any>" } else { address }
}
