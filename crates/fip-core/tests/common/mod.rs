//! Test doubles and common utilities for contract tests
//!
//! The scripted API counts every remote call so tests can assert exactly how
//! many requests an operation issued.

#![allow(dead_code)]

use fip_core::backoff::BackoffPolicy;
use fip_core::config::ManagerConfig;
use fip_core::error::{Error, Result};
use fip_core::traits::{
    BindRequest, CreateRequest, EventReason, EventRecorder, FloatingIp, FloatingIpApi,
    FloatingIpStatus, LifecycleEvent, ListFilter,
};
use fip_core::FloatingIpManager;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SUBJECT: &str = "cluster-a";
pub const NETWORK: &str = "ext-net";
pub const PORT: &str = "port-1";

type ErrorFn = Arc<dyn Fn() -> Error + Send + Sync>;

/// What the scripted `get` returns on a given call
#[derive(Clone)]
pub enum GetStep {
    Status(FloatingIpStatus),
    Fail(ErrorFn),
}

impl GetStep {
    pub fn fail(make: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        GetStep::Fail(Arc::new(make))
    }
}

#[derive(Default)]
struct Counters {
    list: AtomicUsize,
    create: AtomicUsize,
    update: AtomicUsize,
    get: AtomicUsize,
    delete: AtomicUsize,
}

#[derive(Default)]
struct Recorded {
    create_requests: Vec<CreateRequest>,
    update_requests: Vec<BindRequest>,
    deleted_ids: Vec<String>,
}

/// A FloatingIpApi whose responses are scripted up front
///
/// Clones share counters and recorded requests.
#[derive(Clone)]
pub struct ScriptedFloatingIpApi {
    existing: Arc<Vec<FloatingIp>>,
    get_script: Arc<Vec<GetStep>>,
    list_error: Option<ErrorFn>,
    create_error: Option<ErrorFn>,
    update_error: Option<ErrorFn>,
    delete_error: Option<ErrorFn>,
    counters: Arc<Counters>,
    recorded: Arc<Mutex<Recorded>>,
}

impl ScriptedFloatingIpApi {
    pub fn new() -> Self {
        Self {
            existing: Arc::new(Vec::new()),
            get_script: Arc::new(vec![GetStep::Status(FloatingIpStatus::Active)]),
            list_error: None,
            create_error: None,
            update_error: None,
            delete_error: None,
            counters: Arc::new(Counters::default()),
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    /// Floating IPs the listing call knows about
    pub fn with_existing(mut self, existing: Vec<FloatingIp>) -> Self {
        self.existing = Arc::new(existing);
        self
    }

    /// Responses for successive `get` calls; the last one repeats
    pub fn with_get_script(mut self, script: Vec<GetStep>) -> Self {
        assert!(!script.is_empty(), "get script needs at least one step");
        self.get_script = Arc::new(script);
        self
    }

    /// `get` reports `DOWN` for `downs` calls and `ACTIVE` afterwards
    pub fn active_after(self, downs: usize) -> Self {
        let mut script = vec![GetStep::Status(FloatingIpStatus::Down); downs];
        script.push(GetStep::Status(FloatingIpStatus::Active));
        self.with_get_script(script)
    }

    pub fn failing_list(mut self, make: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        self.list_error = Some(Arc::new(make));
        self
    }

    pub fn failing_create(mut self, make: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        self.create_error = Some(Arc::new(make));
        self
    }

    pub fn failing_update(mut self, make: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        self.update_error = Some(Arc::new(make));
        self
    }

    pub fn failing_delete(mut self, make: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        self.delete_error = Some(Arc::new(make));
        self
    }

    pub fn list_call_count(&self) -> usize {
        self.counters.list.load(Ordering::SeqCst)
    }

    pub fn create_call_count(&self) -> usize {
        self.counters.create.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.counters.update.load(Ordering::SeqCst)
    }

    pub fn get_call_count(&self) -> usize {
        self.counters.get.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.counters.delete.load(Ordering::SeqCst)
    }

    pub fn create_requests(&self) -> Vec<CreateRequest> {
        self.recorded.lock().unwrap().create_requests.clone()
    }

    pub fn update_requests(&self) -> Vec<BindRequest> {
        self.recorded.lock().unwrap().update_requests.clone()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.recorded.lock().unwrap().deleted_ids.clone()
    }
}

#[async_trait::async_trait]
impl FloatingIpApi for ScriptedFloatingIpApi {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<FloatingIp>> {
        self.counters.list.fetch_add(1, Ordering::SeqCst);
        if let Some(make) = &self.list_error {
            return Err(make());
        }
        Ok(self
            .existing
            .iter()
            .filter(|fip| filter.matches(fip))
            .cloned()
            .collect())
    }

    async fn create(&self, request: &CreateRequest) -> Result<FloatingIp> {
        let n = self.counters.create.fetch_add(1, Ordering::SeqCst) + 1;
        self.recorded
            .lock()
            .unwrap()
            .create_requests
            .push(request.clone());
        if let Some(make) = &self.create_error {
            return Err(make());
        }
        let address = request
            .address
            .clone()
            .unwrap_or_else(|| format!("198.51.100.{}", n));
        Ok(FloatingIp::new(
            format!("created-{}", n),
            address,
            request.network_id.clone(),
            FloatingIpStatus::Down,
        ))
    }

    async fn update(&self, request: &BindRequest) -> Result<FloatingIp> {
        self.counters.update.fetch_add(1, Ordering::SeqCst);
        self.recorded
            .lock()
            .unwrap()
            .update_requests
            .push(request.clone());
        if let Some(make) = &self.update_error {
            return Err(make());
        }
        let mut fip = FloatingIp::new(
            request.floating_ip_id.clone(),
            "203.0.113.7",
            NETWORK,
            FloatingIpStatus::Down,
        );
        fip.port_id = request.port_id.clone();
        Ok(fip)
    }

    async fn get(&self, id: &str) -> Result<FloatingIp> {
        let call = self.counters.get.fetch_add(1, Ordering::SeqCst);
        let step = self
            .get_script
            .get(call)
            .or_else(|| self.get_script.last())
            .cloned()
            .expect("get script is never empty");
        match step {
            GetStep::Status(status) => Ok(FloatingIp::new(id, "203.0.113.7", NETWORK, status)),
            GetStep::Fail(make) => Err(make()),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.counters.delete.fetch_add(1, Ordering::SeqCst);
        self.recorded
            .lock()
            .unwrap()
            .deleted_ids
            .push(id.to_string());
        if let Some(make) = &self.delete_error {
            return Err(make());
        }
        Ok(())
    }

    fn api_name(&self) -> &'static str {
        "scripted"
    }
}

/// An EventRecorder that keeps every event; clones share the log
#[derive(Clone, Default)]
pub struct RecordingEventRecorder {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl RecordingEventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn reasons(&self) -> Vec<EventReason> {
        self.events().into_iter().map(|e| e.reason).collect()
    }
}

impl EventRecorder for RecordingEventRecorder {
    fn record(&self, event: LifecycleEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Recorder that drops every event
pub struct DiscardingEventRecorder;

impl EventRecorder for DiscardingEventRecorder {
    fn record(&self, _event: LifecycleEvent) {}
}

/// Ten attempts, 1ms apart, no jitter
pub fn fast_policy() -> BackoffPolicy {
    BackoffPolicy::fixed(10, Duration::from_millis(1))
}

/// Manager config with the fast schedule
pub fn fast_config() -> ManagerConfig {
    ManagerConfig::default()
        .with_subject(SUBJECT)
        .with_backoff(fast_policy())
}

/// Build a manager over clones of the given doubles
pub fn manager(api: &ScriptedFloatingIpApi, recorder: &RecordingEventRecorder) -> FloatingIpManager {
    FloatingIpManager::new(Box::new(api.clone()), Box::new(recorder.clone()), fast_config())
        .expect("manager construction succeeds")
}

/// A floating IP snapshot as returned by a listing
pub fn existing_fip(id: &str, address: &str) -> FloatingIp {
    FloatingIp::new(id, address, NETWORK, FloatingIpStatus::Down)
}
