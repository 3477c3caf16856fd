//! Core traits for floating IP lifecycle management
//!
//! - [`FloatingIpApi`]: Remote service owning floating IP resources
//! - [`EventRecorder`]: Fire-and-forget audit sink

pub mod event_recorder;
pub mod floating_ip_api;

pub use event_recorder::{EventReason, EventRecorder, EventType, LifecycleEvent};
pub use floating_ip_api::{
    BindRequest, CreateRequest, FloatingIp, FloatingIpApi, FloatingIpApiFactory, FloatingIpStatus,
    ListFilter,
};
