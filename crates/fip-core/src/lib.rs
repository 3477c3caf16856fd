// # fip-core
//
// Core library for floating IP lifecycle management.
//
// ## Architecture Overview
//
// This library reconciles "a floating IP with address X exists and is bound
// to port Y" against an eventually consistent remote service:
// - **FloatingIpApi**: Trait for the remote list/create/update/get/delete calls
// - **EventRecorder**: Trait for the fire-and-forget audit sink
// - **FloatingIpManager**: Resolve, create, bind (with convergence wait), release
// - **BackoffPolicy**: Immutable polling schedule shared by every bind
// - **ApiRegistry**: Plugin-based registry for remote API implementations
//
// ## Design Principles
//
// 1. **Resolve before create**: Creation is only idempotent when preceded by a lookup
// 2. **Bounded waits**: Convergence polling has a fixed attempt budget
// 3. **No hidden retries**: Remote calls other than status polls are issued once
// 4. **Library-First**: The CLI is a thin layer over this crate

pub mod api;
pub mod backoff;
pub mod config;
pub mod error;
pub mod manager;
pub mod recorder;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use api::MemoryFloatingIpApi;
pub use backoff::BackoffPolicy;
pub use config::{ApiConfig, FloatingIpConfig, ManagerConfig};
pub use error::{Error, Result};
pub use manager::FloatingIpManager;
pub use recorder::{ChannelEventRecorder, TracingEventRecorder};
pub use registry::ApiRegistry;
pub use traits::{EventRecorder, FloatingIp, FloatingIpApi, FloatingIpStatus};
