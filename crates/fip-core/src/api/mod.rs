// # Floating IP API Implementations
//
// Remote-service implementations that live in the core crate. HTTP-backed
// implementations live in their own crates (see `fip-provider-neutron`).

pub mod memory;

pub use memory::{MemoryFloatingIpApi, MemoryFloatingIpApiFactory};
