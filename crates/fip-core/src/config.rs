//! Configuration types for floating IP lifecycle management
//!
//! This module defines all configuration structures used throughout the crate.

use crate::backoff::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingIpConfig {
    /// Remote API configuration
    pub api: ApiConfig,

    /// Manager settings
    #[serde(default)]
    pub manager: ManagerConfig,
}

impl FloatingIpConfig {
    /// Create a configuration for the given API with default manager settings
    pub fn new(api: ApiConfig) -> Self {
        Self {
            api,
            manager: ManagerConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.api.validate()?;
        self.manager.validate()?;
        Ok(())
    }
}

/// Remote API configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiConfig {
    /// OpenStack Networking v2.0
    Neutron {
        /// Networking endpoint (e.g. "https://network.example.com:9696")
        endpoint: String,
        /// Pre-issued auth token
        token: String,
    },

    /// In-process simulated API
    #[default]
    Memory,

    /// Custom API
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ApiConfig {
    /// Validate the API configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ApiConfig::Neutron { endpoint, token } => {
                if endpoint.is_empty() {
                    return Err(crate::Error::config("Neutron endpoint cannot be empty"));
                }
                if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Neutron endpoint must use HTTP or HTTPS scheme. Got: {}",
                        endpoint
                    )));
                }
                if token.is_empty() {
                    return Err(crate::Error::config("Neutron token cannot be empty"));
                }
                Ok(())
            }
            ApiConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom API factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom API config cannot be null"));
                }
                Ok(())
            }
            ApiConfig::Memory => Ok(()),
        }
    }

    /// Get the API type name
    pub fn type_name(&self) -> &str {
        match self {
            ApiConfig::Neutron { .. } => "neutron",
            ApiConfig::Memory => "memory",
            ApiConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Subject attached to every lifecycle event (usually the owning cluster)
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Capacity of the event channel used by `ChannelEventRecorder`
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Convergence polling schedule
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl ManagerConfig {
    /// Validate the manager configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.subject.is_empty() {
            return Err(crate::Error::config("Event subject cannot be empty"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        self.backoff.validate()
    }

    /// Set the event subject
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Replace the polling schedule
    pub fn with_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff = BackoffConfig::from(policy);
        self
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            event_channel_capacity: default_event_channel_capacity(),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Serializable form of [`BackoffPolicy`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Maximum number of status fetches
    #[serde(default = "default_steps")]
    pub steps: u32,

    /// Delay between fetches (in milliseconds)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Delay multiplier per step (1.0 = fixed interval)
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// Random extra delay as a fraction of the delay
    #[serde(default = "default_jitter")]
    pub jitter: f64,

    /// Upper bound for a single delay before jitter (in milliseconds)
    #[serde(default = "default_cap_ms")]
    pub cap_ms: u64,
}

impl BackoffConfig {
    /// Validate the schedule
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.steps == 0 {
            return Err(crate::Error::config("Backoff steps must be > 0"));
        }
        if !self.factor.is_finite() || self.factor < 0.0 {
            return Err(crate::Error::config(format!(
                "Backoff factor must be a non-negative number. Got: {}",
                self.factor
            )));
        }
        if !self.jitter.is_finite() || !(0.0..=1.0).contains(&self.jitter) {
            return Err(crate::Error::config(format!(
                "Backoff jitter must be between 0.0 and 1.0. Got: {}",
                self.jitter
            )));
        }
        if self.cap_ms == 0 {
            return Err(crate::Error::config("Backoff cap must be > 0"));
        }
        Ok(())
    }

    /// Build the immutable policy
    pub fn to_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.steps,
            Duration::from_millis(self.initial_delay_ms),
            self.factor,
            self.jitter,
        )
        .with_cap(Duration::from_millis(self.cap_ms))
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::from(BackoffPolicy::default())
    }
}

impl From<BackoffPolicy> for BackoffConfig {
    fn from(policy: BackoffPolicy) -> Self {
        Self {
            steps: policy.steps,
            initial_delay_ms: millis(policy.initial_delay),
            factor: policy.factor,
            jitter: policy.jitter,
            cap_ms: millis(policy.cap),
        }
    }
}

fn default_subject() -> String {
    "floating-ip-manager".to_string()
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_steps() -> u32 {
    crate::backoff::DEFAULT_STEPS
}

fn default_initial_delay_ms() -> u64 {
    millis(crate::backoff::DEFAULT_INITIAL_DELAY)
}

fn default_cap_ms() -> u64 {
    millis(crate::backoff::DEFAULT_CAP)
}

/// Whole milliseconds, saturating at `u64::MAX`
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn default_factor() -> f64 {
    crate::backoff::DEFAULT_FACTOR
}

fn default_jitter() -> f64 {
    crate::backoff::DEFAULT_JITTER
}
