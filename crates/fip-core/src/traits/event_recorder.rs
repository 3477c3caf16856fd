// # Event Recorder Trait
//
// Audit sink for floating IP lifecycle events.
//
// Recording is fire-and-forget: `record` has no return value, so a broken
// sink can never fail the operation that produced the event.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// Expected progress
    Normal,
    /// Something the operator should look at
    Warning,
}

/// Machine-readable reason code of a lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventReason {
    SuccessfulCreateFloatingIp,
    FailedCreateFloatingIp,
    SuccessfulAssociateFloatingIp,
    FailedAssociateFloatingIp,
    SuccessfulDisassociateFloatingIp,
    SuccessfulDeleteFloatingIp,
    FailedDeleteFloatingIp,
}

impl EventReason {
    /// Reason code as shown to audit tooling
    pub fn as_str(&self) -> &'static str {
        match self {
            EventReason::SuccessfulCreateFloatingIp => "SuccessfulCreateFloatingIP",
            EventReason::FailedCreateFloatingIp => "FailedCreateFloatingIP",
            EventReason::SuccessfulAssociateFloatingIp => "SuccessfulAssociateFloatingIP",
            EventReason::FailedAssociateFloatingIp => "FailedAssociateFloatingIP",
            EventReason::SuccessfulDisassociateFloatingIp => "SuccessfulDisassociateFloatingIP",
            EventReason::SuccessfulDeleteFloatingIp => "SuccessfulDeleteFloatingIP",
            EventReason::FailedDeleteFloatingIp => "FailedDeleteFloatingIP",
        }
    }

    /// Severity implied by the reason
    pub fn event_type(&self) -> EventType {
        match self {
            EventReason::FailedCreateFloatingIp
            | EventReason::FailedAssociateFloatingIp
            | EventReason::FailedDeleteFloatingIp => EventType::Warning,
            _ => EventType::Normal,
        }
    }
}

impl fmt::Display for EventReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (subject, reason, message) triple with severity and timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Object the event is about (e.g. the owning cluster)
    pub subject: String,
    /// Reason code
    pub reason: EventReason,
    /// Human-readable message
    pub message: String,
    /// Severity
    pub event_type: EventType,
    /// When the event was produced
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

impl LifecycleEvent {
    /// Create an event stamped with the current time
    pub fn new(subject: impl Into<String>, reason: EventReason, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            reason,
            message: message.into(),
            event_type: reason.event_type(),
            recorded_at: chrono::Utc::now(),
        }
    }
}

/// Trait for audit sinks
///
/// Implementations must not block for long and must swallow their own
/// failures (log them instead).
pub trait EventRecorder: Send + Sync {
    /// Record an event
    fn record(&self, event: LifecycleEvent);
}
