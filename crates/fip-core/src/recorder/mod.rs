// # Event Recorder Implementations
//
// - `ChannelEventRecorder`: forwards events into a bounded channel for an
//   external consumer (audit pipeline, UI, tests)
// - `TracingEventRecorder`: writes events to the log

use crate::traits::{EventRecorder, EventType, LifecycleEvent};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Recorder backed by a bounded mpsc channel
///
/// When the channel is full or the receiver is gone the event is dropped
/// and a warning is logged. Recording never blocks.
#[derive(Debug, Clone)]
pub struct ChannelEventRecorder {
    event_tx: mpsc::Sender<LifecycleEvent>,
}

impl ChannelEventRecorder {
    /// Create a recorder and the receiver that yields its events
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<LifecycleEvent>) {
        let (event_tx, event_rx) = mpsc::channel(capacity.max(1));
        (Self { event_tx }, event_rx)
    }
}

impl EventRecorder for ChannelEventRecorder {
    fn record(&self, event: LifecycleEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            match e {
                mpsc::error::TrySendError::Full(event) => warn!(
                    reason = %event.reason,
                    "Event channel full, dropping event. Consider increasing event_channel_capacity."
                ),
                mpsc::error::TrySendError::Closed(event) => warn!(
                    reason = %event.reason,
                    "Event receiver dropped, discarding event"
                ),
            }
        }
    }
}

/// Recorder that writes events to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventRecorder;

impl EventRecorder for TracingEventRecorder {
    fn record(&self, event: LifecycleEvent) {
        match event.event_type {
            EventType::Normal => info!(
                subject = %event.subject,
                reason = %event.reason,
                "{}",
                event.message
            ),
            EventType::Warning => warn!(
                subject = %event.subject,
                reason = %event.reason,
                "{}",
                event.message
            ),
        }
    }
}
