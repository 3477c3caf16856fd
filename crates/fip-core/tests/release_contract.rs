//! Contract Test: Release
//!
//! Constraints verified:
//! - Releasing an address nobody holds succeeds without a delete
//! - Only the identifier returned by the lookup is deleted, exactly once
//! - Delete failures are returned unmodified and recorded as warnings
//! - The full lifecycle works against the in-memory API
//!
//! If this test fails, release can delete the wrong floating IP or leak one.

mod common;

use common::*;
use fip_core::error::Error;
use fip_core::traits::{EventReason, EventType, FloatingIpApi, FloatingIpStatus, ListFilter};
use fip_core::{ChannelEventRecorder, FloatingIpManager, MemoryFloatingIpApi};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn absent_address_is_a_successful_noop() {
    let api = ScriptedFloatingIpApi::new();
    let recorder = RecordingEventRecorder::new();
    let manager = manager(&api, &recorder);

    assert_ok!(manager.release("203.0.113.7").await);

    assert_eq!(api.list_call_count(), 1);
    assert_eq!(api.delete_call_count(), 0);
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn resolved_identifier_is_deleted_once() {
    let api = ScriptedFloatingIpApi::new().with_existing(vec![
        existing_fip("fip-9", "203.0.113.9"),
        existing_fip("fip-7", "203.0.113.7"),
    ]);
    let recorder = RecordingEventRecorder::new();
    let manager = manager(&api, &recorder);

    assert_ok!(manager.release("203.0.113.7").await);

    assert_eq!(api.deleted_ids(), vec!["fip-7".to_string()]);
    assert_eq!(recorder.reasons(), vec![EventReason::SuccessfulDeleteFloatingIp]);
}

#[tokio::test]
async fn empty_address_never_lists_or_deletes() {
    let api = ScriptedFloatingIpApi::new().with_existing(vec![existing_fip("fip-1", "203.0.113.1")]);
    let recorder = RecordingEventRecorder::new();
    let manager = manager(&api, &recorder);

    assert_ok!(manager.release("").await);

    assert_eq!(api.list_call_count(), 0);
    assert_eq!(api.delete_call_count(), 0);
}

#[tokio::test]
async fn delete_failure_propagates_and_warns() {
    let api = ScriptedFloatingIpApi::new()
        .with_existing(vec![existing_fip("fip-7", "203.0.113.7")])
        .failing_delete(|| Error::conflict("floating IP is in use"));
    let recorder = RecordingEventRecorder::new();
    let manager = manager(&api, &recorder);

    let err = assert_err!(manager.release("203.0.113.7").await);

    assert!(matches!(&err, Error::Conflict(msg) if msg == "floating IP is in use"));
    assert_eq!(api.delete_call_count(), 1, "delete is not retried");

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].reason, EventReason::FailedDeleteFloatingIp);
    assert_eq!(events[0].event_type, EventType::Warning);
}

#[tokio::test]
async fn listing_failure_skips_delete() {
    let api = ScriptedFloatingIpApi::new().failing_list(|| Error::rate_limited("slow down"));
    let recorder = RecordingEventRecorder::new();
    let manager = manager(&api, &recorder);

    let err = assert_err!(manager.release("203.0.113.7").await);

    assert!(matches!(err, Error::RateLimited(_)));
    assert_eq!(api.delete_call_count(), 0);
}

#[tokio::test]
async fn full_lifecycle_against_memory_api() {
    let api = MemoryFloatingIpApi::new().with_polls_until_converged(2);
    let (recorder, mut events) = ChannelEventRecorder::new(16);
    let manager = FloatingIpManager::new(Box::new(api.clone()), Box::new(recorder), fast_config())
        .expect("manager construction succeeds");

    let fip = assert_ok!(manager.get_or_create("203.0.113.50", NETWORK).await);
    assert_eq!(fip.address, "203.0.113.50");
    assert_eq!(fip.status, FloatingIpStatus::Down);

    // A second get_or_create resolves the same floating IP
    let again = assert_ok!(manager.get_or_create("203.0.113.50", NETWORK).await);
    assert_eq!(again.id, fip.id);
    assert_eq!(api.len().await, 1);

    let bound = assert_ok!(manager.associate(&fip, PORT).await);
    assert_eq!(bound.status, FloatingIpStatus::Active);
    assert_eq!(bound.port_id.as_deref(), Some(PORT));

    let unbound = assert_ok!(manager.disassociate(&bound).await);
    assert_eq!(unbound.status, FloatingIpStatus::Down);
    assert_eq!(unbound.port_id, None);

    assert_ok!(manager.release("203.0.113.50").await);
    assert!(api.is_empty().await);
    let remaining = assert_ok!(api.list(&ListFilter::by_address("203.0.113.50")).await);
    assert!(remaining.is_empty());

    let mut reasons = Vec::new();
    while let Ok(event) = events.try_recv() {
        assert_eq!(event.subject, SUBJECT);
        reasons.push(event.reason);
    }
    assert_eq!(
        reasons,
        vec![
            EventReason::SuccessfulCreateFloatingIp,
            EventReason::SuccessfulAssociateFloatingIp,
            EventReason::SuccessfulDisassociateFloatingIp,
            EventReason::SuccessfulDeleteFloatingIp,
        ]
    );
}

#[tokio::test]
async fn pinned_address_refused_for_non_admin() {
    let api = MemoryFloatingIpApi::new().with_pinned_addresses_allowed(false);
    let recorder = RecordingEventRecorder::new();
    let manager = FloatingIpManager::new(Box::new(api.clone()), Box::new(recorder.clone()), fast_config())
        .expect("manager construction succeeds");

    let err = assert_err!(manager.get_or_create("203.0.113.50", NETWORK).await);
    assert!(err.is_permission_denied());

    // Unpinned allocation still works
    let fip = assert_ok!(manager.get_or_create("", NETWORK).await);
    assert_eq!(fip.address, "203.0.113.1");
}
