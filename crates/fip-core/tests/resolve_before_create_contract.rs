//! Contract Test: Resolve Before Create
//!
//! Constraints verified:
//! - An empty address never reaches the listing endpoint
//! - A resolved floating IP is reused; no creation is issued
//! - An unresolved pinned address is created exactly once, pinned
//! - An empty address produces an unpinned creation request
//! - Remote failures surface with the creation prefix and a typed kind
//!
//! If this test fails, duplicate floating IPs can be allocated.

mod common;

use common::*;
use fip_core::error::Error;
use fip_core::traits::{CreateRequest, EventReason, EventType};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn absent_address_is_created_once_and_pinned() {
    let api = ScriptedFloatingIpApi::new();
    let recorder = RecordingEventRecorder::new();
    let manager = manager(&api, &recorder);

    let resolved = assert_ok!(manager.resolve("203.0.113.7").await);
    assert!(resolved.is_none());

    let fip = assert_ok!(manager.ensure(resolved, "203.0.113.7", NETWORK).await);

    assert_eq!(fip.address, "203.0.113.7");
    assert_eq!(api.list_call_count(), 1);
    assert_eq!(api.create_call_count(), 1);
    assert_eq!(
        api.create_requests(),
        vec![CreateRequest {
            network_id: NETWORK.to_string(),
            address: Some("203.0.113.7".to_string()),
            description: None,
        }]
    );
}

#[tokio::test]
async fn existing_address_is_reused_without_create() {
    let existing = existing_fip("fip-42", "203.0.113.7");
    let api = ScriptedFloatingIpApi::new().with_existing(vec![existing.clone()]);
    let recorder = RecordingEventRecorder::new();
    let manager = manager(&api, &recorder);

    let fip = assert_ok!(manager.get_or_create("203.0.113.7", NETWORK).await);

    assert_eq!(fip, existing);
    assert_eq!(api.create_call_count(), 0);
    assert!(recorder.events().is_empty(), "reuse must not emit events");
}

#[tokio::test]
async fn empty_address_skips_listing_and_creates_unpinned() {
    let api = ScriptedFloatingIpApi::new();
    let recorder = RecordingEventRecorder::new();
    let manager = manager(&api, &recorder);

    let resolved = assert_ok!(manager.resolve("").await);
    assert!(resolved.is_none());
    assert_eq!(api.list_call_count(), 0, "empty address must not be listed");

    assert_ok!(manager.ensure(None, "", NETWORK).await);

    let requests = api.create_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].address, None,
        "empty address must be omitted, not sent as an empty string"
    );
}

#[tokio::test]
async fn duplicate_listing_entries_pick_the_first() {
    let api = ScriptedFloatingIpApi::new().with_existing(vec![
        existing_fip("fip-first", "203.0.113.7"),
        existing_fip("fip-second", "203.0.113.7"),
    ]);
    let recorder = RecordingEventRecorder::new();
    let manager = manager(&api, &recorder);

    let fip = assert_ok!(manager.resolve("203.0.113.7").await).expect("resolved");
    assert_eq!(fip.id, "fip-first");
}

#[tokio::test]
async fn listing_failure_propagates_unmodified() {
    let api = ScriptedFloatingIpApi::new().failing_list(|| Error::api("service unavailable"));
    let recorder = RecordingEventRecorder::new();
    let manager = manager(&api, &recorder);

    let err = assert_err!(manager.get_or_create("203.0.113.7", NETWORK).await);

    assert!(matches!(&err, Error::Api(msg) if msg == "service unavailable"));
    assert_eq!(api.list_call_count(), 1, "resolution is not retried");
    assert_eq!(api.create_call_count(), 0);
}

#[tokio::test]
async fn successful_create_records_event() {
    let api = ScriptedFloatingIpApi::new();
    let recorder = RecordingEventRecorder::new();
    let manager = manager(&api, &recorder);

    let fip = assert_ok!(manager.get_or_create("203.0.113.7", NETWORK).await);

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].subject, SUBJECT);
    assert_eq!(events[0].reason, EventReason::SuccessfulCreateFloatingIp);
    assert_eq!(events[0].event_type, EventType::Normal);
    assert_eq!(
        events[0].message,
        format!("Created floating IP 203.0.113.7 with id {}", fip.id)
    );
}

#[tokio::test]
async fn rejected_pinned_create_is_typed_and_prefixed() {
    let api = ScriptedFloatingIpApi::new()
        .failing_create(|| Error::permission_denied("setting floating_ip_address is restricted"));
    let recorder = RecordingEventRecorder::new();
    let manager = manager(&api, &recorder);

    let err = assert_err!(manager.get_or_create("203.0.113.7", NETWORK).await);

    assert!(err.is_permission_denied());
    assert!(err.is_transport());
    assert!(
        err.to_string().starts_with("error creating floating IP: "),
        "unexpected message: {}",
        err
    );
    assert_eq!(api.create_call_count(), 1, "creation is never retried");
    assert_eq!(recorder.reasons(), vec![EventReason::FailedCreateFloatingIp]);
}

#[tokio::test]
async fn ensure_alone_is_not_idempotent() {
    // Without a fresh resolve, two ensures mean two creations
    let api = ScriptedFloatingIpApi::new();
    let recorder = RecordingEventRecorder::new();
    let manager = manager(&api, &recorder);

    assert_ok!(manager.ensure(None, "203.0.113.7", NETWORK).await);
    assert_ok!(manager.ensure(None, "203.0.113.7", NETWORK).await);

    assert_eq!(api.create_call_count(), 2);
}

#[tokio::test]
async fn missing_network_is_rejected_before_any_call() {
    let api = ScriptedFloatingIpApi::new();
    let recorder = RecordingEventRecorder::new();
    let manager = manager(&api, &recorder);

    let err = assert_err!(manager.ensure(None, "203.0.113.7", "").await);

    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(api.create_call_count(), 0);
}

#[tokio::test]
async fn sink_without_consumer_does_not_fail_create() {
    let api = ScriptedFloatingIpApi::new();
    let manager = fip_core::FloatingIpManager::new(
        Box::new(api.clone()),
        Box::new(DiscardingEventRecorder),
        fast_config(),
    )
    .expect("manager construction succeeds");

    assert_ok!(manager.get_or_create("", NETWORK).await);
    assert_eq!(api.create_call_count(), 1);
}
