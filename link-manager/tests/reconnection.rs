/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use integration_test_utils::{
    init_logging, ManualCredentials, RecordingListener, RecordingObserver, RecordingTransport,
};
use link_manager::{
    ChannelMembership, CloseReason, ConnectionHandle, ConnectionKey, ConnectionRegistry,
    ConnectionState, Credential, ErrorKind, EventListener, LifecycleObserver, ManagerConfig,
    ReconnectPolicy,
};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(600);

struct Harness {
    registry: Arc<ConnectionRegistry>,
    transport: Arc<RecordingTransport>,
    credentials: Arc<ManualCredentials>,
    observer: Arc<RecordingObserver>,
}

fn harness(policy: ReconnectPolicy) -> Harness {
    init_logging();
    let transport = Arc::new(RecordingTransport::new());
    let credentials = Arc::new(ManualCredentials::valid("session-token"));
    let observer = Arc::new(RecordingObserver::new());
    let registry = ConnectionRegistry::with_observers(
        ManagerConfig::new("wss://realtime.test/socket").with_reconnect(policy),
        transport.clone(),
        credentials.clone(),
        vec![observer.clone() as Arc<dyn LifecycleObserver>],
    )
    .expect("valid config");

    Harness {
        registry,
        transport,
        credentials,
        observer,
    }
}

fn deterministic() -> ReconnectPolicy {
    ReconnectPolicy::default().with_max_jitter_ms(0)
}

fn alice() -> ConnectionKey {
    ConnectionKey::new("acme", "alice")
}

async fn connected(harness: &Harness) -> ConnectionHandle {
    let handle = harness.registry.acquire("acme", "alice").await;
    assert_eq!(handle.connection_state(), ConnectionState::Connected);
    handle
}

async fn lose_and_recover(harness: &Harness, handle: &ConnectionHandle) {
    harness
        .transport
        .latest()
        .expect("live transport")
        .drop_connection();
    handle
        .wait_for_state(ConnectionState::Reconnecting, WAIT)
        .await
        .expect("notices the loss");
    handle
        .wait_for_state(ConnectionState::Connected, WAIT)
        .await
        .expect("recovers");
}

#[tokio::test(start_paused = true)]
async fn listeners_are_replayed_in_registration_order() {
    let harness = harness(deterministic());
    let handle = connected(&harness).await;

    let messages: Arc<dyn EventListener> = Arc::new(RecordingListener::new());
    let presence: Arc<dyn EventListener> = Arc::new(RecordingListener::new());
    let typing: Arc<dyn EventListener> = Arc::new(RecordingListener::new());
    assert!(handle.on("message", messages.clone()).await);
    assert!(handle.on("presence", presence).await);
    assert!(handle.on("typing", typing).await);
    assert!(handle.on("presence", messages).await);

    lose_and_recover(&harness, &handle).await;

    let recovered = harness.transport.connection(1).expect("second transport");
    assert_eq!(
        recovered.listener_events(),
        vec!["message", "presence", "typing", "presence"]
    );
    assert_eq!(recovered.token(), "session-token");
}

#[tokio::test(start_paused = true)]
async fn memberships_are_replayed_once_in_order() {
    let harness = harness(deterministic());
    let handle = connected(&harness).await;

    for room in ["general", "random", "ops"] {
        assert!(
            handle
                .join(ChannelMembership::new("join_room", json!({ "room": room })))
                .await
        );
    }
    assert!(
        !handle
            .join(ChannelMembership::new("join_room", json!({ "room": "general" })))
            .await
    );
    assert!(
        handle
            .leave(&ChannelMembership::new("join_room", json!({ "room": "random" })))
            .await
    );

    lose_and_recover(&harness, &handle).await;

    let replayed = harness.transport.connection(1).expect("second transport").emitted();
    assert_eq!(
        replayed,
        vec![
            ("join_room".to_string(), json!({ "room": "general" })),
            ("join_room".to_string(), json!({ "room": "ops" })),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn successful_recovery_resets_the_attempt_counter() {
    let harness = harness(deterministic());
    let handle = connected(&harness).await;
    harness.transport.fail_next_opens(2);

    lose_and_recover(&harness, &handle).await;

    let diagnostics = handle.diagnostics().await;
    assert_eq!(diagnostics.reconnect_attempts, 0);
    assert_eq!(diagnostics.last_error, None);
    assert_eq!(harness.transport.open_count(), 4);

    let retries = harness.observer.retries_of(&alice());
    let attempts: Vec<u32> = retries.iter().map(|(attempt, _)| *attempt).collect();
    assert_eq!(attempts, vec![1, 2, 3]);
    assert_eq!(retries[0].1, Duration::from_millis(1_000));
    // Later attempts are held back by the minimum interval between attempts.
    assert!(retries[1].1 >= Duration::from_millis(2_000));
    assert!(retries[1].1 <= Duration::from_millis(5_000));

    let metrics = harness.registry.metrics().await.counters;
    assert_eq!(metrics.total_reconnects, 1);
    assert_eq!(metrics.total_reconnect_attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_end_in_error() {
    let harness = harness(deterministic().with_max_attempts(3));
    let handle = connected(&harness).await;
    harness.transport.fail_next_opens(usize::MAX);

    harness.transport.latest().expect("live").drop_connection();
    handle
        .wait_for_state(ConnectionState::Error, WAIT)
        .await
        .expect("gives up");

    let diagnostics = handle.diagnostics().await;
    assert_eq!(diagnostics.reconnect_attempts, 3);
    assert!(!diagnostics.reconnect_pending);
    assert_eq!(
        handle
            .as_managed()
            .expect("managed")
            .last_error()
            .await
            .map(|err| err.kind()),
        Some(ErrorKind::ExhaustedRetries)
    );
    assert_eq!(harness.transport.open_count(), 4);

    tokio::time::sleep(Duration::from_secs(3_600)).await;
    assert_eq!(harness.transport.open_count(), 4);
    assert_eq!(
        harness.observer.states_of(&alice()).last(),
        Some(&ConnectionState::Error)
    );
}

#[tokio::test(start_paused = true)]
async fn destroy_cancels_a_pending_retry() {
    let harness = harness(deterministic());
    let handle = connected(&harness).await;

    harness.transport.latest().expect("live").drop_connection();
    handle
        .wait_for_state(ConnectionState::Reconnecting, WAIT)
        .await
        .expect("schedules a retry");
    assert!(handle.diagnostics().await.reconnect_pending);

    handle.destroy().await;
    tokio::time::sleep(Duration::from_secs(3_600)).await;

    assert_eq!(harness.transport.open_count(), 1);
    assert_eq!(handle.connection_state(), ConnectionState::Destroyed);
}

#[tokio::test(start_paused = true)]
async fn disconnect_while_reconnecting_cancels_the_retry() {
    let harness = harness(deterministic());
    let handle = connected(&harness).await;

    harness.transport.latest().expect("live").drop_connection();
    handle
        .wait_for_state(ConnectionState::Reconnecting, WAIT)
        .await
        .expect("schedules a retry");
    handle.disconnect().await;
    tokio::time::sleep(Duration::from_secs(3_600)).await;

    assert_eq!(handle.connection_state(), ConnectionState::Disconnected);
    assert_eq!(harness.transport.open_count(), 1);
    assert_eq!(handle.diagnostics().await.reconnect_attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn overlapping_failure_reports_start_one_sequence() {
    let harness = harness(deterministic());
    let handle = connected(&harness).await;

    let raw = harness.transport.latest().expect("live");
    raw.close_with(CloseReason::ServerRequested("going away".to_string()));
    raw.fail_with("socket hang up");
    raw.drop_connection();

    handle
        .wait_for_state(ConnectionState::Reconnecting, WAIT)
        .await
        .expect("reconnecting");
    handle
        .wait_for_state(ConnectionState::Connected, WAIT)
        .await
        .expect("recovers");
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(harness.transport.open_count(), 2);
    assert_eq!(harness.observer.retries_of(&alice()).len(), 1);
    assert_eq!(handle.connection_state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn late_close_from_replaced_transport_is_ignored() {
    let harness = harness(deterministic());
    let handle = connected(&harness).await;
    let first = harness.transport.latest().expect("first");

    lose_and_recover(&harness, &handle).await;
    first.drop_connection();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(handle.connection_state(), ConnectionState::Connected);
    assert_eq!(harness.transport.open_count(), 2);
    assert!(first.is_closed());
}

#[tokio::test(start_paused = true)]
async fn expired_credential_stops_recovery() {
    let harness = harness(deterministic());
    let handle = connected(&harness).await;

    harness.credentials.set(Some(
        Credential::new("stale").with_expiry(Utc::now() - ChronoDuration::minutes(1)),
    ));
    harness.transport.latest().expect("live").drop_connection();
    handle
        .wait_for_state(ConnectionState::Error, WAIT)
        .await
        .expect("enters error");
    tokio::time::sleep(Duration::from_secs(3_600)).await;

    assert_eq!(harness.transport.open_count(), 1);
    assert!(harness.observer.retries_of(&alice()).is_empty());
    assert_eq!(
        harness.observer.states_of(&alice()),
        vec![
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Error,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn invalidated_credential_closes_the_live_transport() {
    let harness = harness(deterministic());
    let handle = connected(&harness).await;
    assert_eq!(harness.credentials.subscriber_count(), 1);

    harness.credentials.invalidate();
    handle
        .wait_for_state(ConnectionState::Error, WAIT)
        .await
        .expect("enters error");
    tokio::time::sleep(Duration::from_secs(3_600)).await;

    assert!(harness.transport.connection(0).expect("raw").is_closed());
    assert_eq!(harness.transport.open_count(), 1);
    assert!(!handle.emit("typing", json!({})).await);
}

#[tokio::test(start_paused = true)]
async fn emits_are_dropped_while_reconnecting() {
    let harness = harness(deterministic());
    let handle = connected(&harness).await;

    harness.transport.latest().expect("live").drop_connection();
    handle
        .wait_for_state(ConnectionState::Reconnecting, WAIT)
        .await
        .expect("reconnecting");
    assert!(!handle.emit("typing", json!({ "room": "general" })).await);

    handle
        .wait_for_state(ConnectionState::Connected, WAIT)
        .await
        .expect("recovers");
    assert!(harness
        .transport
        .connection(1)
        .expect("second")
        .emitted()
        .is_empty());
    assert_eq!(
        harness.registry.metrics().await.counters.total_events_dropped,
        1
    );
}

#[tokio::test(start_paused = true)]
async fn received_events_reach_listeners_and_are_counted() {
    let harness = harness(deterministic());
    let handle = connected(&harness).await;
    let listener = Arc::new(RecordingListener::new());
    handle
        .on("message", listener.clone() as Arc<dyn EventListener>)
        .await;

    let raw = harness.transport.latest().expect("live");
    assert_eq!(raw.deliver("message", json!({ "text": "hi" })).await, 1);
    assert_eq!(raw.deliver("unrelated", json!({})).await, 0);

    assert_eq!(
        listener.received(),
        vec![("message".to_string(), json!({ "text": "hi" }))]
    );
    assert_eq!(
        harness.registry.metrics().await.counters.total_events_received,
        1
    );
}
