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

use integration_test_utils::{init_logging, ManualCredentials, RecordingTransport};
use link_manager::{
    ChannelMembership, ConnectionRegistry, ConnectionState, ErrorKind, LifecycleCallback,
    ManagerConfig, ReconnectPolicy, RegistryPolicy,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(600);

fn config() -> ManagerConfig {
    ManagerConfig::new("wss://realtime.test/socket")
        .with_reconnect(ReconnectPolicy::default().with_max_jitter_ms(0))
        .with_registry(
            RegistryPolicy::default()
                .with_creation_min_interval_ms(1_000)
                .with_idle_timeout_ms(600_000)
                .with_sweep_interval_ms(300_000),
        )
}

fn registry() -> (Arc<ConnectionRegistry>, Arc<RecordingTransport>, Arc<ManualCredentials>) {
    init_logging();
    let transport = Arc::new(RecordingTransport::new());
    let credentials = Arc::new(ManualCredentials::valid("session-token"));
    let registry = ConnectionRegistry::new(config(), transport.clone(), credentials.clone())
        .expect("valid config");
    (registry, transport, credentials)
}

fn counting() -> (Arc<AtomicUsize>, LifecycleCallback) {
    let count = Arc::new(AtomicUsize::new(0));
    let callback_count = count.clone();
    let callback: LifecycleCallback = Arc::new(move || {
        callback_count.fetch_add(1, Ordering::SeqCst);
    });
    (count, callback)
}

#[tokio::test(start_paused = true)]
async fn acquire_is_idempotent_for_live_connections() {
    let (registry, transport, _credentials) = registry();

    let first = registry.acquire("acme", "alice").await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    let second = registry.acquire("acme", "alice").await;

    assert!(first.same_connection(&second));
    assert!(Arc::ptr_eq(
        first.as_managed().expect("managed"),
        second.as_managed().expect("managed")
    ));
    assert_eq!(transport.open_count(), 1);
    assert_eq!(transport.endpoints(), vec!["wss://realtime.test/socket"]);
}

#[tokio::test(start_paused = true)]
async fn errored_connection_is_recreated() {
    let (registry, transport, credentials) = registry();
    let first = registry.acquire("acme", "alice").await;

    credentials.invalidate();
    first
        .wait_for_state(ConnectionState::Error, WAIT)
        .await
        .expect("error after invalidation");

    credentials.set(Some(link_manager::Credential::new("fresh-token")));
    tokio::time::sleep(Duration::from_secs(1)).await;
    let second = registry.acquire("acme", "alice").await;

    assert!(!first.same_connection(&second));
    assert_eq!(first.connection_state(), ConnectionState::Destroyed);
    assert_eq!(second.connection_state(), ConnectionState::Connected);
    assert_eq!(transport.latest().expect("raw").token(), "fresh-token");
    assert_eq!(registry.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn expired_credential_yields_inert_connection() {
    init_logging();
    let transport = Arc::new(RecordingTransport::new());
    let registry = ConnectionRegistry::new(
        config(),
        transport.clone(),
        Arc::new(ManualCredentials::expired("old")),
    )
    .expect("valid config");

    let handle = registry.acquire("acme", "alice").await;

    assert!(handle.is_inert());
    assert_eq!(
        handle.failure().map(|failure| failure.kind()),
        Some(ErrorKind::Credential)
    );
    assert!(!handle.emit("typing", json!({})).await);
    assert!(registry.is_empty().await);
    assert_eq!(transport.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn sweep_evicts_only_stale_disconnected_entries() {
    let (registry, _transport, _credentials) = registry();

    let alice = registry.acquire("acme", "alice").await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    let bob = registry.acquire("acme", "bob").await;
    alice.disconnect().await;
    registry.release("acme", "alice").await;
    registry.release("acme", "bob").await;

    registry.start_idle_sweep().await;
    // The first sweep finds alice too young; the second one evicts her.
    tokio::time::sleep(Duration::from_secs(901)).await;

    assert!(registry.get("acme", "alice").await.is_none());
    assert_eq!(alice.connection_state(), ConnectionState::Destroyed);
    assert_eq!(bob.connection_state(), ConnectionState::Connected);
    assert!(registry.get("acme", "bob").await.is_some());

    let snapshot = registry.metrics().await;
    assert_eq!(snapshot.counters.total_connections_evicted, 1);
    assert_eq!(snapshot.connections.len(), 1);
    assert_eq!(snapshot.connections[0].user_id, "bob");
    assert!(!snapshot.connections[0].in_use);
}

#[tokio::test(start_paused = true)]
async fn sweep_during_recovery_keeps_a_busy_connection() {
    let (registry, transport, _credentials) = registry();
    let alice = registry.acquire("acme", "alice").await;
    alice
        .join(ChannelMembership::new("join_room", json!({ "room": "general" })))
        .await;

    for _ in 0..66 {
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(alice.emit("typing", json!({})).await);
    }
    transport.latest().expect("live").drop_connection();
    alice
        .wait_for_state(ConnectionState::Reconnecting, Duration::from_secs(1))
        .await
        .expect("notices the loss");

    assert!(registry.sweep_idle().await.is_empty());
    alice
        .wait_for_state(ConnectionState::Connected, Duration::from_secs(120))
        .await
        .expect("recovers");
    assert_eq!(transport.open_count(), 2);
    assert_eq!(
        transport.latest().expect("recovered").emitted_events(),
        vec!["join_room"]
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_all_tears_down_and_registry_stays_usable() {
    let (registry, transport, _credentials) = registry();

    let alice = registry.acquire("acme", "alice").await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    let bob = registry.acquire("globex", "bob").await;

    assert_eq!(registry.shutdown_all().await, 2);
    assert_eq!(alice.connection_state(), ConnectionState::Destroyed);
    assert_eq!(bob.connection_state(), ConnectionState::Destroyed);
    assert!(transport.connections().iter().all(|raw| raw.is_closed()));

    tokio::time::sleep(Duration::from_secs(1)).await;
    let again = registry.acquire("acme", "alice").await;
    assert_eq!(again.connection_state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn ready_latch_follows_the_primary_connection() {
    let (registry, transport, _credentials) = registry();
    let (connects, on_connect) = counting();
    let (readies, on_ready) = counting();
    assert!(registry.on_connect(on_connect.clone()));
    assert!(!registry.on_connect(on_connect));
    assert!(registry.on_ready(on_ready));

    let alice = registry.acquire("acme", "alice").await;
    assert_eq!(connects.load(Ordering::SeqCst), 1);
    assert_eq!(readies.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    registry.acquire("acme", "bob").await;
    assert_eq!(readies.load(Ordering::SeqCst), 1);

    // Registered after the fact: runs at once.
    let (late, on_late) = counting();
    registry.on_ready(on_late);
    assert_eq!(late.load(Ordering::SeqCst), 1);

    transport.connection(0).expect("alice raw").drop_connection();
    alice
        .wait_for_state(ConnectionState::Reconnecting, WAIT)
        .await
        .expect("reconnecting");
    assert!(!registry.broadcaster().is_ready());

    let (recovered, on_recovered) = counting();
    registry.on_ready(on_recovered);
    assert_eq!(recovered.load(Ordering::SeqCst), 0);
    alice
        .wait_for_state(ConnectionState::Connected, WAIT)
        .await
        .expect("recovers");
    assert_eq!(recovered.load(Ordering::SeqCst), 1);
    assert_eq!(readies.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn set_primary_switches_the_broadcast_context() {
    let (registry, _transport, _credentials) = registry();
    registry.acquire("acme", "alice").await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    let bob = registry.acquire("acme", "bob").await;
    bob.disconnect().await;

    registry.set_primary("acme", "bob").await;
    assert_eq!(
        registry.broadcaster().primary().map(|key| key.user_id().to_string()),
        Some("bob".to_string())
    );
    assert!(!registry.broadcaster().is_ready());

    let (readies, on_ready) = counting();
    registry.on_ready(on_ready);
    bob.reconnect().await.expect("explicit reconnect");
    assert_eq!(readies.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn diagnostics_and_metrics_serialize_for_operators() {
    let (registry, transport, _credentials) = registry();
    let alice = registry.acquire("acme", "alice").await;
    alice.emit("typing", json!({})).await;
    transport.fail_next_opens(1);
    transport.latest().expect("raw").drop_connection();
    alice
        .wait_for_state(ConnectionState::Reconnecting, WAIT)
        .await
        .expect("reconnecting");

    let diagnostics = registry.diagnostics().await;
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].state, ConnectionState::Reconnecting);
    assert_eq!(diagnostics[0].reconnect_attempts, 1);
    assert!(diagnostics[0].reconnect_pending);

    let snapshot = serde_json::to_value(registry.metrics().await).expect("serializes");
    assert_eq!(snapshot["total_connections_created"], json!(1));
    assert_eq!(snapshot["total_events_emitted"], json!(1));
    assert_eq!(snapshot["total_reconnect_attempts"], json!(1));
    assert_eq!(snapshot["connections"][0]["state"], json!("RECONNECTING"));
}
