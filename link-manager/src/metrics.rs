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

//! Passive counters fed by connection lifecycle notifications.

use crate::connection::ConnectionState;
use crate::error::LinkError;
use crate::key::ConnectionKey;
use crate::observers::LifecycleObserver;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free aggregate counters. Observer hooks only ever increment, so a
/// slow or failing reader never affects connection behavior.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    connections_created: AtomicU64,
    events_emitted: AtomicU64,
    events_received: AtomicU64,
    events_dropped: AtomicU64,
    errors: AtomicU64,
    reconnect_attempts: AtomicU64,
    reconnects: AtomicU64,
    connections_evicted: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsCounters {
    pub total_connections_created: u64,
    pub total_events_emitted: u64,
    pub total_events_received: u64,
    pub total_events_dropped: u64,
    pub total_errors: u64,
    pub total_reconnect_attempts: u64,
    pub total_reconnects: u64,
    pub total_connections_evicted: u64,
}

/// One registry entry as seen by [`MetricsSnapshot`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConnectionSummary {
    pub tenant_id: String,
    pub user_id: String,
    pub state: ConnectionState,
    pub in_use: bool,
    pub idle_for_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    #[serde(flatten)]
    pub counters: MetricsCounters,
    /// Sorted by `(tenant_id, user_id)`.
    pub connections: Vec<ConnectionSummary>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> MetricsCounters {
        MetricsCounters {
            total_connections_created: self.connections_created.load(Ordering::Relaxed),
            total_events_emitted: self.events_emitted.load(Ordering::Relaxed),
            total_events_received: self.events_received.load(Ordering::Relaxed),
            total_events_dropped: self.events_dropped.load(Ordering::Relaxed),
            total_errors: self.errors.load(Ordering::Relaxed),
            total_reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            total_reconnects: self.reconnects.load(Ordering::Relaxed),
            total_connections_evicted: self.connections_evicted.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl LifecycleObserver for MetricsCollector {
    fn on_connection_created(&self, _key: &ConnectionKey) {
        Self::bump(&self.connections_created);
    }

    fn on_transition(&self, _key: &ConnectionKey, previous: ConnectionState, current: ConnectionState) {
        if previous == ConnectionState::Reconnecting && current == ConnectionState::Connected {
            Self::bump(&self.reconnects);
        }
    }

    fn on_reconnect_scheduled(&self, _key: &ConnectionKey, _attempt: u32, _delay: Duration) {
        Self::bump(&self.reconnect_attempts);
    }

    fn on_event_emitted(&self, _key: &ConnectionKey, _event: &str) {
        Self::bump(&self.events_emitted);
    }

    fn on_event_dropped(&self, _key: &ConnectionKey, _event: &str) {
        Self::bump(&self.events_dropped);
    }

    fn on_event_received(&self, _key: &ConnectionKey, _event: &str) {
        Self::bump(&self.events_received);
    }

    fn on_error(&self, _key: &ConnectionKey, _error: &LinkError) {
        Self::bump(&self.errors);
    }

    fn on_connection_evicted(&self, _key: &ConnectionKey) {
        Self::bump(&self.connections_evicted);
    }
}
