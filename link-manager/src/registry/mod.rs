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

//! Connection registry: the single owner of every managed connection.
//!
//! Connections are cached per `(tenant, user)` and handed out as
//! [`ConnectionHandle`]s. Creation is rate limited across all keys and gated
//! on a valid credential; refused creations come back as inert handles
//! instead of errors. Idle, non-connected entries are swept periodically.

mod entry;

use crate::broadcaster::{LifecycleBroadcaster, LifecycleCallback};
use crate::config::{ManagerConfig, RegistryPolicy};
use crate::connection::managed::ConnectionContext;
use crate::connection::{
    ConnectionDiagnostics, ConnectionHandle, ConnectionState, InertConnection, ManagedConnection,
};
use crate::credentials::{resolve_valid_credential, CredentialResolver, InvalidationId};
use crate::error::LinkError;
use crate::key::ConnectionKey;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::observability::events;
use crate::observers::{LifecycleObserver, Observers};
use crate::timers::{TimerKind, TimerSet};
use crate::transport::Transport;
use entry::RegistryEntry;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const CONNECTION_REGISTRY_TAG: &str = "ConnectionRegistry:";
const CONNECTION_REGISTRY_FN_ACQUIRE_TAG: &str = "acquire():";
const CONNECTION_REGISTRY_FN_RELEASE_TAG: &str = "release():";
const COMPONENT: &str = "connection_registry";

struct RegistryState {
    entries: HashMap<ConnectionKey, RegistryEntry>,
    last_creation: Option<Instant>,
    primary: Option<ConnectionKey>,
    timers: TimerSet,
}

pub struct ConnectionRegistry {
    context: ConnectionContext,
    policy: RegistryPolicy,
    broadcaster: Arc<LifecycleBroadcaster>,
    metrics: Arc<MetricsCollector>,
    invalidation: InvalidationId,
    state: Mutex<RegistryState>,
}

impl ConnectionRegistry {
    /// Validates `config` and builds an empty registry. Must be called from
    /// within a tokio runtime: the credential invalidation relay is started
    /// here.
    pub fn new(
        config: ManagerConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialResolver>,
    ) -> Result<Arc<Self>, LinkError> {
        Self::with_observers(config, transport, credentials, Vec::new())
    }

    /// Like [`new`](Self::new), with extra observers notified after the
    /// built-in metrics collector and lifecycle broadcaster.
    pub fn with_observers(
        config: ManagerConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialResolver>,
        extra: Vec<Arc<dyn LifecycleObserver>>,
    ) -> Result<Arc<Self>, LinkError> {
        config.validate()?;

        let metrics = Arc::new(MetricsCollector::new());
        let broadcaster = Arc::new(LifecycleBroadcaster::new());
        let mut observers: Vec<Arc<dyn LifecycleObserver>> =
            vec![metrics.clone(), broadcaster.clone()];
        observers.extend(extra);

        let context = ConnectionContext {
            endpoint: config.endpoint.clone(),
            connect_timeout: config.connect_timeout(),
            policy: config.reconnect.clone(),
            transport,
            credentials: credentials.clone(),
            observers: Observers::new(observers),
        };

        let (invalidations, receiver) = mpsc::unbounded_channel();
        let invalidation = credentials.on_invalidate(Box::new(move || {
            // The registry may already be gone.
            let _ = invalidations.send(());
        }));

        Ok(Arc::new_cyclic(|weak: &Weak<Self>| {
            let mut timers = TimerSet::new();
            timers.spawn(
                TimerKind::InvalidationRelay,
                Self::relay_invalidations(weak.clone(), receiver),
            );

            Self {
                context,
                policy: config.registry,
                broadcaster,
                metrics,
                invalidation,
                state: Mutex::new(RegistryState {
                    entries: HashMap::new(),
                    last_creation: None,
                    primary: None,
                    timers,
                }),
            }
        }))
    }

    async fn relay_invalidations(registry: Weak<Self>, mut receiver: UnboundedReceiver<()>) {
        while receiver.recv().await.is_some() {
            let Some(registry) = registry.upgrade() else {
                break;
            };
            let state = registry.state.lock().await;
            info!(
                event = events::CREDENTIAL_INVALIDATED,
                component = COMPONENT,
                connections = state.entries.len(),
                "forwarding credential invalidation"
            );
            for entry in state.entries.values() {
                entry.connection.notify_credential_invalidated();
            }
        }
    }

    /// Returns the cached connection for `(tenant_id, user_id)`, or creates
    /// and starts connecting a new one. Never fails: refused creations yield
    /// an inert handle carrying the reason.
    pub async fn acquire(&self, tenant_id: &str, user_id: &str) -> ConnectionHandle {
        let key = ConnectionKey::new(tenant_id, user_id);
        let mut state = self.state.lock().await;

        let mut replaced = None;
        if let Some(entry) = state.entries.get_mut(&key) {
            let current = entry.connection.connection_state();
            if !current.is_terminal() {
                entry.touch(true);
                debug!(
                    event = events::REGISTRY_REUSE,
                    component = COMPONENT,
                    key = %key,
                    state = %current,
                    "reusing cached connection"
                );
                return ConnectionHandle::Managed(entry.connection.clone());
            }
            debug!(
                "{}:{} {key} is {current}, replacing it",
                CONNECTION_REGISTRY_TAG, CONNECTION_REGISTRY_FN_ACQUIRE_TAG
            );
            replaced = state.entries.remove(&key).map(|entry| entry.connection);
        }

        let now = Instant::now();
        let min_interval = self.policy.creation_min_interval();
        if let Some(last) = state.last_creation {
            let elapsed = now.duration_since(last);
            if elapsed < min_interval {
                drop(state);
                Self::retire(replaced).await;
                let retry_in = min_interval - elapsed;
                warn!(
                    event = events::REGISTRY_RATE_LIMITED,
                    component = COMPONENT,
                    key = %key,
                    retry_in_ms = retry_in.as_millis() as u64,
                    "connection creation rate limited"
                );
                return self.inert(key, LinkError::RateLimited { retry_in });
            }
        }
        state.last_creation = Some(now);

        if let Err(err) = resolve_valid_credential(self.context.credentials.as_ref()) {
            drop(state);
            Self::retire(replaced).await;
            warn!(
                event = events::CREDENTIAL_REJECTED,
                component = COMPONENT,
                key = %key,
                err = %err,
                "refusing to create connection without a valid credential"
            );
            self.context
                .observers
                .notify("on_error", |observer| observer.on_error(&key, &err));
            return self.inert(key, err);
        }

        let connection = ManagedConnection::spawn(key.clone(), self.context.clone());
        state
            .entries
            .insert(key.clone(), RegistryEntry::new(connection.clone()));
        let becomes_primary = state.primary.is_none();
        if becomes_primary {
            state.primary = Some(key.clone());
        }
        drop(state);

        Self::retire(replaced).await;
        info!(
            event = events::REGISTRY_CREATE,
            component = COMPONENT,
            key = %key,
            primary = becomes_primary,
            "created managed connection"
        );
        self.context
            .observers
            .notify("on_connection_created", |observer| {
                observer.on_connection_created(&key)
            });
        if becomes_primary {
            self.broadcaster
                .set_primary(key.clone(), connection.connection_state());
        }

        if let Err(err) = connection.connect().await {
            warn!(
                "{}:{} {key} did not connect: {err}",
                CONNECTION_REGISTRY_TAG, CONNECTION_REGISTRY_FN_ACQUIRE_TAG
            );
        }
        ConnectionHandle::Managed(connection)
    }

    /// Marks the entry idle. The connection stays alive until swept.
    pub async fn release(&self, tenant_id: &str, user_id: &str) -> bool {
        let key = ConnectionKey::new(tenant_id, user_id);
        let mut state = self.state.lock().await;
        match state.entries.get_mut(&key) {
            Some(entry) => {
                entry.touch(false);
                true
            }
            None => {
                debug!(
                    "{}:{} no connection cached for {key}",
                    CONNECTION_REGISTRY_TAG, CONNECTION_REGISTRY_FN_RELEASE_TAG
                );
                false
            }
        }
    }

    /// Looks up a cached connection without creating one or touching it.
    pub async fn get(&self, tenant_id: &str, user_id: &str) -> Option<ConnectionHandle> {
        let key = ConnectionKey::new(tenant_id, user_id);
        self.state
            .lock()
            .await
            .entries
            .get(&key)
            .map(|entry| ConnectionHandle::Managed(entry.connection.clone()))
    }

    /// Destroys and removes every entry that is not CONNECTED and has been
    /// idle for at least the configured timeout. Returns the evicted keys.
    pub async fn sweep_idle(&self) -> Vec<ConnectionKey> {
        let now = Instant::now();
        let idle_timeout = self.policy.idle_timeout();

        let evicted: Vec<Arc<ManagedConnection>> = {
            let mut state = self.state.lock().await;
            let keys: Vec<ConnectionKey> = state
                .entries
                .iter()
                .filter(|(_, entry)| entry.is_idle(now, idle_timeout))
                .map(|(key, _)| key.clone())
                .collect();
            if state
                .primary
                .as_ref()
                .is_some_and(|primary| keys.contains(primary))
            {
                state.primary = None;
                self.broadcaster.clear_primary();
            }
            keys.iter()
                .filter_map(|key| state.entries.remove(key))
                .map(|entry| entry.connection)
                .collect()
        };

        let mut keys = Vec::with_capacity(evicted.len());
        for connection in evicted {
            let state = connection.connection_state();
            connection.destroy().await;
            info!(
                event = events::REGISTRY_EVICT,
                component = COMPONENT,
                key = %connection.key(),
                state = %state,
                "evicted idle connection"
            );
            self.context
                .observers
                .notify("on_connection_evicted", |observer| {
                    observer.on_connection_evicted(connection.key())
                });
            keys.push(connection.key().clone());
        }
        keys
    }

    /// Starts the periodic idle sweep, replacing any running one.
    pub async fn start_idle_sweep(self: &Arc<Self>) {
        let registry = Arc::downgrade(self);
        let period = self.policy.sweep_interval();
        let sweep = async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let evicted = registry.sweep_idle().await;
                debug!("{CONNECTION_REGISTRY_TAG} idle sweep evicted {}", evicted.len());
            }
        };
        self.state
            .lock()
            .await
            .timers
            .spawn(TimerKind::IdleSweep, sweep);
    }

    /// Destroys every cached connection and stops the idle sweep. The
    /// registry stays usable; later `acquire` calls create fresh connections.
    pub async fn shutdown_all(&self) -> usize {
        let connections: Vec<Arc<ManagedConnection>> = {
            let mut state = self.state.lock().await;
            state.timers.cancel(TimerKind::IdleSweep);
            state.primary = None;
            self.broadcaster.clear_primary();
            state
                .entries
                .drain()
                .map(|(_, entry)| entry.connection)
                .collect()
        };

        let count = connections.len();
        join_all(connections.iter().map(|connection| connection.destroy())).await;
        info!(
            event = events::REGISTRY_SHUTDOWN,
            component = COMPONENT,
            connections = count,
            "destroyed all connections"
        );
        count
    }

    /// Selects the tenant context the broadcaster reports on. The key does
    /// not have to be cached yet.
    pub async fn set_primary(&self, tenant_id: &str, user_id: &str) {
        let key = ConnectionKey::new(tenant_id, user_id);
        let current = {
            let mut state = self.state.lock().await;
            state.primary = Some(key.clone());
            state
                .entries
                .get(&key)
                .map(|entry| entry.connection.connection_state())
                .unwrap_or(ConnectionState::Disconnected)
        };
        self.broadcaster.set_primary(key, current);
    }

    pub fn on_connect(&self, callback: LifecycleCallback) -> bool {
        self.broadcaster.on_connect(callback)
    }

    pub fn on_ready(&self, callback: LifecycleCallback) -> bool {
        self.broadcaster.on_ready(callback)
    }

    pub fn broadcaster(&self) -> &Arc<LifecycleBroadcaster> {
        &self.broadcaster
    }

    pub async fn metrics(&self) -> MetricsSnapshot {
        let now = Instant::now();
        let state = self.state.lock().await;
        let mut connections: Vec<_> = state
            .entries
            .values()
            .map(|entry| entry.summary(now))
            .collect();
        connections.sort_by(|a, b| {
            (a.tenant_id.as_str(), a.user_id.as_str())
                .cmp(&(b.tenant_id.as_str(), b.user_id.as_str()))
        });

        MetricsSnapshot {
            counters: self.metrics.counters(),
            connections,
        }
    }

    /// Per-connection diagnostics, sorted by key.
    pub async fn diagnostics(&self) -> Vec<ConnectionDiagnostics> {
        let mut connections: Vec<Arc<ManagedConnection>> = self
            .state
            .lock()
            .await
            .entries
            .values()
            .map(|entry| entry.connection.clone())
            .collect();
        connections.sort_by(|a, b| a.key().cmp(b.key()));

        let mut diagnostics = Vec::with_capacity(connections.len());
        for connection in connections {
            diagnostics.push(connection.diagnostics().await);
        }
        diagnostics
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    fn inert(&self, key: ConnectionKey, failure: LinkError) -> ConnectionHandle {
        ConnectionHandle::Inert(Arc::new(InertConnection::new(key, failure)))
    }

    async fn retire(replaced: Option<Arc<ManagedConnection>>) {
        if let Some(connection) = replaced {
            connection.destroy().await;
        }
    }
}

impl Drop for ConnectionRegistry {
    fn drop(&mut self) {
        self.context.credentials.remove_invalidate(self.invalidation);
    }
}
