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

//! The managed connection state machine.
//!
//! A [`ManagedConnection`] wraps one raw transport connection at a time for a
//! single `(tenant, user)` pair. Lifecycle signals (transport close/error,
//! retry timers, credential invalidation) are drained by one driver task per
//! connection, and every transition happens while holding the connection's
//! lock, so transitions for one connection never interleave. Handlers
//! re-check the current state and the transport generation before acting.
//!
//! Reconnection follows a bounded exponential backoff with jitter. After a
//! successful re-open, listeners are re-attached and channel memberships are
//! re-requested in the order they were first registered, and only then does
//! the connection report CONNECTED again.

use crate::config::ReconnectPolicy;
use crate::connection::backoff::retry_delay;
use crate::connection::listeners::{CountingListener, ListenerIdentityKey, ListenerRegistry};
use crate::connection::memberships::{ChannelMembership, MembershipRegistry};
use crate::connection::signal::ConnectionSignal;
use crate::connection::state::ConnectionState;
use crate::credentials::{resolve_valid_credential, Credential, CredentialResolver};
use crate::error::LinkError;
use crate::key::ConnectionKey;
use crate::observability::events;
use crate::observers::Observers;
use crate::timers::{TimerKind, TimerSet};
use crate::transport::{EventListener, LifecycleSink, RawConnection, Transport};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const MANAGED_CONNECTION_TAG: &str = "ManagedConnection:";
const MANAGED_CONNECTION_FN_ON_TAG: &str = "on():";
const MANAGED_CONNECTION_FN_EMIT_TAG: &str = "emit():";
const MANAGED_CONNECTION_FN_JOIN_TAG: &str = "join():";
const MANAGED_CONNECTION_FN_DESTROY_TAG: &str = "destroy():";
const COMPONENT: &str = "managed_connection";

/// Collaborators and policy shared by every connection a registry creates.
#[derive(Clone)]
pub(crate) struct ConnectionContext {
    pub(crate) endpoint: String,
    pub(crate) connect_timeout: Duration,
    pub(crate) policy: ReconnectPolicy,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) credentials: Arc<dyn CredentialResolver>,
    pub(crate) observers: Observers,
}

struct ConnectionInner {
    /// Present exactly while CONNECTED.
    raw: Option<Arc<dyn RawConnection>>,
    /// Bumped for every open attempt and every teardown; signals and open
    /// results carrying an older value are ignored.
    generation: u64,
    listeners: ListenerRegistry,
    memberships: MembershipRegistry,
    reconnect_attempts: u32,
    last_reconnect_at: Option<Instant>,
    last_error: Option<LinkError>,
    /// Failure reported for the generation whose open is still in flight.
    pending_failure: Option<String>,
    timers: TimerSet,
}

/// Point-in-time view of one connection, for "reconnecting" indicators and
/// operational inspection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConnectionDiagnostics {
    pub tenant_id: String,
    pub user_id: String,
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
    pub max_reconnect_attempts: u32,
    pub reconnect_pending: bool,
    pub listener_count: usize,
    pub membership_count: usize,
    pub last_error: Option<String>,
}

pub struct ManagedConnection {
    key: ConnectionKey,
    context: ConnectionContext,
    inner: Mutex<ConnectionInner>,
    state: watch::Sender<ConnectionState>,
    signals: UnboundedSender<ConnectionSignal>,
    last_activity: StdMutex<Instant>,
}

impl ManagedConnection {
    /// Builds a DISCONNECTED connection and starts its signal driver. Must be
    /// called from within a tokio runtime.
    pub(crate) fn spawn(key: ConnectionKey, context: ConnectionContext) -> Arc<Self> {
        let (signals, receiver) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Arc::new_cyclic(|weak: &Weak<Self>| {
            let mut timers = TimerSet::new();
            timers.spawn(TimerKind::SignalDriver, Self::drive(weak.clone(), receiver));

            Self {
                key,
                context,
                inner: Mutex::new(ConnectionInner {
                    raw: None,
                    generation: 0,
                    listeners: ListenerRegistry::new(),
                    memberships: MembershipRegistry::new(),
                    reconnect_attempts: 0,
                    last_reconnect_at: None,
                    last_error: None,
                    pending_failure: None,
                    timers,
                }),
                state,
                signals,
                last_activity: StdMutex::new(Instant::now()),
            }
        })
    }

    async fn drive(connection: Weak<Self>, mut receiver: UnboundedReceiver<ConnectionSignal>) {
        while let Some(signal) = receiver.recv().await {
            let Some(connection) = connection.upgrade() else {
                break;
            };
            connection.handle_signal(signal).await;
        }
    }

    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    pub fn tenant_id(&self) -> &str {
        self.key.tenant_id()
    }

    pub fn user_id(&self) -> &str {
        self.key.user_id()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    pub fn is_destroyed(&self) -> bool {
        self.connection_state() == ConnectionState::Destroyed
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Last consumer call or state change; the idle sweep measures from here.
    pub(crate) fn last_activity(&self) -> Instant {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Waits until the connection reaches `target`.
    pub async fn wait_for_state(
        &self,
        target: ConnectionState,
        timeout: Duration,
    ) -> Result<(), LinkError> {
        let mut receiver = self.state.subscribe();
        let waited = tokio::time::timeout(timeout, receiver.wait_for(|state| *state == target))
            .await
            .map(|reached| reached.map(|_| ()));
        match waited {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(LinkError::InvalidState(
                "state channel closed".to_string(),
            )),
            Err(_) => Err(LinkError::Timeout(timeout)),
        }
    }

    pub async fn last_error(&self) -> Option<LinkError> {
        self.inner.lock().await.last_error.clone()
    }

    /// Registers `listener` for `event`. Attached to the live transport right
    /// away when CONNECTED, otherwise on the next successful (re)connect.
    /// Returns `false` for a duplicate pair or a destroyed connection.
    pub async fn on(&self, event: &str, listener: Arc<dyn EventListener>) -> bool {
        self.touch();
        let mut inner = self.inner.lock().await;
        if self.is_destroyed() {
            debug!(
                "{}:{} {} is destroyed, ignoring listener for {event}",
                MANAGED_CONNECTION_TAG, MANAGED_CONNECTION_FN_ON_TAG, self.key
            );
            return false;
        }

        let identity = ListenerIdentityKey::new(listener.clone());
        if inner.listeners.contains(event, &identity) {
            debug!(
                "{}:{} {} already has this listener for {event}",
                MANAGED_CONNECTION_TAG, MANAGED_CONNECTION_FN_ON_TAG, self.key
            );
            return false;
        }

        let attached: Arc<dyn EventListener> = Arc::new(CountingListener::new(
            self.key.clone(),
            listener,
            self.context.observers.clone(),
        ));
        inner.listeners.register(event, identity, attached.clone());
        if let Some(raw) = inner.raw.as_ref() {
            raw.on(event, attached);
        }
        true
    }

    pub async fn off(&self, event: &str, listener: &Arc<dyn EventListener>) -> bool {
        self.touch();
        let mut inner = self.inner.lock().await;
        let identity = ListenerIdentityKey::new(listener.clone());
        let Some(registered) = inner.listeners.unregister(event, &identity) else {
            return false;
        };
        if let Some(raw) = inner.raw.as_ref() {
            raw.off(&registered.event, &registered.attached);
        }
        true
    }

    /// Requests `membership` from the server now if CONNECTED, and remembers
    /// it so it is re-requested after every recovery.
    pub async fn join(&self, membership: ChannelMembership) -> bool {
        self.touch();
        let mut inner = self.inner.lock().await;
        if self.is_destroyed() {
            return false;
        }
        if !inner.memberships.insert(membership.clone()) {
            debug!(
                "{}:{} {} already joined {:?}",
                MANAGED_CONNECTION_TAG, MANAGED_CONNECTION_FN_JOIN_TAG, self.key, membership
            );
            return false;
        }
        if let Some(raw) = inner.raw.clone() {
            self.send(&raw, membership.event(), membership.params().clone());
        }
        true
    }

    /// Forgets `membership`; it will not be replayed anymore.
    pub async fn leave(&self, membership: &ChannelMembership) -> bool {
        self.touch();
        self.inner.lock().await.memberships.remove(membership)
    }

    /// Sends an event when CONNECTED. Outbound traffic is never buffered: on
    /// any other state the event is dropped with a warning.
    pub async fn emit(&self, event: &str, payload: Value) -> bool {
        self.touch();
        let inner = self.inner.lock().await;
        let state = self.connection_state();
        match (state, inner.raw.clone()) {
            (ConnectionState::Connected, Some(raw)) => self.send(&raw, event, payload),
            _ => {
                warn!(
                    event = events::EMIT_DROPPED,
                    component = COMPONENT,
                    key = %self.key,
                    %state,
                    outbound = event,
                    "dropping outbound event, connection is not connected"
                );
                self.context.observers.notify("on_event_dropped", |observer| {
                    observer.on_event_dropped(&self.key, event)
                });
                false
            }
        }
    }

    /// Explicit reconnect request. Only valid from DISCONNECTED; ERROR and
    /// DESTROYED connections must be re-created through the registry.
    pub async fn reconnect(&self) -> Result<(), LinkError> {
        self.connect().await
    }

    /// Consumer-initiated disconnect. Pending retries are cancelled and the
    /// registries are kept, so a later [`reconnect`](Self::reconnect) restores
    /// everything.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        let state = self.connection_state();
        if !state.is_active() {
            debug!(
                "{MANAGED_CONNECTION_TAG} {} is {state}, nothing to disconnect",
                self.key
            );
            return;
        }

        inner.timers.cancel(TimerKind::Reconnect);
        inner.generation += 1;
        Self::detach_transport(&mut inner);
        inner.reconnect_attempts = 0;
        self.set_state(&mut inner, ConnectionState::Disconnected);
    }

    /// Tears the connection down for good: timers are cancelled first, then
    /// listeners are detached and the transport is closed.
    pub async fn destroy(&self) {
        let mut inner = self.inner.lock().await;
        if self.is_destroyed() {
            return;
        }

        let cancelled = inner.timers.cancel_all();
        inner.generation += 1;
        if let Some(raw) = inner.raw.take() {
            for registered in inner.listeners.iter() {
                raw.off(&registered.event, &registered.attached);
            }
            raw.close();
        }
        inner.listeners.clear();
        inner.memberships.clear();
        debug!(
            "{}:{} {} destroyed, {} pending timer(s) cancelled",
            MANAGED_CONNECTION_TAG, MANAGED_CONNECTION_FN_DESTROY_TAG, self.key, cancelled
        );
        self.set_state(&mut inner, ConnectionState::Destroyed);
    }

    pub async fn diagnostics(&self) -> ConnectionDiagnostics {
        let inner = self.inner.lock().await;
        ConnectionDiagnostics {
            tenant_id: self.key.tenant_id().to_string(),
            user_id: self.key.user_id().to_string(),
            state: self.connection_state(),
            reconnect_attempts: inner.reconnect_attempts,
            max_reconnect_attempts: self.context.policy.max_attempts,
            reconnect_pending: inner.timers.is_pending(TimerKind::Reconnect),
            listener_count: inner.listeners.len(),
            membership_count: inner.memberships.len(),
            last_error: inner.last_error.as_ref().map(ToString::to_string),
        }
    }

    /// DISCONNECTED -> CONNECTING, then CONNECTED on a successful open.
    ///
    /// A transport failure here is recovered locally through RECONNECTING;
    /// only credential problems and an exhausted retry budget are returned.
    pub(crate) async fn connect(&self) -> Result<(), LinkError> {
        let mut inner = self.inner.lock().await;
        let state = self.connection_state();
        if state != ConnectionState::Disconnected {
            return Err(LinkError::InvalidState(format!(
                "{} cannot connect while {state}",
                self.key
            )));
        }

        let credential = match resolve_valid_credential(self.context.credentials.as_ref()) {
            Ok(credential) => credential,
            Err(err) => {
                warn!(
                    event = events::CREDENTIAL_REJECTED,
                    component = COMPONENT,
                    key = %self.key,
                    err = %err,
                    "unable to connect without a valid credential"
                );
                self.fail(&mut inner, err.clone());
                return Err(err);
            }
        };

        self.set_state(&mut inner, ConnectionState::Connecting);
        inner.generation += 1;
        inner.pending_failure = None;
        let generation = inner.generation;
        drop(inner);

        let opened = self.open_transport(&credential, generation).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation || self.connection_state() != ConnectionState::Connecting
        {
            if let Ok(raw) = opened {
                raw.close();
            }
            return Err(LinkError::InvalidState(format!(
                "{} was torn down while connecting",
                self.key
            )));
        }

        match self.settle_open(&mut inner, opened) {
            Ok(raw) => {
                self.establish(&mut inner, raw);
                Ok(())
            }
            Err(err) => {
                self.record_error(&mut inner, &err);
                self.set_state(&mut inner, ConnectionState::Reconnecting);
                self.schedule_retry(&mut inner)
            }
        }
    }

    pub(crate) fn notify_credential_invalidated(&self) {
        if self
            .signals
            .send(ConnectionSignal::CredentialInvalidated)
            .is_err()
        {
            debug!("{MANAGED_CONNECTION_TAG} {} has no driver left", self.key);
        }
    }

    async fn handle_signal(&self, signal: ConnectionSignal) {
        match signal {
            ConnectionSignal::TransportClosed { generation, reason } => {
                if reason.is_unexpected() {
                    self.handle_transport_failure(generation, reason.to_string())
                        .await;
                } else {
                    debug!(
                        "{MANAGED_CONNECTION_TAG} {} ignoring close: {reason}",
                        self.key
                    );
                }
            }
            ConnectionSignal::TransportError { generation, error } => {
                self.handle_transport_failure(generation, error).await;
            }
            ConnectionSignal::RetryDue { generation } => self.retry(generation).await,
            ConnectionSignal::CredentialInvalidated => self.handle_credential_invalidated().await,
        }
    }

    /// CONNECTED -> RECONNECTING on an unexpected closure. Overlapping
    /// reports for the same failure find the connection already
    /// RECONNECTING and are dropped.
    async fn handle_transport_failure(&self, generation: u64, reason: String) {
        let mut inner = self.inner.lock().await;
        if generation != inner.generation {
            debug!(
                event = events::STALE_SIGNAL,
                component = COMPONENT,
                key = %self.key,
                generation,
                current = inner.generation,
                "ignoring failure report from a replaced transport"
            );
            return;
        }

        let state = self.connection_state();
        match state {
            ConnectionState::Connected => {}
            ConnectionState::Connecting => {
                debug!(
                    "{MANAGED_CONNECTION_TAG} {} failed while opening, deferring: {reason}",
                    self.key
                );
                inner.pending_failure = Some(reason);
                return;
            }
            _ => {
                debug!(
                    "{MANAGED_CONNECTION_TAG} {} is {state}, ignoring transport failure: {reason}",
                    self.key
                );
                return;
            }
        }

        warn!(
            event = events::TRANSPORT_FAILED,
            component = COMPONENT,
            key = %self.key,
            reason = %reason,
            "transport closed unexpectedly"
        );
        self.record_error(&mut inner, &LinkError::Transport(reason));
        Self::detach_transport(&mut inner);

        if let Err(err) = resolve_valid_credential(self.context.credentials.as_ref()) {
            self.fail(&mut inner, err);
            return;
        }

        self.set_state(&mut inner, ConnectionState::Reconnecting);
        // Exhaustion is already recorded and published by `schedule_retry`.
        let _ = self.schedule_retry(&mut inner);
    }

    /// One reconnection attempt, fired by the retry timer.
    async fn retry(&self, generation: u64) {
        let mut inner = self.inner.lock().await;
        if generation != inner.generation
            || self.connection_state() != ConnectionState::Reconnecting
        {
            debug!(
                event = events::STALE_SIGNAL,
                component = COMPONENT,
                key = %self.key,
                generation,
                "ignoring retry timer that no longer applies"
            );
            return;
        }
        // The timer that delivered this signal has done its job.
        inner.timers.cancel(TimerKind::Reconnect);

        let credential = match resolve_valid_credential(self.context.credentials.as_ref()) {
            Ok(credential) => credential,
            Err(err) => {
                self.fail(&mut inner, err);
                return;
            }
        };

        inner.last_reconnect_at = Some(Instant::now());
        inner.generation += 1;
        inner.pending_failure = None;
        let generation = inner.generation;
        info!(
            event = events::RECONNECT_ATTEMPT,
            component = COMPONENT,
            key = %self.key,
            attempt = inner.reconnect_attempts,
            max_attempts = self.context.policy.max_attempts,
            "attempting reconnection"
        );
        drop(inner);

        let opened = self.open_transport(&credential, generation).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation
            || self.connection_state() != ConnectionState::Reconnecting
        {
            if let Ok(raw) = opened {
                raw.close();
            }
            return;
        }

        match self.settle_open(&mut inner, opened) {
            Ok(raw) => self.establish(&mut inner, raw),
            Err(err) => {
                self.record_error(&mut inner, &err);
                let _ = self.schedule_retry(&mut inner);
            }
        }
    }

    async fn handle_credential_invalidated(&self) {
        let mut inner = self.inner.lock().await;
        let state = self.connection_state();
        if !state.is_active() {
            return;
        }

        warn!(
            event = events::CREDENTIAL_INVALIDATED,
            component = COMPONENT,
            key = %self.key,
            %state,
            "credential invalidated, abandoning connection"
        );
        self.fail(
            &mut inner,
            LinkError::Credential("session credential was invalidated".to_string()),
        );
    }

    async fn open_transport(
        &self,
        credential: &Credential,
        generation: u64,
    ) -> Result<Arc<dyn RawConnection>, LinkError> {
        let lifecycle = LifecycleSink::new(generation, self.signals.clone());
        let open = self
            .context
            .transport
            .open(&self.context.endpoint, credential, lifecycle);

        match tokio::time::timeout(self.context.connect_timeout, open).await {
            Ok(opened) => opened,
            Err(_) => Err(LinkError::Timeout(self.context.connect_timeout)),
        }
    }

    /// A handle whose transport already reported a failure during the open is
    /// closed and treated as a failed open.
    fn settle_open(
        &self,
        inner: &mut ConnectionInner,
        opened: Result<Arc<dyn RawConnection>, LinkError>,
    ) -> Result<Arc<dyn RawConnection>, LinkError> {
        match (opened, inner.pending_failure.take()) {
            (Ok(raw), Some(reason)) => {
                warn!(
                    event = events::TRANSPORT_FAILED,
                    component = COMPONENT,
                    key = %self.key,
                    reason = %reason,
                    "transport failed before the open completed"
                );
                raw.close();
                Err(LinkError::Transport(reason))
            }
            (opened, _) => opened,
        }
    }

    /// Replays listeners, then memberships, each in registration order, and
    /// only then reports CONNECTED.
    fn establish(&self, inner: &mut ConnectionInner, raw: Arc<dyn RawConnection>) {
        debug!(
            event = events::TRANSPORT_OPENED,
            component = COMPONENT,
            key = %self.key,
            generation = inner.generation,
            "transport opened"
        );
        self.context
            .observers
            .notify("on_transport_opened", |observer| {
                observer.on_transport_opened(&self.key)
            });

        for registered in inner.listeners.iter() {
            raw.on(&registered.event, registered.attached.clone());
        }
        for membership in inner.memberships.iter() {
            self.send(&raw, membership.event(), membership.params().clone());
        }
        debug!(
            event = events::STATE_REPLAYED,
            component = COMPONENT,
            key = %self.key,
            listeners = inner.listeners.len(),
            memberships = inner.memberships.len(),
            "listeners and memberships replayed"
        );

        inner.raw = Some(raw);
        inner.reconnect_attempts = 0;
        inner.last_error = None;
        self.set_state(inner, ConnectionState::Connected);
    }

    /// Arms the retry timer, or gives up once the attempt budget is spent.
    fn schedule_retry(&self, inner: &mut ConnectionInner) -> Result<(), LinkError> {
        if inner.timers.is_pending(TimerKind::Reconnect) {
            debug!(
                "{MANAGED_CONNECTION_TAG} {} already has a retry scheduled",
                self.key
            );
            return Ok(());
        }

        let policy = &self.context.policy;
        if inner.reconnect_attempts >= policy.max_attempts {
            let err = LinkError::ExhaustedRetries {
                attempts: inner.reconnect_attempts,
            };
            error!(
                event = events::RECONNECT_EXHAUSTED,
                component = COMPONENT,
                key = %self.key,
                attempts = inner.reconnect_attempts,
                "reconnection attempts exhausted"
            );
            self.fail(inner, err.clone());
            return Err(err);
        }

        inner.reconnect_attempts += 1;
        let attempt = inner.reconnect_attempts;
        let since_last_attempt = inner.last_reconnect_at.map(|at| at.elapsed());
        let delay = retry_delay(policy, attempt, since_last_attempt);

        let generation = inner.generation;
        let signals = self.signals.clone();
        inner
            .timers
            .schedule_after(TimerKind::Reconnect, delay, async move {
                // The connection may be gone by now; nothing to retry then.
                let _ = signals.send(ConnectionSignal::RetryDue { generation });
            });

        info!(
            event = events::RECONNECT_SCHEDULED,
            component = COMPONENT,
            key = %self.key,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "reconnection scheduled"
        );
        self.context
            .observers
            .notify("on_reconnect_scheduled", |observer| {
                observer.on_reconnect_scheduled(&self.key, attempt, delay)
            });
        Ok(())
    }

    fn send(&self, raw: &Arc<dyn RawConnection>, event: &str, payload: Value) -> bool {
        match raw.emit(event, payload) {
            Ok(()) => {
                self.context.observers.notify("on_event_emitted", |observer| {
                    observer.on_event_emitted(&self.key, event)
                });
                true
            }
            Err(err) => {
                warn!(
                    "{}:{} {} unable to emit {event}: {err}",
                    MANAGED_CONNECTION_TAG, MANAGED_CONNECTION_FN_EMIT_TAG, self.key
                );
                self.context
                    .observers
                    .notify("on_error", |observer| observer.on_error(&self.key, &err));
                false
            }
        }
    }

    /// Moves to ERROR: no retry stays armed and no transport stays open.
    fn fail(&self, inner: &mut ConnectionInner, err: LinkError) {
        inner.timers.cancel(TimerKind::Reconnect);
        inner.generation += 1;
        Self::detach_transport(inner);
        self.record_error(inner, &err);
        self.set_state(inner, ConnectionState::Error);
    }

    fn record_error(&self, inner: &mut ConnectionInner, err: &LinkError) {
        inner.last_error = Some(err.clone());
        self.context
            .observers
            .notify("on_error", |observer| observer.on_error(&self.key, err));
    }

    fn detach_transport(inner: &mut ConnectionInner) {
        if let Some(raw) = inner.raw.take() {
            raw.close();
        }
    }

    /// The only place the state changes. Requires the inner lock.
    fn set_state(&self, _inner: &mut ConnectionInner, next: ConnectionState) -> bool {
        let previous = self.connection_state();
        if !previous.can_transition_to(next) {
            warn!(
                event = events::TRANSITION_REJECTED,
                component = COMPONENT,
                key = %self.key,
                from = %previous,
                to = %next,
                "refusing illegal state transition"
            );
            return false;
        }

        self.state.send_replace(next);
        self.touch();
        debug!(
            event = events::STATE_TRANSITION,
            component = COMPONENT,
            key = %self.key,
            from = %previous,
            to = %next,
            "connection state changed"
        );
        self.context.observers.notify("on_transition", |observer| {
            observer.on_transition(&self.key, previous, next)
        });
        true
    }
}

impl Debug for ManagedConnection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedConnection")
            .field("key", &self.key)
            .field("state", &self.connection_state())
            .finish_non_exhaustive()
    }
}
