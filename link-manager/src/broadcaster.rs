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

//! Process-wide "connect" and "ready" notifications.
//!
//! Each event is a single-fire latch tied to the primary connection: queued
//! callbacks run exactly once when the latch fires and the queue is cleared.
//! A callback registered after the latch fired runs immediately. Both latches
//! re-arm when the primary connection leaves CONNECTED, so a later recovery
//! is announced to whoever registered in the meantime.

use crate::connection::ConnectionState;
use crate::key::ConnectionKey;
use crate::observability::events;
use crate::observers::LifecycleObserver;
use serde::Serialize;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

const LIFECYCLE_BROADCASTER_TAG: &str = "LifecycleBroadcaster:";
const COMPONENT: &str = "lifecycle_broadcaster";

pub type LifecycleCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The primary connection's transport opened.
    Connect,
    /// The primary connection reached CONNECTED with its state replayed.
    Ready,
}

impl Display for LifecycleEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Connect => write!(f, "connect"),
            LifecycleEvent::Ready => write!(f, "ready"),
        }
    }
}

#[derive(Default)]
struct Latch {
    fired: bool,
    queue: Vec<LifecycleCallback>,
}

impl Latch {
    fn contains(&self, callback: &LifecycleCallback) -> bool {
        let address = Arc::as_ptr(callback) as *const ();
        self.queue
            .iter()
            .any(|queued| Arc::as_ptr(queued) as *const () == address)
    }
}

#[derive(Default)]
struct BroadcasterState {
    primary: Option<ConnectionKey>,
    connect: Latch,
    ready: Latch,
}

impl BroadcasterState {
    fn latch_mut(&mut self, event: LifecycleEvent) -> &mut Latch {
        match event {
            LifecycleEvent::Connect => &mut self.connect,
            LifecycleEvent::Ready => &mut self.ready,
        }
    }

    fn is_primary(&self, key: &ConnectionKey) -> bool {
        self.primary.as_ref() == Some(key)
    }

    fn reset(&mut self) {
        self.connect.fired = false;
        self.ready.fired = false;
    }
}

#[derive(Default)]
pub struct LifecycleBroadcaster {
    state: Mutex<BroadcasterState>,
}

impl LifecycleBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when this exact callback is already queued.
    pub fn on_connect(&self, callback: LifecycleCallback) -> bool {
        self.register(LifecycleEvent::Connect, callback)
    }

    /// Returns `false` when this exact callback is already queued.
    pub fn on_ready(&self, callback: LifecycleCallback) -> bool {
        self.register(LifecycleEvent::Ready, callback)
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connect.fired
    }

    pub fn is_ready(&self) -> bool {
        self.lock().ready.fired
    }

    pub fn primary(&self) -> Option<ConnectionKey> {
        self.lock().primary.clone()
    }

    /// Makes `key` the primary connection. Both latches re-arm and fire right
    /// away if the new primary is already CONNECTED.
    pub fn set_primary(&self, key: ConnectionKey, current: ConnectionState) {
        {
            let mut state = self.lock();
            debug!(
                "{LIFECYCLE_BROADCASTER_TAG} primary changed from {:?} to {key} ({current})",
                state.primary
            );
            state.primary = Some(key);
            state.reset();
        }

        if current.is_connected() {
            self.fire(LifecycleEvent::Connect);
            self.fire(LifecycleEvent::Ready);
        }
    }

    /// Forgets the primary connection. Both latches re-arm; queued callbacks
    /// stay queued for the next primary.
    pub fn clear_primary(&self) {
        let mut state = self.lock();
        if let Some(previous) = state.primary.take() {
            debug!("{LIFECYCLE_BROADCASTER_TAG} primary {previous} cleared");
        }
        state.reset();
    }

    fn register(&self, event: LifecycleEvent, callback: LifecycleCallback) -> bool {
        let mut state = self.lock();
        let latch = state.latch_mut(event);
        if latch.fired {
            drop(state);
            Self::run(event, vec![callback]);
            return true;
        }
        if latch.contains(&callback) {
            return false;
        }
        latch.queue.push(callback);
        true
    }

    fn fire(&self, event: LifecycleEvent) {
        let callbacks = {
            let mut state = self.lock();
            let latch = state.latch_mut(event);
            if latch.fired {
                return;
            }
            latch.fired = true;
            std::mem::take(&mut latch.queue)
        };
        debug!(
            "{LIFECYCLE_BROADCASTER_TAG} {event} fired, running {} callback(s)",
            callbacks.len()
        );
        Self::run(event, callbacks);
    }

    fn run(event: LifecycleEvent, callbacks: Vec<LifecycleCallback>) {
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                error!(
                    event = events::OBSERVER_PANICKED,
                    component = COMPONENT,
                    lifecycle = %event,
                    "lifecycle callback panicked, ignoring"
                );
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, BroadcasterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LifecycleObserver for LifecycleBroadcaster {
    fn on_transport_opened(&self, key: &ConnectionKey) {
        if self.lock().is_primary(key) {
            self.fire(LifecycleEvent::Connect);
        }
    }

    fn on_transition(&self, key: &ConnectionKey, previous: ConnectionState, current: ConnectionState) {
        let mut state = self.lock();
        if !state.is_primary(key) {
            return;
        }
        if current.is_connected() {
            drop(state);
            self.fire(LifecycleEvent::Ready);
        } else if previous.is_connected() {
            state.reset();
        }
    }
}

impl Debug for LifecycleBroadcaster {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("LifecycleBroadcaster")
            .field("primary", &state.primary)
            .field("connected", &state.connect.fired)
            .field("ready", &state.ready.fired)
            .finish()
    }
}
