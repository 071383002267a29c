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

//! Ordered listener registry replayed onto every new raw connection.

use crate::key::ConnectionKey;
use crate::observers::Observers;
use crate::transport::EventListener;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a listener callback: two handles are the same listener only
/// when they point at the same allocation.
#[derive(Clone)]
pub(crate) struct ListenerIdentityKey {
    listener: Arc<dyn EventListener>,
}

impl ListenerIdentityKey {
    pub(crate) fn new(listener: Arc<dyn EventListener>) -> Self {
        Self { listener }
    }

    fn address(&self) -> *const () {
        Arc::as_ptr(&self.listener).cast::<()>()
    }
}

impl Hash for ListenerIdentityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl PartialEq for ListenerIdentityKey {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for ListenerIdentityKey {}

impl Debug for ListenerIdentityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerIdentityKey")
            .field("address", &self.address())
            .finish()
    }
}

/// Wraps a consumer listener before it is attached to a raw connection so
/// inbound traffic is counted.
pub(crate) struct CountingListener {
    key: ConnectionKey,
    inner: Arc<dyn EventListener>,
    observers: Observers,
}

impl CountingListener {
    pub(crate) fn new(key: ConnectionKey, inner: Arc<dyn EventListener>, observers: Observers) -> Self {
        Self {
            key,
            inner,
            observers,
        }
    }
}

#[async_trait]
impl EventListener for CountingListener {
    async fn on_event(&self, event: &str, payload: Value) {
        self.observers.notify("on_event_received", |observer| {
            observer.on_event_received(&self.key, event)
        });
        self.inner.on_event(event, payload).await;
    }
}

pub(crate) struct RegisteredListener {
    pub(crate) event: String,
    pub(crate) identity: ListenerIdentityKey,
    /// What is actually attached to the raw connection.
    pub(crate) attached: Arc<dyn EventListener>,
}

/// `(event, listener)` pairs in registration order, unique per pair.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    entries: Vec<RegisteredListener>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contains(&self, event: &str, identity: &ListenerIdentityKey) -> bool {
        self.position(event, identity).is_some()
    }

    /// Returns `false` and keeps the registry unchanged for a duplicate pair.
    pub(crate) fn register(
        &mut self,
        event: &str,
        identity: ListenerIdentityKey,
        attached: Arc<dyn EventListener>,
    ) -> bool {
        if self.contains(event, &identity) {
            return false;
        }
        self.entries.push(RegisteredListener {
            event: event.to_string(),
            identity,
            attached,
        });
        true
    }

    pub(crate) fn unregister(
        &mut self,
        event: &str,
        identity: &ListenerIdentityKey,
    ) -> Option<RegisteredListener> {
        self.position(event, identity)
            .map(|index| self.entries.remove(index))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &RegisteredListener> {
        self.entries.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, event: &str, identity: &ListenerIdentityKey) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.event == event && &entry.identity == identity)
    }
}
