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

//! In-crate test doubles shared by unit tests.

use crate::credentials::{
    Credential, CredentialResolver, InvalidateCallback, InvalidationId, InvalidationSubscribers,
};
use crate::error::LinkError;
use crate::transport::{CloseReason, EventListener, LifecycleSink, RawConnection, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    opened: Mutex<Vec<Arc<ScriptedRaw>>>,
    open_calls: AtomicUsize,
    failures_left: AtomicUsize,
    hangs_left: AtomicUsize,
    closes_during_open_left: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn fail_next_opens(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub(crate) fn hang_next_opens(&self, count: usize) {
        self.hangs_left.store(count, Ordering::SeqCst);
    }

    /// The next `count` opens report a lost transport before returning the
    /// handle.
    pub(crate) fn close_during_next_opens(&self, count: usize) {
        self.closes_during_open_left.store(count, Ordering::SeqCst);
    }

    pub(crate) fn open_count(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn connection(&self, index: usize) -> Option<Arc<ScriptedRaw>> {
        self.opened.lock().unwrap().get(index).cloned()
    }

    pub(crate) fn latest(&self) -> Option<Arc<ScriptedRaw>> {
        self.opened.lock().unwrap().last().cloned()
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(
        &self,
        _endpoint: &str,
        _credential: &Credential,
        lifecycle: LifecycleSink,
    ) -> Result<Arc<dyn RawConnection>, LinkError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.hangs_left) {
            std::future::pending::<()>().await;
        }
        if take_one(&self.failures_left) {
            return Err(LinkError::Transport("scripted open failure".to_string()));
        }

        if take_one(&self.closes_during_open_left) {
            lifecycle.on_close(CloseReason::TransportLost("dropped while opening".to_string()));
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let raw = Arc::new(ScriptedRaw {
            lifecycle,
            emitted: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        self.opened.lock().unwrap().push(raw.clone());
        Ok(raw)
    }
}

pub(crate) struct ScriptedRaw {
    lifecycle: LifecycleSink,
    emitted: Mutex<Vec<(String, Value)>>,
    listeners: Mutex<Vec<(String, Arc<dyn EventListener>)>>,
    closed: AtomicBool,
}

impl ScriptedRaw {
    pub(crate) fn close_with(&self, reason: CloseReason) {
        self.lifecycle.on_close(reason);
    }

    pub(crate) fn emitted(&self) -> Vec<(String, Value)> {
        self.emitted.lock().unwrap().clone()
    }

    pub(crate) fn listener_events(&self) -> Vec<String> {
        self.listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(event, _)| event.clone())
            .collect()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl RawConnection for ScriptedRaw {
    fn on(&self, event: &str, listener: Arc<dyn EventListener>) {
        self.listeners
            .lock()
            .unwrap()
            .push((event.to_string(), listener));
    }

    fn off(&self, event: &str, listener: &Arc<dyn EventListener>) {
        self.listeners
            .lock()
            .unwrap()
            .retain(|(registered, attached)| {
                registered != event || Arc::as_ptr(attached) as *const () != Arc::as_ptr(listener) as *const ()
            });
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), LinkError> {
        self.emitted
            .lock()
            .unwrap()
            .push((event.to_string(), payload));
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct ScriptedCredentials {
    current: Mutex<Option<Credential>>,
    subscribers: InvalidationSubscribers,
}

impl ScriptedCredentials {
    pub(crate) fn valid(token: &str) -> Self {
        Self {
            current: Mutex::new(Some(Credential::new(token))),
            subscribers: InvalidationSubscribers::new(),
        }
    }

    pub(crate) fn missing() -> Self {
        Self::default()
    }

    pub(crate) fn invalidate(&self) {
        self.current.lock().unwrap().take();
        self.subscribers.notify();
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl CredentialResolver for ScriptedCredentials {
    fn current_credential(&self) -> Option<Credential> {
        self.current.lock().unwrap().clone()
    }

    fn on_invalidate(&self, callback: InvalidateCallback) -> InvalidationId {
        self.subscribers.subscribe(callback)
    }

    fn remove_invalidate(&self, id: InvalidationId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}
