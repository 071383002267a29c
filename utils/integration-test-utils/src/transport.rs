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

use async_trait::async_trait;
use link_manager::{
    CloseReason, Credential, EventListener, LifecycleSink, LinkError, RawConnection, Transport,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

const RECORDING_TRANSPORT_TAG: &str = "RecordingTransport:";

/// Transport that records every raw connection it opens and can be told to
/// fail or hang upcoming opens.
#[derive(Default)]
pub struct RecordingTransport {
    opened: Mutex<Vec<Arc<RecordingConnection>>>,
    endpoints: Mutex<Vec<String>>,
    open_calls: AtomicUsize,
    failures_left: AtomicUsize,
    hangs_left: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_opens(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Upcoming opens never complete; the manager's connect timeout applies.
    pub fn hang_next_opens(&self, count: usize) {
        self.hangs_left.store(count, Ordering::SeqCst);
    }

    /// Every call to `open`, including failed and hung ones.
    pub fn open_count(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub fn connection(&self, index: usize) -> Option<Arc<RecordingConnection>> {
        self.opened.lock().unwrap().get(index).cloned()
    }

    pub fn latest(&self) -> Option<Arc<RecordingConnection>> {
        self.opened.lock().unwrap().last().cloned()
    }

    pub fn connections(&self) -> Vec<Arc<RecordingConnection>> {
        self.opened.lock().unwrap().clone()
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints.lock().unwrap().clone()
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn open(
        &self,
        endpoint: &str,
        credential: &Credential,
        lifecycle: LifecycleSink,
    ) -> Result<Arc<dyn RawConnection>, LinkError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        self.endpoints.lock().unwrap().push(endpoint.to_string());

        if Self::take_one(&self.hangs_left) {
            debug!("{RECORDING_TRANSPORT_TAG} hanging open to {endpoint}");
            std::future::pending::<()>().await;
        }
        if Self::take_one(&self.failures_left) {
            debug!("{RECORDING_TRANSPORT_TAG} failing open to {endpoint}");
            return Err(LinkError::Transport("connection refused".to_string()));
        }

        let connection = Arc::new(RecordingConnection {
            token: credential.token().to_string(),
            lifecycle,
            emitted: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        self.opened.lock().unwrap().push(connection.clone());
        Ok(connection)
    }
}

/// One opened raw connection. Lets the test play the server side.
pub struct RecordingConnection {
    token: String,
    lifecycle: LifecycleSink,
    emitted: Mutex<Vec<(String, Value)>>,
    listeners: Mutex<Vec<(String, Arc<dyn EventListener>)>>,
    closed: AtomicBool,
}

impl RecordingConnection {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn generation(&self) -> u64 {
        self.lifecycle.generation()
    }

    /// Everything the manager sent, in order.
    pub fn emitted(&self) -> Vec<(String, Value)> {
        self.emitted.lock().unwrap().clone()
    }

    pub fn emitted_events(&self) -> Vec<String> {
        self.emitted()
            .into_iter()
            .map(|(event, _)| event)
            .collect()
    }

    /// Event names of the attached listeners, in attachment order.
    pub fn listener_events(&self) -> Vec<String> {
        self.listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(event, _)| event.clone())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Reports a closure to the manager.
    pub fn close_with(&self, reason: CloseReason) {
        self.lifecycle.on_close(reason);
    }

    pub fn drop_connection(&self) {
        self.close_with(CloseReason::TransportLost("connection reset".to_string()));
    }

    pub fn fail_with(&self, error: &str) {
        self.lifecycle.on_error(error);
    }

    /// Delivers a server event to every listener attached for `event`.
    pub async fn deliver(&self, event: &str, payload: Value) -> usize {
        let targets: Vec<Arc<dyn EventListener>> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .filter(|(registered, _)| registered == event)
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in &targets {
            listener.on_event(event, payload.clone()).await;
        }
        targets.len()
    }
}

impl RawConnection for RecordingConnection {
    fn on(&self, event: &str, listener: Arc<dyn EventListener>) {
        self.listeners
            .lock()
            .unwrap()
            .push((event.to_string(), listener));
    }

    fn off(&self, event: &str, listener: &Arc<dyn EventListener>) {
        let address = Arc::as_ptr(listener) as *const ();
        self.listeners.lock().unwrap().retain(|(registered, attached)| {
            registered != event || Arc::as_ptr(attached) as *const () != address
        });
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), LinkError> {
        if self.is_closed() {
            return Err(LinkError::Transport("connection is closed".to_string()));
        }
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
