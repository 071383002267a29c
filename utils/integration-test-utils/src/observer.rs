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
use link_manager::{ConnectionKey, ConnectionState, EventListener, LifecycleObserver};
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

/// Listener that keeps every event it was handed.
#[derive(Default)]
pub struct RecordingListener {
    received: Mutex<Vec<(String, Value)>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<(String, Value)> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventListener for RecordingListener {
    async fn on_event(&self, event: &str, payload: Value) {
        self.received
            .lock()
            .unwrap()
            .push((event.to_string(), payload));
    }
}

/// Observer recording state transitions and scheduled retries.
#[derive(Default)]
pub struct RecordingObserver {
    transitions: Mutex<Vec<(ConnectionKey, ConnectionState, ConnectionState)>>,
    retries: Mutex<Vec<(ConnectionKey, u32, Duration)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visited states for `key`, starting with the first transition's origin.
    pub fn states_of(&self, key: &ConnectionKey) -> Vec<ConnectionState> {
        let transitions = self.transitions.lock().unwrap();
        let mut states = Vec::new();
        for (transition_key, previous, current) in transitions.iter() {
            if transition_key != key {
                continue;
            }
            if states.is_empty() {
                states.push(*previous);
            }
            states.push(*current);
        }
        states
    }

    pub fn retries_of(&self, key: &ConnectionKey) -> Vec<(u32, Duration)> {
        self.retries
            .lock()
            .unwrap()
            .iter()
            .filter(|(retry_key, _, _)| retry_key == key)
            .map(|(_, attempt, delay)| (*attempt, *delay))
            .collect()
    }
}

impl LifecycleObserver for RecordingObserver {
    fn on_transition(&self, key: &ConnectionKey, previous: ConnectionState, current: ConnectionState) {
        self.transitions
            .lock()
            .unwrap()
            .push((key.clone(), previous, current));
    }

    fn on_reconnect_scheduled(&self, key: &ConnectionKey, attempt: u32, delay: Duration) {
        self.retries
            .lock()
            .unwrap()
            .push((key.clone(), attempt, delay));
    }
}
