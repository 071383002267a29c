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

//! In-process transport that echoes every emitted event back to the
//! listeners attached for it. Lets the manager run without a server.

use async_trait::async_trait;
use link_manager::{
    CloseReason, Credential, EventListener, LifecycleSink, LinkError, RawConnection, Transport,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info};
use uuid::Uuid;

const LOOPBACK_TRANSPORT_TAG: &str = "LoopbackTransport:";
const LOOPBACK_CONNECTION_TAG: &str = "LoopbackConnection:";

#[derive(Default)]
pub(crate) struct LoopbackTransport {
    live: Mutex<Vec<Weak<LoopbackConnection>>>,
}

impl LoopbackTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Simulates a network outage on every open connection. Returns how many
    /// were dropped.
    pub(crate) fn drop_all(&self, reason: &str) -> usize {
        let connections: Vec<Arc<LoopbackConnection>> = {
            let mut live = lock(&self.live);
            live.retain(|connection| {
                connection
                    .upgrade()
                    .is_some_and(|connection| !connection.is_closed())
            });
            live.iter().filter_map(Weak::upgrade).collect()
        };

        for connection in &connections {
            info!(
                "{LOOPBACK_TRANSPORT_TAG} dropping connection {}",
                connection.id
            );
            connection
                .lifecycle
                .on_close(CloseReason::TransportLost(reason.to_string()));
        }
        connections.len()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn open(
        &self,
        endpoint: &str,
        credential: &Credential,
        lifecycle: LifecycleSink,
    ) -> Result<Arc<dyn RawConnection>, LinkError> {
        if credential.token().is_empty() {
            return Err(LinkError::Transport("empty session token".to_string()));
        }

        let connection = Arc::new(LoopbackConnection {
            id: Uuid::new_v4(),
            lifecycle,
            listeners: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        debug!(
            "{LOOPBACK_TRANSPORT_TAG} opened {} to {endpoint} (generation {})",
            connection.id,
            connection.lifecycle.generation()
        );
        lock(&self.live).push(Arc::downgrade(&connection));
        Ok(connection)
    }
}

pub(crate) struct LoopbackConnection {
    id: Uuid,
    lifecycle: LifecycleSink,
    listeners: Mutex<Vec<(String, Arc<dyn EventListener>)>>,
    closed: AtomicBool,
}

impl LoopbackConnection {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl RawConnection for LoopbackConnection {
    fn on(&self, event: &str, listener: Arc<dyn EventListener>) {
        lock(&self.listeners).push((event.to_string(), listener));
    }

    fn off(&self, event: &str, listener: &Arc<dyn EventListener>) {
        let address = Arc::as_ptr(listener) as *const ();
        lock(&self.listeners).retain(|(registered, attached)| {
            registered != event || Arc::as_ptr(attached) as *const () != address
        });
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), LinkError> {
        if self.is_closed() {
            return Err(LinkError::Transport(format!(
                "connection {} is closed",
                self.id
            )));
        }

        let targets: Vec<Arc<dyn EventListener>> = lock(&self.listeners)
            .iter()
            .filter(|(registered, _)| registered == event)
            .map(|(_, listener)| listener.clone())
            .collect();
        debug!(
            "{LOOPBACK_CONNECTION_TAG} {} echoing {event} to {} listener(s)",
            self.id,
            targets.len()
        );

        let event = event.to_string();
        tokio::spawn(async move {
            for listener in targets {
                listener.on_event(&event, payload.clone()).await;
            }
        });
        Ok(())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("{LOOPBACK_CONNECTION_TAG} {} closed", self.id);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
