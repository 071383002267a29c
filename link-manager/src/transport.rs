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

//! Seams towards the external transport collaborator.
//!
//! The transport library performs the byte-level connection; the manager only
//! needs to open a raw handle, attach and detach listeners, emit events and
//! close it. Lifecycle changes after a successful open are reported back
//! through the [`LifecycleSink`] handed to [`Transport::open`].

use crate::connection::signal::ConnectionSignal;
use crate::credentials::Credential;
use crate::error::LinkError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

const LIFECYCLE_SINK_TAG: &str = "LifecycleSink:";

/// Callback invoked by the transport for every inbound event it was
/// registered for.
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, event: &str, payload: Value);
}

/// One open, bidirectional connection produced by a [`Transport`].
pub trait RawConnection: Send + Sync {
    fn on(&self, event: &str, listener: Arc<dyn EventListener>);

    fn off(&self, event: &str, listener: &Arc<dyn EventListener>);

    fn emit(&self, event: &str, payload: Value) -> Result<(), LinkError>;

    fn close(&self);
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a raw connection. Returning `Ok` is the "open" notification;
    /// later closures and errors go through `lifecycle`.
    async fn open(
        &self,
        endpoint: &str,
        credential: &Credential,
        lifecycle: LifecycleSink,
    ) -> Result<Arc<dyn RawConnection>, LinkError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The manager closed the handle itself.
    ClientRequested,
    ServerRequested(String),
    TransportLost(String),
}

impl CloseReason {
    /// Everything the consumer did not ask for counts as unexpected and
    /// starts the reconnection algorithm.
    pub fn is_unexpected(&self) -> bool {
        !matches!(self, CloseReason::ClientRequested)
    }
}

impl Display for CloseReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::ClientRequested => write!(f, "closed by client"),
            CloseReason::ServerRequested(reason) => write!(f, "closed by server: {reason}"),
            CloseReason::TransportLost(reason) => write!(f, "transport lost: {reason}"),
        }
    }
}

/// Lifecycle callbacks for one raw connection.
///
/// Each sink is stamped with the generation of the handle it belongs to, so
/// reports from a handle that has since been replaced are ignored.
#[derive(Clone)]
pub struct LifecycleSink {
    generation: u64,
    signals: UnboundedSender<ConnectionSignal>,
}

impl LifecycleSink {
    pub(crate) fn new(generation: u64, signals: UnboundedSender<ConnectionSignal>) -> Self {
        Self {
            generation,
            signals,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn on_close(&self, reason: CloseReason) {
        self.deliver(ConnectionSignal::TransportClosed {
            generation: self.generation,
            reason,
        });
    }

    pub fn on_error(&self, error: impl Into<String>) {
        self.deliver(ConnectionSignal::TransportError {
            generation: self.generation,
            error: error.into(),
        });
    }

    fn deliver(&self, signal: ConnectionSignal) {
        if let Err(err) = self.signals.send(signal) {
            debug!(
                "{LIFECYCLE_SINK_TAG} connection is gone, dropping {:?}",
                err.0
            );
        }
    }
}

impl Debug for LifecycleSink {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleSink")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
