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

//! What [`ConnectionRegistry::acquire`](crate::ConnectionRegistry::acquire)
//! hands out: either a live managed connection or an inert placeholder that
//! records why no connection could be created.

use crate::connection::managed::{ConnectionDiagnostics, ManagedConnection};
use crate::connection::memberships::ChannelMembership;
use crate::connection::state::ConnectionState;
use crate::error::{ErrorKind, LinkError};
use crate::key::ConnectionKey;
use crate::transport::EventListener;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const INERT_CONNECTION_TAG: &str = "InertConnection:";

/// Stand-in returned when creation was refused (missing credential or the
/// creation rate limit). Every operation is a no-op.
#[derive(Debug)]
pub struct InertConnection {
    key: ConnectionKey,
    failure: LinkError,
}

impl InertConnection {
    pub(crate) fn new(key: ConnectionKey, failure: LinkError) -> Self {
        Self { key, failure }
    }

    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    pub fn failure(&self) -> &LinkError {
        &self.failure
    }

    /// Rate-limited placeholders never reached the server, so they report
    /// DISCONNECTED; credential failures report ERROR.
    pub fn connection_state(&self) -> ConnectionState {
        match self.failure.kind() {
            ErrorKind::RateLimited => ConnectionState::Disconnected,
            _ => ConnectionState::Error,
        }
    }

    fn ignore(&self, operation: &str) -> bool {
        debug!(
            "{INERT_CONNECTION_TAG} {} ignoring {operation}, connection was never created: {}",
            self.key, self.failure
        );
        false
    }
}

#[derive(Clone, Debug)]
pub enum ConnectionHandle {
    Managed(Arc<ManagedConnection>),
    Inert(Arc<InertConnection>),
}

impl ConnectionHandle {
    pub fn key(&self) -> &ConnectionKey {
        match self {
            ConnectionHandle::Managed(connection) => connection.key(),
            ConnectionHandle::Inert(inert) => inert.key(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        self.key().tenant_id()
    }

    pub fn user_id(&self) -> &str {
        self.key().user_id()
    }

    pub fn is_inert(&self) -> bool {
        matches!(self, ConnectionHandle::Inert(_))
    }

    /// Why the registry refused to create a connection, for inert handles.
    pub fn failure(&self) -> Option<&LinkError> {
        match self {
            ConnectionHandle::Managed(_) => None,
            ConnectionHandle::Inert(inert) => Some(inert.failure()),
        }
    }

    pub fn as_managed(&self) -> Option<&Arc<ManagedConnection>> {
        match self {
            ConnectionHandle::Managed(connection) => Some(connection),
            ConnectionHandle::Inert(_) => None,
        }
    }

    /// True when both handles point at the same underlying connection.
    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        match (self, other) {
            (ConnectionHandle::Managed(a), ConnectionHandle::Managed(b)) => Arc::ptr_eq(a, b),
            (ConnectionHandle::Inert(a), ConnectionHandle::Inert(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        match self {
            ConnectionHandle::Managed(connection) => connection.connection_state(),
            ConnectionHandle::Inert(inert) => inert.connection_state(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    pub async fn on(&self, event: &str, listener: Arc<dyn EventListener>) -> bool {
        match self {
            ConnectionHandle::Managed(connection) => connection.on(event, listener).await,
            ConnectionHandle::Inert(inert) => inert.ignore("on"),
        }
    }

    pub async fn off(&self, event: &str, listener: &Arc<dyn EventListener>) -> bool {
        match self {
            ConnectionHandle::Managed(connection) => connection.off(event, listener).await,
            ConnectionHandle::Inert(inert) => inert.ignore("off"),
        }
    }

    pub async fn join(&self, membership: ChannelMembership) -> bool {
        match self {
            ConnectionHandle::Managed(connection) => connection.join(membership).await,
            ConnectionHandle::Inert(inert) => inert.ignore("join"),
        }
    }

    pub async fn leave(&self, membership: &ChannelMembership) -> bool {
        match self {
            ConnectionHandle::Managed(connection) => connection.leave(membership).await,
            ConnectionHandle::Inert(inert) => inert.ignore("leave"),
        }
    }

    pub async fn emit(&self, event: &str, payload: Value) -> bool {
        match self {
            ConnectionHandle::Managed(connection) => connection.emit(event, payload).await,
            ConnectionHandle::Inert(inert) => inert.ignore("emit"),
        }
    }

    pub async fn reconnect(&self) -> Result<(), LinkError> {
        match self {
            ConnectionHandle::Managed(connection) => connection.reconnect().await,
            ConnectionHandle::Inert(inert) => Err(inert.failure().clone()),
        }
    }

    pub async fn disconnect(&self) {
        if let ConnectionHandle::Managed(connection) = self {
            connection.disconnect().await;
        }
    }

    /// Tears the managed connection down for good. No-op on an inert handle.
    pub async fn destroy(&self) {
        match self {
            ConnectionHandle::Managed(connection) => connection.destroy().await,
            ConnectionHandle::Inert(inert) => {
                inert.ignore("destroy");
            }
        }
    }

    pub async fn wait_for_state(
        &self,
        target: ConnectionState,
        timeout: Duration,
    ) -> Result<(), LinkError> {
        match self {
            ConnectionHandle::Managed(connection) => {
                connection.wait_for_state(target, timeout).await
            }
            ConnectionHandle::Inert(inert) if inert.connection_state() == target => Ok(()),
            ConnectionHandle::Inert(inert) => Err(inert.failure().clone()),
        }
    }

    pub async fn diagnostics(&self) -> ConnectionDiagnostics {
        match self {
            ConnectionHandle::Managed(connection) => connection.diagnostics().await,
            ConnectionHandle::Inert(inert) => ConnectionDiagnostics {
                tenant_id: inert.key().tenant_id().to_string(),
                user_id: inert.key().user_id().to_string(),
                state: inert.connection_state(),
                reconnect_attempts: 0,
                max_reconnect_attempts: 0,
                reconnect_pending: false,
                listener_count: 0,
                membership_count: 0,
                last_error: Some(inert.failure().to_string()),
            },
        }
    }
}
