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

//! # link-manager
//!
//! `link-manager` keeps long-lived, multiplexed real-time connections alive on
//! behalf of UI-facing code. Consumers ask a [`ConnectionRegistry`] for the
//! connection of a `(tenant, user)` pair, attach listeners and channel
//! memberships through the returned [`ConnectionHandle`], and let the manager
//! recover from transport loss: bounded exponential backoff with jitter, then
//! replay of every listener and membership in registration order before the
//! connection reports CONNECTED again.
//!
//! The wire protocol is not implemented here. Plug one in through
//! [`Transport`] and [`RawConnection`]; session credentials come from a
//! [`CredentialResolver`].
//!
//! ```
//! use link_manager::{
//!     ChannelMembership, ConnectionRegistry, ConnectionState, ManagerConfig,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//! # use async_trait::async_trait;
//! # use link_manager::{
//! #     Credential, CredentialResolver, EventListener, InvalidateCallback, InvalidationId,
//! #     LifecycleSink, LinkError, RawConnection, Transport,
//! # };
//! # use serde_json::Value;
//! #
//! # struct Loopback;
//! # impl RawConnection for Loopback {
//! #     fn on(&self, _event: &str, _listener: Arc<dyn EventListener>) {}
//! #     fn off(&self, _event: &str, _listener: &Arc<dyn EventListener>) {}
//! #     fn emit(&self, _event: &str, _payload: Value) -> Result<(), LinkError> { Ok(()) }
//! #     fn close(&self) {}
//! # }
//! # struct LoopbackTransport;
//! # #[async_trait]
//! # impl Transport for LoopbackTransport {
//! #     async fn open(
//! #         &self,
//! #         _endpoint: &str,
//! #         _credential: &Credential,
//! #         _lifecycle: LifecycleSink,
//! #     ) -> Result<Arc<dyn RawConnection>, LinkError> {
//! #         Ok(Arc::new(Loopback))
//! #     }
//! # }
//! # struct SessionToken;
//! # impl CredentialResolver for SessionToken {
//! #     fn current_credential(&self) -> Option<Credential> { Some(Credential::new("token")) }
//! #     fn on_invalidate(&self, _callback: InvalidateCallback) -> InvalidationId {
//! #         InvalidationId::new(0)
//! #     }
//! #     fn remove_invalidate(&self, _id: InvalidationId) -> bool { false }
//! # }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let registry = ConnectionRegistry::new(
//!     ManagerConfig::new("wss://realtime.example.com/socket"),
//!     Arc::new(LoopbackTransport),
//!     Arc::new(SessionToken),
//! )
//! .unwrap();
//!
//! let connection = registry.acquire("acme", "alice").await;
//! assert_eq!(connection.connection_state(), ConnectionState::Connected);
//!
//! connection
//!     .join(ChannelMembership::new("join_room", json!({ "room": "general" })))
//!     .await;
//! assert!(connection.emit("typing", json!({ "room": "general" })).await);
//!
//! assert_eq!(registry.metrics().await.counters.total_connections_created, 1);
//! registry.shutdown_all().await;
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Connection: per-connection state machine, reconnection, listener and
//!   membership replay
//! - Registry: connection ownership, creation rate limit, idle eviction,
//!   credential invalidation fan-out
//! - Broadcaster: process-wide "connect"/"ready" latches for the primary
//!   tenant context
//! - Metrics: passive counters fed through [`LifecycleObserver`]
//!
//! ## Observability model
//!
//! Library code emits `tracing` events with a stable `event` field (see
//! `observability::events`) and never installs a global subscriber.
//! Binaries and tests are responsible for `tracing_subscriber`
//! initialization.

mod broadcaster;
pub use broadcaster::{LifecycleBroadcaster, LifecycleCallback, LifecycleEvent};

mod config;
pub use config::{ManagerConfig, ReconnectPolicy, RegistryPolicy};

mod connection;
pub use connection::{
    ChannelMembership, ConnectionDiagnostics, ConnectionHandle, ConnectionState,
    InertConnection, ManagedConnection,
};

mod credentials;
pub use credentials::{
    resolve_valid_credential, Credential, CredentialResolver, InvalidateCallback, InvalidationId,
    InvalidationSubscribers,
};

mod error;
pub use error::{ErrorKind, LinkError};

mod key;
pub use key::ConnectionKey;

mod metrics;
pub use metrics::{ConnectionSummary, MetricsCollector, MetricsCounters, MetricsSnapshot};

#[doc(hidden)]
pub mod observability;

mod observers;
pub use observers::LifecycleObserver;

mod registry;
pub use registry::ConnectionRegistry;

mod timers;

mod transport;
pub use transport::{CloseReason, EventListener, LifecycleSink, RawConnection, Transport};

#[cfg(test)]
mod testing;
