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

//! Managed connection layer.
//!
//! Owns the per-connection state machine, the ordered listener and
//! channel-membership registries replayed after recovery, and the bounded
//! reconnection algorithm. Consumers reach this layer through the
//! [`ConnectionHandle`] returned by the registry.

pub(crate) mod backoff;
pub(crate) mod handle;
pub(crate) mod listeners;
pub(crate) mod managed;
pub(crate) mod memberships;
pub(crate) mod signal;
pub(crate) mod state;

pub use handle::{ConnectionHandle, InertConnection};
pub use managed::{ConnectionDiagnostics, ManagedConnection};
pub use memberships::ChannelMembership;
pub use state::ConnectionState;
