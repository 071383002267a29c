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

//! Structured logging vocabulary.
//!
//! Library code only emits events; subscribers are installed by binaries and
//! tests.

pub mod events {
    pub const STATE_TRANSITION: &str = "link.state_transition";
    pub const TRANSITION_REJECTED: &str = "link.transition_rejected";
    pub const TRANSPORT_OPENED: &str = "link.transport_opened";
    pub const TRANSPORT_FAILED: &str = "link.transport_failed";
    pub const STALE_SIGNAL: &str = "link.stale_signal";
    pub const RECONNECT_SCHEDULED: &str = "link.reconnect_scheduled";
    pub const RECONNECT_ATTEMPT: &str = "link.reconnect_attempt";
    pub const RECONNECT_EXHAUSTED: &str = "link.reconnect_exhausted";
    pub const STATE_REPLAYED: &str = "link.state_replayed";
    pub const EMIT_DROPPED: &str = "link.emit_dropped";
    pub const CREDENTIAL_REJECTED: &str = "link.credential_rejected";
    pub const CREDENTIAL_INVALIDATED: &str = "link.credential_invalidated";
    pub const REGISTRY_CREATE: &str = "registry.create";
    pub const REGISTRY_REUSE: &str = "registry.reuse";
    pub const REGISTRY_RATE_LIMITED: &str = "registry.rate_limited";
    pub const REGISTRY_EVICT: &str = "registry.evict";
    pub const REGISTRY_SHUTDOWN: &str = "registry.shutdown";
    pub const OBSERVER_PANICKED: &str = "observer.panicked";
}
