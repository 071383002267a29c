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

//! The canonical connection state.

use serde::Serialize;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Exactly one of these holds for a managed connection at any time; the
/// boolean accessors are derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Automatic recovery was abandoned; only re-creation leaves this state.
    Error,
    /// Absorbing. The connection is inert.
    Destroyed,
}

impl ConnectionState {
    pub const fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub const fn is_active(self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Reconnecting
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Error | ConnectionState::Destroyed)
    }

    pub const fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Disconnected, Error)
                | (Connecting, Connected)
                | (Connecting, Reconnecting)
                | (Connecting, Error)
                | (Connecting, Disconnected)
                | (Connected, Reconnecting)
                | (Connected, Disconnected)
                | (Connected, Error)
                | (Reconnecting, Connected)
                | (Reconnecting, Error)
                | (Reconnecting, Disconnected)
                | (Disconnected, Destroyed)
                | (Connecting, Destroyed)
                | (Connected, Destroyed)
                | (Reconnecting, Destroyed)
                | (Error, Destroyed)
        )
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Reconnecting => "RECONNECTING",
            ConnectionState::Error => "ERROR",
            ConnectionState::Destroyed => "DESTROYED",
        };
        f.write_str(label)
    }
}
