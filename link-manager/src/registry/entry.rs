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

use crate::connection::ManagedConnection;
use crate::metrics::ConnectionSummary;
use std::sync::Arc;
use tokio::time::Instant;

pub(crate) struct RegistryEntry {
    pub(crate) connection: Arc<ManagedConnection>,
    touched_at: Instant,
    pub(crate) in_use: bool,
}

impl RegistryEntry {
    pub(crate) fn new(connection: Arc<ManagedConnection>) -> Self {
        Self {
            connection,
            touched_at: Instant::now(),
            in_use: true,
        }
    }

    pub(crate) fn touch(&mut self, in_use: bool) {
        self.in_use = in_use;
        self.touched_at = Instant::now();
    }

    /// Registry touches or connection activity, whichever is later.
    pub(crate) fn last_activity(&self) -> Instant {
        self.touched_at.max(self.connection.last_activity())
    }

    /// Evictable once it is neither connected nor recovering and nothing
    /// touched it for `idle_timeout`.
    pub(crate) fn is_idle(&self, now: Instant, idle_timeout: std::time::Duration) -> bool {
        !self.connection.connection_state().is_active()
            && now.duration_since(self.last_activity()) >= idle_timeout
    }

    pub(crate) fn summary(&self, now: Instant) -> ConnectionSummary {
        ConnectionSummary {
            tenant_id: self.connection.tenant_id().to_string(),
            user_id: self.connection.user_id().to_string(),
            state: self.connection.connection_state(),
            in_use: self.in_use,
            idle_for_ms: now.duration_since(self.last_activity()).as_millis() as u64,
        }
    }
}
