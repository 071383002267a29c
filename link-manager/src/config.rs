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

//! Manager configuration.
//!
//! Every tunable of the reconnection algorithm and the registry is a field with
//! a default, so deployments override only what they need:
//!
//! ```
//! use link_manager::ManagerConfig;
//!
//! let config = ManagerConfig::from_json5_str(
//!     r#"{
//!         endpoint: "wss://realtime.example.com/socket",
//!         reconnect: { max_attempts: 8, max_jitter_ms: 250 },
//!     }"#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.reconnect.max_attempts, 8);
//! assert_eq!(config.reconnect.base_delay_ms, 1_000);
//! assert_eq!(config.registry.idle_timeout_ms, 600_000);
//! ```

use crate::error::LinkError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const MANAGER_CONFIG_TAG: &str = "ManagerConfig:";
const MANAGER_CONFIG_FN_FROM_FILE_TAG: &str = "from_json5_file():";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Server endpoint handed to the transport on every open.
    pub endpoint: String,
    /// Upper bound for a single transport open.
    pub connect_timeout_ms: u64,
    pub reconnect: ReconnectPolicy,
    pub registry: RegistryPolicy,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8080/realtime".to_string(),
            connect_timeout_ms: 10_000,
            reconnect: ReconnectPolicy::default(),
            registry: RegistryPolicy::default(),
        }
    }
}

impl ManagerConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: RegistryPolicy) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_connect_timeout_ms(mut self, connect_timeout_ms: u64) -> Self {
        self.connect_timeout_ms = connect_timeout_ms;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn from_json5_str(source: &str) -> Result<Self, LinkError> {
        let config: ManagerConfig = json5::from_str(source)
            .map_err(|error| LinkError::Config(format!("Unable to parse JSON5: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json5_file(path: impl AsRef<Path>) -> Result<Self, LinkError> {
        let path = path.as_ref();
        debug!(
            "{}:{} reading configuration from {}",
            MANAGER_CONFIG_TAG,
            MANAGER_CONFIG_FN_FROM_FILE_TAG,
            path.display()
        );

        let data = fs::read_to_string(path).map_err(|error| {
            LinkError::Config(format!("Unable to read {}: {error}", path.display()))
        })?;
        Self::from_json5_str(&data)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if self.endpoint.trim().is_empty() {
            return Err(LinkError::Config("endpoint must not be empty".to_string()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(LinkError::Config(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        self.reconnect.validate()?;
        self.registry.validate()
    }
}

/// Bounded exponential backoff with jitter used while RECONNECTING.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Attempts allowed before the connection gives up and enters ERROR.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    /// Upper bound of the uniformly random term added to every delay.
    pub max_jitter_ms: u64,
    /// Minimum spacing between two attempts, whatever triggered them.
    pub min_interval_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            multiplier: 2.0,
            max_delay_ms: 30_000,
            max_jitter_ms: 1_000,
            min_interval_ms: 5_000,
        }
    }
}

impl ReconnectPolicy {
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    #[must_use]
    pub fn with_max_jitter_ms(mut self, max_jitter_ms: u64) -> Self {
        self.max_jitter_ms = max_jitter_ms;
        self
    }

    #[must_use]
    pub fn with_min_interval_ms(mut self, min_interval_ms: u64) -> Self {
        self.min_interval_ms = min_interval_ms;
        self
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(LinkError::Config(format!(
                "reconnect.multiplier must be a finite value >= 1.0, got {}",
                self.multiplier
            )));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(LinkError::Config(format!(
                "reconnect.max_delay_ms ({}) is smaller than reconnect.base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }
        Ok(())
    }
}

/// Creation throttling and idle eviction for the connection registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryPolicy {
    /// Minimum spacing between two connection creations, across all keys.
    pub creation_min_interval_ms: u64,
    /// Entries that are not CONNECTED are evicted after this much inactivity.
    pub idle_timeout_ms: u64,
    pub sweep_interval_ms: u64,
}

impl Default for RegistryPolicy {
    fn default() -> Self {
        Self {
            creation_min_interval_ms: 1_000,
            idle_timeout_ms: 600_000,
            sweep_interval_ms: 300_000,
        }
    }
}

impl RegistryPolicy {
    #[must_use]
    pub fn with_creation_min_interval_ms(mut self, creation_min_interval_ms: u64) -> Self {
        self.creation_min_interval_ms = creation_min_interval_ms;
        self
    }

    #[must_use]
    pub fn with_idle_timeout_ms(mut self, idle_timeout_ms: u64) -> Self {
        self.idle_timeout_ms = idle_timeout_ms;
        self
    }

    #[must_use]
    pub fn with_sweep_interval_ms(mut self, sweep_interval_ms: u64) -> Self {
        self.sweep_interval_ms = sweep_interval_ms;
        self
    }

    pub fn creation_min_interval(&self) -> Duration {
        Duration::from_millis(self.creation_min_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if self.sweep_interval_ms == 0 {
            return Err(LinkError::Config(
                "registry.sweep_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
