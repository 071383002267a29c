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

use link_manager::{ChannelMembership, LinkError, ManagerConfig};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) manager: ManagerConfig,
    pub(crate) credentials_file: String,
    #[serde(default = "default_metrics_interval_ms")]
    pub(crate) metrics_interval_ms: u64,
    /// Zero disables the loopback drop schedule.
    #[serde(default)]
    pub(crate) drop_interval_ms: u64,
    #[serde(default)]
    pub(crate) sessions: Vec<SessionConfig>,
}

fn default_metrics_interval_ms() -> u64 {
    10_000
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct SessionConfig {
    pub(crate) tenant: String,
    pub(crate) user: String,
    #[serde(default)]
    pub(crate) channels: Vec<ChannelConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ChannelConfig {
    pub(crate) event: String,
    #[serde(default)]
    pub(crate) params: Value,
}

impl ChannelConfig {
    pub(crate) fn membership(&self) -> ChannelMembership {
        ChannelMembership::new(self.event.clone(), self.params.clone())
    }
}

impl Config {
    pub(crate) fn from_file(path: &Path) -> Result<Self, LinkError> {
        let source = fs::read_to_string(path).map_err(|error| {
            LinkError::Config(format!("Unable to read config file {path:?}: {error}"))
        })?;
        Self::from_json5_str(&source)
    }

    pub(crate) fn from_json5_str(source: &str) -> Result<Self, LinkError> {
        let config: Config = json5::from_str(source)
            .map_err(|error| LinkError::Config(format!("Unable to parse config: {error}")))?;
        config.manager.validate()?;
        if config.metrics_interval_ms == 0 {
            return Err(LinkError::Config(
                "metrics_interval_ms must be positive".to_string(),
            ));
        }
        Ok(config)
    }
}

/// `tenant:user` as given on the command line.
impl FromStr for SessionConfig {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.split_once(':') {
            Some((tenant, user)) if !tenant.is_empty() && !user.is_empty() => Ok(Self {
                tenant: tenant.to_string(),
                user: user.to_string(),
                channels: Vec::new(),
            }),
            _ => Err(format!("expected tenant:user, got {value:?}")),
        }
    }
}
