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

//! Channel memberships re-requested after every recovery.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A server-side subscription: the join event to emit and its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelMembership {
    event: String,
    #[serde(default)]
    params: Value,
}

impl ChannelMembership {
    pub fn new(event: impl Into<String>, params: Value) -> Self {
        Self {
            event: event.into(),
            params,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn params(&self) -> &Value {
        &self.params
    }
}

/// Set of memberships that remembers the order they were first requested in.
#[derive(Debug, Default)]
pub(crate) struct MembershipRegistry {
    entries: Vec<ChannelMembership>,
}

impl MembershipRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, membership: ChannelMembership) -> bool {
        if self.entries.contains(&membership) {
            return false;
        }
        self.entries.push(membership);
        true
    }

    pub(crate) fn remove(&mut self, membership: &ChannelMembership) -> bool {
        match self.entries.iter().position(|entry| entry == membership) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ChannelMembership> {
        self.entries.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
