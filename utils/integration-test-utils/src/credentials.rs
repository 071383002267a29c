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

use chrono::{Duration, Utc};
use link_manager::{
    Credential, CredentialResolver, InvalidateCallback, InvalidationId, InvalidationSubscribers,
};
use std::sync::Mutex;
use tracing::debug;

const MANUAL_CREDENTIALS_TAG: &str = "ManualCredentials:";

/// Credential resolver driven by the test: swap, expire or invalidate the
/// credential at will.
#[derive(Default)]
pub struct ManualCredentials {
    current: Mutex<Option<Credential>>,
    subscribers: InvalidationSubscribers,
}

impl ManualCredentials {
    pub fn valid(token: &str) -> Self {
        let credentials = Self::default();
        credentials.set(Some(Credential::new(token)));
        credentials
    }

    pub fn missing() -> Self {
        Self::default()
    }

    pub fn expired(token: &str) -> Self {
        let credentials = Self::default();
        credentials.set(Some(
            Credential::new(token).with_expiry(Utc::now() - Duration::minutes(5)),
        ));
        credentials
    }

    pub fn set(&self, credential: Option<Credential>) {
        *self.current.lock().unwrap() = credential;
    }

    /// Drops the current credential and fires every invalidation callback.
    pub fn invalidate(&self) {
        self.set(None);
        let notified = self.subscribers.notify();
        debug!("{MANUAL_CREDENTIALS_TAG} invalidated, {notified} subscriber(s) notified");
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl CredentialResolver for ManualCredentials {
    fn current_credential(&self) -> Option<Credential> {
        self.current.lock().unwrap().clone()
    }

    fn on_invalidate(&self, callback: InvalidateCallback) -> InvalidationId {
        self.subscribers.subscribe(callback)
    }

    fn remove_invalidate(&self, id: InvalidationId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}
