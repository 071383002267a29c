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

//! Credential Resolver integration.
//!
//! The connection manager only ever reads credentials. Validity is decided by
//! the resolver, and invalidation is pushed by the resolver through
//! [`CredentialResolver::on_invalidate`].

use crate::error::LinkError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

const CREDENTIALS_TAG: &str = "Credentials:";
const CREDENTIALS_FN_RESOLVE_TAG: &str = "resolve_valid_credential():";

/// Session credential presented to the transport on open.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub type InvalidateCallback = Box<dyn Fn() + Send + Sync>;

/// Token returned by [`CredentialResolver::on_invalidate`], used to remove
/// the callback again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InvalidationId(u64);

impl InvalidationId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Callback list for resolver implementations.
///
/// Callbacks run while the list is locked and must not call back into
/// `subscribe`/`unsubscribe`.
#[derive(Default)]
pub struct InvalidationSubscribers {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(InvalidationId, InvalidateCallback)>>,
}

impl InvalidationSubscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: InvalidateCallback) -> InvalidationId {
        let id = InvalidationId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, callback));
        id
    }

    pub fn unsubscribe(&self, id: InvalidationId) -> bool {
        let mut callbacks = self.lock();
        let before = callbacks.len();
        callbacks.retain(|(registered, _)| *registered != id);
        callbacks.len() != before
    }

    /// Fires every callback, returning how many ran.
    pub fn notify(&self) -> usize {
        let callbacks = self.lock();
        for (_, callback) in callbacks.iter() {
            callback();
        }
        callbacks.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(InvalidationId, InvalidateCallback)>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Source of session credentials, owned by the authentication subsystem.
pub trait CredentialResolver: Send + Sync {
    fn current_credential(&self) -> Option<Credential>;

    fn is_expired(&self, credential: &Credential) -> bool {
        credential.is_expired_at(Utc::now())
    }

    /// Registers a callback fired whenever the current credential stops being
    /// valid. Callbacks may run on any thread and must not block.
    fn on_invalidate(&self, callback: InvalidateCallback) -> InvalidationId;

    /// Removes a callback registered through
    /// [`on_invalidate`](Self::on_invalidate). Returns `false` for an unknown
    /// id.
    fn remove_invalidate(&self, id: InvalidationId) -> bool;
}

/// Fetches the current credential and rejects it when missing or expired.
pub fn resolve_valid_credential(resolver: &dyn CredentialResolver) -> Result<Credential, LinkError> {
    let Some(credential) = resolver.current_credential() else {
        debug!("{CREDENTIALS_TAG}:{CREDENTIALS_FN_RESOLVE_TAG} no credential available");
        return Err(LinkError::Credential(
            "no session credential available".to_string(),
        ));
    };

    if resolver.is_expired(&credential) {
        debug!(
            "{CREDENTIALS_TAG}:{CREDENTIALS_FN_RESOLVE_TAG} credential expired at {:?}",
            credential.expires_at()
        );
        return Err(LinkError::Credential(
            "session credential has expired".to_string(),
        ));
    }

    Ok(credential)
}

#[cfg(test)]
mod tests {
    use super::{
        resolve_valid_credential, Credential, CredentialResolver, InvalidateCallback,
        InvalidationId, InvalidationSubscribers,
    };
    use crate::error::ErrorKind;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedResolver(Option<Credential>);

    impl CredentialResolver for FixedResolver {
        fn current_credential(&self) -> Option<Credential> {
            self.0.clone()
        }

        fn on_invalidate(&self, _callback: InvalidateCallback) -> InvalidationId {
            InvalidationId::new(0)
        }

        fn remove_invalidate(&self, _id: InvalidationId) -> bool {
            false
        }
    }

    #[test]
    fn missing_credential_is_a_credential_error() {
        let err = resolve_valid_credential(&FixedResolver(None)).expect_err("no credential");
        assert_eq!(err.kind(), ErrorKind::Credential);
    }

    #[test]
    fn default_expiry_check_uses_expires_at() {
        let expired = Credential::new("t").with_expiry(Utc::now() - Duration::seconds(1));
        let err = resolve_valid_credential(&FixedResolver(Some(expired)))
            .expect_err("expired credential");
        assert!(err.to_string().contains("expired"));

        let fresh = Credential::new("t").with_expiry(Utc::now() + Duration::hours(1));
        assert_eq!(
            resolve_valid_credential(&FixedResolver(Some(fresh.clone()))).expect("valid"),
            fresh
        );

        let unbounded = Credential::new("t");
        assert!(resolve_valid_credential(&FixedResolver(Some(unbounded))).is_ok());
    }

    #[test]
    fn debug_output_redacts_token() {
        let rendered = format!("{:?}", Credential::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn unsubscribed_callback_no_longer_fires() {
        let subscribers = InvalidationSubscribers::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        let first = subscribers.subscribe(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = fired.clone();
        let second = subscribers.subscribe(Box::new(move || {
            counter.fetch_add(10, Ordering::SeqCst);
        }));
        assert_ne!(first, second);

        assert!(subscribers.unsubscribe(second));
        assert!(!subscribers.unsubscribe(second));
        assert_eq!(subscribers.notify(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(subscribers.len(), 1);
    }
}
