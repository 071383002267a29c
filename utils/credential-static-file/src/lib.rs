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

//! Credential resolver backed by a JSON file.
//!
//! The file holds a single session credential:
//!
//! ```json
//! { "token": "dev-session-token", "expires_at": "2099-01-01T00:00:00Z" }
//! ```
//!
//! `expires_at` is optional. Call [`StaticFileCredentials::reload`] after the
//! file changes; a changed or removed token invalidates every connection
//! built on the old one.

use chrono::{DateTime, Utc};
use link_manager::{
    Credential, CredentialResolver, InvalidateCallback, InvalidationId, InvalidationSubscribers,
    LinkError,
};
use serde::Deserialize;
use std::fs::{self, canonicalize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

const STATIC_FILE_CREDENTIALS_TAG: &str = "StaticFileCredentials:";
const STATIC_FILE_CREDENTIALS_FN_RELOAD_TAG: &str = "reload():";

#[derive(Debug, Deserialize)]
struct CredentialFile {
    token: Option<String>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

pub struct StaticFileCredentials {
    static_file: PathBuf,
    current: Mutex<Option<Credential>>,
    subscribers: InvalidationSubscribers,
}

impl StaticFileCredentials {
    /// Reads `static_file` right away; a missing or malformed file is a
    /// configuration error.
    pub fn new(static_file: impl Into<PathBuf>) -> Result<Self, LinkError> {
        let static_file = static_file.into();
        let current = Self::read(&static_file)?;
        Ok(Self {
            static_file,
            current: Mutex::new(current),
            subscribers: InvalidationSubscribers::new(),
        })
    }

    /// Re-reads the file. Returns `true` when the credential changed, in
    /// which case invalidation subscribers have been notified.
    pub fn reload(&self) -> Result<bool, LinkError> {
        let fresh = Self::read(&self.static_file)?;
        let changed = {
            let mut current = lock(&self.current);
            let changed = current.as_ref().map(Credential::token)
                != fresh.as_ref().map(Credential::token)
                || current.as_ref().and_then(Credential::expires_at)
                    != fresh.as_ref().and_then(Credential::expires_at);
            *current = fresh;
            changed
        };

        if changed {
            let notified = self.subscribers.notify();
            info!(
                "{}:{} credential changed, notified {} subscriber(s)",
                STATIC_FILE_CREDENTIALS_TAG, STATIC_FILE_CREDENTIALS_FN_RELOAD_TAG, notified
            );
        } else {
            debug!(
                "{}:{} credential unchanged",
                STATIC_FILE_CREDENTIALS_TAG, STATIC_FILE_CREDENTIALS_FN_RELOAD_TAG
            );
        }
        Ok(changed)
    }

    fn read(static_file: &Path) -> Result<Option<Credential>, LinkError> {
        let path = canonicalize(static_file).map_err(|error| {
            LinkError::Config(format!("Static credential file not found: {error:?}"))
        })?;
        debug!("{STATIC_FILE_CREDENTIALS_TAG} reading {path:?}");

        let data = fs::read_to_string(&path)
            .map_err(|error| LinkError::Config(format!("Unable to read file: {error:?}")))?;
        let parsed: CredentialFile = serde_json::from_str(&data)
            .map_err(|error| LinkError::Config(format!("Unable to parse JSON: {error:?}")))?;

        Ok(parsed
            .token
            .filter(|token| !token.is_empty())
            .map(|token| match parsed.expires_at {
                Some(expires_at) => Credential::new(token).with_expiry(expires_at),
                None => Credential::new(token),
            }))
    }
}

impl CredentialResolver for StaticFileCredentials {
    fn current_credential(&self) -> Option<Credential> {
        lock(&self.current).clone()
    }

    fn on_invalidate(&self, callback: InvalidateCallback) -> InvalidationId {
        self.subscribers.subscribe(callback)
    }

    fn remove_invalidate(&self, id: InvalidationId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::StaticFileCredentials;
    use link_manager::{CredentialResolver, ErrorKind};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn write(file: &NamedTempFile, contents: &str) {
        fs::write(file.path(), contents).expect("write credential file");
    }

    #[test]
    fn bundled_config_parses() {
        let credentials = StaticFileCredentials::new("static-configs/credential.json")
            .expect("bundled file is valid");
        let credential = credentials.current_credential().expect("token present");
        assert_eq!(credential.token(), "dev-session-token");
        assert!(!credentials.is_expired(&credential));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = StaticFileCredentials::new("does/not/exist.json")
            .err()
            .expect("missing file");
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn malformed_json_is_rejected() {
        let file = NamedTempFile::new().expect("temp file");
        write(&file, "{ token: ");
        let err = StaticFileCredentials::new(file.path()).err().expect("bad json");
        assert!(err.to_string().contains("Unable to parse JSON"));
    }

    #[test]
    fn expired_and_empty_tokens() {
        let file = NamedTempFile::new().expect("temp file");
        write(&file, r#"{ "token": "old", "expires_at": "2001-01-01T00:00:00Z" }"#);
        let credentials = StaticFileCredentials::new(file.path()).expect("valid file");
        let credential = credentials.current_credential().expect("token present");
        assert!(credentials.is_expired(&credential));

        write(&file, r#"{ "token": "" }"#);
        credentials.reload().expect("reloads");
        assert!(credentials.current_credential().is_none());
    }

    #[test]
    fn reload_notifies_only_on_change() {
        let file = NamedTempFile::new().expect("temp file");
        write(&file, r#"{ "token": "first" }"#);
        let credentials = StaticFileCredentials::new(file.path()).expect("valid file");

        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        let subscription = credentials.on_invalidate(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(!credentials.reload().expect("reloads"));
        write(&file, r#"{ "token": "second" }"#);
        assert!(credentials.reload().expect("reloads"));

        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(
            credentials.current_credential().map(|c| c.token().to_string()),
            Some("second".to_string())
        );

        assert!(credentials.remove_invalidate(subscription));
        write(&file, r#"{ "token": "third" }"#);
        assert!(credentials.reload().expect("reloads"));
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }
}
