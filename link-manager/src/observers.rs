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

//! Passive observation of managed connections.
//!
//! The metrics collector and the lifecycle broadcaster both watch connections
//! through [`LifecycleObserver`]. Observers are notified synchronously and
//! must not block; a panicking observer is logged and skipped so it can never
//! disturb the connection that notified it.

use crate::connection::state::ConnectionState;
use crate::error::LinkError;
use crate::key::ConnectionKey;
use crate::observability::events;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

const COMPONENT: &str = "observers";

#[allow(unused_variables)]
pub trait LifecycleObserver: Send + Sync {
    fn on_connection_created(&self, key: &ConnectionKey) {}

    /// The transport reported a successful open; listener and membership
    /// replay has not happened yet.
    fn on_transport_opened(&self, key: &ConnectionKey) {}

    fn on_transition(
        &self,
        key: &ConnectionKey,
        previous: ConnectionState,
        current: ConnectionState,
    ) {
    }

    fn on_reconnect_scheduled(&self, key: &ConnectionKey, attempt: u32, delay: Duration) {}

    fn on_event_emitted(&self, key: &ConnectionKey, event: &str) {}

    fn on_event_dropped(&self, key: &ConnectionKey, event: &str) {}

    fn on_event_received(&self, key: &ConnectionKey, event: &str) {}

    fn on_error(&self, key: &ConnectionKey, error: &LinkError) {}

    fn on_connection_evicted(&self, key: &ConnectionKey) {}
}

#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl Observers {
    pub(crate) fn new(observers: Vec<Arc<dyn LifecycleObserver>>) -> Self {
        Self { observers }
    }

    pub(crate) fn notify(&self, hook: &str, notify: impl Fn(&dyn LifecycleObserver)) {
        for observer in &self.observers {
            if catch_unwind(AssertUnwindSafe(|| notify(observer.as_ref()))).is_err() {
                error!(
                    event = events::OBSERVER_PANICKED,
                    component = COMPONENT,
                    hook,
                    "observer panicked, ignoring"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LifecycleObserver, Observers};
    use crate::key::ConnectionKey;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Panicking;

    impl LifecycleObserver for Panicking {
        fn on_connection_created(&self, _key: &ConnectionKey) {
            panic!("observer bug");
        }
    }

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl LifecycleObserver for Counting {
        fn on_connection_created(&self, _key: &ConnectionKey) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn panicking_observer_does_not_stop_the_others() {
        let counting = Arc::new(Counting::default());
        let observers = Observers::new(vec![Arc::new(Panicking), counting.clone()]);

        observers.notify("on_connection_created", |observer| {
            observer.on_connection_created(&ConnectionKey::new("t", "u"))
        });

        assert_eq!(counting.0.load(Ordering::SeqCst), 1);
    }
}
