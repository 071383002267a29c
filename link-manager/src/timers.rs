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

//! Cancellable timer bookkeeping.
//!
//! Every task the manager spawns on its own behalf (retry delays, the idle
//! sweep, signal drivers) is tracked here. Cancelling aborts the task
//! synchronously, so nothing tracked can fire afterwards.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum TimerKind {
    Reconnect,
    IdleSweep,
    InvalidationRelay,
    SignalDriver,
}

#[derive(Debug, Default)]
pub(crate) struct TimerSet {
    timers: HashMap<TimerKind, JoinHandle<()>>,
}

impl TimerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Runs `task` once `delay` has elapsed, replacing any pending timer of
    /// the same kind.
    pub(crate) fn schedule_after<F>(&mut self, kind: TimerKind, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn(kind, async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
    }

    pub(crate) fn spawn<F>(&mut self, kind: TimerKind, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.track(kind, tokio::spawn(task));
    }

    pub(crate) fn track(&mut self, kind: TimerKind, handle: JoinHandle<()>) {
        if let Some(previous) = self.timers.insert(kind, handle) {
            previous.abort();
        }
    }

    pub(crate) fn is_pending(&self, kind: TimerKind) -> bool {
        self.timers
            .get(&kind)
            .is_some_and(|handle| !handle.is_finished())
    }

    pub(crate) fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.timers.remove(&kind) {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    /// Aborts every tracked task, returning how many were still pending.
    pub(crate) fn cancel_all(&mut self) -> usize {
        self.timers
            .drain()
            .map(|(_, handle)| {
                let pending = !handle.is_finished();
                handle.abort();
                usize::from(pending)
            })
            .sum()
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
