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

//! Error taxonomy shared by every layer of the connection manager.

use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;

/// Coarse classification of a [`LinkError`], used for counters and for
/// deciding whether a failure is recovered locally or surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Credential,
    Transport,
    ExhaustedRetries,
    RateLimited,
    InvalidState,
    Timeout,
    Config,
}

#[derive(Clone, PartialEq, Eq)]
pub enum LinkError {
    /// No valid session credential is available. Never retried.
    Credential(String),
    /// The raw connection failed to open or closed unexpectedly.
    Transport(String),
    /// The reconnection budget is spent; only re-creation recovers.
    ExhaustedRetries { attempts: u32 },
    /// A connection was requested before the creation interval elapsed.
    RateLimited { retry_in: Duration },
    InvalidState(String),
    Timeout(Duration),
    Config(String),
}

impl LinkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkError::Credential(_) => ErrorKind::Credential,
            LinkError::Transport(_) => ErrorKind::Transport,
            LinkError::ExhaustedRetries { .. } => ErrorKind::ExhaustedRetries,
            LinkError::RateLimited { .. } => ErrorKind::RateLimited,
            LinkError::InvalidState(_) => ErrorKind::InvalidState,
            LinkError::Timeout(_) => ErrorKind::Timeout,
            LinkError::Config(_) => ErrorKind::Config,
        }
    }

    /// Transport failures and open timeouts feed the reconnection algorithm
    /// instead of reaching the consumer.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Timeout)
    }
}

impl Debug for LinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Credential(reason) => write!(f, "Credential({reason:?})"),
            LinkError::Transport(reason) => write!(f, "Transport({reason:?})"),
            LinkError::ExhaustedRetries { attempts } => {
                write!(f, "ExhaustedRetries {{ attempts: {attempts} }}")
            }
            LinkError::RateLimited { retry_in } => {
                write!(f, "RateLimited {{ retry_in: {retry_in:?} }}")
            }
            LinkError::InvalidState(reason) => write!(f, "InvalidState({reason:?})"),
            LinkError::Timeout(after) => write!(f, "Timeout({after:?})"),
            LinkError::Config(reason) => write!(f, "Config({reason:?})"),
        }
    }
}

impl Display for LinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Credential(reason) => write!(f, "Credential unavailable: {reason}"),
            LinkError::Transport(reason) => write!(f, "Transport failure: {reason}"),
            LinkError::ExhaustedRetries { attempts } => write!(
                f,
                "Gave up reconnecting after {attempts} attempts, re-create the connection"
            ),
            LinkError::RateLimited { retry_in } => write!(
                f,
                "Connection creation rate limited, retry in {} ms",
                retry_in.as_millis()
            ),
            LinkError::InvalidState(reason) => write!(f, "Invalid state: {reason}"),
            LinkError::Timeout(after) => {
                write!(f, "Timed out after {} ms", after.as_millis())
            }
            LinkError::Config(reason) => write!(f, "Invalid configuration: {reason}"),
        }
    }
}

impl Error for LinkError {}
