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

//! Retry delay computation.

use crate::config::ReconnectPolicy;
use rand::Rng;
use std::time::Duration;

/// `min(max_delay, base_delay * multiplier^(attempt - 1))`, without jitter.
pub(crate) fn backoff_delay(policy: &ReconnectPolicy, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
    let scaled = policy.base_delay_ms as f64 * policy.multiplier.powi(exponent);
    let capped = scaled.min(policy.max_delay_ms as f64);
    Duration::from_millis(capped as u64)
}

pub(crate) fn jitter(policy: &ReconnectPolicy) -> Duration {
    if policy.max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=policy.max_jitter_ms))
}

/// Never lets an attempt start sooner than `min_interval` after the previous
/// one.
pub(crate) fn respect_min_interval(
    delay: Duration,
    since_last_attempt: Option<Duration>,
    min_interval: Duration,
) -> Duration {
    match since_last_attempt {
        Some(elapsed) if elapsed < min_interval => delay.max(min_interval - elapsed),
        _ => delay,
    }
}

pub(crate) fn retry_delay(
    policy: &ReconnectPolicy,
    attempt: u32,
    since_last_attempt: Option<Duration>,
) -> Duration {
    respect_min_interval(
        backoff_delay(policy, attempt) + jitter(policy),
        since_last_attempt,
        policy.min_interval(),
    )
}
