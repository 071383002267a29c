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

//! Lifecycle signals drained by a connection's driver task.

use crate::transport::CloseReason;

#[derive(Debug)]
pub(crate) enum ConnectionSignal {
    TransportClosed { generation: u64, reason: CloseReason },
    TransportError { generation: u64, error: String },
    RetryDue { generation: u64 },
    CredentialInvalidated,
}
