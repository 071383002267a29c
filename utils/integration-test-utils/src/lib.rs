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

//! Test doubles for exercising `link-manager` without a real server.

mod credentials;
mod logging;
mod observer;
mod transport;

pub use credentials::ManualCredentials;
pub use logging::init_logging;
pub use observer::{RecordingListener, RecordingObserver};
pub use transport::{RecordingConnection, RecordingTransport};
