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

mod config;
mod loopback;

use crate::config::{Config, SessionConfig};
use crate::loopback::LoopbackTransport;
use async_trait::async_trait;
use clap::Parser;
use credential_static_file::StaticFileCredentials;
use link_manager::{ConnectionRegistry, EventListener, LifecycleCallback};
use serde_json::Value;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const CONFIGURABLE_LINK_MANAGER_TAG: &str = "configurable-link-manager:";

#[derive(Parser, Debug)]
#[command(version, about = "Keeps managed real-time connections alive over a loopback transport", long_about = None)]
struct StartupArgs {
    /// Path to the JSON5 configuration file
    #[arg(short, long, default_value = "config/sample.json5")]
    config: PathBuf,

    /// Overrides the server endpoint from the configuration file
    #[arg(long)]
    endpoint: Option<String>,

    /// Overrides credentials_file from the configuration file
    #[arg(long)]
    credential_file: Option<String>,

    /// Extra session to acquire, as tenant:user (repeatable)
    #[arg(short, long = "session")]
    sessions: Vec<SessionConfig>,

    /// Overrides metrics_interval_ms from the configuration file
    #[arg(long)]
    metrics_interval_ms: Option<u64>,
}

struct LoggingListener {
    session: String,
}

#[async_trait]
impl EventListener for LoggingListener {
    async fn on_event(&self, event: &str, payload: Value) {
        info!("{CONFIGURABLE_LINK_MANAGER_TAG} {} received {event}: {payload}", self.session);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = StartupArgs::parse();
    let mut config = Config::from_file(&args.config)?;
    if let Some(endpoint) = args.endpoint {
        config.manager.endpoint = endpoint;
        config.manager.validate()?;
    }
    if let Some(credential_file) = args.credential_file {
        config.credentials_file = credential_file;
    }
    config.sessions.extend(args.sessions);
    if let Some(metrics_interval_ms) = args.metrics_interval_ms.filter(|ms| *ms > 0) {
        config.metrics_interval_ms = metrics_interval_ms;
    }
    info!(
        "{CONFIGURABLE_LINK_MANAGER_TAG} starting with endpoint {} and {} session(s)",
        config.manager.endpoint,
        config.sessions.len()
    );

    let transport = Arc::new(LoopbackTransport::new());
    let credentials = Arc::new(StaticFileCredentials::new(&config.credentials_file)?);
    let registry = ConnectionRegistry::new(config.manager.clone(), transport.clone(), credentials)?;
    registry.start_idle_sweep().await;

    let on_ready: LifecycleCallback =
        Arc::new(|| info!("{CONFIGURABLE_LINK_MANAGER_TAG} primary connection is ready"));
    registry.on_ready(on_ready);

    let creation_gap = config.manager.registry.creation_min_interval();
    for (index, session) in config.sessions.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(creation_gap).await;
        }
        let handle = registry.acquire(&session.tenant, &session.user).await;
        if let Some(failure) = handle.failure() {
            warn!(
                "{CONFIGURABLE_LINK_MANAGER_TAG} no connection for {}: {failure}",
                handle.key()
            );
            continue;
        }

        let listener: Arc<dyn EventListener> = Arc::new(LoggingListener {
            session: handle.key().to_string(),
        });
        for channel in &session.channels {
            handle.on(&channel.event, listener.clone()).await;
            handle.join(channel.membership()).await;
        }
    }

    let mut metrics_tick =
        tokio::time::interval(Duration::from_millis(config.metrics_interval_ms));
    let drop_period = Duration::from_millis(config.drop_interval_ms.max(1));
    let mut drop_tick =
        tokio::time::interval_at(tokio::time::Instant::now() + drop_period, drop_period);

    loop {
        tokio::select! {
            _ = metrics_tick.tick() => {
                match serde_json::to_string(&registry.metrics().await) {
                    Ok(snapshot) => info!("{CONFIGURABLE_LINK_MANAGER_TAG} metrics {snapshot}"),
                    Err(err) => error!("{CONFIGURABLE_LINK_MANAGER_TAG} unable to serialize metrics: {err}"),
                }
            }
            _ = drop_tick.tick(), if config.drop_interval_ms > 0 => {
                let dropped = transport.drop_all("scheduled loopback outage");
                info!("{CONFIGURABLE_LINK_MANAGER_TAG} dropped {dropped} connection(s)");
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    error!("{CONFIGURABLE_LINK_MANAGER_TAG} unable to listen for shutdown signal: {err}");
                }
                break;
            }
        }
    }

    let destroyed = registry.shutdown_all().await;
    info!("{CONFIGURABLE_LINK_MANAGER_TAG} shut down {destroyed} connection(s)");
    Ok(())
}
