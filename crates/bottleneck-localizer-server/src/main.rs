// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::sync::Arc;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use bottleneck_localizer::{config, server::BottleneckServer, trace_source::JaegerTraceSource};

#[tokio::main]
pub async fn main() {
    let config = match config::Config::new() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            // the subscriber is not installed yet
            eprintln!("Error creating config on bottleneck localizer startup: {e}");
            return;
        }
    };

    let env_filter = format!("h2=off,hyper=off,reqwest=off,{}", config.log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let trace_source = match JaegerTraceSource::new(config.jaeger_query_port, config.query_timeout())
    {
        Ok(source) => Arc::new(source),
        Err(e) => {
            error!("Error creating the Jaeger query client: {e}");
            return;
        }
    };

    let server = BottleneckServer {
        config: Arc::clone(&config),
        trace_source,
    };

    if let Err(e) = server.start().await {
        error!("Error when starting bottleneck localizer: {e:?}");
    }
}
