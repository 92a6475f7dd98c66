// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::net::IpAddr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_JAEGER_QUERY_PORT: u16 = 16686;
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_LEVEL: &str = "debug";

#[derive(Debug, Clone)]
pub struct Config {
    /// address the /getbottleneck endpoint listens on
    pub host: IpAddr,
    pub port: u16,
    /// tracing level filter, already mapped from the LOG_LEVEL name
    pub log_level: &'static str,
    /// port of the Jaeger query service on the host given with each request
    pub jaeger_query_port: u16,
    /// deadline for one trace search, in seconds
    pub query_timeout_secs: u64,
}

impl Config {
    pub fn new() -> Result<Config, Box<dyn std::error::Error>> {
        let log_level = log_level_filter(
            &env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
        );

        let host_string = env::var("BOTTLENECK_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let host: IpAddr = host_string.parse().map_err(|_| {
            anyhow::anyhow!("BOTTLENECK_HOST is not a valid IP address: {host_string}")
        })?;

        let port: u16 = env::var("BOTTLENECK_PORT")
            .ok()
            .and_then(|port| port.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let jaeger_query_port: u16 = env::var("JAEGER_QUERY_PORT")
            .ok()
            .and_then(|port| port.parse::<u16>().ok())
            .unwrap_or(DEFAULT_JAEGER_QUERY_PORT);

        let query_timeout_secs = match env::var("JAEGER_QUERY_TIMEOUT_SECS") {
            Ok(secs) => match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(anyhow::anyhow!(
                        "JAEGER_QUERY_TIMEOUT_SECS must be a positive number of seconds, got {secs}"
                    )
                    .into())
                }
            },
            Err(_) => DEFAULT_QUERY_TIMEOUT_SECS,
        };

        Ok(Config {
            host,
            port,
            log_level,
            jaeger_query_port,
            query_timeout_secs,
        })
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// Maps a logrus-style level name onto a tracing filter directive. Unknown names fall back to
/// debug.
pub fn log_level_filter(level: &str) -> &'static str {
    match level.trim().to_lowercase().as_str() {
        "panic" | "fatal" | "error" => "error",
        "warn" | "warning" => "warn",
        "info" => "info",
        "trace" => "trace",
        _ => "debug",
    }
}
