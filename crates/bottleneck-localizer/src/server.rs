// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use hyper::service::service_fn;
use hyper::{http, Method, StatusCode, Uri};
use reqwest::Url;
use std::borrow::Cow;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::config;
use crate::error::LocalizeError;
use crate::http_utils::{
    create_bottleneck_response, create_no_content_response, log_and_create_error_response,
    log_and_create_http_response, HttpResponse,
};
use crate::localizer::localize;
use crate::trace_source::{TraceQuery, TraceSource};

pub const BOTTLENECK_ENDPOINT_PATH: &str = "/getbottleneck";

pub struct BottleneckServer {
    pub config: Arc<config::Config>,
    pub trace_source: Arc<dyn TraceSource + Send + Sync>,
}

impl BottleneckServer {
    /// Binds the configured address and serves requests until the listener fails.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        let now = Instant::now();
        let addr = SocketAddr::new(self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        debug!("Bottleneck localizer listening on {}", addr);
        debug!(
            "Time taken to start the bottleneck localizer: {} ms",
            now.elapsed().as_millis()
        );

        self.serve(listener).await
    }

    /// Serves requests on an already bound listener.
    pub async fn serve(
        &self,
        listener: tokio::net::TcpListener,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let trace_source = self.trace_source.clone();
        let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
            // called for each http request
            let trace_source = trace_source.clone();
            async move { Self::endpoint_handler(req.method(), req.uri(), trace_source).await }
        });

        let server = hyper::server::conn::http1::Builder::new();
        let mut joinset = tokio::task::JoinSet::new();

        loop {
            let conn = tokio::select! {
                con_res = listener.accept() => match con_res {
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::ConnectionAborted
                                | io::ErrorKind::ConnectionReset
                                | io::ErrorKind::ConnectionRefused
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!("Server error: {e}");
                        return Err(e.into());
                    }
                    Ok((conn, _)) => conn,
                },
                finished = async {
                    match joinset.join_next().await {
                        Some(finished) => finished,
                        None => std::future::pending().await,
                    }
                } => match finished {
                    Err(e) if e.is_panic() => {
                        error!("Connection handler panicked: {:?}", e);
                        continue;
                    },
                    Ok(()) | Err(_) => continue,
                },
            };
            let conn = hyper_util::rt::TokioIo::new(conn);
            let server = server.clone();
            let service = service.clone();
            joinset.spawn(async move {
                if let Err(e) = server.serve_connection(conn, service).await {
                    error!("Connection error: {e}");
                }
            });
        }
    }

    async fn endpoint_handler(
        method: &Method,
        uri: &Uri,
        trace_source: Arc<dyn TraceSource + Send + Sync>,
    ) -> http::Result<HttpResponse> {
        match (method, uri.path()) {
            (&Method::GET, BOTTLENECK_ENDPOINT_PATH) => {
                match Self::bottleneck_handler(uri, trace_source).await {
                    Ok(Some(service)) => create_bottleneck_response(&service),
                    Ok(None) => create_no_content_response(),
                    Err(err) => log_and_create_error_response(&err),
                }
            }
            (_, BOTTLENECK_ENDPOINT_PATH) => log_and_create_http_response(
                &format!("Method {method} not allowed on {BOTTLENECK_ENDPOINT_PATH}"),
                StatusCode::METHOD_NOT_ALLOWED,
            ),
            (_, path) => log_and_create_http_response(
                &format!("No endpoint at {path}"),
                StatusCode::NOT_FOUND,
            ),
        }
    }

    async fn bottleneck_handler(
        uri: &Uri,
        trace_source: Arc<dyn TraceSource + Send + Sync>,
    ) -> Result<Option<String>, LocalizeError> {
        let query = parse_trace_query(uri.query())?;
        info!(
            service = %query.service,
            start_time = %query.start_time,
            end_time = %query.end_time,
            host = %query.host,
            "{}", uri
        );

        let traces = trace_source.search(&query).await?;
        let localization = localize(&traces)?;
        Ok(localization.bottleneck)
    }
}

/// Reads `service`, `startTime`, `endTime` and `host` from the request query string.
/// `service` and `host` are required. A repeated key keeps its first value.
pub fn parse_trace_query(query: Option<&str>) -> Result<TraceQuery, LocalizeError> {
    let mut url =
        Url::parse("http://localhost/").map_err(|_| LocalizeError::IncorrectParameters)?;
    url.set_query(query);
    let pairs: Vec<(Cow<str>, Cow<str>)> = url.query_pairs().collect();
    let first = |name: &str| {
        pairs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
            .unwrap_or_default()
    };

    let trace_query = TraceQuery {
        service: first("service"),
        start_time: first("startTime"),
        end_time: first("endTime"),
        host: first("host"),
    };

    if trace_query.service.is_empty() {
        return Err(LocalizeError::MissingParameter("service"));
    }
    if trace_query.host.is_empty() {
        return Err(LocalizeError::MissingParameter("host"));
    }
    Ok(trace_query)
}
