// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use bottleneck_localizer::{
    config::Config, server::BottleneckServer, trace_source::JaegerTraceSource,
};
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// One span of a Jaeger trace document.
pub fn jaeger_span(id: &str, process: &str, duration: u64, parent: Option<&str>) -> Value {
    let references = match parent {
        Some(parent) => json!([{"refType": "CHILD_OF", "traceID": "t", "spanID": parent}]),
        None => json!([]),
    };
    json!({
        "traceID": "t",
        "spanID": id,
        "operationName": id,
        "processID": process,
        "startTime": 1_700_000_000_000_000u64,
        "duration": duration,
        "references": references,
        "tags": [],
        "logs": [],
        "warnings": null
    })
}

/// A two-service trace where the root spends `root_self_time` on its own and its child
/// `child_duration`.
pub fn jaeger_trace(id: &str, url: &str, root_self_time: u64, child_duration: u64) -> Value {
    let mut root = jaeger_span("root", "p1", root_self_time + child_duration, None);
    root["tags"] = json!([{"key": "http.url", "type": "string", "value": url}]);
    json!({
        "traceID": id,
        "spans": [root, jaeger_span("child", "p2", child_duration, Some("root"))],
        "processes": {
            "p1": {"serviceName": "frontend", "tags": []},
            "p2": {"serviceName": "orders", "tags": []}
        },
        "warnings": null
    })
}

/// Starts a server on a random local port that queries Jaeger on `jaeger_query_port`.
pub async fn start_server(jaeger_query_port: u16, query_timeout: Duration) -> u16 {
    let config = Arc::new(Config {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        log_level: "debug",
        jaeger_query_port,
        query_timeout_secs: query_timeout.as_secs(),
    });
    let trace_source = Arc::new(
        JaegerTraceSource::new(jaeger_query_port, query_timeout)
            .expect("Failed to build trace source"),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind server");
    let port = listener.local_addr().expect("Failed to get local addr").port();

    tokio::spawn(async move {
        let server = BottleneckServer {
            config,
            trace_source,
        };
        let _ = server.serve(listener).await;
    });
    port
}

/// Sends a GET request over TCP and returns the status and body
pub async fn send_get_request(
    port: u16,
    uri: &str,
) -> Result<(StatusCode, String), Box<dyn std::error::Error>> {
    send_request(port, "GET", uri).await
}

pub async fn send_request(
    port: u16,
    method: &str,
    uri: &str,
) -> Result<(StatusCode, String), Box<dyn std::error::Error>> {
    let stream = timeout(
        Duration::from_secs(2),
        tokio::net::TcpStream::connect(format!("127.0.0.1:{}", port)),
    )
    .await??;

    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    tokio::spawn(async move {
        let _ = conn.await;
    });

    let request = Request::builder()
        .uri(uri)
        .method(method)
        .header("Host", format!("127.0.0.1:{port}"))
        .body(Empty::<Bytes>::new())?;
    let response = timeout(Duration::from_secs(10), sender.send_request(request)).await??;
    let status = response.status();
    let body = response.into_body().collect().await?.to_bytes();
    Ok((status, String::from_utf8(body.to_vec())?))
}
