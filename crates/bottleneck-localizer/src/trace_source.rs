// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::QueryError;

pub const SEARCH_RESULT_LIMIT: u32 = 10000;
pub const SEARCH_LOOKBACK: &str = "1h";
const SEARCH_PATH: &str = "/api/traces";

/// Parameters of one trace search, as received on `/getbottleneck`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceQuery {
    pub service: String,
    pub start_time: String,
    pub end_time: String,
    /// Host of the tracing backend query API.
    pub host: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    data: Vec<Value>,
}

#[async_trait]
pub trait TraceSource {
    /// Searches the tracing backend and returns the raw trace documents.
    async fn search(&self, query: &TraceQuery) -> Result<Vec<Value>, QueryError>;
}

/// Queries the Jaeger query service trace search API.
#[derive(Clone)]
pub struct JaegerTraceSource {
    client: reqwest::Client,
    query_port: u16,
    timeout: Duration,
}

impl JaegerTraceSource {
    pub fn new(query_port: u16, timeout: Duration) -> Result<Self, Box<dyn Error>> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(JaegerTraceSource {
            client,
            query_port,
            timeout,
        })
    }

    pub fn search_url(&self, query: &TraceQuery) -> Result<Url, QueryError> {
        let base = format!("http://{}:{}{}", query.host, self.query_port, SEARCH_PATH);
        let mut url = Url::parse(&base).map_err(|e| QueryError::InvalidHost(e.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            if !query.end_time.is_empty() {
                pairs.append_pair("end", &query.end_time);
            }
            pairs
                .append_pair("limit", &SEARCH_RESULT_LIMIT.to_string())
                .append_pair("lookback", SEARCH_LOOKBACK)
                .append_key_only("maxDuration")
                .append_key_only("minDuration")
                .append_pair("service", &query.service);
            if !query.start_time.is_empty() {
                pairs.append_pair("start", &query.start_time);
            }
        }
        Ok(url)
    }

    async fn fetch(&self, url: Url) -> Result<Vec<Value>, QueryError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                QueryError::Timeout(self.timeout.as_secs())
            } else {
                QueryError::Transport(e)
            }
        })?;

        info!("Response status: {}", response.status());
        if !response.status().is_success() {
            return Err(QueryError::Status(response.status()));
        }

        let body = response.bytes().await.map_err(QueryError::ReadBody)?;
        let search: SearchResponse = serde_json::from_slice(&body).map_err(QueryError::Decode)?;
        debug!("Received {} traces", search.data.len());
        Ok(search.data)
    }
}

#[async_trait]
impl TraceSource for JaegerTraceSource {
    async fn search(&self, query: &TraceQuery) -> Result<Vec<Value>, QueryError> {
        let url = self.search_url(query)?;
        debug!("Searching traces: {url}");
        match tokio::time::timeout(self.timeout, self.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(self.timeout.as_secs())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> TraceQuery {
        TraceQuery {
            service: "frontend".to_string(),
            start_time: "1700000000000000".to_string(),
            end_time: "1700003600000000".to_string(),
            host: "jaeger-query".to_string(),
        }
    }

    #[test]
    fn test_search_url() {
        let source = JaegerTraceSource::new(16686, Duration::from_secs(1)).unwrap();
        let url = source.search_url(&query()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://jaeger-query:16686/api/traces?end=1700003600000000&limit=10000&lookback=1h&maxDuration&minDuration&service=frontend&start=1700000000000000"
        );
    }

    #[test]
    fn test_search_url_encodes_service() {
        let source = JaegerTraceSource::new(16686, Duration::from_secs(1)).unwrap();
        let mut query = query();
        query.service = "cart service&x=1".to_string();
        query.start_time.clear();
        query.end_time.clear();
        let url = source.search_url(&query).unwrap();
        assert_eq!(
            url.query(),
            Some("limit=10000&lookback=1h&maxDuration&minDuration&service=cart+service%26x%3D1")
        );
    }

    #[test]
    fn test_invalid_host() {
        let source = JaegerTraceSource::new(16686, Duration::from_secs(1)).unwrap();
        let mut query = query();
        query.host = "bad host/".to_string();
        assert!(matches!(
            source.search_url(&query),
            Err(QueryError::InvalidHost(_))
        ));
    }
}
