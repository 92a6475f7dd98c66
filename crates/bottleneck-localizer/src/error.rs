// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use hyper::StatusCode;

/// A trace field could not be read as a floating-point value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Can't convert {source_type} to f64")]
pub struct ConversionError {
    pub source_type: &'static str,
}

/// A trace document that does not have the shape the parser requires.
#[derive(Debug, thiserror::Error)]
pub enum MalformedTraceError {
    #[error("Invalid trace document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Span {span_id} has an invalid duration: {source}")]
    Duration {
        span_id: String,
        #[source]
        source: ConversionError,
    },

    #[error("Span {span_id} references unknown process {process_id}")]
    UnknownProcess { span_id: String, process_id: String },

    #[error("Span {0} appears more than once")]
    DuplicateSpan(String),

    #[error("Root span {0} has a non-string http.url tag")]
    InvalidUrlTag(String),

    #[error("Trace has {0} root spans, only one is supported")]
    MultipleRoots(usize),
}

/// Precondition violations of the ranking routines.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInputError {
    #[error("Empty data to Topsis")]
    EmptyCandidates,
}

/// Failures talking to the tracing backend.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid tracing backend host: {0}")]
    InvalidHost(String),

    #[error("Error Response: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Error Response: query did not complete within {0} seconds")]
    Timeout(u64),

    #[error("Error Response: {0}")]
    ReadBody(#[source] reqwest::Error),

    #[error("Error Response Code: {0}")]
    Status(StatusCode),

    #[error("Invalid trace search response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Request-level failures of the `/getbottleneck` endpoint.
#[derive(Debug, thiserror::Error)]
pub enum LocalizeError {
    #[error("Incorrect Parameters")]
    IncorrectParameters,

    #[error("Missing query parameter: {0}")]
    MissingParameter(&'static str),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("All {0} traces were malformed")]
    AllTracesMalformed(usize),

    #[error(transparent)]
    Ranking(#[from] InvalidInputError),
}

impl LocalizeError {
    /// The `errType` code reported to the caller.
    pub fn code(&self) -> &'static str {
        match self {
            LocalizeError::IncorrectParameters
            | LocalizeError::MissingParameter(_)
            | LocalizeError::Query(QueryError::InvalidHost(_)) => "201",
            LocalizeError::Query(QueryError::Status(_)) => "202",
            LocalizeError::Query(QueryError::ReadBody(_)) => "203",
            LocalizeError::Query(QueryError::Transport(_) | QueryError::Timeout(_)) => "204",
            LocalizeError::Query(QueryError::Decode(_)) | LocalizeError::AllTracesMalformed(_) => {
                "205"
            }
            LocalizeError::Ranking(_) => "500",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            LocalizeError::IncorrectParameters
            | LocalizeError::MissingParameter(_)
            | LocalizeError::Query(QueryError::InvalidHost(_)) => StatusCode::BAD_REQUEST,
            LocalizeError::Query(QueryError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            LocalizeError::Query(_) | LocalizeError::AllTracesMalformed(_) => {
                StatusCode::BAD_GATEWAY
            }
            LocalizeError::Ranking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
