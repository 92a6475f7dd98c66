// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use http_body_util::Full;
use hyper::{
    body::Bytes,
    header,
    http::{self},
    Response, StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::LocalizeError;

pub type HttpResponse = Response<Full<Bytes>>;

pub const BOTTLENECK_RESULT_TYPE: &str = "Bottleneck";

/// Body of a successful `/getbottleneck` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BottleneckResult {
    #[serde(rename = "type")]
    pub result_type: String,
    #[serde(rename = "result")]
    pub result: String,
}

/// Body of a failed `/getbottleneck` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    #[serde(rename = "errType")]
    pub err_type: String,
    #[serde(rename = "errString")]
    pub err_string: String,
}

fn json_response(status: StatusCode, body: String) -> http::Result<HttpResponse> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
}

fn serialize_response<T: Serialize>(
    status: StatusCode,
    payload: &T,
) -> http::Result<HttpResponse> {
    match serde_json::to_string(payload) {
        Ok(body) => json_response(status, body),
        Err(e) => log_and_create_http_response(
            &format!("Error serializing response body: {e}"),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    }
}

/// Does two things:
/// 1. Logs the given message. A success status code (within 200-299) will cause a debug log to
///    be written, otherwise error will be written.
/// 2. Returns the given message in the body of JSON response with the given status code.
///
/// Response body format:
/// {
///     "message": message
/// }
pub fn log_and_create_http_response(
    message: &str,
    status: StatusCode,
) -> http::Result<HttpResponse> {
    if status.is_success() {
        debug!("{message}");
    } else {
        error!("{message}");
    }
    let mut body = Map::new();
    body.insert("message".to_string(), Value::String(message.to_string()));
    json_response(status, Value::Object(body).to_string())
}

/// Logs the error and returns it as an `{"errType", "errString"}` body with the error's status.
pub fn log_and_create_error_response(err: &LocalizeError) -> http::Result<HttpResponse> {
    let result = ErrorResult {
        err_type: err.code().to_string(),
        err_string: err.to_string(),
    };
    error!("errorCode: {} msg: {}", result.err_type, result.err_string);
    serialize_response(err.status(), &result)
}

pub fn create_bottleneck_response(service: &str) -> http::Result<HttpResponse> {
    debug!("Bottleneck = {service}");
    let result = BottleneckResult {
        result_type: BOTTLENECK_RESULT_TYPE.to_string(),
        result: service.to_string(),
    };
    serialize_response(StatusCode::OK, &result)
}

/// Empty `204 No Content`, sent when the traces did not point at any bottleneck.
pub fn create_no_content_response() -> http::Result<HttpResponse> {
    debug!("No bottleneck found");
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Full::new(Bytes::new()))
}
