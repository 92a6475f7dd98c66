// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Typed span graph built from one Jaeger trace document.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::MalformedTraceError;
use crate::float_coercion::coerce_float;

const CHILD_OF_REF_TYPE: &str = "CHILD_OF";
const HTTP_URL_TAG_KEY: &str = "http.url";

#[derive(Deserialize)]
struct RawTrace {
    #[serde(rename = "traceID")]
    trace_id: String,
    spans: Vec<RawSpan>,
    processes: HashMap<String, RawProcess>,
}

#[derive(Deserialize)]
struct RawSpan {
    #[serde(rename = "spanID")]
    span_id: String,
    #[serde(rename = "processID")]
    process_id: String,
    duration: Value,
    references: Vec<RawReference>,
    tags: Vec<RawTag>,
}

#[derive(Deserialize)]
struct RawReference {
    #[serde(rename = "refType")]
    ref_type: String,
    #[serde(rename = "spanID")]
    span_id: String,
}

#[derive(Deserialize)]
struct RawTag {
    key: String,
    value: Value,
}

#[derive(Deserialize)]
struct RawProcess {
    #[serde(rename = "serviceName")]
    service_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub process_id: String,
    pub service_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub span_id: String,
    pub process_id: String,
    /// Elapsed time, children included.
    pub duration: f64,
    /// The first `CHILD_OF` reference. Further parents are dropped.
    pub parent: Option<String>,
    /// Duration minus the durations of the spans reporting this span as parent. Equal to
    /// `duration` until the trace is reduced.
    pub processing_time: f64,
}

impl Span {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// One sampled execution of a request.
///
/// Spans and processes are kept in ordered maps so every walk over them visits ids in the
/// same order, which keeps bottleneck tie breaks reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub trace_id: String,
    pub spans: BTreeMap<String, Span>,
    pub processes: BTreeMap<String, Process>,
    /// `http.url` tag of the root span, empty if the root carries none.
    pub url: String,
}

impl Trace {
    /// Decodes a trace document, rejecting it whole if any required field is missing or
    /// mistyped.
    pub fn from_value(value: &Value) -> Result<Trace, MalformedTraceError> {
        let raw = RawTrace::deserialize(value)?;

        let processes: BTreeMap<String, Process> = raw
            .processes
            .into_iter()
            .map(|(process_id, process)| {
                (
                    process_id.clone(),
                    Process {
                        process_id,
                        service_name: process.service_name,
                    },
                )
            })
            .collect();

        let mut spans = BTreeMap::new();
        let mut url: Option<String> = None;
        let mut roots = 0;

        for raw_span in raw.spans {
            if !processes.contains_key(&raw_span.process_id) {
                return Err(MalformedTraceError::UnknownProcess {
                    span_id: raw_span.span_id,
                    process_id: raw_span.process_id,
                });
            }

            let duration = coerce_float(&raw_span.duration).map_err(|source| {
                MalformedTraceError::Duration {
                    span_id: raw_span.span_id.clone(),
                    source,
                }
            })?;

            let parent = raw_span
                .references
                .into_iter()
                .find(|reference| reference.ref_type == CHILD_OF_REF_TYPE)
                .map(|reference| reference.span_id);

            if parent.is_none() {
                roots += 1;
                if url.is_none() {
                    url = root_url(&raw_span.span_id, &raw_span.tags)?;
                }
            }

            let span = Span {
                span_id: raw_span.span_id.clone(),
                process_id: raw_span.process_id,
                duration,
                parent,
                processing_time: duration,
            };
            if spans.insert(raw_span.span_id.clone(), span).is_some() {
                return Err(MalformedTraceError::DuplicateSpan(raw_span.span_id));
            }
        }

        if roots > 1 {
            return Err(MalformedTraceError::MultipleRoots(roots));
        }

        let url = url.unwrap_or_default();
        debug!("traceID = {}, primary url = {}", raw.trace_id, url);

        Ok(Trace {
            trace_id: raw.trace_id,
            spans,
            processes,
            url,
        })
    }

    /// Name of the service owning the given process, if the process is known.
    pub fn service_name(&self, process_id: &str) -> Option<&str> {
        self.processes
            .get(process_id)
            .map(|process| process.service_name.as_str())
    }
}

fn root_url(span_id: &str, tags: &[RawTag]) -> Result<Option<String>, MalformedTraceError> {
    match tags.iter().find(|tag| tag.key == HTTP_URL_TAG_KEY) {
        Some(tag) => match &tag.value {
            Value::String(url) => Ok(Some(url.clone())),
            _ => Err(MalformedTraceError::InvalidUrlTag(span_id.to_string())),
        },
        None => Ok(None),
    }
}
