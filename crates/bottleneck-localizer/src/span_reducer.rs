// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use tracing::debug;

use crate::trace::Trace;

/// The service and exclusive processing time of the dominant span of one trace.
#[derive(Debug, Clone, PartialEq)]
pub struct BottleneckObservation {
    pub service: String,
    pub delay: f64,
}

/// A parent span's service calling a child span's service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServiceCall {
    pub caller: String,
    pub callee: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReducedTrace {
    pub trace: Trace,
    /// `None` when no span spent a positive amount of time on its own.
    pub bottleneck: Option<BottleneckObservation>,
    /// Number of parent/child span pairs crossing each service boundary.
    pub service_calls: BTreeMap<ServiceCall, u64>,
}

/// Computes the processing time of every span and picks the trace's bottleneck.
pub fn reduce_trace(mut trace: Trace) -> ReducedTrace {
    let service_calls = subtract_child_durations(&mut trace);
    let bottleneck = find_bottleneck(&trace);

    match &bottleneck {
        Some(observation) => debug!(
            "traceID = {}, bottleneck service = {}, processing time = {}",
            trace.trace_id, observation.service, observation.delay
        ),
        None => debug!("traceID = {} has no bottleneck span", trace.trace_id),
    }

    ReducedTrace {
        trace,
        bottleneck,
        service_calls,
    }
}

/// Subtracts each span's duration from its parent's processing time, once per parent/child
/// pair. References to spans missing from the trace are ignored.
fn subtract_child_durations(trace: &mut Trace) -> BTreeMap<ServiceCall, u64> {
    let links: Vec<(String, String, f64, String)> = trace
        .spans
        .values()
        .filter_map(|span| {
            span.parent.as_ref().map(|parent| {
                (
                    span.span_id.clone(),
                    parent.clone(),
                    span.duration,
                    span.process_id.clone(),
                )
            })
        })
        .collect();

    let mut service_calls = BTreeMap::new();
    for (span_id, parent_id, duration, child_process) in links {
        let Some(parent) = trace.spans.get_mut(&parent_id) else {
            debug!("Span {span_id} references missing parent {parent_id}");
            continue;
        };
        parent.processing_time -= duration;

        if parent.process_id == child_process {
            continue;
        }
        let caller = trace.processes.get(&parent.process_id);
        let callee = trace.processes.get(&child_process);
        if let (Some(caller), Some(callee)) = (caller, callee) {
            if caller.service_name != callee.service_name {
                *service_calls
                    .entry(ServiceCall {
                        caller: caller.service_name.clone(),
                        callee: callee.service_name.clone(),
                    })
                    .or_insert(0) += 1;
            }
        }
    }

    for (call, count) in &service_calls {
        debug!("{}:{} messages = {}", call.caller, call.callee, count);
    }
    service_calls
}

/// The span with the greatest positive processing time. Spans are visited in span id order
/// and only a strictly greater time replaces the current winner.
fn find_bottleneck(trace: &Trace) -> Option<BottleneckObservation> {
    let mut max_processing_time = 0.0;
    let mut bottleneck = None;
    for span in trace.spans.values() {
        debug!(
            "SpanID = {}, Duration = {}, Processing Time = {}, ProcessID = {}",
            span.span_id, span.duration, span.processing_time, span.process_id
        );
        if span.processing_time > max_processing_time {
            max_processing_time = span.processing_time;
            bottleneck = Some(span);
        }
    }

    let span = bottleneck?;
    let service = trace.service_name(&span.process_id)?;
    Some(BottleneckObservation {
        service: service.to_string(),
        delay: span.processing_time,
    })
}
