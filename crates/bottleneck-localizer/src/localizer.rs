// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::aggregator::UrlAggregator;
use crate::error::LocalizeError;
use crate::selector::{select_global, UrlStat};
use crate::span_reducer::reduce_trace;
use crate::trace::Trace;

/// Outcome of reducing one batch of traces.
#[derive(Debug, Clone, PartialEq)]
pub struct Localization {
    /// `None` when no trace produced a bottleneck observation.
    pub bottleneck: Option<String>,
    pub url_stats: BTreeMap<String, UrlStat>,
    /// Traces dropped because they were malformed.
    pub skipped: usize,
}

/// Reduces every trace of a search result to its bottleneck and selects one service across
/// all URLs.
///
/// A malformed trace is logged and skipped; the batch only fails when none of its traces
/// could be parsed.
pub fn localize(traces: &[Value]) -> Result<Localization, LocalizeError> {
    if traces.is_empty() {
        return Err(LocalizeError::IncorrectParameters);
    }

    let mut aggregator = UrlAggregator::new();
    let mut skipped = 0;
    for (index, value) in traces.iter().enumerate() {
        let trace = match Trace::from_value(value) {
            Ok(trace) => trace,
            Err(err) => {
                warn!("Skipping trace {index}: {err}");
                skipped += 1;
                continue;
            }
        };

        let reduced = reduce_trace(trace);
        if let Some(observation) = reduced.bottleneck {
            aggregator.record(&reduced.trace.url, observation);
        }
    }

    if skipped == traces.len() {
        return Err(LocalizeError::AllTracesMalformed(skipped));
    }

    let url_stats = aggregator.url_stats()?;
    let bottleneck = select_global(&url_stats).map(str::to_string);
    debug!(
        "Processed {} traces, skipped {}, bottleneck = {:?}",
        traces.len(),
        skipped,
        bottleneck
    );

    Ok(Localization {
        bottleneck,
        url_stats,
        skipped,
    })
}
