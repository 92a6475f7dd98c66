// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use tracing::info;

/// Observation count of one URL and the service TOPSIS ranked first for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlStat {
    pub total_calls: u64,
    pub bottleneck: String,
}

/// Picks the bottleneck of the URL with the most observations. URLs with the same count
/// resolve to the alphabetically first one. Returns `None` when there are no URLs.
pub fn select_global(url_stats: &BTreeMap<String, UrlStat>) -> Option<&str> {
    info!("Performing url Aggregation");

    let mut max_calls = 0;
    let mut winner = None;
    for (url, stat) in url_stats {
        info!(
            "url = {}, total calls = {}, bottleneck = {}",
            url, stat.total_calls, stat.bottleneck
        );
        if stat.total_calls > max_calls {
            max_calls = stat.total_calls;
            winner = Some(stat.bottleneck.as_str());
        }
    }
    winner
}
