// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use crate::error::InvalidInputError;
use crate::selector::UrlStat;
use crate::span_reducer::BottleneckObservation;
use crate::topsis;

/// Running statistics of one service being a trace bottleneck for one URL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopsisCandidate {
    pub frequency: u64,
    /// Mean delay over `frequency` observations.
    pub delay: f64,
}

impl TopsisCandidate {
    pub fn new(delay: f64) -> Self {
        TopsisCandidate {
            frequency: 1,
            delay,
        }
    }

    /// Folds one more delay into the mean.
    #[allow(clippy::cast_precision_loss)]
    pub fn observe(&mut self, delay: f64) {
        let frequency = self.frequency as f64;
        self.delay = (self.delay * frequency + delay) / (frequency + 1.0);
        self.frequency += 1;
    }
}

pub type Candidates = BTreeMap<String, TopsisCandidate>;

/// Collects bottleneck observations per originating URL.
#[derive(Debug, Default)]
pub struct UrlAggregator {
    urls: BTreeMap<String, Candidates>,
}

impl UrlAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, url: &str, observation: BottleneckObservation) {
        let candidates = self.urls.entry(url.to_string()).or_default();
        match candidates.get_mut(&observation.service) {
            Some(candidate) => candidate.observe(observation.delay),
            None => {
                candidates.insert(observation.service, TopsisCandidate::new(observation.delay));
            }
        }
    }

    pub fn candidates(&self, url: &str) -> Option<&Candidates> {
        self.urls.get(url)
    }

    /// Number of observations recorded for the URL.
    pub fn total_calls(&self, url: &str) -> u64 {
        self.urls
            .get(url)
            .map(|candidates| candidates.values().map(|c| c.frequency).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Ranks every URL's candidates and pairs the winner with the URL's call count.
    pub fn url_stats(&self) -> Result<BTreeMap<String, UrlStat>, InvalidInputError> {
        self.urls
            .iter()
            .map(|(url, candidates)| {
                let bottleneck = topsis::rank(candidates)?;
                Ok((
                    url.clone(),
                    UrlStat {
                        total_calls: self.total_calls(url),
                        bottleneck,
                    },
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn observation(service: &str, delay: f64) -> BottleneckObservation {
        BottleneckObservation {
            service: service.to_string(),
            delay,
        }
    }

    #[test]
    fn test_two_traces_same_service() {
        let mut aggregator = UrlAggregator::new();
        aggregator.record("/x", observation("A", 10.0));
        aggregator.record("/x", observation("A", 20.0));

        let candidates = aggregator.candidates("/x").unwrap();
        assert_eq!(
            candidates["A"],
            TopsisCandidate {
                frequency: 2,
                delay: 15.0
            }
        );
        assert_eq!(aggregator.total_calls("/x"), 2);
    }

    #[test]
    fn test_urls_are_kept_apart() {
        let mut aggregator = UrlAggregator::new();
        aggregator.record("/x", observation("A", 10.0));
        aggregator.record("/y", observation("B", 5.0));
        aggregator.record("/y", observation("A", 7.0));

        assert_eq!(aggregator.total_calls("/x"), 1);
        assert_eq!(aggregator.total_calls("/y"), 2);
        assert_eq!(aggregator.total_calls("/z"), 0);
        assert_eq!(aggregator.candidates("/y").unwrap().len(), 2);
    }

    #[test]
    fn test_mean_is_order_independent() {
        let mut split = TopsisCandidate::new(5.0);
        split.observe(5.0);
        split.observe(10.0);

        let mut interleaved = TopsisCandidate::new(5.0);
        interleaved.observe(10.0);
        interleaved.observe(5.0);

        assert_eq!(split.frequency, interleaved.frequency);
        assert!((split.delay - interleaved.delay).abs() < 1e-9);
        assert!((split.delay - 20.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_url_stats() {
        let mut aggregator = UrlAggregator::new();
        aggregator.record("/x", observation("A", 10.0));
        aggregator.record("/x", observation("A", 20.0));
        aggregator.record("", observation("B", 1.0));

        let stats = aggregator.url_stats().unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(
            stats["/x"],
            UrlStat {
                total_calls: 2,
                bottleneck: "A".to_string()
            }
        );
        assert_eq!(stats[""].bottleneck, "B");
    }

    proptest! {
        #[test]
        fn prop_running_mean_matches_arithmetic_mean(
            mut delays in prop::collection::vec(0.0f64..10_000.0, 1..32),
        ) {
            let mut forward = TopsisCandidate::new(delays[0]);
            for delay in &delays[1..] {
                forward.observe(*delay);
            }
            delays.reverse();
            let mut backward = TopsisCandidate::new(delays[0]);
            for delay in &delays[1..] {
                backward.observe(*delay);
            }
            let mean = delays.iter().sum::<f64>() / delays.len() as f64;
            prop_assert_eq!(forward.frequency, delays.len() as u64);
            prop_assert!((forward.delay - mean).abs() < 1e-6);
            prop_assert!((forward.delay - backward.delay).abs() < 1e-6);
        }
    }
}
