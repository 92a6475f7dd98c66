// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! TOPSIS ranking over two criteria: how often a service was the bottleneck of a URL's
//! traces and its mean delay when it was.

use std::collections::BTreeMap;

use tracing::debug;

use crate::aggregator::Candidates;
use crate::error::InvalidInputError;

pub const FREQUENCY_WEIGHT: f64 = 0.5;
pub const DELAY_WEIGHT: f64 = 0.5;

/// Closeness assigned when the best and worst points coincide.
const TIED_CLOSENESS: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
struct WeightedPoint {
    frequency: f64,
    delay: f64,
}

impl WeightedPoint {
    fn distance(&self, other: &WeightedPoint) -> f64 {
        (self.frequency - other.frequency).hypot(self.delay - other.delay)
    }
}

fn normalize(value: f64, norm: f64, weight: f64) -> f64 {
    if norm == 0.0 {
        0.0
    } else {
        value / norm * weight
    }
}

/// Closeness of every candidate to the ideal point, in `[0, 1]`.
#[allow(clippy::cast_precision_loss)]
pub fn closeness_scores(
    candidates: &Candidates,
) -> Result<BTreeMap<String, f64>, InvalidInputError> {
    if candidates.is_empty() {
        return Err(InvalidInputError::EmptyCandidates);
    }

    // hypot keeps the Euclidean norm finite for very large delays
    let frequency_norm = candidates
        .values()
        .map(|c| c.frequency as f64)
        .fold(0.0, f64::hypot);
    let delay_norm = candidates.values().map(|c| c.delay).fold(0.0, f64::hypot);

    let weighted: Vec<(&String, WeightedPoint)> = candidates
        .iter()
        .map(|(service, c)| {
            (
                service,
                WeightedPoint {
                    frequency: normalize(c.frequency as f64, frequency_norm, FREQUENCY_WEIGHT),
                    delay: normalize(c.delay, delay_norm, DELAY_WEIGHT),
                },
            )
        })
        .collect();

    let mut best = weighted[0].1;
    let mut worst = weighted[0].1;
    for (_, point) in &weighted[1..] {
        best.frequency = best.frequency.max(point.frequency);
        best.delay = best.delay.max(point.delay);
        worst.frequency = worst.frequency.min(point.frequency);
        worst.delay = worst.delay.min(point.delay);
    }

    Ok(weighted
        .into_iter()
        .map(|(service, point)| {
            let positive = point.distance(&best);
            let negative = point.distance(&worst);
            let total = positive + negative;
            let score = if total == 0.0 {
                TIED_CLOSENESS
            } else {
                negative / total
            };
            (service.clone(), score)
        })
        .collect())
}

/// Returns the service with the strictly greatest closeness. Equal scores keep the
/// alphabetically first service. A single candidate wins without scoring.
pub fn rank(candidates: &Candidates) -> Result<String, InvalidInputError> {
    if candidates.len() == 1 {
        if let Some(service) = candidates.keys().next() {
            return Ok(service.clone());
        }
    }

    let scores = closeness_scores(candidates)?;
    let mut winner: Option<(&String, f64)> = None;
    for (service, score) in &scores {
        debug!("service = {service}, topsis score = {score}");
        match winner {
            Some((_, best)) if *score <= best => {}
            _ => winner = Some((service, *score)),
        }
    }

    winner
        .map(|(service, _)| service.clone())
        .ok_or(InvalidInputError::EmptyCandidates)
}
