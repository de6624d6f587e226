//! Reliability scorer — turns an endpoint's history into a comparable score.
//!
//! ```text
//! latency_score = max(0, 100 − latency_ms / decay_divisor)
//! score         = latency_score × latency_weight + success_rate × 100 × uptime_weight
//! ```
//!
//! Scores are recomputed on every selection and never stored.

use serde::{Deserialize, Serialize};

use crate::registry::EndpointRecord;

/// Upper bound of every score.
pub const MAX_SCORE: f64 = 100.0;

/// Tunable weights of the reliability score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub latency_weight: f64,
    pub uptime_weight: f64,
    /// Milliseconds of latency that cost one latency point.
    pub latency_decay_divisor: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            latency_weight: 0.3,
            uptime_weight: 0.7,
            latency_decay_divisor: 10.0,
        }
    }
}

/// A record paired with its score at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEndpoint {
    pub record: EndpointRecord,
    pub score: f64,
}

/// Score a record in `[0, 100]`; anything not online scores zero.
pub fn score(record: &EndpointRecord, weights: &ScoringWeights) -> f64 {
    if !record.is_online() {
        return 0.0;
    }
    let latency_ms = record.latency_ms.unwrap_or(u64::MAX) as f64;
    let divisor = if weights.latency_decay_divisor > 0.0 {
        weights.latency_decay_divisor
    } else {
        ScoringWeights::default().latency_decay_divisor
    };
    let latency_score = (MAX_SCORE - latency_ms / divisor).max(0.0);
    let uptime_score = record.success_rate() * MAX_SCORE;

    let total = latency_score * weights.latency_weight.max(0.0)
        + uptime_score * weights.uptime_weight.max(0.0);
    if total.is_finite() {
        total.clamp(0.0, MAX_SCORE)
    } else {
        0.0
    }
}

/// Score each record, preserving input order.
pub fn score_all(records: Vec<EndpointRecord>, weights: &ScoringWeights) -> Vec<ScoredEndpoint> {
    records
        .into_iter()
        .map(|record| {
            let score = score(&record, weights);
            ScoredEndpoint { record, score }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::EndpointStatus;

    fn online(latency_ms: u64, success: u64, failure: u64) -> EndpointRecord {
        EndpointRecord {
            status: EndpointStatus::Online,
            latency_ms: Some(latency_ms),
            success_count: success,
            failure_count: failure,
            chain_id: Some(56),
            ..EndpointRecord::new("https://a.com")
        }
    }

    #[test]
    fn not_online_scores_zero() {
        let w = ScoringWeights::default();
        let mut rec = online(10, 10, 0);
        rec.status = EndpointStatus::Offline;
        assert_eq!(score(&rec, &w), 0.0);
        rec.status = EndpointStatus::Unknown;
        assert_eq!(score(&rec, &w), 0.0);
    }

    #[test]
    fn default_weights_match_reference_values() {
        let w = ScoringWeights::default();
        // 50ms: latency 95 × 0.3 + 100 × 0.7
        assert!((score(&online(50, 1, 0), &w) - 98.5).abs() < 1e-9);
        // 400ms: latency 60 × 0.3 + 100 × 0.7
        assert!((score(&online(400, 1, 0), &w) - 88.0).abs() < 1e-9);
        // latency floors at zero past one second
        assert!((score(&online(5_000, 1, 1), &w) - 35.0).abs() < 1e-9);
    }

    #[test]
    fn scores_stay_in_range() {
        let w = ScoringWeights::default();
        for latency in [0, 1, 999, 1000, 60_000] {
            for (s, f) in [(0, 0), (1, 0), (0, 5), (3, 7), (1000, 1)] {
                let v = score(&online(latency, s, f), &w);
                assert!((0.0..=MAX_SCORE).contains(&v), "score {v} out of range");
            }
        }
        let heavy = ScoringWeights {
            latency_weight: 5.0,
            uptime_weight: 5.0,
            latency_decay_divisor: 10.0,
        };
        assert_eq!(score(&online(0, 1, 0), &heavy), MAX_SCORE);
    }

    #[test]
    fn monotonic_in_success_rate_and_latency() {
        let w = ScoringWeights::default();
        let mut prev = -1.0;
        for success in 0..=10 {
            let v = score(&online(200, success, 10 - success), &w);
            assert!(v >= prev);
            prev = v;
        }
        let mut prev = f64::MAX;
        for latency in (0..=1500).step_by(50) {
            let v = score(&online(latency, 4, 1), &w);
            assert!(v <= prev);
            prev = v;
        }
    }

    #[test]
    fn slow_reliable_beats_fast_flaky() {
        let w = ScoringWeights::default();
        let slow = score(&online(800, 10, 0), &w);
        let fast = score(&online(20, 5, 5), &w);
        assert!(slow > fast);
    }

    #[test]
    fn weights_deserialize_with_defaults() {
        let w: ScoringWeights = serde_json::from_str(r#"{"latency_weight":0.5}"#).unwrap();
        assert_eq!(w.latency_weight, 0.5);
        assert_eq!(w.uptime_weight, 0.7);
    }
}
