//! Backoff schedules for downstream retries.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How the wait between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// `(min + random(0, max - min)) * (attempt + 1)`.
    #[default]
    LinearJitter,
    /// `min * 2^attempt` plus up to 10% jitter.
    Exponential,
}

impl BackoffStrategy {
    /// Wait before the attempt following `attempt` (0-based), clamped to `[min, max]`.
    pub fn delay(self, attempt: u32, min: Duration, max: Duration) -> Duration {
        match self {
            BackoffStrategy::LinearJitter => linear_jitter_backoff(attempt, min, max),
            BackoffStrategy::Exponential => exponential_backoff(attempt, min, max),
        }
    }
}

/// Linear backoff with jitter spread over `[min, max]`.
pub fn linear_jitter_backoff(attempt: u32, min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }

    let min_ms = min.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    let spread = max_ms - min_ms;
    let jitter = rand::thread_rng().gen_range(0..=spread);
    let scale = u64::from(attempt).saturating_add(1);

    let delay_ms = min_ms.saturating_add(jitter).saturating_mul(scale);
    Duration::from_millis(delay_ms.clamp(min_ms, max_ms))
}

/// Exponential backoff with up to 10% jitter.
pub fn exponential_backoff(attempt: u32, min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }

    let min_ms = min.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    let exponential_base = 2u64.saturating_pow(attempt);
    let capped_delay = min_ms.saturating_mul(exponential_base).min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis((capped_delay + jitter).clamp(min_ms, max_ms))
}
