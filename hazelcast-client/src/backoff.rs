//! Capped exponential backoff shared by cluster reconnects and invocation
//! retries.

use std::time::Duration;

use rand::Rng;

/// Calculates the next backoff duration with jitter applied.
pub(crate) fn calculate_backoff_with_jitter(
    current_backoff: Duration,
    multiplier: f64,
    max_backoff: Duration,
    jitter: f64,
) -> Duration {
    let base_backoff = current_backoff.as_secs_f64() * multiplier;

    let jitter_factor = if jitter > 0.0 {
        let mut rng = rand::thread_rng();
        1.0 + rng.gen_range(-jitter..=jitter)
    } else {
        1.0
    };

    let jittered_backoff = (base_backoff * jitter_factor).max(0.0);

    std::cmp::min(Duration::from_secs_f64(jittered_backoff), max_backoff)
}

/// Sequence of sleep durations growing from `initial` up to `max`.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    current: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
}

impl Backoff {
    pub(crate) fn new(initial: Duration, max: Duration, multiplier: f64, jitter: f64) -> Self {
        Self {
            current: initial.min(max),
            max,
            multiplier,
            jitter,
        }
    }

    /// Returns the delay to wait now and advances to the next one.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current =
            calculate_backoff_with_jitter(self.current, self.multiplier, self.max, self.jitter);
        delay
    }
}
