use crate::error::NetworkError;
use rand::Rng;
use std::time::Duration;

/// Delay policy for unbounded retry loops.
///
/// With `exponential_base == 1.0` and no jitter every attempt waits
/// `base_delay_ms`, which is the fixed-delay policy the bots use by default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Same delay on every attempt.
    pub fn fixed(delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self {
            base_delay_ms: ms,
            max_delay_ms: ms,
            exponential_base: 1.0,
            jitter: false,
        }
    }

    pub fn new(base_delay_ms: u64) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms: base_delay_ms * 30,
            ..Default::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = self.base_delay_ms as f64 * self.exponential_base.powi(exponent);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64);

        let delay_ms = if self.jitter {
            let rng_factor = rand::thread_rng().gen_range(0.5..=1.5);
            delay_ms * rng_factor
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms as u64)
    }
}

/// Cycles through a fixed list of delays.
///
/// Each call to [`StepBackoff::next_delay`] returns the next entry; after the
/// last entry the position wraps to the start, so the schedule never grows.
#[derive(Debug, Clone)]
pub struct StepBackoff {
    steps: Vec<Duration>,
    position: usize,
}

impl StepBackoff {
    pub fn new(steps: Vec<Duration>) -> Self {
        Self { steps, position: 0 }
    }

    pub fn next_delay(&mut self) -> Duration {
        if self.steps.is_empty() {
            return Duration::ZERO;
        }
        let delay = self.steps[self.position];
        self.position = (self.position + 1) % self.steps.len();
        delay
    }

    /// Number of delays handed out since the last wrap or reset.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }
}

pub fn is_transient_error(error: &anyhow::Error) -> bool {
    if let Some(network) = error.downcast_ref::<NetworkError>() {
        return network.is_transient();
    }

    let error_msg = format!("{:?}", error).to_lowercase();

    let transient_patterns = [
        "timeout",
        "timed out",
        "connection refused",
        "connection reset",
        "network error",
        "temporary failure",
        "service unavailable",
        "too many requests",
        "bad gateway",
        "error decoding response body",
    ];

    transient_patterns
        .iter()
        .any(|pattern| error_msg.contains(pattern))
}
