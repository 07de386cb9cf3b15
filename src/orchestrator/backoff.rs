use rand::Rng;
use std::time::Duration;

use super::error::{AttemptError, OrchestratorError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Deterministic part of the wait after the attempt at `attempt_index` failed.
    pub fn exponential_delay(&self, attempt_index: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt_index))
    }

    /// Full wait: exponential part plus a jitter clamped below `max_jitter`.
    pub fn delay_for(&self, attempt_index: u32, jitter: Duration) -> Duration {
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            jitter.min(self.max_jitter.saturating_sub(Duration::from_nanos(1)))
        };
        self.exponential_delay(attempt_index).saturating_add(jitter)
    }
}

/// Source of the random component added to each backoff delay.
pub trait Jitter: Send + Sync {
    /// Returns a duration in `[0, ceiling)`, or zero when `ceiling` is zero.
    fn sample(&self, ceiling: Duration) -> Duration;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn sample(&self, ceiling: Duration) -> Duration {
        let ceiling_micros = u64::try_from(ceiling.as_micros()).unwrap_or(u64::MAX);
        if ceiling_micros == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(rand::thread_rng().gen_range(0..ceiling_micros))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn sample(&self, _ceiling: Duration) -> Duration {
        Duration::ZERO
    }
}

/// Snapshot taken right after the attempt at `attempt_index` failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptState {
    pub attempt_index: u32,
    pub last_error: AttemptError,
}

impl AttemptState {
    pub fn failed(attempt_index: u32, last_error: AttemptError) -> Self {
        Self {
            attempt_index,
            last_error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    Retry { delay: Duration },
    Fail { error: OrchestratorError },
}

/// Decides what follows a failed attempt. The caller samples `jitter` so this
/// stays a pure function of its inputs.
pub fn next_action(policy: &RetryPolicy, state: AttemptState, jitter: Duration) -> NextAction {
    let attempts_made = state.attempt_index.saturating_add(1);
    if attempts_made < policy.max_attempts {
        NextAction::Retry {
            delay: policy.delay_for(state.attempt_index, jitter),
        }
    } else {
        NextAction::Fail {
            error: OrchestratorError::ExhaustedRetries {
                attempts: attempts_made,
                last_cause: state.last_error,
            },
        }
    }
}
