//! Backoff schedule for convergence polling
//!
//! A [`BackoffPolicy`] is an immutable value shared by every convergence wait
//! in the process. Each wait takes its own [`Backoff`] stepper from it.
//!
//! The delay before step `n` is `initial_delay * factor^n`, clamped to `cap`,
//! plus a random extra of up to `jitter * delay`. With the default factor of
//! 1.0 this is a fixed-interval poll. Delay arithmetic saturates instead of
//! overflowing, so any finite non-negative factor is safe.

use std::time::Duration;

/// Default number of attempts
pub const DEFAULT_STEPS: u32 = 10;

/// Default delay between attempts
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(30);

/// Default multiplicative factor
pub const DEFAULT_FACTOR: f64 = 1.0;

/// Default jitter fraction
pub const DEFAULT_JITTER: f64 = 0.1;

/// Default upper bound for a single delay, before jitter
pub const DEFAULT_CAP: Duration = Duration::from_secs(3600);

/// Bounded retry schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Maximum number of attempts
    pub steps: u32,
    /// Delay after the first attempt
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each step
    pub factor: f64,
    /// Fraction of the delay added at random
    pub jitter: f64,
    /// Upper bound for a single delay, before jitter
    pub cap: Duration,
}

impl BackoffPolicy {
    /// Create a policy capped at [`DEFAULT_CAP`]
    pub const fn new(steps: u32, initial_delay: Duration, factor: f64, jitter: f64) -> Self {
        Self {
            steps,
            initial_delay,
            factor,
            jitter,
            cap: DEFAULT_CAP,
        }
    }

    /// Replace the per-delay cap
    pub const fn with_cap(mut self, cap: Duration) -> Self {
        self.cap = cap;
        self
    }

    /// Fixed-interval policy without jitter
    pub const fn fixed(steps: u32, delay: Duration) -> Self {
        Self::new(steps, delay, 1.0, 0.0)
    }

    /// Start a fresh stepper
    pub fn start(&self) -> Backoff {
        Backoff {
            remaining: self.steps,
            delay: self.initial_delay.min(self.cap),
            factor: self.factor,
            jitter: self.jitter,
            cap: self.cap,
        }
    }

    /// Upper bound of the total time spent sleeping, jitter included
    pub fn max_total_delay(&self) -> Duration {
        let mut total = Duration::ZERO;
        let mut delay = self.initial_delay.min(self.cap);
        for _ in 1..self.steps {
            let worst = delay.saturating_add(scale(delay, self.jitter.max(0.0), Duration::MAX));
            total = total.saturating_add(worst);
            if self.factor > 0.0 {
                delay = scale(delay, self.factor, self.cap);
            }
        }
        total
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_STEPS,
            DEFAULT_INITIAL_DELAY,
            DEFAULT_FACTOR,
            DEFAULT_JITTER,
        )
    }
}

/// Per-wait stepper over a [`BackoffPolicy`]
#[derive(Debug, Clone)]
pub struct Backoff {
    remaining: u32,
    delay: Duration,
    factor: f64,
    jitter: f64,
    cap: Duration,
}

impl Backoff {
    /// Attempts left, including the one about to run
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Consume one attempt and return the delay to wait before the next one
    ///
    /// Returns `None` once the budget is spent; the caller must stop after
    /// the attempt it just made.
    pub fn step(&mut self) -> Option<Duration> {
        if self.remaining <= 1 {
            self.remaining = 0;
            return None;
        }
        self.remaining -= 1;

        let delay = jittered(self.delay, self.jitter);
        if self.factor > 0.0 {
            self.delay = scale(self.delay, self.factor, self.cap);
        }
        Some(delay)
    }
}

/// `base` plus a uniformly random extra in `[0, jitter * base)`
fn jittered(base: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 {
        return base;
    }
    base.saturating_add(scale(base, rand::random::<f64>() * jitter, Duration::MAX))
}

/// `delay * factor`, saturating at `cap`
fn scale(delay: Duration, factor: f64, cap: Duration) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).map_or(cap, |scaled| scaled.min(cap))
}
