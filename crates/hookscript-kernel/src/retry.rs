//! Bounded retry for operations that may transiently produce nothing.

/// Default number of attempts made by [`RetryPolicy::default`].
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Retries an operation until it yields a value, with no delay between
/// attempts.
///
/// Only an empty result (`Ok(None)`) triggers another attempt. An `Err` is
/// returned immediately so genuine failures are never retried away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// A policy making at most `max_attempts` attempts. Zero is treated as one.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `op` until it returns a value, an error, or the attempt budget is
    /// spent. `op` receives the 1-based attempt number.
    pub fn run<T, E, F>(&self, mut op: F) -> Result<Option<T>, E>
    where
        F: FnMut(u32) -> Result<Option<T>, E>,
    {
        for attempt in 1..=self.max_attempts {
            if let Some(value) = op(attempt)? {
                return Ok(Some(value));
            }
            tracing::debug!("Attempt {}/{} produced no result", attempt, self.max_attempts);
        }
        Ok(None)
    }
}
