//! Bounded retry with a fixed pause.
//!
//! The playlist service is eventually consistent: a mutation may not be
//! visible on the very next read. Each mutation is followed by a pause and a
//! verifying read, and repeated at most `max_attempts` times.

use std::time::Duration;

/// Something that can wait. Production code sleeps the thread; tests record.
pub trait Pause {
    fn pause(&self, duration: Duration);
}

/// Blocks the current thread for the requested duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// How often to repeat a mutation and how long to wait before checking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never less than one.
    pub max_attempts: u32,
    /// Fixed delay between a mutation and its verifying read.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(15),
        }
    }
}

/// Outcome of [`RetryPolicy::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempted<T> {
    /// The check passed after `attempts` mutations.
    Observed { value: T, attempts: u32 },
    /// Every attempt ran and the check never passed; `last` is the final read.
    Exhausted { last: T, attempts: u32 },
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Repeat `mutate`, pause, `observe` until `accept` holds for the observation
    /// or the attempts run out. Errors from either closure abort immediately.
    pub fn run<T, E>(
        &self,
        pause: &dyn Pause,
        mut mutate: impl FnMut(u32, Option<&T>) -> Result<(), E>,
        mut observe: impl FnMut() -> Result<T, E>,
        accept: impl Fn(&T) -> bool,
    ) -> Result<Attempted<T>, E> {
        let max_attempts = self.max_attempts.max(1);
        let mut last: Option<T> = None;
        let mut attempt = 1;

        loop {
            mutate(attempt, last.as_ref())?;
            pause.pause(self.delay);
            let observed = observe()?;
            if accept(&observed) {
                return Ok(Attempted::Observed {
                    value: observed,
                    attempts: attempt,
                });
            }
            if attempt >= max_attempts {
                return Ok(Attempted::Exhausted {
                    last: observed,
                    attempts: attempt,
                });
            }
            last = Some(observed);
            attempt += 1;
        }
    }
}
