//! Fixed-interval, bounded polling.
//!
//! Both the search readiness check and the bulk update task check work the
//! same way: ask for a status, stop if it's terminal, otherwise sleep a fixed
//! amount and ask again, up to a maximum number of attempts. There's no
//! backoff.

use std::{future::Future, time::Duration};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollSchedule {
    /// How long to sleep after every non-terminal attempt.
    pub interval: Duration,
    /// The number of status requests to make before giving up.
    pub max_attempts: u32,
}

#[derive(Debug, Eq, PartialEq)]
pub enum PollOutcome<T> {
    /// The probe returned a terminal value on the given (1-based) attempt.
    Done { value: T, attempts: u32 },
    TimedOut,
}

/// Call `probe` until it returns `Some`, sleeping `schedule.interval` after
/// each `None`.
///
/// The sleep also happens after the last attempt, so a timeout always takes
/// `max_attempts * interval`.
pub async fn poll_until<T, F, Fut>(schedule: PollSchedule, mut probe: F) -> PollOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=schedule.max_attempts {
        if let Some(value) = probe(attempt).await {
            return PollOutcome::Done {
                value,
                attempts: attempt,
            };
        }
        tokio::time::sleep(schedule.interval).await;
    }

    PollOutcome::TimedOut
}
