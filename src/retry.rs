//! Bounded retry with a validation gate.
//!
//! Model edits are probabilistic: an instruction is not always followed
//! exactly, so a handful of independent attempts trades latency for
//! reliability without unbounded cost. Policy lives here; call sites only
//! supply the attempt action and the acceptance predicate.

use std::thread;
use std::time::Duration;

/// Outcome of a bounded retry loop.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// An attempt produced a value that passed the acceptance predicate.
    Success(T),
    /// Every attempt either produced nothing or failed the predicate.
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Run `action` up to `max_attempts` times until `accept` passes.
///
/// `action` receives the 1-based attempt number and returns:
/// - `Ok(Some(value))` — a candidate, checked against `accept`;
/// - `Ok(None)` — no candidate this attempt (consumes the attempt);
/// - `Err(e)` — a hard failure, aborts the loop immediately.
///
/// Attempts are independent; no state is carried between them besides the
/// counter. Sleeps `backoff` between attempts, never after the last.
///
/// # Errors
///
/// Propagates the first `Err` returned by `action`.
pub fn run<T, E, A, P>(
    max_attempts: u32,
    backoff: Duration,
    mut action: A,
    mut accept: P,
) -> Result<RetryOutcome<T>, E>
where
    A: FnMut(u32) -> Result<Option<T>, E>,
    P: FnMut(&T) -> bool,
{
    for attempt in 1..=max_attempts {
        if let Some(value) = action(attempt)? {
            if accept(&value) {
                return Ok(RetryOutcome::Success(value));
            }
        }
        if attempt < max_attempts {
            thread::sleep(backoff);
        }
    }
    Ok(RetryOutcome::Exhausted {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    type NoError = std::convert::Infallible;

    #[test]
    fn stops_on_first_accepted_value() {
        let mut calls = 0u32;
        let outcome: Result<_, NoError> = run(
            5,
            Duration::ZERO,
            |attempt| {
                calls += 1;
                Ok(Some(attempt))
            },
            |_| true,
        );
        assert!(matches!(outcome, Ok(RetryOutcome::Success(1))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn retries_until_predicate_passes() {
        let outcome: Result<_, NoError> = run(
            5,
            Duration::ZERO,
            |attempt| Ok(Some(attempt)),
            |&attempt| attempt == 3,
        );
        assert!(matches!(outcome, Ok(RetryOutcome::Success(3))));
    }

    #[test]
    fn empty_attempts_consume_the_budget() {
        let mut calls = 0u32;
        let outcome: Result<RetryOutcome<u32>, NoError> = run(
            4,
            Duration::ZERO,
            |_| {
                calls += 1;
                Ok(None)
            },
            |_| true,
        );
        assert!(matches!(outcome, Ok(RetryOutcome::Exhausted { attempts: 4 })));
        assert_eq!(calls, 4);
    }

    #[test]
    fn never_exceeds_max_attempts() {
        let mut calls = 0u32;
        let outcome: Result<RetryOutcome<u32>, NoError> = run(
            3,
            Duration::ZERO,
            |attempt| {
                calls += 1;
                Ok(Some(attempt))
            },
            |_| false,
        );
        assert!(matches!(outcome, Ok(RetryOutcome::Exhausted { attempts: 3 })));
        assert_eq!(calls, 3);
    }

    #[test]
    fn hard_error_aborts_immediately() {
        let mut calls = 0u32;
        let outcome: Result<RetryOutcome<u32>, &str> = run(
            5,
            Duration::ZERO,
            |_| {
                calls += 1;
                Err("boom")
            },
            |_| true,
        );
        assert_eq!(outcome.unwrap_err(), "boom");
        assert_eq!(calls, 1);
    }

    #[test]
    fn zero_attempts_is_immediately_exhausted() {
        let outcome: Result<RetryOutcome<u32>, NoError> =
            run(0, Duration::ZERO, |_| Ok(Some(1)), |_| true);
        assert!(matches!(outcome, Ok(RetryOutcome::Exhausted { attempts: 0 })));
    }
}
