// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! The `Idle -> Sending -> Backoff -> Sending ...` retry state machine.
//!
//! [`RetryMachine`] is a plain, clockless state container: its transitions
//! are exercised directly in unit tests. [`send_with_retry`] is the async
//! driver that pairs it with a [`Ticker`](crate::ticker::Ticker) and an
//! attempt closure.

use crate::ticker::Ticker;
use rand::{Rng, rng};
use std::future::Future;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Sending { attempt: u32 },
    Backoff { attempt: u32 },
    GivenUp,
}

/// Backoff shape for one kind of retried operation.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    /// `None` retries forever (the outgoing send worker); `Some(n)` gives up
    /// after `n` failed attempts (reconnect).
    pub max_attempts: Option<u32>,
    pub randomized: bool,
}

impl RetryPolicy {
    /// `connect`'s reconnect policy: randomized backoff capped at ~10s,
    /// giving up after 5 attempts.
    pub fn reconnect() -> Self {
        RetryPolicy {
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            max_attempts: Some(5),
            randomized: true,
        }
    }

    /// The outgoing queue worker's policy: fixed 1s backoff capped at 5s,
    /// retrying indefinitely until success or shutdown.
    pub fn send() -> Self {
        RetryPolicy {
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            max_attempts: None,
            randomized: false,
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let scaled = self.base_backoff.saturating_mul(attempt.max(1));
        let capped = scaled.min(self.max_backoff);
        if self.randomized {
            let upper_ms = capped.as_millis().max(1) as u64;
            let jitter_ms = rng().random_range(1..=upper_ms);
            Duration::from_millis(jitter_ms)
        } else {
            capped
        }
    }
}

/// Drives the `Idle -> Sending -> Backoff -> ...` transitions for one kind
/// of retried operation. Holds no I/O of its own; [`send_with_retry`] pairs
/// it with the actual attempt.
pub struct RetryMachine {
    policy: RetryPolicy,
    state: RetryState,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        RetryMachine {
            policy,
            state: RetryState::Idle,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    /// `Idle -> Sending { attempt: 1 }`.
    pub fn start(&mut self) -> RetryState {
        self.state = RetryState::Sending { attempt: 1 };
        self.state
    }

    /// `Sending -> Idle`.
    pub fn on_success(&mut self) -> RetryState {
        self.state = RetryState::Idle;
        self.state
    }

    /// `Sending -> Backoff` with the backoff duration to wait, or
    /// `Sending -> GivenUp` once the policy's attempt budget is spent.
    pub fn on_failure(&mut self) -> (RetryState, Option<Duration>) {
        let attempt = match self.state {
            RetryState::Sending { attempt } => attempt,
            _ => 1,
        };
        if let Some(max) = self.policy.max_attempts
            && attempt >= max
        {
            self.state = RetryState::GivenUp;
            return (self.state, None);
        }
        let backoff = self.policy.backoff_for(attempt);
        self.state = RetryState::Backoff { attempt };
        (self.state, Some(backoff))
    }

    /// `Backoff -> Sending { attempt: attempt + 1 }`.
    pub fn retry(&mut self) -> RetryState {
        let attempt = match self.state {
            RetryState::Backoff { attempt } => attempt + 1,
            _ => 1,
        };
        self.state = RetryState::Sending { attempt };
        self.state
    }
}

/// Runs `attempt` against `policy`, sleeping on `ticker` between failures,
/// until it succeeds or the policy gives up. Returns `true` on success.
pub async fn send_with_retry<F, Fut, E>(ticker: &dyn Ticker, policy: RetryPolicy, mut attempt: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let mut machine = RetryMachine::new(policy);
    machine.start();
    loop {
        match attempt().await {
            Ok(()) => {
                machine.on_success();
                return true;
            }
            Err(_) => match machine.on_failure() {
                (RetryState::GivenUp, _) => return false,
                (_, Some(backoff)) => {
                    ticker.sleep(backoff).await;
                    machine.retry();
                }
                (_, None) => return false,
            },
        }
    }
}
