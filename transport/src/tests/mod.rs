// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::retry::{RetryMachine, RetryPolicy, RetryState};
use crate::test_helper::{FakeHub, InstantTicker};
use crate::ticker::Ticker;
use crate::{HubTransport, send_with_retry};
use common::messages::ConnectionState;
use std::time::Duration;

#[test]
fn starting_the_machine_enters_sending_with_attempt_one() {
    let mut machine = RetryMachine::new(RetryPolicy::send());
    assert_eq!(machine.start(), RetryState::Sending { attempt: 1 });
}

#[test]
fn success_returns_the_machine_to_idle() {
    let mut machine = RetryMachine::new(RetryPolicy::send());
    machine.start();
    assert_eq!(machine.on_success(), RetryState::Idle);
}

#[test]
fn a_failure_moves_to_backoff_with_a_bounded_duration() {
    let mut machine = RetryMachine::new(RetryPolicy::send());
    machine.start();
    let (state, backoff) = machine.on_failure();
    assert_eq!(state, RetryState::Backoff { attempt: 1 });
    let backoff = backoff.expect("send policy always backs off before giving up");
    assert!(backoff <= Duration::from_secs(5));
}

#[test]
fn retrying_after_backoff_advances_the_attempt_counter() {
    let mut machine = RetryMachine::new(RetryPolicy::send());
    machine.start();
    machine.on_failure();
    assert_eq!(machine.retry(), RetryState::Sending { attempt: 2 });
}

#[test]
fn reconnect_policy_gives_up_after_five_failed_attempts() {
    let mut machine = RetryMachine::new(RetryPolicy::reconnect());
    machine.start();
    for _ in 0..4 {
        let (state, backoff) = machine.on_failure();
        assert!(matches!(state, RetryState::Backoff { .. }));
        assert!(backoff.unwrap() <= Duration::from_secs(10));
        machine.retry();
    }
    let (state, backoff) = machine.on_failure();
    assert_eq!(state, RetryState::GivenUp);
    assert!(backoff.is_none());
}

#[test]
fn send_policy_never_gives_up() {
    let mut machine = RetryMachine::new(RetryPolicy::send());
    machine.start();
    for _ in 0..50 {
        let (state, backoff) = machine.on_failure();
        assert!(matches!(state, RetryState::Backoff { .. }));
        assert!(backoff.is_some());
        machine.retry();
    }
}

#[tokio::test]
async fn send_with_retry_succeeds_once_the_attempt_stops_failing() {
    let ticker = InstantTicker;
    let mut calls = 0u32;
    let ok = send_with_retry(&ticker, RetryPolicy::send(), || {
        calls += 1;
        let attempt = calls;
        async move {
            if attempt < 3 {
                Err(())
            } else {
                Ok(())
            }
        }
    })
    .await;
    assert!(ok);
    assert_eq!(calls, 3);
}

#[tokio::test]
async fn connect_against_a_hub_that_always_fails_gives_up_and_disconnects() {
    let hub = FakeHub::failing_connect(u64::MAX);
    let result = hub.connect("hub://test").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn connect_retries_through_transient_failures_until_success() {
    let hub = FakeHub::failing_connect(2);
    let ticker = InstantTicker;
    let mut machine = RetryMachine::new(RetryPolicy::reconnect());
    machine.start();
    loop {
        match hub.connect("hub://test").await {
            Ok(state) => {
                assert_eq!(state, ConnectionState::Connected);
                break;
            }
            Err(_) => match machine.on_failure() {
                (RetryState::GivenUp, _) => panic!("should not give up before the hub starts succeeding"),
                (_, Some(backoff)) => {
                    ticker.sleep(backoff).await;
                    machine.retry();
                }
                (_, None) => panic!("unexpected terminal state without giving up"),
            },
        }
    }
    assert_eq!(hub.connect_call_count(), 3);
}
