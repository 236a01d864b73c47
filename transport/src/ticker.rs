// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::time::Duration;

/// An injectable clock the retry machinery sleeps against between attempts.
///
/// Exists so [`crate::retry::send_with_retry`] is testable without real
/// delays: production code uses [`TokioTicker`], tests use
/// [`crate::test_helper::InstantTicker`].
#[async_trait::async_trait]
pub trait Ticker: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// A [`Ticker`] backed by the Tokio runtime's timer wheel.
#[derive(Clone, Copy, Default)]
pub struct TokioTicker;

#[async_trait::async_trait]
impl Ticker for TokioTicker {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
