use crate::ticker::Ticker;
use std::time::Duration;

/// A [`Ticker`] that never actually sleeps, only yields once. Lets retry
/// tests exercise many backoff cycles without slowing the test suite down.
#[derive(Clone, Copy, Default)]
pub struct InstantTicker;

#[async_trait::async_trait]
impl Ticker for InstantTicker {
    async fn sleep(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}
