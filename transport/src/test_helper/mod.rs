pub mod fake_hub;
pub mod instant_ticker;

pub use fake_hub::FakeHub;
pub use instant_ticker::InstantTicker;
