// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Live-timing hub transport: a retrying, queueing client that sits between
//! the rest of the modules and the network.

pub mod client;
pub mod error;
pub mod hub_transport;
pub mod logging_hub;
pub mod retry;
pub mod test_helper;
pub mod ticker;
pub mod types;

pub use client::{HubTransportClient, OutgoingHandle};
pub use error::TransportError;
pub use hub_transport::HubTransport;
pub use logging_hub::LoggingHub;
pub use retry::{RetryMachine, RetryPolicy, RetryState, send_with_retry};
pub use ticker::{Ticker, TokioTicker};
pub use types::{DeviceInfo, PublicSessionInfo};

#[cfg(test)]
mod tests;
