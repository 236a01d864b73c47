// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

/// Errors a [`crate::HubTransport`] operation can fail with.
///
/// Maps onto the `invalid-state` / `protocol-failure` / `transport-timeout`
/// / `transport-transient` error kinds: no concrete wire protocol is
/// implemented here, so these are the shapes an adapter surfaces rather
/// than exhaustive machine-readable codes for a real hub.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// An RPC was attempted while not connected.
    NotConnected,
    /// The hub returned a failure flag for the operation.
    ProtocolFailure(String),
    /// A send attempt exceeded its per-attempt budget.
    Timeout,
    /// The connection dropped or a reconnect is already in progress.
    Transient,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::NotConnected => write!(f, "not connected to a hub"),
            TransportError::ProtocolFailure(msg) => write!(f, "hub reported a failure: {msg}"),
            TransportError::Timeout => write!(f, "transport operation timed out"),
            TransportError::Transient => write!(f, "connection dropped or reconnecting"),
        }
    }
}

impl std::error::Error for TransportError {}
