//! Small payload and error types shared across module boundaries.
//!
//! These are the structs and enums that travel as event-bus request and
//! response payloads between crates that otherwise have no reason to depend
//! on each other.

use serde::{Deserialize, Serialize};

/// Parameters needed to open a new [`crate::device_session::DeviceSession`].
#[derive(Clone, Debug, PartialEq)]
pub struct CreateSessionParams {
    pub circuit_code: String,
    pub device_id: String,
    pub user_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaptimerError {
    UnknownCircuit,
    NoActiveSession,
    AlreadyDetecting,
    NotDetecting,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerError {
    NotFound,
    Io(String),
    Malformed(String),
}

/// State of the outgoing link to a live-timing hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}
