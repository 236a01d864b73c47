// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::error::TransportError;
use crate::types::{DeviceInfo, PublicSessionInfo};
use common::board_event::DeviceEventBatch;
use common::messages::{ConnectionState, CreateSessionParams};

/// Remote RPCs exposed by a live-timing hub.
///
/// Implementors perform the actual network call (or, in tests, a
/// predetermined in-process response); [`crate::client::HubTransportClient`]
/// wraps any implementor with connection-state tracking, outgoing queueing,
/// and the retry machinery around `add_event_data`.
#[async_trait::async_trait]
pub trait HubTransport: Send + Sync {
    async fn connect(&self, hub_url: &str) -> Result<ConnectionState, TransportError>;
    async fn create_session(&self, req: CreateSessionParams) -> Result<PublicSessionInfo, TransportError>;
    async fn join_session(&self, id: &str, password: Option<&str>) -> Result<PublicSessionInfo, TransportError>;
    async fn leave_session(&self, id: &str) -> Result<(), TransportError>;
    async fn get_circuit_public_session(&self, code: &str) -> Result<PublicSessionInfo, TransportError>;
    async fn update_device_info(&self, info: DeviceInfo) -> Result<(), TransportError>;
    async fn request_device_info(&self, session_id: &str, device_id: &str) -> Result<DeviceInfo, TransportError>;
    async fn add_event_data(&self, batch: DeviceEventBatch) -> Result<(), TransportError>;
}
