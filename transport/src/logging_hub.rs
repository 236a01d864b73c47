use crate::error::TransportError;
use crate::hub_transport::HubTransport;
use crate::types::{DeviceInfo, PublicSessionInfo};
use common::board_event::DeviceEventBatch;
use common::messages::{ConnectionState, CreateSessionParams};
use tracing::info;

/// A [`HubTransport`] that logs every call and reports success, standing in
/// for the real wire protocol to a live-timing hub — an external
/// collaborator this workspace treats as opaque (connect/publish/subscribe/
/// join-leave/reconnect only). Lets `rapid_headless` exercise the full
/// connection-state and retry machinery end to end without a hub to talk to.
#[derive(Clone, Copy, Default)]
pub struct LoggingHub;

#[async_trait::async_trait]
impl HubTransport for LoggingHub {
    async fn connect(&self, hub_url: &str) -> Result<ConnectionState, TransportError> {
        info!(hub_url, "would connect to hub");
        Ok(ConnectionState::Connected)
    }

    async fn create_session(&self, req: CreateSessionParams) -> Result<PublicSessionInfo, TransportError> {
        info!(circuit_code = %req.circuit_code, "would create hub session");
        Ok(PublicSessionInfo {
            session_id: format!("{}-hub", req.circuit_code),
            circuit_code: req.circuit_code,
        })
    }

    async fn join_session(&self, id: &str, _password: Option<&str>) -> Result<PublicSessionInfo, TransportError> {
        info!(session_id = id, "would join hub session");
        Ok(PublicSessionInfo {
            session_id: id.to_string(),
            circuit_code: String::new(),
        })
    }

    async fn leave_session(&self, id: &str) -> Result<(), TransportError> {
        info!(session_id = id, "would leave hub session");
        Ok(())
    }

    async fn get_circuit_public_session(&self, code: &str) -> Result<PublicSessionInfo, TransportError> {
        info!(circuit_code = code, "would look up circuit's public session");
        Ok(PublicSessionInfo {
            session_id: format!("{code}-hub"),
            circuit_code: code.to_string(),
        })
    }

    async fn update_device_info(&self, info: DeviceInfo) -> Result<(), TransportError> {
        tracing::info!(device_id = %info.device_id, "would update device info on hub");
        Ok(())
    }

    async fn request_device_info(&self, _session_id: &str, device_id: &str) -> Result<DeviceInfo, TransportError> {
        Ok(DeviceInfo {
            device_id: device_id.to_string(),
            display_name: None,
            category: None,
        })
    }

    async fn add_event_data(&self, batch: DeviceEventBatch) -> Result<(), TransportError> {
        info!(session_id = %batch.session_id, device_id = %batch.device_id, events = batch.events.len(), "would forward event batch to hub");
        Ok(())
    }
}
