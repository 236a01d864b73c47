use crate::error::TransportError;
use crate::hub_transport::HubTransport;
use crate::types::{DeviceInfo, PublicSessionInfo};
use common::board_event::DeviceEventBatch;
use common::messages::{ConnectionState, CreateSessionParams};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// In-process [`HubTransport`] double. `fail_until_attempt` lets a test make
/// the first `n` calls to a given method fail with [`TransportError::Transient`]
/// before succeeding, so retry behaviour can be exercised without a real
/// network. Call counts are tracked per method for assertions.
pub struct FakeHub {
    fail_connect_until: u64,
    fail_send_until: u64,
    connect_calls: AtomicU64,
    send_calls: AtomicU64,
    sent_batches: Mutex<Vec<DeviceEventBatch>>,
}

impl FakeHub {
    /// Every call to `connect`/`add_event_data` succeeds immediately.
    pub fn always_succeeds() -> Self {
        FakeHub {
            fail_connect_until: 0,
            fail_send_until: 0,
            connect_calls: AtomicU64::new(0),
            send_calls: AtomicU64::new(0),
            sent_batches: Mutex::new(Vec::new()),
        }
    }

    /// `connect` fails the first `n` times it's called, then succeeds.
    pub fn failing_connect(n: u64) -> Self {
        FakeHub {
            fail_connect_until: n,
            ..Self::always_succeeds()
        }
    }

    /// `add_event_data` fails the first `n` times it's called, then succeeds.
    pub fn failing_send(n: u64) -> Self {
        FakeHub {
            fail_send_until: n,
            ..Self::always_succeeds()
        }
    }

    pub fn connect_call_count(&self) -> u64 {
        self.connect_calls.load(Ordering::Relaxed)
    }

    pub fn send_call_count(&self) -> u64 {
        self.send_calls.load(Ordering::Relaxed)
    }

    pub fn sent_batches(&self) -> Vec<DeviceEventBatch> {
        self.sent_batches.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait::async_trait]
impl HubTransport for FakeHub {
    async fn connect(&self, _hub_url: &str) -> Result<ConnectionState, TransportError> {
        let call = self.connect_calls.fetch_add(1, Ordering::Relaxed) + 1;
        if call <= self.fail_connect_until {
            Err(TransportError::Transient)
        } else {
            Ok(ConnectionState::Connected)
        }
    }

    async fn create_session(&self, req: CreateSessionParams) -> Result<PublicSessionInfo, TransportError> {
        Ok(PublicSessionInfo {
            session_id: "fake-session".to_string(),
            circuit_code: req.circuit_code,
        })
    }

    async fn join_session(&self, id: &str, _password: Option<&str>) -> Result<PublicSessionInfo, TransportError> {
        Ok(PublicSessionInfo {
            session_id: id.to_string(),
            circuit_code: "fake-circuit".to_string(),
        })
    }

    async fn leave_session(&self, _id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn get_circuit_public_session(&self, code: &str) -> Result<PublicSessionInfo, TransportError> {
        Ok(PublicSessionInfo {
            session_id: "fake-session".to_string(),
            circuit_code: code.to_string(),
        })
    }

    async fn update_device_info(&self, _info: DeviceInfo) -> Result<(), TransportError> {
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
        let call = self.send_calls.fetch_add(1, Ordering::Relaxed) + 1;
        if call <= self.fail_send_until {
            return Err(TransportError::Transient);
        }
        self.sent_batches.lock().unwrap_or_else(|e| e.into_inner()).push(batch);
        Ok(())
    }
}
