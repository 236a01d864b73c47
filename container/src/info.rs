// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! The `.info` sidecar: a small JSON summary kept next to every stored
//! session so listing doesn't require parsing the full LapViz payload.

use chrono::{DateTime, Utc};
use common::device_session::DeviceSession;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub circuit_code: String,
    pub device_id: String,
    pub created_at: DateTime<Utc>,
    pub event_count: usize,
}

impl SessionInfo {
    pub fn from_session(session: &DeviceSession) -> Self {
        SessionInfo {
            id: session.id.clone(),
            circuit_code: session.circuit_code.clone(),
            device_id: session.device_id.clone(),
            created_at: session.created_at,
            event_count: session.events.len(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
