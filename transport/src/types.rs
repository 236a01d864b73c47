// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

/// A device's display identity as known to a live-timing hub.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: String,
    pub display_name: Option<String>,
    pub category: Option<String>,
}

/// Summary of a session published on a hub, as returned by
/// `create_session`/`join_session`/`get_circuit_public_session`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicSessionInfo {
    pub session_id: String,
    pub circuit_code: String,
}
