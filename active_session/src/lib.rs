// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Keeps a standing copy of the device session the lap-timer is building up
//! and persists it through the container whenever a lap completes.
//!
//! The lap-timer owns the authoritative [`common::device_session::DeviceSession`]
//! internally and only ever puts its timing events on the bus; this module
//! rebuilds an equivalent copy from that stream so the rest of the system
//! (container, transport) has something concrete to act on without reaching
//! into the lap-timer actor directly.

use async_trait::async_trait;
use common::{
    device_session::DeviceSession,
    session_event::{SessionEvent, SessionEventType},
};
use module_core::{
    EventKind, GetCircuitByCodeResponsePtr, Module, ModuleCtx, Request, SaveSessionResponsePtr,
    SessionEventPtr,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const CIRCUIT_LOOKUP_ID: u64 = 20;
const CIRCUIT_LOOKUP_ADDR: u64 = 200;
const SAVE_SESSION_ID: u64 = 30;
const SAVE_SESSION_ADDR: u64 = 300;

pub struct ActiveSession {
    ctx: ModuleCtx,
    session: Option<DeviceSession>,
}

impl ActiveSession {
    pub fn new(ctx: ModuleCtx) -> Self {
        ActiveSession { ctx, session: None }
    }

    fn on_session_event(&mut self, event: SessionEventPtr) {
        if event.event_type == SessionEventType::Start {
            self.on_session_started(&event);
            return;
        }

        let Some(session) = self.session.as_mut() else {
            warn!(
                "Received session event for {} before a Start marker, dropping",
                event.session_id
            );
            return;
        };
        if session.id != event.session_id {
            debug!(
                "Ignoring event for session {}, active session is {}",
                event.session_id, session.id
            );
            return;
        }

        session.push_event((*event).clone());
        if event.event_type == SessionEventType::Lap {
            info!(
                "Lap {} finished on session {}, saving",
                event.lap_number, session.id
            );
            self.save_session();
        }
    }

    fn on_session_started(&mut self, event: &SessionEvent) {
        let session = DeviceSession::new(
            event.session_id.clone(),
            event.circuit_code.clone(),
            event.device_id.clone(),
            event.user_id.clone(),
            event.timestamp,
        );
        info!(
            "Active session {} started on circuit {}",
            session.id, session.circuit_code
        );
        let circuit_code = session.circuit_code.clone();
        self.session = Some(session);

        let request = Request::new(CIRCUIT_LOOKUP_ID, CIRCUIT_LOOKUP_ADDR, circuit_code);
        let _ = self
            .ctx
            .publish_event(EventKind::GetCircuitByCodeRequestEvent(request));
    }

    fn on_circuit_lookup_response(&self, response: GetCircuitByCodeResponsePtr) {
        if response.id != CIRCUIT_LOOKUP_ID || response.receiver_addr != CIRCUIT_LOOKUP_ADDR {
            return;
        }
        match &response.data {
            Some(circuit) => debug!("Active session circuit {} confirmed", circuit.code),
            None => error!("Active session started on a circuit the registry no longer knows"),
        }
    }

    fn on_save_response(&self, response: SaveSessionResponsePtr) {
        if response.id != SAVE_SESSION_ID || response.receiver_addr != SAVE_SESSION_ADDR {
            return;
        }
        match &response.data {
            Ok(id) => debug!("Saved session {}", id),
            Err(e) => error!("Failed to save active session: {:?}", e),
        }
    }

    fn save_session(&self) {
        let Some(session) = &self.session else {
            return;
        };
        let request = Request::new(
            SAVE_SESSION_ID,
            SAVE_SESSION_ADDR,
            Arc::new(session.clone()),
        );
        let _ = self
            .ctx
            .publish_event(EventKind::SaveSessionRequestEvent(request));
    }
}

#[async_trait]
impl Module for ActiveSession {
    async fn run(&mut self) -> std::result::Result<(), ()> {
        let mut run = true;
        while run {
            match self.ctx.receiver.recv().await {
                Ok(event) => match event.kind {
                    EventKind::QuitEvent => run = false,
                    EventKind::SessionEventEmittedEvent(event) => {
                        self.on_session_event(event);
                    }
                    EventKind::GetCircuitByCodeResponseEvent(response) => {
                        self.on_circuit_lookup_response(response);
                    }
                    EventKind::SaveSessionResponseEvent(response) => {
                        self.on_save_response(response);
                    }
                    _ => (),
                },
                Err(e) => {
                    error!("Failed to receive event in module ActiveSession. Error: {e}");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
