// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{circuit::Circuit, fix::Fix};
use module_core::{
    DetectCircuitRequestPtr, Event, EventKind, GetCircuitByCodeRequestPtr, Module, ModuleCtx,
    Request, Response, SyncCircuitsRequestPtr,
};
use std::{collections::VecDeque, result::Result};
use tracing::{error, info};

/// The set of circuits known to this process, keyed for case-insensitive
/// lookup and bounding-box detection.
///
/// Holds no I/O of its own; whoever loads the circuit catalogue (the
/// `container` crate, a config file, …) hands it a `Vec<Circuit>`.
#[derive(Debug, Default)]
pub struct CircuitRegistry {
    circuits: Vec<Circuit>,
    updated: Option<DateTime<Utc>>,
}

impl CircuitRegistry {
    pub fn new() -> Self {
        CircuitRegistry::default()
    }

    pub fn with_circuits(circuits: Vec<Circuit>) -> Self {
        CircuitRegistry {
            circuits,
            updated: Some(Utc::now()),
        }
    }

    pub fn circuits(&self) -> &[Circuit] {
        &self.circuits
    }

    /// Case-insensitive lookup by circuit code. Blank codes never match.
    /// When the catalogue has more than one circuit sharing a code, the
    /// last insertion wins.
    pub fn get_by_code(&self, code: &str) -> Option<&Circuit> {
        if code.trim().is_empty() {
            return None;
        }
        self.circuits
            .iter()
            .rev()
            .find(|c| c.code.eq_ignore_ascii_case(code))
    }

    /// The first circuit, in registry insertion order, whose bounding box
    /// contains `fix`'s point.
    pub fn detect(&self, fix: &Fix) -> Option<&Circuit> {
        self.circuits
            .iter()
            .find(|c| c.bounding_box.contains_box(&fix.point))
    }

    /// Refreshes the registry's catalogue around `(lat, lon)` within
    /// `radius_meters`. There is no remote catalogue to fetch from
    /// (non-goal), so this is a no-op that stamps `updated` and always
    /// reports full progress.
    pub fn sync(&mut self, _lat: f64, _lon: f64, _radius_meters: f64) -> f32 {
        self.updated = Some(Utc::now());
        1.0
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }
}

/// Actor wrapper around [`CircuitRegistry`]: answers circuit-detection and
/// lookup-by-code requests over the [`module_core::EventBus`] once the
/// catalogue has been loaded.
pub struct CircuitRegistryActor {
    ctx: ModuleCtx,
    registry: CircuitRegistry,
    pending_detect: VecDeque<DetectCircuitRequestPtr>,
    pending_lookup: VecDeque<GetCircuitByCodeRequestPtr>,
}

impl CircuitRegistryActor {
    pub fn new(ctx: ModuleCtx) -> Self {
        CircuitRegistryActor {
            ctx,
            registry: CircuitRegistry::new(),
            pending_detect: VecDeque::new(),
            pending_lookup: VecDeque::new(),
        }
    }

    fn handle_pending_requests(&mut self) {
        if self.registry.circuits().is_empty() {
            return;
        }
        while let Some(request) = self.pending_detect.pop_front() {
            let detected = self.registry.detect(&request.data).cloned();
            let response = EventKind::DetectCircuitResponseEvent(Response::new(
                request.id,
                request.sender_addr,
                detected,
            ));
            let _ = self.ctx.sender.send(Event { kind: response });
            info!(
                "Sent circuit detection response for request id {}, receiver id {}",
                request.id, request.sender_addr
            );
        }
        while let Some(request) = self.pending_lookup.pop_front() {
            let found = self.registry.get_by_code(&request.data).cloned();
            let response = EventKind::GetCircuitByCodeResponseEvent(Response::new(
                request.id,
                request.sender_addr,
                found,
            ));
            let _ = self.ctx.sender.send(Event { kind: response });
        }
    }

    fn handle_sync_request(&mut self, request: SyncCircuitsRequestPtr) {
        let (lat, lon, radius) = request.data;
        let progress = self.registry.sync(lat, lon, radius);
        let response = EventKind::SyncCircuitsResponseEvent(Response::new(
            request.id,
            request.sender_addr,
            progress,
        ));
        let _ = self.ctx.sender.send(Event { kind: response });
    }
}

#[async_trait]
impl Module for CircuitRegistryActor {
    /// Runs the circuit registry's event loop: requests the full catalogue
    /// on startup, then answers detection and lookup requests as they
    /// arrive. Terminates on `QuitEvent`.
    async fn run(&mut self) -> Result<(), ()> {
        let _ = self.ctx.sender.send(Event {
            kind: EventKind::LoadAllCircuitsRequestEvent(Request::empty_request(0, 30)),
        });
        let mut run = true;
        while run {
            match self.ctx.receiver.recv().await {
                Ok(event) => match event.kind {
                    EventKind::QuitEvent => run = false,
                    EventKind::LoadAllCircuitsResponseEvent(circuits) => {
                        self.registry = CircuitRegistry::with_circuits(circuits.data.clone());
                        self.handle_pending_requests();
                    }
                    EventKind::DetectCircuitRequestEvent(request) => {
                        info!(
                            "Received circuit detection request. id: {}, sender id: {}",
                            request.id, request.sender_addr
                        );
                        self.pending_detect.push_back(request);
                        self.handle_pending_requests();
                    }
                    EventKind::GetCircuitByCodeRequestEvent(request) => {
                        self.pending_lookup.push_back(request);
                        self.handle_pending_requests();
                    }
                    EventKind::SyncCircuitsRequestEvent(request) => {
                        self.handle_sync_request(request);
                    }
                    _ => (),
                },
                Err(e) => error!("Failed to receive event. Error {}", e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
