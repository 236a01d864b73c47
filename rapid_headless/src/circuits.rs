// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Loads the circuit catalogue this process knows about and answers
//! [`circuit_registry`]'s startup request for it.
//!
//! The registry itself has no I/O of its own (see
//! [`circuit_registry::CircuitRegistry`]'s doc comment); something has to
//! load a `Vec<Circuit>` and hand it over. Here that's a JSON file under
//! the local data directory, falling back to a small built-in demo circuit
//! so a first run has something to detect against.

use async_trait::async_trait;
use common::circuit::{Circuit, CircuitSegment, CircuitType};
use geo::{GeoPoint, Segment};
use module_core::{EventKind, Module, ModuleCtx};
use std::path::Path;
use tracing::{info, warn};

/// A closed rectangular loop around Spa's old Eau Rouge / Raidillon bend,
/// wide enough that the constant-velocity simulator's demo track (see
/// [`crate::gps::demo_waypoints`]) sits comfortably inside it.
fn demo_circuit() -> Circuit {
    let corner = |lat: f64, lon: f64| GeoPoint::new(lat, lon, 0.0);
    let finish = Segment::new(corner(50.4372, 5.9714), corner(50.4372, 5.9716));
    let apex = Segment::new(corner(50.4380, 5.9720), corner(50.4380, 5.9722));
    Circuit {
        code: "DEMO".to_string(),
        name: "Demo Loop".to_string(),
        circuit_type: CircuitType::Closed,
        use_direction: true,
        bounding_box: Segment::new(corner(50.4360, 5.9700), corner(50.4390, 5.9730)),
        segments: vec![
            CircuitSegment { number: 1, boundary: finish },
            CircuitSegment { number: 2, boundary: apex },
        ],
        sector_timeout_seconds: 0,
    }
}

/// Reads a JSON array of [`Circuit`]s from `path`. Falls back to
/// [`demo_circuit`] when the file is missing or malformed, so `laptimer
/// run`/`livetiming run --test` work without any setup.
pub fn load_circuits(path: &Path) -> Vec<Circuit> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<Vec<Circuit>>(&contents) {
            Ok(circuits) => {
                info!(count = circuits.len(), path = %path.display(), "loaded circuit catalogue");
                circuits
            }
            Err(e) => {
                warn!(path = %path.display(), "malformed circuit catalogue ({e}), using the built-in demo circuit");
                vec![demo_circuit()]
            }
        },
        Err(_) => {
            info!(path = %path.display(), "no circuit catalogue found, using the built-in demo circuit");
            vec![demo_circuit()]
        }
    }
}

/// Answers [`EventKind::LoadAllCircuitsRequestEvent`] once with a
/// pre-loaded catalogue, then idles until asked to quit.
///
/// `circuit_registry::CircuitRegistryActor` always starts empty and
/// requests its catalogue on startup; this is the process-specific loader
/// that supplies it.
pub struct CircuitCatalogueLoader {
    ctx: ModuleCtx,
    circuits: Vec<Circuit>,
}

impl CircuitCatalogueLoader {
    pub fn new(ctx: ModuleCtx, circuits: Vec<Circuit>) -> Self {
        CircuitCatalogueLoader { ctx, circuits }
    }
}

#[async_trait]
impl Module for CircuitCatalogueLoader {
    async fn run(&mut self) -> Result<(), ()> {
        let mut running = true;
        while running {
            match self.ctx.receiver.recv().await {
                Ok(event) => match event.kind {
                    EventKind::QuitEvent => running = false,
                    EventKind::LoadAllCircuitsRequestEvent(request) => {
                        let response = module_core::Response::new(request.id, request.sender_addr, self.circuits.clone());
                        let _ = self.ctx.publish_event(EventKind::LoadAllCircuitsResponseEvent(response));
                    }
                    _ => {}
                },
                Err(e) => tracing::error!("Failed to receive event in module CircuitCatalogueLoader. Error: {e}"),
            }
        }
        Ok(())
    }
}
