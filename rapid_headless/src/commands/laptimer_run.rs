// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::circuits::{self, CircuitCatalogueLoader};
use crate::gps;
use active_session::ActiveSession;
use circuit_registry::CircuitRegistryActor;
use clap::Args;
use common::board_event::DeviceEventBatch;
use container::FsSessionContainer;
use gnss::constant_source::ConstantGnssModule;
use laptimer::{LapTimerActor, LaptimerConfig};
use module_core::{EventBus, EventKind, Module};
use std::sync::Arc;
use tracing::{error, info};
use transport::{HubTransportClient, LoggingHub};

/// Constant simulated speed used when no real GPS source is wired in.
const SIMULATED_VELOCITY_MPS: f64 = 10.0;

#[derive(Args, Debug)]
pub struct LaptimerRunArgs {
    /// CSV of `longitude,latitude[,altitude]` waypoints to loop at a
    /// constant speed. Without this the built-in demo track is used.
    #[arg(long)]
    pub input: Option<String>,
    /// Live-timing session id to bridge events into when `--hub` is set.
    #[arg(long)]
    pub session_id: Option<String>,
    /// Device identifier stamped on every emitted event. Auto-generated
    /// when omitted.
    #[arg(long)]
    pub device_id: Option<String>,
    /// Start a session automatically on the first fix once a circuit is
    /// detected, instead of waiting on an explicit start.
    #[arg(long)]
    pub create: bool,
    /// Bridge every emitted session event to this live-timing hub.
    #[arg(long)]
    pub hub: Option<String>,
}

pub async fn run(args: LaptimerRunArgs) -> Result<(), ()> {
    let storage_dir = crate::commands::storage_dir()?;
    let eb = EventBus::new();
    let mut handles = Vec::new();

    let circuits_path = storage_dir.join("circuits.json");
    let catalogue = circuits::load_circuits(&circuits_path);
    let mut loader = CircuitCatalogueLoader::new(eb.context(), catalogue);
    handles.push(tokio::spawn(async move { loader.run().await }));

    let mut registry = CircuitRegistryActor::new(eb.context());
    handles.push(tokio::spawn(async move { registry.run().await }));

    let mut container = FsSessionContainer::new(storage_dir.join("sessions"), eb.context());
    handles.push(tokio::spawn(async move { container.run().await }));

    let waypoints = match &args.input {
        Some(path) => gps::read_waypoints_from_csv(path).map_err(|e| {
            error!("Failed to read waypoints from {path}. Error: {e}");
        })?,
        None => gps::demo_waypoints(),
    };
    let mut gnss_source = ConstantGnssModule::new(eb.context(), waypoints, SIMULATED_VELOCITY_MPS).map_err(|e| {
        error!("Failed to start the GNSS simulator. Error: {e}");
    })?;
    handles.push(tokio::spawn(async move { gnss_source.run().await }));

    let config = LaptimerConfig {
        auto_start_detection: args.create,
        device_id: args.device_id.clone().unwrap_or_default(),
        ..LaptimerConfig::default()
    };
    let mut lap_timer = LapTimerActor::new(eb.context(), config);
    handles.push(tokio::spawn(async move { lap_timer.run().await }));

    let mut active_session = ActiveSession::new(eb.context());
    handles.push(tokio::spawn(async move { active_session.run().await }));

    if let Some(hub_url) = args.hub.clone() {
        let hub_session_id = args.session_id.clone().unwrap_or_else(|| "local".to_string());
        let client = HubTransportClient::new(eb.context(), Arc::new(LoggingHub));
        let state = client.connect(&hub_url).await;
        info!(?state, hub_url, "connected to live-timing hub");
        let outgoing = client.outgoing_handle();
        let mut client = client;
        handles.push(tokio::spawn(async move { client.run().await }));

        let mut bridge_rx = eb.subscribe();
        handles.push(tokio::spawn(async move {
            loop {
                match bridge_rx.recv().await {
                    Ok(event) => match event.kind {
                        EventKind::QuitEvent => return Ok(()),
                        EventKind::SessionEventEmittedEvent(session_event) => {
                            let batch = DeviceEventBatch::single(
                                hub_session_id.clone(),
                                session_event.device_id.clone(),
                                &session_event,
                            );
                            outgoing.enqueue(batch);
                        }
                        _ => {}
                    },
                    Err(e) => {
                        error!("Failed to receive event while bridging to hub. Error: {e}");
                        return Err(());
                    }
                }
            }
        }));
    }

    crate::commands::install_quit_handler(eb.context());

    info!("laptimer running, press Ctrl-C to stop");
    for handle in handles {
        if let Err(e) = handle.await {
            error!("A module task panicked: {e}");
        }
    }
    Ok(())
}
