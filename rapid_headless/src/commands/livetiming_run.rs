// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::circuits::{self, CircuitCatalogueLoader};
use crate::gps;
use circuit_registry::CircuitRegistryActor;
use clap::Args;
use gnss::constant_source::ConstantGnssModule;
use laptimer::{LapTimerActor, LaptimerConfig};
use live_board::{LiveBoardActor, RankingKind};
use module_core::{EventBus, EventKind, Module};
use std::sync::Arc;
use tracing::{error, info};
use transport::{HubTransportClient, LoggingHub};

const SIMULATED_VELOCITY_MPS: f64 = 10.0;

#[derive(Args, Debug)]
pub struct LivetimingRunArgs {
    /// Hub to connect to. Required unless `--test` is given: rendering a
    /// board from a real hub's inbound feed is out of scope here (the hub
    /// wire protocol is an opaque external collaborator), so this only
    /// exercises the connect/reconnect machinery.
    #[arg(long)]
    pub hub: Option<String>,
    #[arg(long)]
    pub session_id: Option<String>,
    /// Drive the board from a local canned replay instead of a hub feed.
    #[arg(long)]
    pub test: bool,
}

pub async fn run(args: LivetimingRunArgs) -> Result<(), ()> {
    let eb = EventBus::new();
    let session_id = args.session_id.clone().unwrap_or_else(|| "local".to_string());
    let mut handles = Vec::new();

    let mut board_actor = LiveBoardActor::new(eb.context(), session_id);
    let board = board_actor.board();
    handles.push(tokio::spawn(async move { board_actor.run().await }));

    if args.test {
        let storage_dir = crate::commands::storage_dir()?;
        let catalogue = circuits::load_circuits(&storage_dir.join("circuits.json"));
        let mut loader = CircuitCatalogueLoader::new(eb.context(), catalogue);
        handles.push(tokio::spawn(async move { loader.run().await }));

        let mut registry = CircuitRegistryActor::new(eb.context());
        handles.push(tokio::spawn(async move { registry.run().await }));

        let mut gnss_source = ConstantGnssModule::new(eb.context(), gps::demo_waypoints(), SIMULATED_VELOCITY_MPS)
            .map_err(|e| error!("Failed to start the canned replay. Error: {e}"))?;
        handles.push(tokio::spawn(async move { gnss_source.run().await }));

        let config = LaptimerConfig {
            auto_start_detection: true,
            ..LaptimerConfig::default()
        };
        let mut lap_timer = LapTimerActor::new(eb.context(), config);
        handles.push(tokio::spawn(async move { lap_timer.run().await }));
    } else {
        let Some(hub_url) = args.hub.clone() else {
            error!("livetiming run requires --hub unless --test is given");
            return Err(());
        };
        let client = HubTransportClient::new(eb.context(), Arc::new(LoggingHub));
        let state = client.connect(&hub_url).await;
        info!(?state, hub_url, "connected to live-timing hub");
        let mut client = client;
        handles.push(tokio::spawn(async move { client.run().await }));
    }

    let mut status_rx = eb.subscribe();
    handles.push(tokio::spawn(async move {
        loop {
            match status_rx.recv().await {
                Ok(event) => match event.kind {
                    EventKind::QuitEvent => return Ok(()),
                    EventKind::BoardUpdatedEvent(_) => {
                        let ranking = board.get_ranking(RankingKind::BestLap, None);
                        for row in &ranking.rows {
                            info!(
                                rank = row.rank,
                                device = %row.device_short_id,
                                laps = %row.laps,
                                "board updated"
                            );
                        }
                    }
                    _ => {}
                },
                Err(e) => {
                    error!("Failed to receive event while watching the board. Error: {e}");
                    return Err(());
                }
            }
        }
    }));

    crate::commands::install_quit_handler(eb.context());

    info!("live-timing board running, press Ctrl-C to stop");
    for handle in handles {
        if let Err(e) = handle.await {
            error!("A module task panicked: {e}");
        }
    }
    Ok(())
}
