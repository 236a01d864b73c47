// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{BatchResult, RankingKind, RankingSnapshot, SessionBoard};
use common::board_event::DeviceEventBatch;
use common::session_event::SessionEvent;
use module_core::{EventKind, Module, ModuleCtx};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{error, info};

/// Thread-safe wrapper around a [`SessionBoard`]: every mutating call takes
/// a single blocking lock, does its work without suspending, and then
/// broadcasts the change on a [`watch`] channel.
pub struct LiveBoard {
    board: std::sync::Mutex<SessionBoard>,
    updated_tx: watch::Sender<Instant>,
}

impl LiveBoard {
    pub fn new(session_id: String) -> Self {
        let (updated_tx, _) = watch::channel(Instant::now());
        LiveBoard {
            board: std::sync::Mutex::new(SessionBoard::new(session_id)),
            updated_tx,
        }
    }

    pub fn subscribe_updates(&self) -> watch::Receiver<Instant> {
        self.updated_tx.subscribe()
    }

    pub fn add_device_events(&self, batch: &DeviceEventBatch, skip_state_calc: bool) -> BatchResult {
        let result = {
            let mut board = self.board.lock().unwrap_or_else(|poison| poison.into_inner());
            board.add_device_events(batch, skip_state_calc)
        };
        let _ = self.updated_tx.send(Instant::now());
        result
    }

    pub fn mark_device_deleted(&self, device_id: &str) {
        {
            let mut board = self.board.lock().unwrap_or_else(|poison| poison.into_inner());
            board.mark_device_deleted(device_id);
        }
        let _ = self.updated_tx.send(Instant::now());
    }

    pub fn get_ranking(&self, kind: RankingKind, previous: Option<&RankingSnapshot>) -> RankingSnapshot {
        let board = self.board.lock().unwrap_or_else(|poison| poison.into_inner());
        board.get_ranking(kind, previous)
    }

    /// Runs `f` against the current board state under the lock. Keep `f`
    /// short: the lock is held for its entire duration.
    pub fn with_board<R>(&self, f: impl FnOnce(&SessionBoard) -> R) -> R {
        let board = self.board.lock().unwrap_or_else(|poison| poison.into_inner());
        f(&board)
    }
}

/// Feeds a [`LiveBoard`] from the event bus and republishes its change
/// notification as a [`EventKind::BoardUpdatedEvent`].
pub struct LiveBoardActor {
    ctx: ModuleCtx,
    board: Arc<LiveBoard>,
    updates: watch::Receiver<Instant>,
}

impl LiveBoardActor {
    pub fn new(ctx: ModuleCtx, session_id: String) -> Self {
        let board = Arc::new(LiveBoard::new(session_id));
        let updates = board.subscribe_updates();
        LiveBoardActor { ctx, board, updates }
    }

    pub fn board(&self) -> Arc<LiveBoard> {
        self.board.clone()
    }

    fn on_session_event(&self, event: &SessionEvent) {
        let batch = DeviceEventBatch::single(event.session_id.clone(), event.device_id.clone(), event);
        self.board.add_device_events(&batch, false);
    }
}

#[async_trait::async_trait]
impl Module for LiveBoardActor {
    async fn run(&mut self) -> Result<(), ()> {
        let mut running = true;
        while running {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => match event.kind {
                            EventKind::QuitEvent => running = false,
                            EventKind::SessionEventEmittedEvent(session_event) => {
                                self.on_session_event(&session_event);
                            }
                            EventKind::BoardEventBatchEvent(batch) => {
                                self.board.add_device_events(&batch, false);
                            }
                            _ => {}
                        },
                        Err(e) => error!("Failed to receive event in module LiveBoard. Error: {e}"),
                    }
                }
                changed = self.updates.changed() => {
                    if changed.is_err() {
                        continue;
                    }
                    let at = *self.updates.borrow_and_update();
                    if let Err(e) = self.ctx.publish_event(EventKind::BoardUpdatedEvent(Arc::new(at))) {
                        info!("No subscribers for board update: {e:?}");
                    }
                }
            }
        }
        Ok(())
    }
}
