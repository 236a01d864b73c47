// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::error::TransportError;
use crate::hub_transport::HubTransport;
use crate::retry::{RetryMachine, RetryPolicy, RetryState, send_with_retry};
use crate::ticker::{Ticker, TokioTicker};
use common::board_event::DeviceEventBatch;
use common::messages::ConnectionState;
use module_core::{EventKind, Module, ModuleCtx};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const OUTGOING_QUEUE_CAPACITY: usize = 256;
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Bridges a [`HubTransport`] onto the event bus: tracks connection state,
/// decouples callers from the network via a bounded outgoing queue, and
/// drives `add_event_data` through the `Idle -> Sending -> Backoff -> ...`
/// retry machine until it succeeds or the module is asked to quit.
pub struct HubTransportClient {
    ctx: ModuleCtx,
    hub: Arc<dyn HubTransport>,
    ticker: Arc<dyn Ticker>,
    outgoing_tx: mpsc::Sender<DeviceEventBatch>,
    outgoing_rx: mpsc::Receiver<DeviceEventBatch>,
    state: Mutex<ConnectionState>,
    messages_sent: Arc<AtomicU64>,
    queue_size: Arc<AtomicU64>,
}

/// A cloneable producer side of [`HubTransportClient`]'s outgoing queue.
///
/// Lets a caller keep enqueueing batches from wherever events arrive while
/// the client itself has been moved onto its own task to run its
/// [`Module`] loop.
#[derive(Clone)]
pub struct OutgoingHandle {
    tx: mpsc::Sender<DeviceEventBatch>,
    queue_size: Arc<AtomicU64>,
}

impl OutgoingHandle {
    pub fn enqueue(&self, batch: DeviceEventBatch) -> bool {
        match self.tx.try_send(batch) {
            Ok(()) => {
                self.queue_size.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                warn!("Outgoing transport queue full, dropping batch");
                false
            }
        }
    }
}

impl HubTransportClient {
    pub fn new(ctx: ModuleCtx, hub: Arc<dyn HubTransport>) -> Self {
        Self::with_ticker(ctx, hub, Arc::new(TokioTicker))
    }

    pub fn with_ticker(ctx: ModuleCtx, hub: Arc<dyn HubTransport>, ticker: Arc<dyn Ticker>) -> Self {
        let (outgoing_tx, outgoing_rx) = mpsc::channel(OUTGOING_QUEUE_CAPACITY);
        HubTransportClient {
            ctx,
            hub,
            ticker,
            outgoing_tx,
            outgoing_rx,
            state: Mutex::new(ConnectionState::Disconnected),
            messages_sent: Arc::new(AtomicU64::new(0)),
            queue_size: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn queue_size(&self) -> u64 {
        self.queue_size.load(Ordering::Relaxed)
    }

    /// A cloneable producer handle for the outgoing queue, usable once
    /// `self` has been moved into [`Module::run`] on its own task.
    pub fn outgoing_handle(&self) -> OutgoingHandle {
        OutgoingHandle {
            tx: self.outgoing_tx.clone(),
            queue_size: self.queue_size.clone(),
        }
    }

    /// Non-blocking enqueue of an outgoing batch. Returns `false` if the
    /// queue is full; the caller's batch is dropped, matching §5's
    /// non-blocking `enqueue`/`try_dequeue` contract.
    pub fn enqueue(&self, batch: DeviceEventBatch) -> bool {
        match self.outgoing_tx.try_send(batch) {
            Ok(()) => {
                self.queue_size.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                warn!("Outgoing transport queue full, dropping batch");
                false
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
        let _ = self.ctx.publish_event(EventKind::TransportConnectionStateEvent(Arc::new(state)));
    }

    /// Connects (or reconnects) with randomized backoff, capped at ~10s and
    /// giving up after 5 attempts.
    pub async fn connect(&self, hub_url: &str) -> ConnectionState {
        self.set_state(ConnectionState::Connecting);
        let mut machine = RetryMachine::new(RetryPolicy::reconnect());
        machine.start();
        loop {
            match self.hub.connect(hub_url).await {
                Ok(state) => {
                    self.set_state(state);
                    return state;
                }
                Err(e) => {
                    debug!("Connect attempt failed: {e}");
                    match machine.on_failure() {
                        (RetryState::GivenUp, _) => {
                            self.set_state(ConnectionState::Disconnected);
                            return ConnectionState::Disconnected;
                        }
                        (_, Some(backoff)) => {
                            self.ticker.sleep(backoff).await;
                            machine.retry();
                        }
                        (_, None) => {
                            self.set_state(ConnectionState::Disconnected);
                            return ConnectionState::Disconnected;
                        }
                    }
                }
            }
        }
    }

    async fn drain_one(&mut self, batch: DeviceEventBatch) {
        self.queue_size.fetch_sub(1, Ordering::Relaxed);
        let hub = self.hub.clone();
        let ticker = self.ticker.clone();
        let sent = send_with_retry(ticker.as_ref(), RetryPolicy::send(), || {
            let hub = hub.clone();
            let batch = batch.clone();
            async move {
                match tokio::time::timeout(SEND_TIMEOUT, hub.add_event_data(batch)).await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout),
                }
            }
        })
        .await;
        if sent {
            self.messages_sent.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[async_trait::async_trait]
impl Module for HubTransportClient {
    async fn run(&mut self) -> Result<(), ()> {
        let mut running = true;
        while running {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) if matches!(event.kind, EventKind::QuitEvent) => running = false,
                        Ok(_) => {}
                        Err(e) => warn!("Failed to receive event in module HubTransportClient. Error: {e}"),
                    }
                }
                batch = self.outgoing_rx.recv() => {
                    match batch {
                        Some(batch) => self.drain_one(batch).await,
                        None => running = false,
                    }
                }
            }
        }
        Ok(())
    }
}
