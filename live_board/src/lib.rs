// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! The multi-device live-timing board: incremental bests kept up to date as
//! event batches arrive, with a full rebuild as the correctness fallback
//! whenever an arrival looks out of order.
//!
//! [`SessionBoard`] is the pure, lock-free state machine; [`LiveBoard`]
//! wraps it behind a single blocking [`std::sync::Mutex`] (deliberately not
//! a `tokio::sync::Mutex` — every critical section here is short and
//! CPU-only, so there is nothing to gain from letting it suspend) and
//! republishes a change notification on every mutation. [`LiveBoardActor`]
//! is the `Module` adapter that feeds it from the event bus and forwards
//! that notification back onto the bus.

use chrono::{DateTime, Utc};
use common::board_event::DeviceEventBatch;
use common::session_event::SessionEventType;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Display metadata and soft-delete marker for one device on the board.
#[derive(Clone, Debug, Default)]
pub struct DeviceInfo {
    pub display_name: Option<String>,
    pub category: Option<String>,
    pub deleted: Option<Instant>,
}

impl DeviceInfo {
    fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }
}

/// One event in a [`DeviceView`]'s log, with the derived best-ness flags
/// the board and the device both maintain independently.
#[derive(Clone, Debug)]
pub struct EventView {
    pub id: String,
    pub event_type: SessionEventType,
    pub lap_number: u32,
    pub sector: u32,
    pub time: Duration,
    pub timestamp: DateTime<Utc>,
    pub deleted: bool,
    pub was_personal_best: bool,
    pub was_best_overall: bool,
}

/// One device's standing view on the board: its event log plus the bests
/// and last-seen pointers derived from it.
#[derive(Clone, Debug)]
pub struct DeviceView {
    pub id: String,
    pub info: DeviceInfo,
    pub events: Vec<EventView>,
    event_index: HashMap<String, usize>,
    pub best_lap: Option<usize>,
    pub best_sectors: HashMap<u32, usize>,
    pub last_event: Option<usize>,
    pub last_lap: Option<usize>,
}

impl DeviceView {
    fn new(id: String) -> Self {
        DeviceView {
            id,
            info: DeviceInfo::default(),
            events: Vec::new(),
            event_index: HashMap::new(),
            best_lap: None,
            best_sectors: HashMap::new(),
            last_event: None,
            last_lap: None,
        }
    }
}

/// A stable reference to an event owned by some device, used for the
/// board-level bests so they never hold a direct borrow or index into a
/// particular device's log.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventRef {
    pub device_id: String,
    pub event_id: String,
}

/// Outcome of [`SessionBoard::add_device_events`]: how long the mutation
/// took and whether it forced a full [`SessionBoard::rebuild_statistics`].
#[derive(Clone, Copy, Debug)]
pub struct BatchResult {
    pub duration: Duration,
    pub statistics_rebuilt: bool,
}

/// Per-session live-timing state: every device's log plus the board-wide
/// bests across all of them.
pub struct SessionBoard {
    pub session_id: String,
    devices: Vec<DeviceView>,
    device_index: HashMap<String, usize>,
    pub best_lap: Option<EventRef>,
    pub best_sectors: HashMap<u32, EventRef>,
    pub updated: Instant,
    pub sectors_hint: Option<u32>,
    last_event_ts: Option<DateTime<Utc>>,
    ever_rebuilt: bool,
}

impl SessionBoard {
    pub fn new(session_id: String) -> Self {
        SessionBoard {
            session_id,
            devices: Vec::new(),
            device_index: HashMap::new(),
            best_lap: None,
            best_sectors: HashMap::new(),
            updated: Instant::now(),
            sectors_hint: None,
            last_event_ts: None,
            ever_rebuilt: false,
        }
    }

    pub fn devices(&self) -> &[DeviceView] {
        &self.devices
    }

    pub fn device(&self, device_id: &str) -> Option<&DeviceView> {
        self.device_index.get(device_id).map(|&idx| &self.devices[idx])
    }

    fn ensure_device(&mut self, device_id: &str) -> usize {
        if let Some(&idx) = self.device_index.get(device_id) {
            return idx;
        }
        let idx = self.devices.len();
        self.devices.push(DeviceView::new(device_id.to_string()));
        self.device_index.insert(device_id.to_string(), idx);
        idx
    }

    /// Merges a batch of one device's raw events into the board. See the
    /// module-level docs for the per-step contract.
    pub fn add_device_events(&mut self, batch: &DeviceEventBatch, skip_state_calc: bool) -> BatchResult {
        let start = Instant::now();
        let device_idx = self.ensure_device(&batch.device_id);
        if let Some(name) = batch.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            self.devices[device_idx].info.display_name = Some(name.to_string());
        }
        if let Some(category) = batch.category.as_deref().filter(|c| !c.trim().is_empty()) {
            self.devices[device_idx].info.category = Some(category.to_string());
        }

        let mut should_rebuild = false;
        for raw in &batch.events {
            if raw.deleted {
                if let Some(&event_idx) = self.devices[device_idx].event_index.get(&raw.id) {
                    if !self.devices[device_idx].events[event_idx].deleted {
                        self.devices[device_idx].events[event_idx].deleted = true;
                        should_rebuild = true;
                    }
                    continue;
                }
            }

            let event_idx = self.devices[device_idx].events.len();
            self.devices[device_idx]
                .event_index
                .insert(raw.id.clone(), event_idx);
            self.devices[device_idx].events.push(EventView {
                id: raw.id.clone(),
                event_type: raw.event_type,
                lap_number: raw.lap_number,
                sector: raw.sector,
                time: raw.time,
                timestamp: raw.timestamp,
                deleted: raw.deleted,
                was_personal_best: false,
                was_best_overall: false,
            });

            if !skip_state_calc && raw.time > Duration::ZERO {
                self.update_statistics(device_idx, event_idx);
            }
            if self.last_event_ts.is_some_and(|ts| raw.timestamp < ts) {
                should_rebuild = true;
            }

            let device = &mut self.devices[device_idx];
            let is_newest = device.last_event.is_none_or(|i| device.events[i].timestamp < raw.timestamp);
            if is_newest {
                device.last_event = Some(event_idx);
            }
            if raw.event_type == SessionEventType::Lap {
                let is_newest_lap = device.last_lap.is_none_or(|i| device.events[i].timestamp < raw.timestamp);
                if is_newest_lap {
                    device.last_lap = Some(event_idx);
                }
            }
            self.last_event_ts = Some(
                self.last_event_ts
                    .map_or(raw.timestamp, |ts| ts.max(raw.timestamp)),
            );
        }

        let statistics_rebuilt = should_rebuild || !self.ever_rebuilt;
        if statistics_rebuilt {
            self.rebuild_statistics();
        }
        self.updated = Instant::now();
        BatchResult {
            duration: start.elapsed(),
            statistics_rebuilt,
        }
    }

    fn update_statistics(&mut self, device_idx: usize, event_idx: usize) {
        let (event_type, sector, time, deleted) = {
            let e = &self.devices[device_idx].events[event_idx];
            (e.event_type, e.sector, e.time, e.deleted)
        };
        if deleted || self.devices[device_idx].info.is_deleted() || time == Duration::ZERO {
            return;
        }
        match event_type {
            SessionEventType::Lap => {
                self.update_device_best_lap(device_idx, event_idx, time);
                self.update_board_best_lap(device_idx, event_idx, time);
            }
            SessionEventType::Sector => {
                self.update_device_best_sector(device_idx, event_idx, sector, time);
                self.update_board_best_sector(device_idx, event_idx, sector, time);
            }
            _ => {}
        }
    }

    fn update_device_best_lap(&mut self, device_idx: usize, event_idx: usize, time: Duration) {
        let device = &mut self.devices[device_idx];
        let replace = match device.best_lap {
            None => true,
            Some(prev_idx) => {
                let prev = &device.events[prev_idx];
                prev.deleted || prev.time >= time
            }
        };
        if replace {
            if let Some(prev_idx) = device.best_lap {
                device.events[prev_idx].was_personal_best = false;
            }
            device.best_lap = Some(event_idx);
            device.events[event_idx].was_personal_best = true;
        } else {
            device.events[event_idx].was_personal_best = false;
        }
    }

    fn update_device_best_sector(&mut self, device_idx: usize, event_idx: usize, sector: u32, time: Duration) {
        let device = &mut self.devices[device_idx];
        let prev_idx = device.best_sectors.get(&sector).copied();
        let replace = match prev_idx {
            None => true,
            Some(idx) => {
                let prev = &device.events[idx];
                prev.deleted || prev.time >= time
            }
        };
        if replace {
            if let Some(idx) = prev_idx {
                device.events[idx].was_personal_best = false;
            }
            device.best_sectors.insert(sector, event_idx);
            device.events[event_idx].was_personal_best = true;
        } else {
            device.events[event_idx].was_personal_best = false;
        }
    }

    fn event_ref(&self, device_idx: usize, event_idx: usize) -> EventRef {
        EventRef {
            device_id: self.devices[device_idx].id.clone(),
            event_id: self.devices[device_idx].events[event_idx].id.clone(),
        }
    }

    fn resolve(&self, r: &EventRef) -> Option<(usize, usize)> {
        let device_idx = *self.device_index.get(&r.device_id)?;
        let event_idx = *self.devices[device_idx].event_index.get(&r.event_id)?;
        Some((device_idx, event_idx))
    }

    fn set_overall_flag(&mut self, r: &EventRef, value: bool) {
        if let Some((d, e)) = self.resolve(r) {
            self.devices[d].events[e].was_best_overall = value;
        }
    }

    fn update_board_best_lap(&mut self, device_idx: usize, event_idx: usize, time: Duration) {
        let replace = match &self.best_lap {
            None => true,
            Some(r) => match self.resolve(r) {
                None => true,
                Some((d, e)) => {
                    let prev = &self.devices[d].events[e];
                    prev.deleted || self.devices[d].info.is_deleted() || prev.time >= time
                }
            },
        };
        if replace {
            if let Some(prev) = self.best_lap.clone() {
                self.set_overall_flag(&prev, false);
            }
            let r = self.event_ref(device_idx, event_idx);
            self.best_lap = Some(r);
            self.devices[device_idx].events[event_idx].was_best_overall = true;
        } else {
            self.devices[device_idx].events[event_idx].was_best_overall = false;
        }
    }

    fn update_board_best_sector(&mut self, device_idx: usize, event_idx: usize, sector: u32, time: Duration) {
        let replace = match self.best_sectors.get(&sector) {
            None => true,
            Some(r) => match self.resolve(r) {
                None => true,
                Some((d, e)) => {
                    let prev = &self.devices[d].events[e];
                    prev.deleted || self.devices[d].info.is_deleted() || prev.time >= time
                }
            },
        };
        if replace {
            if let Some(prev) = self.best_sectors.get(&sector).cloned() {
                self.set_overall_flag(&prev, false);
            }
            let r = self.event_ref(device_idx, event_idx);
            self.best_sectors.insert(sector, r);
            self.devices[device_idx].events[event_idx].was_best_overall = true;
        } else {
            self.devices[device_idx].events[event_idx].was_best_overall = false;
        }
    }

    /// Clears every derived pointer and flag, then replays every
    /// non-deleted, non-zero-time event from every non-deleted device in
    /// timestamp order (stable) to recompute them from scratch.
    pub fn rebuild_statistics(&mut self) {
        self.best_lap = None;
        self.best_sectors.clear();
        for device in &mut self.devices {
            device.best_lap = None;
            device.best_sectors.clear();
            device.last_event = None;
            device.last_lap = None;
            for event in &mut device.events {
                event.was_personal_best = false;
                event.was_best_overall = false;
            }
        }
        self.ever_rebuilt = true;

        if self.devices.iter().all(|d| d.info.is_deleted()) {
            return;
        }

        let mut entries: Vec<(usize, usize, DateTime<Utc>)> = Vec::new();
        for (device_idx, device) in self.devices.iter().enumerate() {
            if device.info.is_deleted() {
                continue;
            }
            for (event_idx, event) in device.events.iter().enumerate() {
                if event.deleted || event.time == Duration::ZERO {
                    continue;
                }
                entries.push((device_idx, event_idx, event.timestamp));
            }
        }
        entries.sort_by_key(|(_, _, ts)| *ts);

        for (device_idx, event_idx, _) in entries {
            self.update_statistics(device_idx, event_idx);
            let device = &mut self.devices[device_idx];
            device.last_event = Some(event_idx);
            if device.events[event_idx].event_type == SessionEventType::Lap {
                device.last_lap = Some(event_idx);
            }
        }
    }

    /// Soft-deletes a device: it keeps its event log but drops out of
    /// every board-wide and per-device best.
    pub fn mark_device_deleted(&mut self, device_id: &str) {
        if let Some(&idx) = self.device_index.get(device_id) {
            self.devices[idx].info.deleted = Some(Instant::now());
            self.rebuild_statistics();
            self.updated = Instant::now();
        }
    }

    pub fn get_ranking(&self, kind: RankingKind, previous: Option<&RankingSnapshot>) -> RankingSnapshot {
        let RankingKind::BestLap = kind;
        let start = Instant::now();
        let sector_count = self
            .sectors_hint
            .unwrap_or_else(|| self.best_sectors.keys().copied().max().unwrap_or(3));

        let mut candidates: Vec<(&DeviceView, Option<usize>)> = self
            .devices
            .iter()
            .filter(|d| !d.info.is_deleted())
            .map(|d| (d, d.best_lap))
            .collect();

        candidates.sort_by(|(a_dev, a_idx), (b_dev, b_idx)| match (a_idx, b_idx) {
            (Some(ai), Some(bi)) => a_dev.events[*ai].time.cmp(&b_dev.events[*bi].time),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let board_best_lap_time = self
            .best_lap
            .as_ref()
            .and_then(|r| self.resolve(r))
            .map(|(d, e)| self.devices[d].events[e].time);

        let mut rows = Vec::with_capacity(candidates.len());
        let mut previous_best_time: Option<Duration> = None;
        for (i, (device, best_lap_idx)) in candidates.into_iter().enumerate() {
            let rank = (i + 1) as u32;
            let best_lap = best_lap_idx.map(|idx| EventSummary {
                time: device.events[idx].time,
                timestamp: device.events[idx].timestamp,
            });
            let last_lap_idx = device.last_lap.filter(|&idx| !device.events[idx].deleted);
            let last_lap = last_lap_idx.map(|idx| EventSummary {
                time: device.events[idx].time,
                timestamp: device.events[idx].timestamp,
            });
            let laps = last_lap_idx
                .map(|idx| device.events[idx].lap_number.to_string())
                .unwrap_or_default();

            let last_completed_lap_number = last_lap_idx.map(|idx| device.events[idx].lap_number).unwrap_or(0);
            let current_lap_number = last_completed_lap_number + 1;
            let has_current_lap_sectors = device
                .events
                .iter()
                .any(|e| !e.deleted && e.event_type == SessionEventType::Sector && e.lap_number == current_lap_number);
            let source_lap_number = if has_current_lap_sectors {
                current_lap_number
            } else {
                last_completed_lap_number
            };

            let mut sectors = vec![String::new(); sector_count as usize];
            for s in 1..=sector_count {
                if let Some(event) = device.events.iter().rev().find(|e| {
                    !e.deleted
                        && e.event_type == SessionEventType::Sector
                        && e.lap_number == source_lap_number
                        && e.sector == s
                }) {
                    sectors[(s - 1) as usize] = format_duration(event.time);
                }
            }

            let gap = match (&best_lap, board_best_lap_time) {
                (Some(b), Some(board_best)) => Some(b.time.saturating_sub(board_best)),
                _ => None,
            };
            let interval = match (&best_lap, previous_best_time) {
                (Some(b), Some(prev)) => Some(b.time.saturating_sub(prev)),
                _ => None,
            };
            if let Some(b) = &best_lap {
                previous_best_time = Some(b.time);
            }

            let (previous_rank, has_changed) = match previous.and_then(|p| p.row_for(&device.id)) {
                Some(prev_row) => (prev_row.rank, prev_row.rank != rank),
                None => (rank, false),
            };
            let rank_change = previous_rank as i64 - rank as i64;

            let display_name = device
                .info
                .display_name
                .clone()
                .unwrap_or_else(|| short_id(&device.id));

            rows.push(RankingRow {
                rank,
                device_id: device.id.clone(),
                device_short_id: short_id(&device.id),
                display_name,
                laps,
                sectors,
                last_lap,
                best_lap,
                gap,
                interval,
                previous_rank,
                has_changed,
                rank_change,
            });
        }

        RankingSnapshot {
            rows,
            duration: start.elapsed(),
        }
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn format_duration(d: Duration) -> String {
    format!("{:.3}", d.as_secs_f64())
}

/// Which dimension to rank devices by. Only best-lap ranking is specified
/// today; kept as an enum so a sector-based or current-lap-based ranking
/// can be added without changing the call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RankingKind {
    BestLap,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EventSummary {
    pub time: Duration,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct RankingRow {
    pub rank: u32,
    pub device_id: String,
    pub device_short_id: String,
    pub display_name: String,
    pub laps: String,
    pub sectors: Vec<String>,
    pub last_lap: Option<EventSummary>,
    pub best_lap: Option<EventSummary>,
    pub gap: Option<Duration>,
    pub interval: Option<Duration>,
    pub previous_rank: u32,
    pub has_changed: bool,
    pub rank_change: i64,
}

#[derive(Clone, Debug)]
pub struct RankingSnapshot {
    pub rows: Vec<RankingRow>,
    pub duration: Duration,
}

impl RankingSnapshot {
    pub fn row_for(&self, device_id: &str) -> Option<&RankingRow> {
        self.rows.iter().find(|r| r.device_id == device_id)
    }
}

mod actor;
pub use actor::LiveBoard;
pub use actor::LiveBoardActor;

#[cfg(test)]
mod tests;
