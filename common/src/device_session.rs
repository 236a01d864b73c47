use crate::fix::Fix;
use crate::session_event::{SessionEvent, SessionEventType};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

/// A single device's append-only event log plus the derived bests the
/// lap-timer and board both consult.
///
/// Created on the first fix after a circuit is known; closed on idle
/// timeout, explicit close, or circuit change. `id` is a timestamp-derived
/// string, stable for the life of the session.
#[derive(Clone, Debug)]
pub struct DeviceSession {
    pub id: String,
    pub circuit_code: String,
    pub device_id: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub events: Vec<SessionEvent>,
    pub telemetry_channels: Vec<String>,
    pub telemetry_data: Vec<Fix>,
    pub last_position_ts: Option<DateTime<Utc>>,
}

impl DeviceSession {
    pub fn new(id: String, circuit_code: String, device_id: String, user_id: Option<String>, created_at: DateTime<Utc>) -> Self {
        DeviceSession {
            id,
            circuit_code,
            device_id,
            user_id,
            created_at,
            events: Vec::new(),
            telemetry_channels: Vec::new(),
            telemetry_data: Vec::new(),
            last_position_ts: None,
        }
    }

    pub fn push_event(&mut self, event: SessionEvent) -> &SessionEvent {
        self.events.push(event);
        self.events.last().unwrap()
    }

    pub fn push_telemetry(&mut self, fix: Fix) {
        self.telemetry_data.push(fix);
    }

    pub fn last_event(&self) -> Option<&SessionEvent> {
        self.events.iter().filter(|e| !e.is_deleted()).max_by_key(|e| e.timestamp)
    }

    pub fn last_lap(&self) -> Option<&SessionEvent> {
        self.events
            .iter()
            .filter(|e| !e.is_deleted() && e.event_type == SessionEventType::Lap)
            .max_by_key(|e| e.lap_number)
    }

    /// Greatest lap number, then greatest sector with a positive time.
    pub fn last_sector(&self) -> Option<&SessionEvent> {
        self.events
            .iter()
            .filter(|e| !e.is_deleted() && e.event_type == SessionEventType::Sector && e.time > Duration::ZERO)
            .max_by_key(|e| (e.lap_number, e.sector))
    }

    /// Minimum time among non-deleted laps with `lap_number > 0`.
    pub fn best_lap(&self) -> Option<&SessionEvent> {
        self.events
            .iter()
            .filter(|e| !e.is_deleted() && e.event_type == SessionEventType::Lap && e.lap_number > 0)
            .min_by_key(|e| e.time)
    }

    pub fn best_sectors(&self) -> HashMap<u32, &SessionEvent> {
        let mut best: HashMap<u32, &SessionEvent> = HashMap::new();
        for event in self.events.iter().filter(|e| !e.is_deleted() && e.event_type == SessionEventType::Sector) {
            best.entry(event.sector)
                .and_modify(|current| {
                    if event.time < current.time {
                        *current = event;
                    }
                })
                .or_insert(event);
        }
        best
    }

    /// Would `candidate` become (or tie) the current personal-best sector
    /// for its sector number?
    pub fn is_best_sector(&self, candidate: &SessionEvent) -> bool {
        match self.best_sectors().get(&candidate.sector) {
            None => true,
            Some(best) => best.time >= candidate.time,
        }
    }

    /// Would `candidate` become (or tie) the current personal-best lap?
    pub fn is_best_lap(&self, candidate: &SessionEvent) -> bool {
        match self.best_lap() {
            None => true,
            Some(best) => best.time >= candidate.time,
        }
    }

    /// Sum of each sector's personal-best time, independently optimized.
    pub fn theoretical(&self) -> Duration {
        self.best_sectors().values().map(|e| e.time).sum()
    }

    /// Minimum sum of `N` consecutive sector times in timestamp order,
    /// where `N` is the number of sectors per lap.
    pub fn rolling(&self) -> Option<Duration> {
        let mut sectors: Vec<&SessionEvent> = self
            .events
            .iter()
            .filter(|e| !e.is_deleted() && e.event_type == SessionEventType::Sector)
            .collect();
        sectors.sort_by_key(|e| e.timestamp);

        let n = sectors.iter().map(|e| e.sector).max().unwrap_or(0) as usize;
        if n == 0 || sectors.len() < n {
            return None;
        }
        sectors
            .windows(n)
            .map(|window| window.iter().map(|e| e.time).sum::<Duration>())
            .min()
    }

    pub fn max_speed(&self) -> Option<f64> {
        self.telemetry_data
            .iter()
            .filter_map(|f| f.speed)
            .fold(None, |acc, speed| Some(acc.map_or(speed, |a: f64| a.max(speed))))
    }
}
