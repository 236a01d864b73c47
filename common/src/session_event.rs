use chrono::{DateTime, Utc};
use geo::GeoPoint;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// The high-level type of a [`SessionEvent`]. `sector` is always `0` for
/// every variant except [`SessionEventType::Sector`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEventType {
    Lap,
    Sector,
    Position,
    Start,
    Other,
}

/// One entry in a device's append-only timing log.
///
/// `time` is a delta: for [`SessionEventType::Sector`] it is the time since
/// the previous event; for [`SessionEventType::Lap`] see the lap-timer
/// registration algorithm. Deletion is a soft mark (`deleted`), never a
/// removal, so indices and back-references stay stable.
///
/// `is_personal_best` is owned by the lap-timer (best within this device's
/// own session); `is_best_overall` is owned by the live-timing board (best
/// across all devices) and left `false` until the board promotes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: SessionEventType,
    pub lap_number: u32,
    pub sector: u32,
    pub time: Duration,
    pub first_point: Option<GeoPoint>,
    pub second_point: Option<GeoPoint>,
    pub factor: f64,
    pub device_id: String,
    pub user_id: Option<String>,
    pub session_id: String,
    pub circuit_code: String,
    pub is_best_overall: bool,
    pub is_personal_best: bool,
    #[serde(skip)]
    pub deleted: Option<Instant>,
    pub data_min: Option<f64>,
    pub data_max: Option<f64>,
}

impl SessionEvent {
    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }

    pub fn mark_deleted(&mut self) {
        self.deleted = Some(Instant::now());
    }
}
