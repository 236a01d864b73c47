//! The raw, wire-shaped event batch the live-timing board ingests.
//!
//! Distinct from [`crate::session_event::SessionEvent`]: a board batch
//! carries one stable `id` per event (needed to locate and soft-delete a
//! specific entry later) and drops the fields that only make sense inside
//! a single device's own log (`circuit_code`, the personal/overall-best
//! flags, telemetry). [`BoardRawEvent::from_session_event`] bridges the two
//! for the common case of feeding a freshly emitted `SessionEvent` straight
//! into the board.

use crate::session_event::{SessionEvent, SessionEventType};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// One event as the board sees it: enough to rank, sum and soft-delete,
/// nothing more.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardRawEvent {
    pub id: String,
    pub event_type: SessionEventType,
    pub lap_number: u32,
    pub sector: u32,
    pub time: Duration,
    pub timestamp: DateTime<Utc>,
    pub deleted: bool,
}

impl BoardRawEvent {
    /// Derives a stable id from a session event's own addressing fields.
    ///
    /// A device's log never has two distinct events with the same
    /// `(event_type, lap_number, sector, timestamp)` tuple, so this is
    /// sufficient to identify an entry for soft-delete without requiring
    /// `SessionEvent` itself to carry an id.
    pub fn from_session_event(device_id: &str, event: &SessionEvent) -> Self {
        BoardRawEvent {
            id: format!(
                "{device_id}:{:?}:{}:{}:{}",
                event.event_type,
                event.lap_number,
                event.sector,
                event.timestamp.timestamp_millis()
            ),
            event_type: event.event_type,
            lap_number: event.lap_number,
            sector: event.sector,
            time: event.time,
            timestamp: event.timestamp,
            deleted: event.is_deleted(),
        }
    }
}

/// A batch of one device's events destined for the live-timing board,
/// together with display metadata for that device.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceEventBatch {
    pub session_id: String,
    pub device_id: String,
    pub display_name: Option<String>,
    pub category: Option<String>,
    pub events: Vec<BoardRawEvent>,
}

impl DeviceEventBatch {
    /// Wraps a single freshly emitted session event as a one-event batch,
    /// the shape a local lap-timer's own device feeds into the board.
    pub fn single(session_id: String, device_id: String, event: &SessionEvent) -> Self {
        let raw = BoardRawEvent::from_session_event(&device_id, event);
        DeviceEventBatch {
            session_id,
            device_id,
            display_name: None,
            category: None,
            events: vec![raw],
        }
    }
}
