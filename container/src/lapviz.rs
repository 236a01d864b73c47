// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! The LapViz delimited text format: a line-based, `#`-prefixed header
//! followed by interleaved `#Event=` markers and plain telemetry rows.
//!
//! `encode`/`decode` work on the plain-text payload; [`crate::archive`]
//! optionally wraps that payload in a single-entry zip.

use chrono::{DateTime, Utc};
use common::device_session::DeviceSession;
use common::session_event::{SessionEvent, SessionEventType};
use geo::GeoPoint;
use std::fmt::Write as _;
use std::time::Duration;

pub const FORMAT_MARKER: &str = "#Format=LapViz Delimited Data";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LapVizError {
    Malformed(String),
}

impl std::fmt::Display for LapVizError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LapVizError::Malformed(msg) => write!(f, "malformed LapViz document: {msg}"),
        }
    }
}

impl std::error::Error for LapVizError {}

impl From<LapVizError> for common::messages::ContainerError {
    fn from(e: LapVizError) -> Self {
        match e {
            LapVizError::Malformed(msg) => common::messages::ContainerError::Malformed(msg),
        }
    }
}

/// Does `text` look like a LapViz document? Scans the first handful of
/// non-empty lines for the format marker, per the compatibility-sniffing
/// rule.
pub fn looks_like_lapviz(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(8)
        .any(|l| l == FORMAT_MARKER)
}

fn event_type_name(t: SessionEventType) -> &'static str {
    match t {
        SessionEventType::Lap => "Lap",
        SessionEventType::Sector => "Sector",
        SessionEventType::Position => "Position",
        SessionEventType::Start => "Start",
        SessionEventType::Other => "Other",
    }
}

fn parse_event_type(s: &str) -> Option<SessionEventType> {
    match s {
        "Lap" => Some(SessionEventType::Lap),
        "Sector" => Some(SessionEventType::Sector),
        "Position" => Some(SessionEventType::Position),
        "Start" => Some(SessionEventType::Start),
        "Other" => Some(SessionEventType::Other),
        _ => None,
    }
}

/// Sector events sort before Lap events within the same lap number;
/// everything else (Start/Position/Other, always `lap_number == 0` in
/// practice) sorts alongside Sector.
fn event_sort_rank(t: SessionEventType) -> u8 {
    match t {
        SessionEventType::Lap => 1,
        _ => 0,
    }
}

fn duration_to_ticks(d: Duration) -> i64 {
    (d.as_nanos() / 100) as i64
}

fn ticks_to_duration(ticks: i64) -> Duration {
    Duration::from_nanos(ticks.max(0) as u64 * 100)
}

/// Serializes a device session to the plain-text LapViz payload.
pub fn encode(session: &DeviceSession) -> String {
    let mut out = String::new();
    writeln!(out, "{FORMAT_MARKER}").unwrap();
    writeln!(out, "#Version=1").unwrap();
    writeln!(out, "#CircuitCode={}", session.circuit_code).unwrap();
    writeln!(out, "#SessionId={}", session.id).unwrap();
    writeln!(out, "#DeviceId={}", session.device_id).unwrap();
    if let Some(user_id) = &session.user_id {
        writeln!(out, "#UserId={user_id}").unwrap();
    }
    writeln!(out, "#CreatedAt={}", session.created_at.to_rfc3339()).unwrap();
    writeln!(out, "#Fields={}", session.telemetry_channels.join(",")).unwrap();

    let mut events: Vec<&SessionEvent> = session.events.iter().filter(|e| !e.is_deleted()).collect();
    events.sort_by_key(|e| (e.lap_number, event_sort_rank(e.event_type), e.sector));
    for event in events {
        writeln!(
            out,
            "#Event={},{},{},{},{}",
            event.timestamp.timestamp_millis(),
            event_type_name(event.event_type),
            event.lap_number,
            event.sector,
            duration_to_ticks(event.time),
        )
        .unwrap();
    }

    for fix in &session.telemetry_data {
        let mut cols: Vec<String> = Vec::with_capacity(session.telemetry_channels.len());
        for idx in 0..session.telemetry_channels.len() {
            match fix.channels.get(idx).copied() {
                Some(v) if v.is_finite() => cols.push(format!("{v}")),
                _ => cols.push(String::new()),
            }
        }
        if cols.is_empty() {
            writeln!(out, "{}", fix.timestamp.timestamp_millis()).unwrap();
        } else {
            writeln!(out, "{},{}", fix.timestamp.timestamp_millis(), cols.join(",")).unwrap();
        }
    }
    out
}

fn project_well_known(fix: &mut common::fix::Fix, name: &str, value: Option<f64>) {
    let Some(value) = value else { return };
    match name {
        "Latitude" => fix.point.lat = value,
        "Longitude" => fix.point.lon = value,
        "Altitude" => fix.point.alt = value,
        "Speed" => fix.speed = Some(value),
        "Accuracy" => fix.accuracy = Some(value),
        _ => {}
    }
}

fn fix_from_row(ts_ms: i64, fields: &[String], values: &[Option<f64>]) -> common::fix::Fix {
    let timestamp = DateTime::from_timestamp_millis(ts_ms).unwrap_or_else(Utc::now);
    let mut fix = common::fix::Fix::new(GeoPoint::new(0.0, 0.0, 0.0), timestamp);
    let mut channels = Vec::with_capacity(fields.len());
    for (idx, name) in fields.iter().enumerate() {
        let value = values.get(idx).copied().flatten();
        channels.push(value.unwrap_or(f64::NAN));
        project_well_known(&mut fix, name, value);
    }
    fix.channels = channels;
    fix
}

/// Parses a plain-text LapViz payload back into a device session.
///
/// Only the fields named in the grammar round-trip: per-event diagnostic
/// fields not covered by `#Event=` (first/second point, the interpolation
/// factor, the best-lap/best-sector flags, `data_min`/`data_max`) are not
/// part of the on-disk format and come back at their defaults.
pub fn decode(text: &str) -> Result<DeviceSession, LapVizError> {
    let mut format_seen = false;
    let mut circuit_code = String::new();
    let mut session_id = String::new();
    let mut device_id = String::new();
    let mut user_id: Option<String> = None;
    let mut created_at = Utc::now();
    let mut fields: Option<Vec<String>> = None;
    let mut events_raw: Vec<(i64, SessionEventType, u32, u32, i64)> = Vec::new();
    let mut rows: Vec<(i64, Vec<Option<f64>>)> = Vec::new();
    let mut last_row_ts: i64 = 0;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('#') {
            if let Some(v) = rest.strip_prefix("Format=") {
                if v != "LapViz Delimited Data" {
                    return Err(LapVizError::Malformed(format!("unexpected format header: {v}")));
                }
                format_seen = true;
            } else if let Some(v) = rest.strip_prefix("CircuitCode=") {
                circuit_code = v.to_string();
            } else if let Some(v) = rest.strip_prefix("SessionId=") {
                session_id = v.to_string();
            } else if let Some(v) = rest.strip_prefix("DeviceId=") {
                device_id = v.to_string();
            } else if let Some(v) = rest.strip_prefix("UserId=") {
                user_id = Some(v.to_string());
            } else if let Some(v) = rest.strip_prefix("CreatedAt=") {
                if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
                    created_at = dt.with_timezone(&Utc);
                }
            } else if let Some(v) = rest.strip_prefix("Fields=") {
                if fields.is_some() {
                    return Err(LapVizError::Malformed("duplicate #Fields= header".into()));
                }
                fields = Some(v.split(',').map(str::to_string).filter(|s| !s.is_empty()).collect());
            } else if let Some(v) = rest.strip_prefix("Event=") {
                let parts: Vec<&str> = v.split(',').collect();
                if parts.len() != 5 {
                    continue;
                }
                let Some(event_type) = parse_event_type(parts[1]) else {
                    continue;
                };
                let mut ts = parts[0].parse::<i64>().unwrap_or(0);
                if ts == 0 {
                    ts = last_row_ts;
                }
                let lap = parts[2].parse::<u32>().unwrap_or(0);
                let sector = parts[3].parse::<u32>().unwrap_or(0);
                let ticks = parts[4].parse::<i64>().unwrap_or(0);
                events_raw.push((ts, event_type, lap, sector, ticks));
            }
            continue;
        }

        let Some(fields) = &fields else {
            continue;
        };
        // Split fully rather than with a fixed limit: a limited splitn would
        // fold any surplus columns into the last value instead of dropping
        // them, and would choke on a bare timestamp with a trailing comma.
        let mut parts = line.split(',');
        let Some(ts_str) = parts.next() else { continue };
        let Ok(ts) = ts_str.parse::<i64>() else { continue };
        last_row_ts = ts;
        let mut values: Vec<Option<f64>> = parts
            .take(fields.len())
            .map(|p| if p.is_empty() { None } else { p.parse::<f64>().ok() })
            .collect();
        values.resize(fields.len(), None);
        rows.push((ts, values));
    }

    if !format_seen {
        return Err(LapVizError::Malformed("missing #Format= header".into()));
    }
    let fields = fields.ok_or_else(|| LapVizError::Malformed("missing #Fields= header".into()))?;

    let mut session = DeviceSession::new(session_id, circuit_code, device_id, user_id, created_at);
    session.telemetry_channels = fields;
    let device_id = session.device_id.clone();
    let user_id = session.user_id.clone();
    let session_id = session.id.clone();
    let circuit_code = session.circuit_code.clone();
    for (ts, event_type, lap_number, sector, ticks) in events_raw {
        let timestamp = DateTime::from_timestamp_millis(ts).unwrap_or(created_at);
        session.events.push(SessionEvent {
            timestamp,
            event_type,
            lap_number,
            sector,
            time: ticks_to_duration(ticks),
            first_point: None,
            second_point: None,
            factor: 1.0,
            device_id: device_id.clone(),
            user_id: user_id.clone(),
            session_id: session_id.clone(),
            circuit_code: circuit_code.clone(),
            is_best_overall: false,
            is_personal_best: false,
            deleted: None,
            data_min: None,
            data_max: None,
        });
    }
    for (ts, values) in &rows {
        session.telemetry_data.push(fix_from_row(*ts, &session.telemetry_channels, values));
    }
    session.last_position_ts = session.telemetry_data.last().map(|f| f.timestamp);

    Ok(session)
}
