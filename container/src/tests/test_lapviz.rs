use super::sample_session;
use chrono::{TimeZone, Utc};
use common::device_session::DeviceSession;
use common::fix::Fix;
use common::session_event::SessionEventType;
use crate::lapviz::{decode, encode, looks_like_lapviz};
use geo::GeoPoint;
use std::time::Duration;

#[test]
fn encoded_document_is_recognized_by_the_compatibility_sniff() {
    let session = sample_session("s1");
    let text = encode(&session);
    assert!(looks_like_lapviz(&text));
    assert!(text.starts_with(crate::lapviz::FORMAT_MARKER));
}

#[test]
fn round_trip_preserves_events_and_telemetry() {
    let session = sample_session("s1");
    let text = encode(&session);
    let decoded = decode(&text).unwrap_or_else(|e| panic!("decode failed: {e}"));

    assert_eq!(decoded.id, session.id);
    assert_eq!(decoded.circuit_code, session.circuit_code);
    assert_eq!(decoded.device_id, session.device_id);
    assert_eq!(decoded.telemetry_channels, session.telemetry_channels);
    assert_eq!(decoded.telemetry_data.len(), session.telemetry_data.len());

    let best_lap = decoded
        .events
        .iter()
        .find(|e| e.event_type == SessionEventType::Lap)
        .expect("lap event survives the round trip");
    assert_eq!(best_lap.time, Duration::from_secs_f64(57.286));

    let sector = decoded
        .events
        .iter()
        .find(|e| e.event_type == SessionEventType::Sector)
        .expect("sector event survives the round trip");
    assert_eq!(sector.sector, 1);
}

#[test]
fn decode_rejects_a_document_missing_the_format_header() {
    let text = "#Fields=Latitude,Longitude\n0,1.0,2.0\n";
    assert!(decode(text).is_err());
}

#[test]
fn decode_rejects_a_document_missing_the_fields_header() {
    let text = format!("{}\n#Version=1\n", crate::lapviz::FORMAT_MARKER);
    assert!(decode(&text).is_err());
}

#[test]
fn missing_telemetry_values_round_trip_as_non_finite() {
    let mut session = sample_session("s1");
    session.telemetry_data[0].channels[1] = f64::NAN;
    let text = encode(&session);
    let decoded = decode(&text).unwrap();
    assert!(!decoded.telemetry_data[0].channels[1].is_finite());
}

#[test]
fn telemetry_rows_round_trip_with_no_channels_declared() {
    let created_at = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
    let mut session = DeviceSession::new("s1".to_string(), "OSL".to_string(), "dev-a".to_string(), None, created_at);
    assert!(session.telemetry_channels.is_empty());
    for i in 0..3 {
        let fix = Fix::new(GeoPoint::new(52.0 + i as f64 * 0.0001, 11.0, 100.0), created_at);
        session.telemetry_data.push(fix);
    }

    let text = encode(&session);
    assert!(!text.lines().any(|l| l.ends_with(',') && l.chars().next().is_some_and(|c| c.is_ascii_digit())));

    let decoded = decode(&text).unwrap_or_else(|e| panic!("decode failed: {e}"));
    assert_eq!(decoded.telemetry_data.len(), session.telemetry_data.len());
}

#[test]
fn decode_truncates_data_rows_with_surplus_columns() {
    let session = sample_session("s1");
    let mut text = encode(&session);
    // Append a row with one extra column beyond the declared fields.
    text.push_str("0,1.0,2.0,3.0,4.0,999.0\n");

    let decoded = decode(&text).unwrap_or_else(|e| panic!("decode failed: {e}"));
    let extra_row = decoded
        .telemetry_data
        .iter()
        .find(|f| f.timestamp.timestamp_millis() == 0)
        .expect("surplus-column row still decodes");
    assert_eq!(extra_row.channels.len(), session.telemetry_channels.len());
    assert_eq!(extra_row.channels.last().copied(), Some(4.0));
}
