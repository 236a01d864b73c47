use crate::ActiveSession;
use chrono::{TimeZone, Utc};
use common::session_event::{SessionEvent, SessionEventType};
use module_core::EventBus;
use std::sync::Arc;
use std::time::Duration;

fn marker_event(event_type: SessionEventType, session_id: &str) -> SessionEvent {
    SessionEvent {
        timestamp: Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap(),
        event_type,
        lap_number: 0,
        sector: 0,
        time: Duration::ZERO,
        first_point: None,
        second_point: None,
        factor: 0.0,
        device_id: "device-1".to_string(),
        user_id: None,
        session_id: session_id.to_string(),
        circuit_code: "E2E1".to_string(),
        is_best_overall: false,
        is_personal_best: false,
        deleted: None,
        data_min: None,
        data_max: None,
    }
}

#[test]
fn a_start_marker_replaces_any_prior_session() {
    let eb = EventBus::default();
    let mut active_session = ActiveSession::new(eb.context());

    active_session.on_session_event(Arc::new(marker_event(SessionEventType::Start, "first")));
    assert_eq!(active_session.session.as_ref().unwrap().id, "first");

    active_session.on_session_event(Arc::new(marker_event(SessionEventType::Start, "second")));
    let session = active_session.session.as_ref().unwrap();
    assert_eq!(session.id, "second");
    assert!(session.events.is_empty());
}

#[test]
fn sector_events_before_a_start_marker_are_dropped() {
    let eb = EventBus::default();
    let mut active_session = ActiveSession::new(eb.context());

    let mut sector = marker_event(SessionEventType::Sector, "first");
    sector.sector = 1;
    active_session.on_session_event(Arc::new(sector));

    assert!(active_session.session.is_none());
}

#[test]
fn matching_sector_events_are_appended() {
    let eb = EventBus::default();
    let mut active_session = ActiveSession::new(eb.context());

    active_session.on_session_event(Arc::new(marker_event(SessionEventType::Start, "first")));
    let mut sector = marker_event(SessionEventType::Sector, "first");
    sector.sector = 1;
    active_session.on_session_event(Arc::new(sector));

    assert_eq!(active_session.session.as_ref().unwrap().events.len(), 1);
}
