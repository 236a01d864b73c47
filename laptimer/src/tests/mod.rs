use crate::{LapTimer, LaptimerConfig, LaptimerState};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use common::circuit::{Circuit, CircuitSegment, CircuitType};
use common::fix::Fix;
use common::session_event::SessionEventType;
use geo::{GeoPoint, Segment};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn p(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint::new(lat, lon, 0.0)
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

fn fix_at(lat: f64, lon: f64, ts: DateTime<Utc>) -> Fix {
    Fix::new(p(lat, lon), ts)
}

/// A one-segment Closed circuit, per the first-crossing-semantics scenario:
/// boundary `(0.005,0.0)->(-0.005,0.0)`, bounding box covering both sides.
fn single_segment_closed_circuit(sector_timeout_seconds: u32) -> Circuit {
    Circuit {
        code: "E2E1".to_string(),
        name: "E2E-1".to_string(),
        circuit_type: CircuitType::Closed,
        use_direction: false,
        bounding_box: Segment::new(p(0.01, -0.01), p(-0.01, 0.01)),
        segments: vec![CircuitSegment {
            number: 1,
            boundary: Segment::new(p(0.005, 0.0), p(-0.005, 0.0)),
        }],
        sector_timeout_seconds,
    }
}

/// A two-segment Open circuit where only segment 2 (completing sector
/// `N-1 = 1`) is ever crossed in these tests; segment 1 sits far away.
fn two_segment_open_circuit() -> Circuit {
    Circuit {
        code: "E2E-OPEN".to_string(),
        name: "E2E-Open".to_string(),
        circuit_type: CircuitType::Open,
        use_direction: false,
        bounding_box: Segment::new(p(1.0, -1.0), p(-1.0, 1.0)),
        segments: vec![
            CircuitSegment {
                number: 1,
                boundary: Segment::new(p(0.5, -0.5), p(0.5, 0.5)),
            },
            CircuitSegment {
                number: 2,
                boundary: Segment::new(p(0.005, 0.0), p(-0.005, 0.0)),
            },
        ],
        sector_timeout_seconds: 0,
    }
}

fn recorder() -> (impl Fn(&common::session_event::SessionEvent) + Send + Sync + 'static, Arc<Mutex<Vec<common::session_event::SessionEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    (move |e: &common::session_event::SessionEvent| sink.lock().unwrap().push(e.clone()), events)
}

#[test]
fn first_crossing_emits_sector_then_lap_with_zero_time() {
    let mut timer = LapTimer::new(LaptimerConfig::default());
    let (listener, events) = recorder();
    timer.on_session_event(listener);
    timer.set_circuit(single_segment_closed_circuit(0));

    timer.add_geolocation(fix_at(0.0, -0.001, t0()), None);
    timer.add_geolocation(fix_at(0.0, 0.001, t0() + ChronoDuration::seconds(10)), None);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, SessionEventType::Sector);
    assert_eq!(events[0].sector, 1);
    assert_eq!(events[0].time, Duration::ZERO);
    assert_eq!(events[1].event_type, SessionEventType::Lap);
    assert_eq!(events[1].sector, 0);
    assert_eq!(events[1].time, Duration::ZERO);
    assert_eq!(events[1].lap_number, 0);
}

#[test]
fn cooldown_suppresses_a_second_crossing_within_the_window() {
    let mut timer = LapTimer::new(LaptimerConfig {
        minimum_time_between_events: Duration::from_secs(5),
        ..Default::default()
    });
    let (listener, events) = recorder();
    timer.on_session_event(listener);
    timer.set_circuit(single_segment_closed_circuit(0));

    timer.add_geolocation(fix_at(0.0, -0.001, t0()), None);
    timer.add_geolocation(fix_at(0.0, 0.001, t0() + ChronoDuration::seconds(10)), None);
    assert_eq!(events.lock().unwrap().len(), 2);

    // Both fixes below arrive inside the 5s cooldown measured from the lap
    // event at t0+5s, so neither the (no-op) same-side fix nor the
    // re-crossing produces a new event.
    timer.add_geolocation(fix_at(0.0, 0.001, t0() + ChronoDuration::seconds(9)), None);
    timer.add_geolocation(fix_at(0.0, -0.001, t0() + ChronoDuration::milliseconds(9500)), None);
    assert_eq!(events.lock().unwrap().len(), 2);
}

#[test]
fn circuit_sector_timeout_overrides_minimum_time_between_events() {
    let mut timer = LapTimer::new(LaptimerConfig {
        minimum_time_between_events: Duration::from_secs(5),
        ..Default::default()
    });
    let (listener, events) = recorder();
    timer.on_session_event(listener);
    timer.set_circuit(single_segment_closed_circuit(1));

    timer.add_geolocation(fix_at(0.0, -0.001, t0()), None);
    timer.add_geolocation(fix_at(0.0, 0.001, t0() + ChronoDuration::seconds(10)), None);
    assert_eq!(events.lock().unwrap().len(), 2);

    // The same two fixes that were suppressed under the 5s
    // minimum_time_between_events default clear a 1s circuit sector
    // timeout and produce a new sector+lap pair.
    timer.add_geolocation(fix_at(0.0, 0.001, t0() + ChronoDuration::seconds(9)), None);
    timer.add_geolocation(fix_at(0.0, -0.001, t0() + ChronoDuration::milliseconds(9500)), None);
    assert_eq!(events.lock().unwrap().len(), 4);
}

#[test]
fn open_circuit_completes_lap_one_segment_before_closed_would() {
    let mut timer = LapTimer::new(LaptimerConfig::default());
    let (listener, events) = recorder();
    timer.on_session_event(listener);
    timer.set_circuit(two_segment_open_circuit());

    timer.add_geolocation(fix_at(0.0, -0.001, t0()), None);
    timer.add_geolocation(fix_at(0.0, 0.001, t0() + ChronoDuration::seconds(10)), None);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].sector, 1);
    assert_eq!(events[1].event_type, SessionEventType::Lap);
}

#[test]
fn set_circuit_closes_any_active_session() {
    let mut timer = LapTimer::new(LaptimerConfig::default());
    timer.set_circuit(single_segment_closed_circuit(0));
    timer.create_session().unwrap();
    assert!(timer.active_session().is_some());

    timer.set_circuit(single_segment_closed_circuit(0));
    assert!(timer.active_session().is_none());
    assert_eq!(timer.state(), LaptimerState::Armed);
}

#[test]
fn stop_detection_pauses_and_start_detection_resumes() {
    let mut timer = LapTimer::new(LaptimerConfig::default());
    timer.set_circuit(single_segment_closed_circuit(0));
    timer.create_session().unwrap();

    timer.stop_detection();
    assert!(timer.is_paused());
    timer.add_geolocation(fix_at(0.0, -0.001, t0()), None);
    timer.add_geolocation(fix_at(0.0, 0.001, t0() + ChronoDuration::seconds(10)), None);
    assert!(timer.active_session().unwrap().events.is_empty());

    timer.start_detection();
    assert!(!timer.is_paused());
    timer.add_geolocation(fix_at(0.0, -0.001, t0()), None);
    timer.add_geolocation(fix_at(0.0, 0.001, t0() + ChronoDuration::seconds(10)), None);
    assert_eq!(timer.active_session().unwrap().events.len(), 2);
}

#[test]
fn device_override_is_stamped_on_emitted_events() {
    let mut timer = LapTimer::new(LaptimerConfig {
        device_id: "configured-device".to_string(),
        ..Default::default()
    });
    let (listener, events) = recorder();
    timer.on_session_event(listener);
    timer.set_circuit(single_segment_closed_circuit(0));

    timer.add_geolocation(fix_at(0.0, -0.001, t0()), Some("override-device".to_string()));
    timer.add_geolocation(
        fix_at(0.0, 0.001, t0() + ChronoDuration::seconds(10)),
        Some("override-device".to_string()),
    );

    let events = events.lock().unwrap();
    assert!(events.iter().all(|e| e.device_id == "override-device"));
}

#[test]
fn a_listener_panic_does_not_abort_the_pipeline() {
    let mut timer = LapTimer::new(LaptimerConfig::default());
    timer.on_session_event(|_e| panic!("boom"));
    let (listener, events) = recorder();
    timer.on_session_event(listener);
    timer.set_circuit(single_segment_closed_circuit(0));

    timer.add_geolocation(fix_at(0.0, -0.001, t0()), None);
    timer.add_geolocation(fix_at(0.0, 0.001, t0() + ChronoDuration::seconds(10)), None);

    assert_eq!(events.lock().unwrap().len(), 2);
}
