use chrono::{TimeZone, Utc};
use common::device_session::DeviceSession;
use common::fix::Fix;
use common::session_event::{SessionEvent, SessionEventType};
use geo::GeoPoint;
use std::time::Duration;

pub mod test_fs_container;
pub mod test_lapviz;

fn get_path(folder_name: &str) -> String {
    format!("/tmp/rapid-rusty/{folder_name}")
}

fn setup_empty_test_folder(folder_name: &str) -> String {
    let path = get_path(folder_name);
    if let Ok(true) = std::fs::exists(&path) {
        std::fs::remove_dir_all(&path).unwrap_or_else(|_| panic!("Failed to cleanup test dir {path}"));
    }
    std::fs::create_dir_all(&path).unwrap_or_else(|err| panic!("Failed to create test dir for {path}. Reason: {err}"));
    path
}

fn sample_event(session_id: &str, device_id: &str, lap_number: u32, sector: u32, secs: f64, event_type: SessionEventType) -> SessionEvent {
    SessionEvent {
        timestamp: Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap(),
        event_type,
        lap_number,
        sector,
        time: Duration::from_secs_f64(secs),
        first_point: None,
        second_point: None,
        factor: 1.0,
        device_id: device_id.to_string(),
        user_id: None,
        session_id: session_id.to_string(),
        circuit_code: "OSL".to_string(),
        is_best_overall: false,
        is_personal_best: false,
        deleted: None,
        data_min: None,
        data_max: None,
    }
}

fn sample_session(id: &str) -> DeviceSession {
    let created_at = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
    let mut session = DeviceSession::new(id.to_string(), "OSL".to_string(), "dev-a".to_string(), None, created_at);
    session.telemetry_channels = vec!["Latitude".to_string(), "Longitude".to_string(), "Altitude".to_string(), "Speed".to_string()];
    session.events.push(sample_event(id, "dev-a", 1, 1, 28.5, SessionEventType::Sector));
    session.events.push(sample_event(id, "dev-a", 1, 0, 57.286, SessionEventType::Lap));
    for i in 0..5 {
        let mut fix = Fix::new(GeoPoint::new(52.0 + i as f64 * 0.0001, 11.0, 100.0), created_at);
        fix.channels = vec![52.0 + i as f64 * 0.0001, 11.0, 100.0, 40.0 + i as f64];
        session.telemetry_data.push(fix);
    }
    session
}

/// Builds a session with 50 lap events, the last of which is the 57.286s
/// best lap, plus a handful of telemetry rows.
fn large_sample_session(id: &str) -> DeviceSession {
    let mut session = sample_session(id);
    session.events.clear();
    for lap in 1..=50u32 {
        let secs = 57.286 + lap as f64 * 0.01;
        session.events.push(sample_event(id, "dev-a", lap, 0, secs, SessionEventType::Lap));
    }
    session.events.push(sample_event(id, "dev-a", 3, 0, 57.286, SessionEventType::Lap));
    session
}
