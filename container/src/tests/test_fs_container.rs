use super::{get_path, large_sample_session, sample_session, setup_empty_test_folder};
use crate::FsSessionContainer;
use common::messages::ContainerError;
use common::session_event::SessionEventType;
use module_core::test_helper::{stop_module, wait_for_event};
use module_core::{Event, EventBus, EventKind, EventKindType, Module, Request};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn save_then_load_round_trips_a_session() {
    let folder = setup_empty_test_folder("save_then_load");
    let container = FsSessionContainer::new(&folder, EventBus::default().context());
    let session = sample_session("s1");

    container.save(&session).await.unwrap_or_else(|e| panic!("save failed: {e:?}"));
    let loaded = container.load("s1").await.unwrap_or_else(|e| panic!("load failed: {e:?}"));

    assert_eq!(loaded.id, session.id);
    assert_eq!(loaded.telemetry_data.len(), session.telemetry_data.len());
}

#[tokio::test]
async fn zip_wrapped_session_round_trips() {
    let folder = setup_empty_test_folder("zip_round_trip");
    let container = FsSessionContainer::new(&folder, EventBus::default().context()).with_zip(true);
    let session = sample_session("s1");

    container.save(&session).await.unwrap_or_else(|e| panic!("save failed: {e:?}"));
    assert!(std::path::Path::new(&format!("{folder}/s1.lvz")).exists());

    let loaded = container.load("s1").await.unwrap_or_else(|e| panic!("load failed: {e:?}"));
    assert_eq!(loaded.id, session.id);
}

#[tokio::test]
async fn fifty_lap_session_round_trips_the_best_lap_within_a_millisecond() {
    let folder = setup_empty_test_folder("fifty_lap_round_trip");
    let container = FsSessionContainer::new(&folder, EventBus::default().context());
    let session = large_sample_session("s1");
    let original_event_count = session.events.len();

    container.save(&session).await.unwrap_or_else(|e| panic!("save failed: {e:?}"));
    let loaded = container.load("s1").await.unwrap_or_else(|e| panic!("load failed: {e:?}"));

    assert_eq!(loaded.events.len(), original_event_count);
    let lap_three = loaded
        .events
        .iter()
        .find(|e| e.event_type == SessionEventType::Lap && e.lap_number == 3 && e.time.as_secs_f64() < 57.3)
        .expect("lap 3's near-57.286s event survives the round trip");
    assert!((lap_three.time.as_secs_f64() - 57.286).abs() < 0.001);
}

#[tokio::test]
async fn delete_removes_the_session_and_its_info_sidecar() {
    let folder = setup_empty_test_folder("delete_session");
    let container = FsSessionContainer::new(&folder, EventBus::default().context());
    let session = sample_session("s1");

    container.save(&session).await.unwrap();
    container.delete("s1").await.unwrap_or_else(|e| panic!("delete failed: {e:?}"));

    assert!(matches!(container.load("s1").await, Err(ContainerError::NotFound)));
    assert!(!std::path::Path::new(&format!("{folder}/s1.info")).exists());
}

#[tokio::test]
async fn ids_lists_every_stored_session_once() {
    let folder = setup_empty_test_folder("list_ids");
    let container = FsSessionContainer::new(&folder, EventBus::default().context());
    container.save(&sample_session("s1")).await.unwrap();
    container.save(&sample_session("s2")).await.unwrap();

    let mut ids = container.ids().await.unwrap();
    ids.sort();
    assert_eq!(ids, vec!["s1".to_string(), "s2".to_string()]);
}

#[tokio::test]
async fn load_of_an_unknown_id_reports_not_found() {
    let folder = setup_empty_test_folder("load_missing");
    let container = FsSessionContainer::new(&folder, EventBus::default().context());
    assert!(matches!(container.load("missing").await, Err(ContainerError::NotFound)));
}

#[tokio::test]
async fn the_module_actor_saves_and_loads_sessions_over_the_event_bus() {
    let folder = setup_empty_test_folder("actor_save_load");
    let event_bus = EventBus::default();
    let ctx = event_bus.context();
    let mut actor = tokio::spawn(async move {
        let mut container = FsSessionContainer::new(folder, ctx);
        container.run().await
    });

    let session = Arc::new(sample_session("s1"));
    event_bus.publish(&Event {
        kind: EventKind::SaveSessionRequestEvent(Request::new(1, 0, session)),
    });
    let saved = wait_for_event(&mut event_bus.subscribe(), Duration::from_millis(500), EventKindType::SaveSessionResponseEvent).await;
    let EventKind::SaveSessionResponseEvent(resp) = saved.kind else { panic!("unexpected event") };
    assert_eq!(resp.data, Ok("s1".to_string()));

    event_bus.publish(&Event {
        kind: EventKind::LoadSessionRequestEvent(Request::new(2, 0, "s1".to_string())),
    });
    let loaded = wait_for_event(&mut event_bus.subscribe(), Duration::from_millis(500), EventKindType::LoadSessionResponseEvent).await;
    let EventKind::LoadSessionResponseEvent(resp) = loaded.kind else { panic!("unexpected event") };
    assert_eq!(resp.data.unwrap().id, "s1");

    stop_module(&event_bus, &mut actor).await
}
