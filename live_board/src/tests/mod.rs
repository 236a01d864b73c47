// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{RankingKind, SessionBoard};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use common::board_event::{BoardRawEvent, DeviceEventBatch};
use common::session_event::SessionEventType;
use std::time::Duration;

fn base_time() -> DateTime<Utc> {
    Utc::now()
}

fn raw_event(id: &str, event_type: SessionEventType, lap: u32, sector: u32, secs: f64, ts: DateTime<Utc>) -> BoardRawEvent {
    BoardRawEvent {
        id: id.to_string(),
        event_type,
        lap_number: lap,
        sector,
        time: Duration::from_secs_f64(secs),
        timestamp: ts,
        deleted: false,
    }
}

fn batch(session_id: &str, device_id: &str, events: Vec<BoardRawEvent>) -> DeviceEventBatch {
    DeviceEventBatch {
        session_id: session_id.to_string(),
        device_id: device_id.to_string(),
        display_name: None,
        category: None,
        events,
    }
}

#[test]
fn device_and_board_best_lap_track_the_minimum() {
    let mut board = SessionBoard::new("s1".into());
    let t0 = base_time();
    board.add_device_events(
        &batch("s1", "dev-a", vec![raw_event("a-lap-1", SessionEventType::Lap, 1, 0, 31.0, t0)]),
        false,
    );
    board.add_device_events(
        &batch(
            "s1",
            "dev-a",
            vec![raw_event("a-lap-2", SessionEventType::Lap, 2, 0, 29.5, t0 + ChronoDuration::seconds(31))],
        ),
        false,
    );

    let dev = board.device("dev-a").unwrap();
    let best_idx = dev.best_lap.unwrap();
    assert_eq!(dev.events[best_idx].id, "a-lap-2");
    assert!(dev.events[best_idx].was_personal_best);
    assert_eq!(board.best_lap.as_ref().unwrap().event_id, "a-lap-2");
}

#[test]
fn device_and_board_best_sector_track_the_minimum() {
    let mut board = SessionBoard::new("s1".into());
    let t0 = base_time();
    board.add_device_events(
        &batch("s1", "dev-a", vec![raw_event("a-s1-1", SessionEventType::Sector, 1, 1, 20.0, t0)]),
        false,
    );
    board.add_device_events(
        &batch(
            "s1",
            "dev-b",
            vec![raw_event("b-s1-1", SessionEventType::Sector, 1, 1, 18.5, t0 + ChronoDuration::seconds(1))],
        ),
        false,
    );

    assert_eq!(board.best_sectors.get(&1).unwrap().event_id, "b-s1-1");
    let dev_a = board.device("dev-a").unwrap();
    assert_eq!(dev_a.events[dev_a.best_sectors[&1]].id, "a-s1-1");
}

#[test]
fn soft_deleting_an_event_removes_it_from_bests() {
    let mut board = SessionBoard::new("s1".into());
    let t0 = base_time();
    board.add_device_events(
        &batch("s1", "dev-a", vec![raw_event("a-lap-1", SessionEventType::Lap, 1, 0, 30.0, t0)]),
        false,
    );
    assert_eq!(board.best_lap.as_ref().unwrap().event_id, "a-lap-1");

    let mut delete = raw_event("a-lap-1", SessionEventType::Lap, 1, 0, 30.0, t0);
    delete.deleted = true;
    board.add_device_events(&batch("s1", "dev-a", vec![delete]), false);

    assert!(board.best_lap.is_none());
    let dev = board.device("dev-a").unwrap();
    assert!(dev.events[0].deleted);
}

#[test]
fn rebuild_statistics_is_idempotent() {
    let mut board = SessionBoard::new("s1".into());
    let t0 = base_time();
    board.add_device_events(
        &batch(
            "s1",
            "dev-a",
            vec![
                raw_event("a-lap-1", SessionEventType::Lap, 1, 0, 30.0, t0),
                raw_event("a-sector-1", SessionEventType::Sector, 2, 1, 10.0, t0 + ChronoDuration::seconds(30)),
            ],
        ),
        false,
    );
    let before = board.best_lap.clone();
    board.rebuild_statistics();
    let after = board.best_lap.clone();
    assert_eq!(before, after);
}

#[test]
fn deleting_the_fastest_device_promotes_the_remaining_one() {
    let mut board = SessionBoard::new("s1".into());
    let t0 = base_time();
    board.add_device_events(
        &batch("s1", "dev-slow", vec![raw_event("slow-lap-1", SessionEventType::Lap, 1, 0, 31.0, t0)]),
        false,
    );
    board.add_device_events(
        &batch(
            "s1",
            "dev-fast",
            vec![raw_event("fast-lap-1", SessionEventType::Lap, 1, 0, 29.0, t0 + ChronoDuration::seconds(1))],
        ),
        false,
    );
    assert_eq!(board.best_lap.as_ref().unwrap().event_id, "fast-lap-1");

    board.mark_device_deleted("dev-fast");
    assert_eq!(board.best_lap.as_ref().unwrap().event_id, "slow-lap-1");

    board.mark_device_deleted("dev-slow");
    assert!(board.best_lap.is_none());
    assert!(board.best_sectors.is_empty());
}

#[test]
fn ranking_orders_by_best_lap_and_reports_gap_and_interval() {
    let mut board = SessionBoard::new("s1".into());
    let t0 = base_time();
    board.add_device_events(
        &batch("s1", "dev-a", vec![raw_event("a-lap-1", SessionEventType::Lap, 1, 0, 30.5, t0)]),
        false,
    );
    board.add_device_events(
        &batch(
            "s1",
            "dev-b",
            vec![raw_event("b-lap-1", SessionEventType::Lap, 1, 0, 29.9, t0 + ChronoDuration::seconds(1))],
        ),
        false,
    );
    board.add_device_events(
        &batch(
            "s1",
            "dev-c",
            vec![raw_event("c-lap-1", SessionEventType::Lap, 1, 0, 31.0, t0 + ChronoDuration::seconds(2))],
        ),
        false,
    );

    let ranking = board.get_ranking(RankingKind::BestLap, None);
    let ids: Vec<&str> = ranking.rows.iter().map(|r| r.device_id.as_str()).collect();
    assert_eq!(ids, vec!["dev-b", "dev-a", "dev-c"]);

    let row_a = ranking.row_for("dev-a").unwrap();
    assert_eq!(row_a.gap.unwrap().as_millis(), 600);
    assert_eq!(row_a.interval.unwrap().as_millis(), 600);
    assert_eq!(row_a.previous_rank, row_a.rank);
    assert!(!row_a.has_changed);

    board.add_device_events(
        &batch(
            "s1",
            "dev-c",
            vec![raw_event("c-lap-2", SessionEventType::Lap, 2, 0, 29.7, t0 + ChronoDuration::seconds(33))],
        ),
        false,
    );
    let ranking2 = board.get_ranking(RankingKind::BestLap, Some(&ranking));
    let row_c = ranking2.row_for("dev-c").unwrap();
    assert_eq!(row_c.rank, 1);
    assert_eq!(row_c.previous_rank, 3);
    assert!(row_c.has_changed);
}

#[test]
fn out_of_order_event_triggers_rebuild() {
    let mut board = SessionBoard::new("s1".into());
    let t0 = base_time();
    let r1 = board.add_device_events(
        &batch(
            "s1",
            "dev-a",
            vec![raw_event("a-1", SessionEventType::Lap, 1, 0, 30.0, t0 + ChronoDuration::seconds(10))],
        ),
        false,
    );
    assert!(r1.statistics_rebuilt);

    let r2 = board.add_device_events(
        &batch("s1", "dev-a", vec![raw_event("a-0", SessionEventType::Sector, 1, 1, 10.0, t0)]),
        false,
    );
    assert!(r2.statistics_rebuilt);
}
