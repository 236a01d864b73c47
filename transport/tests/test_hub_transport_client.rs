// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::board_event::DeviceEventBatch;
use common::messages::ConnectionState;
use module_core::test_helper::{stop_module, wait_for_event};
use module_core::{EventBus, EventKindType, Module};
use std::sync::Arc;
use std::time::Duration;
use transport::test_helper::{FakeHub, InstantTicker};
use transport::HubTransportClient;

fn batch(session_id: &str, device_id: &str) -> DeviceEventBatch {
    DeviceEventBatch {
        session_id: session_id.to_string(),
        device_id: device_id.to_string(),
        display_name: None,
        category: None,
        events: Vec::new(),
    }
}

#[tokio::test]
async fn connect_against_a_reliable_hub_reaches_connected_and_publishes_the_transition() {
    let event_bus = EventBus::default();
    let hub: Arc<FakeHub> = Arc::new(FakeHub::always_succeeds());
    let client = HubTransportClient::with_ticker(event_bus.context(), hub, Arc::new(InstantTicker));
    let mut rx = event_bus.subscribe();

    let state = client.connect("hub://test").await;

    assert_eq!(state, ConnectionState::Connected);
    assert_eq!(client.connection_state(), ConnectionState::Connected);
    let _ = wait_for_event(&mut rx, Duration::from_millis(500), EventKindType::TransportConnectionStateEvent).await;
}

#[tokio::test]
async fn connect_against_a_hub_that_never_succeeds_gives_up_disconnected() {
    let event_bus = EventBus::default();
    let hub: Arc<FakeHub> = Arc::new(FakeHub::failing_connect(u64::MAX));
    let client = HubTransportClient::with_ticker(event_bus.context(), hub.clone(), Arc::new(InstantTicker));

    let state = client.connect("hub://test").await;

    assert_eq!(state, ConnectionState::Disconnected);
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    assert_eq!(hub.connect_call_count(), 5);
}

#[tokio::test]
async fn enqueued_batches_are_sent_through_the_running_actor() {
    let event_bus = EventBus::default();
    let hub: Arc<FakeHub> = Arc::new(FakeHub::failing_send(2));
    let mut actor = HubTransportClient::with_ticker(event_bus.context(), hub.clone(), Arc::new(InstantTicker));

    assert!(actor.enqueue(batch("s1", "dev-a")));

    let mut handle = tokio::spawn(async move { actor.run().await });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while hub.send_call_count() < 3 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(hub.send_call_count(), 3);
    assert_eq!(hub.sent_batches().len(), 1);

    stop_module(&event_bus, &mut handle).await;
}

#[tokio::test]
async fn the_outgoing_queue_rejects_batches_once_full() {
    let event_bus = EventBus::default();
    let hub: Arc<FakeHub> = Arc::new(FakeHub::always_succeeds());
    // Don't spawn the actor: the queue never drains, so it fills up.
    let client = HubTransportClient::with_ticker(event_bus.context(), hub, Arc::new(InstantTicker));

    let mut accepted = 0;
    let mut rejected = false;
    for _ in 0..300 {
        if client.enqueue(batch("s1", "dev-a")) {
            accepted += 1;
        } else {
            rejected = true;
            break;
        }
    }

    assert!(accepted > 0);
    assert!(rejected, "queue should eventually reject once its bounded capacity is hit");
}
