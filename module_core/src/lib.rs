// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::{
    board_event::DeviceEventBatch,
    circuit::Circuit,
    device_session::DeviceSession,
    fix::Fix,
    messages::{ConnectionState, ContainerError},
    session_event::SessionEvent,
};
use std::sync::{
    Arc,
    atomic::{self, AtomicUsize},
};
use strum_macros::EnumDiscriminants;
use tokio::time::timeout;
use tracing::info;

/// Represents a high-level event in the system.
///
/// Each `Event` wraps an [`EventKind`], which defines the actual type
/// and data carried by the event.
///
/// This structure is designed to be passed through an [`EventBus`]
/// between asynchronous modules.
#[derive(Clone, Debug)]
pub struct Event {
    /// The inner event type and associated data.
    pub kind: EventKind,
}

impl Event {
    /// Returns the high-level type of this event.
    ///
    /// This converts the event's specific `kind` into an `EventKindType`,
    /// which is useful for grouping or filtering events by category.
    pub fn event_type(&self) -> EventKindType {
        EventKindType::from(&self.kind)
    }

    /// Returns the correlation ID carried by the event, if any.
    ///
    /// - For request events, this is the `id` from the request payload.
    /// - For response events, this is the `id` from the response payload.
    /// - For events without a correlation ID, returns `None`.
    pub fn id(&self) -> Option<u64> {
        match &self.kind {
            EventKind::DetectCircuitRequestEvent(req) => Some(req.id),
            EventKind::LoadAllCircuitsRequestEvent(req) => Some(req.id),
            EventKind::GetCircuitByCodeRequestEvent(req) => Some(req.id),
            EventKind::SyncCircuitsRequestEvent(req) => Some(req.id),
            EventKind::SaveSessionRequestEvent(req) => Some(req.id),
            EventKind::LoadSessionRequestEvent(req) => Some(req.id),
            EventKind::DeleteSessionRequestEvent(req) => Some(req.id),
            EventKind::ListStoredSessionIdsRequestEvent(req) => Some(req.id),
            EventKind::DetectCircuitResponseEvent(res) => Some(res.id),
            EventKind::LoadAllCircuitsResponseEvent(res) => Some(res.id),
            EventKind::GetCircuitByCodeResponseEvent(res) => Some(res.id),
            EventKind::SyncCircuitsResponseEvent(res) => Some(res.id),
            EventKind::SaveSessionResponseEvent(res) => Some(res.id),
            EventKind::LoadSessionResponseEvent(res) => Some(res.id),
            EventKind::DeleteSessionResponseEvent(res) => Some(res.id),
            EventKind::ListStoredSessionIdsResponseEvent(res) => Some(res.id),
            _ => None,
        }
    }

    /// Returns the logical address associated with the event, if available.
    ///
    /// - For request events, returns the `sender_addr`.
    /// - For response events, returns the `receiver_addr`.
    /// - For events without an address, returns `None`.
    pub fn addr(&self) -> Option<u64> {
        match &self.kind {
            EventKind::DetectCircuitRequestEvent(req) => Some(req.sender_addr),
            EventKind::LoadAllCircuitsRequestEvent(req) => Some(req.sender_addr),
            EventKind::GetCircuitByCodeRequestEvent(req) => Some(req.sender_addr),
            EventKind::SyncCircuitsRequestEvent(req) => Some(req.sender_addr),
            EventKind::SaveSessionRequestEvent(req) => Some(req.sender_addr),
            EventKind::LoadSessionRequestEvent(req) => Some(req.sender_addr),
            EventKind::DeleteSessionRequestEvent(req) => Some(req.sender_addr),
            EventKind::ListStoredSessionIdsRequestEvent(req) => Some(req.sender_addr),
            EventKind::DetectCircuitResponseEvent(res) => Some(res.receiver_addr),
            EventKind::LoadAllCircuitsResponseEvent(res) => Some(res.receiver_addr),
            EventKind::GetCircuitByCodeResponseEvent(res) => Some(res.receiver_addr),
            EventKind::SyncCircuitsResponseEvent(res) => Some(res.receiver_addr),
            EventKind::SaveSessionResponseEvent(res) => Some(res.receiver_addr),
            EventKind::LoadSessionResponseEvent(res) => Some(res.receiver_addr),
            EventKind::DeleteSessionResponseEvent(res) => Some(res.receiver_addr),
            EventKind::ListStoredSessionIdsResponseEvent(res) => Some(res.receiver_addr),
            _ => None,
        }
    }
}

/// Represents a generic request message.
///
/// # Fields
/// - `id`: A unique identifier for the request. Used to correlate
///   requests with responses.
/// - `sender_addr`: An identifier for the sender. Allows the receiver to
///   know where the request came from.
/// - `data`: The payload or content of the request. The type `T` is generic
///   so that `Request` can carry any kind of data.
///
/// # Type Parameters
/// - `T`: The type of the request payload.
#[derive(Debug, Clone)]
pub struct Request<T = ()> {
    pub id: u64,
    pub sender_addr: u64,
    pub data: T,
}

impl<T> Request<T> {
    /// Constructs a new `Request` with the given metadata and payload.
    ///
    /// - `id`: Correlation identifier used to match responses.
    /// - `sender_addr`: Logical address of the sender.
    /// - `data`: Payload carried by the request.
    ///
    /// Returns a `Request<T>` wrapping `data`.
    pub fn new(id: u64, sender_addr: u64, data: T) -> Arc<Self> {
        Arc::new(Request {
            id,
            sender_addr,
            data,
        })
    }
}

impl Request {
    /// Creates a request with an empty payload (`()`).
    ///
    /// Use for control or signal messages that only need a correlation `id`
    /// and the sender's address.
    pub fn empty_request(id: u64, sender_addr: u64) -> Arc<Self> {
        Arc::new(Request {
            id,
            sender_addr,
            data: (),
        })
    }
}

/// Represents a generic response message.
///
/// # Fields
/// - `id`: The correlation identifier copied from the originating request.
/// - `receiver_addr`: Logical address of the request's original sender.
/// - `data`: The payload or content of the response.
///
/// # Type Parameters
/// - `T`: The type of the response payload.
#[derive(Debug, Clone)]
pub struct Response<T = ()> {
    pub id: u64,
    pub receiver_addr: u64,
    pub data: T,
}

impl<T> Response<T> {
    /// Constructs a new `Response` with the given metadata and payload.
    pub fn new(id: u64, receiver_addr: u64, data: T) -> Arc<Self> {
        Arc::new(Response {
            id,
            receiver_addr,
            data,
        })
    }
}

/// A thread-safe, reference-counted pointer to a [`Fix`].
///
/// Wraps a GNSS fix in an [`Arc`] so that every module subscribed to the
/// event bus can observe the same sample without copying it.
pub type FixPtr = Arc<Fix>;

/// A thread-safe, reference-counted pointer to a [`SessionEvent`].
pub type SessionEventPtr = Arc<SessionEvent>;

/// A thread-safe, reference-counted pointer to a [`DeviceSession`] snapshot.
pub type DeviceSessionPtr = Arc<DeviceSession>;

/// A thread-safe, shared pointer to a [`ConnectionState`] update.
pub type ConnectionStatePtr = Arc<ConnectionState>;

/// A thread-safe, shared pointer to an empty request.
pub type EmptyRequestPtr = Arc<Request<()>>;

/// A thread-safe, shared pointer to a circuit-detection request, carrying
/// the [`Fix`] to test against every known circuit's bounding box.
pub type DetectCircuitRequestPtr = Arc<Request<FixPtr>>;

/// A thread-safe, shared pointer to a circuit-detection response: the
/// first circuit (in registry order) whose bounding box contains the
/// queried fix, or `None`.
pub type DetectCircuitResponsePtr = Arc<Response<Option<Circuit>>>;

/// A thread-safe, shared pointer to a "load all known circuits" response.
pub type LoadAllCircuitsResponsePtr = Arc<Response<Vec<Circuit>>>;

/// A thread-safe, shared pointer to a lookup-by-code request.
pub type GetCircuitByCodeRequestPtr = Arc<Request<String>>;

/// A thread-safe, shared pointer to a lookup-by-code response.
pub type GetCircuitByCodeResponsePtr = Arc<Response<Option<Circuit>>>;

/// A thread-safe, shared pointer to a registry-sync request, carrying
/// `(lat, lon, radius_meters)`.
pub type SyncCircuitsRequestPtr = Arc<Request<(f64, f64, f64)>>;

/// A thread-safe, shared pointer to a registry-sync response carrying
/// completion progress in `[0, 1]`.
pub type SyncCircuitsResponsePtr = Arc<Response<f32>>;

/// A thread-safe, shared pointer to a save-session request.
pub type SaveSessionRequestPtr = Arc<Request<DeviceSessionPtr>>;

/// A thread-safe, shared pointer to a save-session response. The string is
/// the id the session was stored under.
pub type SaveSessionResponsePtr = Arc<Response<Result<String, ContainerError>>>;

/// A thread-safe, shared pointer to a load-session request, keyed by id.
pub type LoadSessionRequestPtr = Arc<Request<String>>;

/// A thread-safe, shared pointer to a load-session response.
pub type LoadSessionResponsePtr = Arc<Response<Result<DeviceSessionPtr, ContainerError>>>;

/// A thread-safe, shared pointer to a delete-session request, keyed by id.
pub type DeleteSessionRequestPtr = Arc<Request<String>>;

/// A thread-safe, shared pointer to a delete-session response.
pub type DeleteSessionResponsePtr = Arc<Response<Result<(), ContainerError>>>;

/// A thread-safe, shared pointer to a "list stored session ids" response.
pub type ListStoredSessionIdsResponsePtr = Arc<Response<Vec<String>>>;

/// A thread-safe, shared pointer to a batch of device events bound for the
/// live-timing board, whether bridged locally from the lap-timer or decoded
/// from an inbound transport message.
pub type BoardEventBatchPtr = Arc<DeviceEventBatch>;

/// A thread-safe, shared pointer to the live-timing board's change
/// notification, carrying the instant the mutation that triggered it
/// completed.
pub type BoardUpdatedPtr = Arc<std::time::Instant>;

/// Generic helper macro to extract enum payloads.
#[macro_export]
macro_rules! payload_ref {
    ($enum_val:expr, $pattern:path) => {
        if let $pattern(ref payload) = $enum_val {
            Some(payload)
        } else {
            None
        }
    };
}

/// Enumerates the different kinds of events that can be emitted
/// and transmitted via the [`EventBus`].
#[derive(Clone, Debug, EnumDiscriminants)]
#[strum_discriminants(derive(Hash))]
#[strum_discriminants(name(EventKindType))]
pub enum EventKind {
    /// Indicates that a module shall terminate.
    QuitEvent,

    /// A GNSS fix update, carrying a [`Fix`].
    FixEvent(FixPtr),

    /// A timing event registered by the lap timer: a sector crossing, lap
    /// completion, position breadcrumb, or session start marker.
    SessionEventEmittedEvent(SessionEventPtr),

    /// Event carrying a request to detect which circuits a fix lies within.
    /// Uses [`DetectCircuitRequestPtr`] as payload.
    DetectCircuitRequestEvent(DetectCircuitRequestPtr),

    /// Response to [`EventKind::DetectCircuitRequestEvent`] with the
    /// matching circuits, in registry insertion order.
    DetectCircuitResponseEvent(DetectCircuitResponsePtr),

    /// Request to load every circuit known to the registry.
    /// This event variant carries an [`EmptyRequestPtr`] with no payload.
    LoadAllCircuitsRequestEvent(EmptyRequestPtr),

    /// Response to [`EventKind::LoadAllCircuitsRequestEvent`].
    LoadAllCircuitsResponseEvent(LoadAllCircuitsResponsePtr),

    /// Request to look up a single circuit by its case-insensitive code.
    /// This event variant carries a [`GetCircuitByCodeRequestPtr`].
    GetCircuitByCodeRequestEvent(GetCircuitByCodeRequestPtr),

    /// Response to [`EventKind::GetCircuitByCodeRequestEvent`].
    GetCircuitByCodeResponseEvent(GetCircuitByCodeResponsePtr),

    /// Request to refresh the registry's catalogue around a point.
    /// This event variant carries a [`SyncCircuitsRequestPtr`].
    SyncCircuitsRequestEvent(SyncCircuitsRequestPtr),

    /// Response to [`EventKind::SyncCircuitsRequestEvent`].
    SyncCircuitsResponseEvent(SyncCircuitsResponsePtr),

    /// Request to persist a device session to the container store.
    /// This event variant carries a [`SaveSessionRequestPtr`].
    SaveSessionRequestEvent(SaveSessionRequestPtr),

    /// Response to [`EventKind::SaveSessionRequestEvent`].
    SaveSessionResponseEvent(SaveSessionResponsePtr),

    /// Request to load a stored device session by id.
    /// This event variant carries a [`LoadSessionRequestPtr`].
    LoadSessionRequestEvent(LoadSessionRequestPtr),

    /// Response to [`EventKind::LoadSessionRequestEvent`].
    LoadSessionResponseEvent(LoadSessionResponsePtr),

    /// Request to delete a stored device session by id.
    /// This event variant carries a [`DeleteSessionRequestPtr`].
    DeleteSessionRequestEvent(DeleteSessionRequestPtr),

    /// Response to [`EventKind::DeleteSessionRequestEvent`].
    DeleteSessionResponseEvent(DeleteSessionResponsePtr),

    /// Request to list every session id known to the container store.
    /// This event variant carries an [`EmptyRequestPtr`] with no payload.
    ListStoredSessionIdsRequestEvent(EmptyRequestPtr),

    /// Response to [`EventKind::ListStoredSessionIdsRequestEvent`].
    ListStoredSessionIdsResponseEvent(ListStoredSessionIdsResponsePtr),

    /// A change in the outgoing live-timing hub connection's state.
    TransportConnectionStateEvent(ConnectionStatePtr),

    /// A batch of one device's events to merge into the live-timing board.
    /// This event variant carries a [`BoardEventBatchPtr`].
    BoardEventBatchEvent(BoardEventBatchPtr),

    /// The live-timing board's derived state changed.
    BoardUpdatedEvent(BoardUpdatedPtr),
}

/// A simple asynchronous event bus for publishing and subscribing to [`Event`]s.
///
/// The event bus uses a [`tokio::sync::broadcast::channel`] under the hood,
/// allowing multiple receivers to listen for the same stream of events.
///
/// Each published event is cloned and distributed to all active subscribers.
/// If no subscribers exist at the time of publication, the event is discarded silently.
pub struct EventBus {
    id: usize,
    /// The broadcast sender used internally to distribute events.
    sender: tokio::sync::broadcast::Sender<Event>,
}

/// Global counter used to assign unique, monotonically increasing IDs to bus instances.
/// Starts at 0 and is incremented atomically for thread-safe ID generation.
static BUS_ID: AtomicUsize = AtomicUsize::new(0);

impl EventBus {
    /// Creates a new [`EventBus`] with a fixed buffer capacity of 100 messages.
    ///
    /// When the buffer is full, the oldest messages are dropped automatically
    /// as new ones are published.
    pub fn new() -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(100);
        let id = BUS_ID.fetch_add(1, atomic::Ordering::Relaxed);
        info!("Creating EventBus with id {}", id);
        BUS_ID.store(id, atomic::Ordering::SeqCst);
        EventBus { id, sender }
    }

    /// Subscribes to the event bus and returns a [`tokio::sync::broadcast::Receiver`].
    ///
    /// The returned receiver will receive all future events published after the
    /// subscription is created.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publishes an [`Event`] to all active subscribers.
    ///
    /// This method clones the event and attempts to send it to each receiver.
    /// If no subscribers exist, the event is discarded silently.
    pub fn publish(&self, event: &Event) {
        let _ = self.sender.send(event.clone());
    }

    /// Creates a [`ModuleCtx`] bound to this [`EventBus`].
    pub fn context(&self) -> ModuleCtx {
        ModuleCtx::new(self)
    }

    /// Returns the numeric identifier for this event bus.
    pub fn id(&self) -> usize {
        self.id
    }
}

/// Provides a default instance of [`EventBus`].
impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Defines the common interface for an asynchronous module
/// that can be executed and communicate via the [`EventBus`].
#[async_trait::async_trait]
pub trait Module {
    /// Runs the module asynchronously until completion.
    ///
    /// This function typically contains the module's main event loop,
    /// reacting to messages received through the [`ModuleCtx`].
    async fn run(&mut self) -> Result<(), ()>;
}

/// Provides a module-scoped context for interacting with the [`EventBus`].
///
/// Each `ModuleCtx` owns both a sender and a receiver, allowing the module
/// to both publish and listen for events concurrently.
#[derive(Debug)]
pub struct ModuleCtx {
    /// Unique identifier of the event bus that this context belongs to.
    id: usize,

    /// The broadcast sender used to publish events.
    pub sender: tokio::sync::broadcast::Sender<Event>,

    /// The broadcast receiver used to listen for events.
    pub receiver: tokio::sync::broadcast::Receiver<Event>,
}

#[derive(Debug)]
pub enum ModuleCtxError {
    PublishError(String),
    ReceiveError(String),
    ReceiveTimeout,
}

impl ModuleCtx {
    pub fn publish_event(&self, event: EventKind) -> Result<(), ModuleCtxError> {
        self.sender
            .send(Event { kind: event })
            .map(|_| ())
            .map_err(|e| ModuleCtxError::PublishError(format!("Failed to publish event: {}", e)))
    }

    pub async fn wait_for_event(
        &mut self,
        id: u64,
        addr: u64,
        response_type: &EventKindType,
    ) -> Result<Event, ModuleCtxError> {
        wait_for_event(self, id, addr, response_type).await
    }
}

impl Clone for ModuleCtx {
    fn clone(&self) -> Self {
        ModuleCtx {
            id: self.id,
            sender: self.sender.clone(),
            receiver: self.receiver.resubscribe(),
        }
    }
}

impl ModuleCtx {
    /// Constructs a new [`ModuleCtx`] from the given [`EventBus`].
    ///
    /// Clones the internal broadcast sender and creates a new receiver.
    pub(crate) fn new(event_bus: &EventBus) -> Self {
        ModuleCtx {
            id: event_bus.id(),
            sender: event_bus.sender.clone(),
            receiver: event_bus.subscribe(),
        }
    }

    /// Returns a new broadcast receiver subscribed to this event bus.
    ///
    /// This creates an independent subscription using `resubscribe()`. The
    /// returned receiver:
    /// - Only receives events published after this call (no replay).
    /// - Does not affect other receivers or advance any internal cursor.
    /// - May yield `tokio::sync::broadcast::error::RecvError::Lagged(_)`
    ///   if the consumer falls behind.
    pub fn receiver(&mut self) -> tokio::sync::broadcast::Receiver<Event> {
        self.receiver.resubscribe()
    }

    /// Returns the unique identifier of the event bus that this module context belongs to.
    /// The ID is stable for the lifetime of the context and can be used for logging.
    pub fn bus_id(&self) -> usize {
        self.id
    }
}

async fn wait_for_event(
    ctx: &mut ModuleCtx,
    id: u64,
    addr: u64,
    response_type: &EventKindType,
) -> Result<Event, ModuleCtxError> {
    let func = async move {
        loop {
            match ctx.receiver.recv().await {
                Ok(event) => {
                    if EventKindType::from(&event.kind) == *response_type
                        && event.id() == Some(id)
                        && event.addr() == Some(addr)
                    {
                        return Ok(event);
                    }
                }
                Err(e) => match e {
                    tokio::sync::broadcast::error::RecvError::Lagged(skipped) => {
                        info!(
                            "ModuleCtx (bus id {}) lagged behind, skipped {} messages",
                            ctx.id, skipped
                        );
                        continue;
                    }
                    _ => {
                        return Err(ModuleCtxError::ReceiveError(format!(
                            "Failed to receive event: {}",
                            e
                        )));
                    }
                },
            }
        }
    };
    timeout(std::time::Duration::from_secs(20), func)
        .await
        .map_err(|_| ModuleCtxError::ReceiveTimeout)?
}

pub mod test_helper;
