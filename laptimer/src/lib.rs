// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! The lap-timer core: turns a per-device stream of GPS fixes into a
//! well-ordered log of sector crossings, lap completions and, optionally,
//! position breadcrumbs.
//!
//! [`LapTimer`] is a plain, synchronous struct with no knowledge of the
//! event bus; [`LapTimerActor`] wraps it for the `module_core` world the
//! rest of the system runs in, the same split `circuit_registry` uses
//! between `CircuitRegistry` and `CircuitRegistryActor`.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use common::{
    circuit::{Circuit, CircuitType},
    device_session::DeviceSession,
    fix::Fix,
    messages::LaptimerError,
    session_event::{SessionEvent, SessionEventType},
};
use geo::{IntersectFilter, Segment};
use module_core::{DetectCircuitRequestPtr, Event, EventKind, Module, ModuleCtx, Request};
use rand::{Rng, distr::Alphanumeric, rng};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{error, info};

/// Recognized options for [`LapTimer`]. Defaults match the defaults the core
/// falls back to when a field is left unset.
#[derive(Clone, Debug, PartialEq)]
pub struct LaptimerConfig {
    /// Create a session automatically on the first fix once a circuit is
    /// set, instead of requiring an explicit [`LapTimer::create_session`].
    pub auto_start_detection: bool,
    /// Size of the recent-fix ring kept for trajectory detection; clamped
    /// to a minimum of 2.
    pub max_telemetry_data_retention: usize,
    /// Minimum wall-clock time between two consecutive detections when the
    /// circuit itself has no `sector_timeout_seconds` configured.
    pub minimum_time_between_events: Duration,
    /// A session with no new event within this long is closed.
    pub session_timeout: Duration,
    /// Emit a Position breadcrumb event alongside every processed fix.
    pub track_position: bool,
    /// Device identifier stamped on every emitted event. A blank value is
    /// replaced with a freshly generated one at construction time.
    pub device_id: String,
    pub user_id: Option<String>,
}

impl Default for LaptimerConfig {
    fn default() -> Self {
        LaptimerConfig {
            auto_start_detection: false,
            max_telemetry_data_retention: 5,
            minimum_time_between_events: Duration::from_secs(5),
            session_timeout: Duration::from_secs(15 * 60),
            track_position: false,
            device_id: String::new(),
            user_id: None,
        }
    }
}

/// Finite state machine the timer walks through as a circuit and session
/// come and go: `Idle -> Armed -> Running -> Paused -> Running -> Armed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaptimerState {
    Idle,
    Armed,
    Running,
    Paused,
}

fn generate_device_id() -> String {
    rng().sample_iter(&Alphanumeric).take(16).map(char::from).collect()
}

fn generate_session_id(created_at: DateTime<Utc>) -> String {
    format!("{}-{:04x}", created_at.timestamp_millis(), rng().random::<u16>())
}

fn duration_since(later: DateTime<Utc>, earlier: DateTime<Utc>) -> Duration {
    (later - earlier).to_std().unwrap_or(Duration::ZERO)
}

/// Given a configured [`Circuit`] and a per-device [`Fix`] stream, emits a
/// well-ordered log of sector and lap events. See the module docs for the
/// split between this pure core and [`LapTimerActor`].
pub struct LapTimer {
    config: LaptimerConfig,
    device_id: String,
    circuit: Option<Circuit>,
    active_session: Option<DeviceSession>,
    fixes: VecDeque<Fix>,
    paused: bool,
    state: LaptimerState,
    listeners: Vec<Box<dyn Fn(&SessionEvent) + Send + Sync>>,
}

impl LapTimer {
    pub fn new(config: LaptimerConfig) -> Self {
        let device_id = if config.device_id.trim().is_empty() {
            generate_device_id()
        } else {
            config.device_id.clone()
        };
        LapTimer {
            config,
            device_id,
            circuit: None,
            active_session: None,
            fixes: VecDeque::new(),
            paused: false,
            state: LaptimerState::Idle,
            listeners: Vec::new(),
        }
    }

    /// Registers a hook invoked for every [`SessionEvent`] this timer
    /// emits, including the `Start` session marker. A panicking hook is
    /// caught and logged; it never aborts the detection pipeline.
    pub fn on_session_event<F>(&mut self, listener: F)
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn state(&self) -> LaptimerState {
        self.state
    }

    pub fn circuit(&self) -> Option<&Circuit> {
        self.circuit.as_ref()
    }

    pub fn active_session(&self) -> Option<&DeviceSession> {
        self.active_session.as_ref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Closes any active session and replaces the configured circuit.
    pub fn set_circuit(&mut self, circuit: Circuit) {
        self.close_session();
        self.circuit = Some(circuit);
        self.state = LaptimerState::Armed;
    }

    /// Creates a fresh [`DeviceSession`], makes it active, unpauses
    /// detection and emits a `Start` marker event. Requires a circuit.
    pub fn create_session(&mut self) -> Result<(), LaptimerError> {
        let circuit = self.circuit.as_ref().ok_or(LaptimerError::UnknownCircuit)?;
        let now = Utc::now();
        let session = DeviceSession::new(
            generate_session_id(now),
            circuit.code.clone(),
            self.device_id.clone(),
            self.config.user_id.clone(),
            now,
        );
        info!("Created device session {} on circuit {}", session.id, circuit.code);
        let session_id = session.id.clone();
        let circuit_code = circuit.code.clone();
        self.active_session = Some(session);
        self.paused = false;
        self.state = LaptimerState::Running;
        self.notify_listeners(&marker_event(SessionEventType::Start, &session_id, &circuit_code, &self.device_id, self.config.user_id.clone()));
        Ok(())
    }

    /// Returns and clears the active session, clearing the fix ring too.
    pub fn close_session(&mut self) -> Option<DeviceSession> {
        self.fixes.clear();
        let session = self.active_session.take();
        if let Some(session) = &session {
            self.notify_listeners(&marker_event(
                SessionEventType::Other,
                &session.id,
                &session.circuit_code,
                &session.device_id,
                session.user_id.clone(),
            ));
        }
        self.state = if self.circuit.is_some() { LaptimerState::Armed } else { LaptimerState::Idle };
        session
    }

    /// Unpauses detection.
    pub fn start_detection(&mut self) {
        self.paused = false;
        if self.active_session.is_some() {
            self.state = LaptimerState::Running;
        }
    }

    /// Pauses detection; emits a `session_paused` marker if a session is
    /// active.
    pub fn stop_detection(&mut self) {
        self.paused = true;
        if let Some(session) = &self.active_session {
            self.state = LaptimerState::Paused;
            self.notify_listeners(&marker_event(
                SessionEventType::Other,
                &session.id,
                &session.circuit_code,
                &session.device_id,
                session.user_id.clone(),
            ));
        }
    }

    /// The hot path: feed one fix through detection. No-op while paused or
    /// without a configured circuit.
    pub fn add_geolocation(&mut self, fix: Fix, device_override: Option<String>) {
        if self.paused || self.circuit.is_none() {
            return;
        }
        if self.active_session.is_none() && self.config.auto_start_detection {
            let _ = self.create_session();
        }
        self.detect(fix, device_override);
    }

    fn detect(&mut self, fix: Fix, device_override: Option<String>) {
        let retention = self.config.max_telemetry_data_retention.max(2);
        self.fixes.push_back(fix.clone());
        while self.fixes.len() > retention {
            self.fixes.pop_front();
        }
        if let Some(session) = self.active_session.as_mut() {
            session.push_telemetry(fix.clone());
        }

        if self.fixes.len() < 2 {
            return;
        }
        let curr = fix;
        let prev = self.fixes[self.fixes.len() - 2].clone();

        let circuit = match &self.circuit {
            Some(c) => c.clone(),
            None => return,
        };

        if let Some(session) = self.active_session.as_ref() {
            if let Some(last) = session.last_event() {
                let window_secs = if circuit.sector_timeout_seconds > 0 {
                    circuit.sector_timeout_seconds as i64
                } else {
                    self.config.minimum_time_between_events.as_secs() as i64
                };
                if last.timestamp + ChronoDuration::seconds(window_secs) > curr.timestamp {
                    if let Some(session) = self.active_session.as_mut() {
                        session.last_position_ts = Some(curr.timestamp);
                    }
                    return;
                }
            }
        }

        let trajectory = Segment::new(prev.point, curr.point);
        let n = circuit.sector_count();
        let filter = if circuit.use_direction { IntersectFilter::TowardApex } else { IntersectFilter::Any };
        let device_id = device_override.unwrap_or_else(|| self.device_id.clone());

        for segment in &circuit.segments {
            if let Some(hit) = segment.boundary.intersect(&trajectory, filter) {
                let factor = trajectory.center_factor(&hit);
                let dt_ms = (curr.timestamp - prev.timestamp).num_milliseconds() as f64;
                let adjusted_ts = prev.timestamp + ChronoDuration::milliseconds((dt_ms * factor).round() as i64);
                let completed = if segment.number == 1 { n } else { segment.number - 1 };
                let event = SessionEvent {
                    timestamp: adjusted_ts,
                    event_type: SessionEventType::Sector,
                    lap_number: 0,
                    sector: completed,
                    time: Duration::ZERO,
                    first_point: Some(prev.point),
                    second_point: Some(curr.point),
                    factor,
                    device_id: device_id.clone(),
                    user_id: self.config.user_id.clone(),
                    session_id: String::new(),
                    circuit_code: circuit.code.clone(),
                    is_best_overall: false,
                    is_personal_best: false,
                    deleted: None,
                    data_min: None,
                    data_max: None,
                };
                self.register_event(event, &circuit, n);
            }
        }

        if self.config.track_position {
            let event = SessionEvent {
                timestamp: curr.timestamp,
                event_type: SessionEventType::Position,
                lap_number: 0,
                sector: 0,
                time: Duration::ZERO,
                first_point: Some(prev.point),
                second_point: Some(curr.point),
                factor: 0.0,
                device_id,
                user_id: self.config.user_id.clone(),
                session_id: String::new(),
                circuit_code: circuit.code.clone(),
                is_best_overall: false,
                is_personal_best: false,
                deleted: None,
                data_min: None,
                data_max: None,
            };
            self.register_event(event, &circuit, n);
        }

        if let Some(session) = self.active_session.as_ref() {
            if let Some(last) = session.last_event() {
                if last.timestamp + ChronoDuration::from_std(self.config.session_timeout).unwrap_or_default() < curr.timestamp {
                    self.close_session();
                }
            }
        }
    }

    /// Appends `event` to the active session (creating one if needed),
    /// stamping its lap number, delta time and personal-best flag, then
    /// builds and appends a Lap event if it completes one.
    fn register_event(&mut self, mut event: SessionEvent, circuit: &Circuit, sector_count: u32) {
        if self.active_session.is_none() && self.create_session().is_err() {
            return;
        }
        let session = self.active_session.as_mut().expect("session created above");

        event.lap_number = match session.last_lap() {
            None => 0,
            Some(lap) => lap.lap_number + 1,
        };
        event.session_id = session.id.clone();
        event.time = match session.last_event() {
            None => Duration::ZERO,
            Some(last) => duration_since(event.timestamp, last.timestamp),
        };
        if event.event_type == SessionEventType::Sector {
            event.is_personal_best = session.is_best_sector(&event);
        }

        let pushed = session.push_event(event).clone();
        self.notify_listeners(&pushed);
        session.last_position_ts = Some(pushed.timestamp);

        if pushed.event_type != SessionEventType::Sector {
            return;
        }
        let completes_lap = match circuit.circuit_type {
            CircuitType::Closed => pushed.sector == sector_count,
            CircuitType::Open => pushed.sector == sector_count.saturating_sub(1),
        };
        if !completes_lap {
            return;
        }

        let (_reference_ts, time) = match circuit.circuit_type {
            CircuitType::Closed => match session.last_lap() {
                Some(lap) => (lap.timestamp, duration_since(pushed.timestamp, lap.timestamp)),
                None => (pushed.timestamp, Duration::ZERO),
            },
            CircuitType::Open => {
                let prior = session
                    .events
                    .iter()
                    .filter(|e| !e.is_deleted() && e.sector == sector_count)
                    .max_by_key(|e| e.timestamp);
                match prior {
                    Some(e) => (e.timestamp, duration_since(pushed.timestamp, e.timestamp)),
                    None => (pushed.timestamp, Duration::ZERO),
                }
            }
        };

        let mut lap = pushed.clone();
        lap.event_type = SessionEventType::Lap;
        lap.sector = 0;
        lap.time = time;
        lap.is_best_overall = false;
        lap.is_personal_best = time != Duration::ZERO && session.is_best_lap(&lap);

        let pushed_lap = session.push_event(lap).clone();
        self.notify_listeners(&pushed_lap);
        session.last_position_ts = Some(pushed_lap.timestamp);
    }

    fn notify_listeners(&self, event: &SessionEvent) {
        for listener in &self.listeners {
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| listener(event))).is_err() {
                error!("session event listener panicked, continuing");
            }
        }
    }
}

fn marker_event(
    event_type: SessionEventType,
    session_id: &str,
    circuit_code: &str,
    device_id: &str,
    user_id: Option<String>,
) -> SessionEvent {
    SessionEvent {
        timestamp: Utc::now(),
        event_type,
        lap_number: 0,
        sector: 0,
        time: Duration::ZERO,
        first_point: None,
        second_point: None,
        factor: 0.0,
        device_id: device_id.to_string(),
        user_id,
        session_id: session_id.to_string(),
        circuit_code: circuit_code.to_string(),
        is_best_overall: false,
        is_personal_best: false,
        deleted: None,
        data_min: None,
        data_max: None,
    }
}

/// Wraps [`LapTimer`] for the `module_core` event bus: requests circuit
/// detection for every fix while no circuit is known, feeds fixes through
/// the timer once one is set, and republishes every emitted
/// [`SessionEvent`].
pub struct LapTimerActor {
    ctx: ModuleCtx,
    timer: LapTimer,
    awaiting_detection: bool,
}

const DETECTION_REQUEST_ID: u64 = 40;
const DETECTION_SENDER_ADDR: u64 = 41;

impl LapTimerActor {
    pub fn new(ctx: ModuleCtx, config: LaptimerConfig) -> Self {
        let mut timer = LapTimer::new(config);
        let sender = ctx.sender.clone();
        timer.on_session_event(move |event| {
            let _ = sender.send(Event {
                kind: EventKind::SessionEventEmittedEvent(std::sync::Arc::new(event.clone())),
            });
        });
        LapTimerActor { ctx, timer, awaiting_detection: false }
    }

    fn on_fix(&mut self, fix: std::sync::Arc<Fix>) {
        if self.timer.circuit().is_none() {
            if !self.awaiting_detection {
                self.awaiting_detection = true;
                let request: DetectCircuitRequestPtr =
                    Request::new(DETECTION_REQUEST_ID, DETECTION_SENDER_ADDR, fix.clone());
                let _ = self.ctx.sender.send(Event {
                    kind: EventKind::DetectCircuitRequestEvent(request),
                });
            }
            return;
        }
        self.timer.add_geolocation((*fix).clone(), None);
    }
}

#[async_trait]
impl Module for LapTimerActor {
    async fn run(&mut self) -> Result<(), ()> {
        let mut run = true;
        while run {
            match self.ctx.receiver.recv().await {
                Ok(event) => match event.kind {
                    EventKind::QuitEvent => run = false,
                    EventKind::FixEvent(fix) => self.on_fix(fix),
                    EventKind::DetectCircuitResponseEvent(response) => {
                        if response.id == DETECTION_REQUEST_ID && response.receiver_addr == DETECTION_SENDER_ADDR {
                            self.awaiting_detection = false;
                            if let Some(circuit) = response.data.clone() {
                                self.timer.set_circuit(circuit);
                            }
                        }
                    }
                    _ => (),
                },
                Err(e) => error!("Failed to receive event. Error {}", e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
