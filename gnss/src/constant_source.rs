use crate::ConstantSourceError;
use chrono::Utc;
use common::fix::Fix;
use geo::{DistanceUnit, GeoPoint};
use module_core::{EventKind, Module, ModuleCtx};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Simulated GNSS fix producer. Loops a device around a closed polyline of
/// waypoints at a constant velocity, publishing a [`Fix`] every tick.
///
/// Stands in for real hardware in tests and demos, the way
/// [`crate::gpsd_source::GpsdModule`] stands in for a real gpsd daemon.
pub struct ConstantGnssModule {
    ctx: ModuleCtx,
    waypoints: Vec<GeoPoint>,
    velocity_mps: f64,
    next_waypoint: usize,
    traveled_into_leg_m: f64,
}

impl ConstantGnssModule {
    /// `waypoints` is walked in order and wraps back to the first point,
    /// so it should describe a closed loop for continuous simulation.
    pub fn new(ctx: ModuleCtx, waypoints: Vec<GeoPoint>, velocity_mps: f64) -> Result<Self, ConstantSourceError> {
        if waypoints.len() < 2 {
            return Err(ConstantSourceError::TrackTooShort);
        }
        Ok(ConstantGnssModule {
            ctx,
            waypoints,
            velocity_mps,
            next_waypoint: 1,
            traveled_into_leg_m: 0.0,
        })
    }

    fn leg(&self) -> (GeoPoint, GeoPoint) {
        let start = self.waypoints[self.next_waypoint - 1];
        let end = self.waypoints[self.next_waypoint % self.waypoints.len()];
        (start, end)
    }

    fn leg_length_m(&self) -> f64 {
        let (start, end) = self.leg();
        start.distance(&end, DistanceUnit::Kilometers) * 1000.0
    }

    /// Advances the simulated position by one tick's worth of travel and
    /// returns the new point, wrapping across legs (and back to the start
    /// of the loop) as needed.
    fn advance(&mut self) -> GeoPoint {
        self.traveled_into_leg_m += self.velocity_mps * TICK_INTERVAL.as_secs_f64();
        let mut leg_len_m = self.leg_length_m();
        while leg_len_m > 0.0 && self.traveled_into_leg_m >= leg_len_m {
            self.traveled_into_leg_m -= leg_len_m;
            self.next_waypoint = (self.next_waypoint % self.waypoints.len()) + 1;
            leg_len_m = self.leg_length_m();
        }
        let (start, end) = self.leg();
        let t = if leg_len_m > 0.0 {
            (self.traveled_into_leg_m / leg_len_m).clamp(0.0, 1.0)
        } else {
            0.0
        };
        GeoPoint::new(
            start.lat + (end.lat - start.lat) * t,
            start.lon + (end.lon - start.lon) * t,
            start.alt + (end.alt - start.alt) * t,
        )
    }

    fn publish_fix(&self, point: GeoPoint) {
        let fix = Fix::new(point, Utc::now()).with_speed(self.velocity_mps);
        let _ = self.ctx.publish_event(EventKind::FixEvent(Arc::new(fix)));
    }
}

#[async_trait::async_trait]
impl Module for ConstantGnssModule {
    async fn run(&mut self) -> Result<(), ()> {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        let mut running = true;
        while running {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) if matches!(event.kind, EventKind::QuitEvent) => running = false,
                        Ok(_) => {}
                        Err(e) => warn!("Failed to receive event in module ConstantGnssModule. Error: {e}"),
                    }
                }
                _ = ticker.tick() => {
                    let point = self.advance();
                    self.publish_fix(point);
                }
            }
        }
        Ok(())
    }
}
