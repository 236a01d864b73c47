use chrono::{DateTime, Utc};
use geo::GeoPoint;
use serde::{Deserialize, Serialize};

/// One GPS sample with a UTC timestamp and an opaque channel vector.
///
/// Timestamps within a single device stream are expected monotonic; the
/// lap-timer core tolerates out-of-order arrivals by deferring correctness
/// to the idle-close and cooldown rules rather than rejecting fixes outright.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub point: GeoPoint,
    pub timestamp: DateTime<Utc>,
    pub speed: Option<f64>,
    pub accuracy: Option<f64>,
    pub distance: Option<f64>,
    pub provider: Option<String>,
    pub channels: Vec<f64>,
}

impl Fix {
    pub fn new(point: GeoPoint, timestamp: DateTime<Utc>) -> Self {
        Fix {
            point,
            timestamp,
            speed: None,
            accuracy: None,
            distance: None,
            provider: None,
            channels: Vec::new(),
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
