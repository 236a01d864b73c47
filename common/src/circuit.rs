use geo::Segment;
use serde::{Deserialize, Serialize};

/// Closed circuits complete a lap on their last segment; Open circuits use
/// their last segment purely as a finish-line timing reference, completing
/// a lap one segment earlier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitType {
    Closed,
    Open,
}

/// A boundary segment with its position in the circuit's total order.
/// Crossing it from the B side to the C side (the `den > 0` side of
/// [`Segment::intersect`]) is the valid direction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CircuitSegment {
    pub number: u32,
    pub boundary: Segment,
}

/// A configured racing circuit: an oriented, numbered list of boundary
/// segments plus detection/timing metadata.
///
/// Invariant: `segments`' numbers are a permutation of `1..=segments.len()`
/// in insertion order, and `segments` is non-empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    pub code: String,
    pub name: String,
    pub circuit_type: CircuitType,
    pub use_direction: bool,
    pub bounding_box: Segment,
    pub segments: Vec<CircuitSegment>,
    pub sector_timeout_seconds: u32,
}

impl Circuit {
    /// `N`, the number of boundary segments (and sectors per lap).
    pub fn sector_count(&self) -> u32 {
        self.segments.len() as u32
    }

    /// The sector number whose crossing completes a lap.
    pub fn completing_sector(&self) -> u32 {
        match self.circuit_type {
            CircuitType::Closed => self.sector_count(),
            CircuitType::Open => self.sector_count().saturating_sub(1),
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
