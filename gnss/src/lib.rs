//! GNSS Modul for the laptimer
//!
//! Provides `Module` actors that publish [`common::fix::Fix`] updates onto
//! the event bus: a constant-velocity simulator for tests/demos and a
//! `gpsd`-backed source for real hardware.

#[derive(Clone, Copy, Debug, PartialEq)]
/// The GNSS status from a GNSS source
pub enum GnssStatus {
    /// The Status of the GNSS is unknow
    Unknown,
    /// The GNSS system has no fix all reported positions are maybe wrong
    NoFix,
    /// The GNSS system is in the 2d fix mode only latitude and longitude are valid
    Fix2d,
    /// The GNSS system is in the 3d Fix mode latitue, longitude and alitude(currently not reported) are valid
    Fix3d,
}

#[derive(Clone, Debug, PartialEq)]
/// Information of the GNSS.
/// The information contains the status of the receiver and the amount of satellites that are used
/// for the position, time and velocitiy informations.
pub struct GnssInformation {
    status: GnssStatus,
    satellites: usize,
}

impl GnssInformation {
    pub fn new(status: &GnssStatus, satellites: usize) -> GnssInformation {
        GnssInformation {
            status: *status,
            satellites,
        }
    }
}

/// Errors raised while configuring a GNSS source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstantSourceError {
    /// A simulated track needs at least two waypoints to define a leg.
    TrackTooShort,
}

impl std::fmt::Display for ConstantSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstantSourceError::TrackTooShort => write!(f, "at least two waypoints are required"),
        }
    }
}

impl std::error::Error for ConstantSourceError {}

pub mod constant_source;
pub mod gpsd_source;
