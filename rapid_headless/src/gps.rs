// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Reads the waypoint CSV a `laptimer run --input <path>` replay drives the
//! [`gnss::constant_source::ConstantGnssModule`] simulator with.

use geo::GeoPoint;
use std::str::FromStr;
use tracing::{debug, warn};

/// Columns are `longitude,latitude[,altitude]`; a missing altitude column
/// defaults to sea level. Lines that don't parse are skipped, matching the
/// CSV reader's documented "malformed rows are silently skipped" contract.
pub fn read_waypoints_from_csv(path: &str) -> Result<Vec<GeoPoint>, csv::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut waypoints = Vec::new();

    for result in reader.records() {
        let Ok(record) = result else {
            warn!("Skipping malformed row while reading {path}");
            continue;
        };
        let lon = record.get(0).and_then(|v| f64::from_str(v).ok());
        let lat = record.get(1).and_then(|v| f64::from_str(v).ok());
        let alt = record.get(2).and_then(|v| f64::from_str(v).ok()).unwrap_or(0.0);
        match (lat, lon) {
            (Some(lat), Some(lon)) => waypoints.push(GeoPoint::new(lat, lon, alt)),
            _ => warn!("Skipping malformed row while reading {path}"),
        }
    }
    debug!("read {} waypoints from {path}", waypoints.len());
    Ok(waypoints)
}

/// A small closed loop around the built-in demo circuit, used when no
/// `--input` file is given so the simulator still has somewhere to drive.
pub fn demo_waypoints() -> Vec<GeoPoint> {
    vec![
        GeoPoint::new(50.4372, 5.9715, 0.0),
        GeoPoint::new(50.4376, 5.9718, 0.0),
        GeoPoint::new(50.4380, 5.9721, 0.0),
        GeoPoint::new(50.4376, 5.9724, 0.0),
        GeoPoint::new(50.4372, 5.9715, 0.0),
    ]
}
