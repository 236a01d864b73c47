// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! (De)serializes a [`Duration`] as a count of 100-nanosecond ticks, the
//! unit LapViz containers use for `TimeTicks` columns and `#Event=` lines.

use serde::{self, Deserialize, Deserializer, Serializer};
use std::time::Duration;

const NANOS_PER_TICK: u128 = 100;

pub fn to_ticks(duration: &Duration) -> i64 {
    (duration.as_nanos() / NANOS_PER_TICK) as i64
}

pub fn from_ticks(ticks: i64) -> Duration {
    Duration::from_nanos((ticks.max(0) as u128 * NANOS_PER_TICK) as u64)
}

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_i64(to_ticks(duration))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ticks = i64::deserialize(deserializer)?;
    Ok(from_ticks(ticks))
}
