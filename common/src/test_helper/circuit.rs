// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::circuit::{Circuit, CircuitSegment, CircuitType};
use geo::{GeoPoint, Segment};

pub fn get_circuit() -> Circuit {
    let start = Segment::new(
        GeoPoint::new(52.0270889, 11.2803483, 0.0),
        GeoPoint::new(52.0271200, 11.2803800, 0.0),
    );
    Circuit {
        code: "OSL".to_string(),
        name: "Oschersleben".to_string(),
        circuit_type: CircuitType::Closed,
        use_direction: true,
        bounding_box: Segment::new(
            GeoPoint::new(52.030, 11.274, 0.0),
            GeoPoint::new(52.027, 11.282, 0.0),
        ),
        segments: vec![
            CircuitSegment {
                number: 1,
                boundary: Segment::new(
                    GeoPoint::new(52.0298205, 11.2741851, 0.0),
                    GeoPoint::new(52.0298500, 11.2742200, 0.0),
                ),
            },
            CircuitSegment {
                number: 2,
                boundary: start,
            },
        ],
        sector_timeout_seconds: 0,
    }
}
