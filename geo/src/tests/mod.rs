use crate::{DistanceUnit, GeoPoint, IntersectFilter, Segment};

fn p(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint::new(lat, lon, 0.0)
}

#[test]
fn distance_between_identical_points_is_zero() {
    let a = p(52.0, 13.0);
    assert!(a.distance(&a, DistanceUnit::Kilometers) < 1e-9);
}

#[test]
fn e2e_1_boundary_crossing_midpoint() {
    let boundary = Segment::new(p(0.005, 0.0), p(-0.005, 0.0));
    let trajectory = Segment::new(p(0.0, -0.001), p(0.0, 0.001));

    let hit = boundary
        .intersect(&trajectory, IntersectFilter::Any)
        .expect("trajectory crosses the boundary");
    assert!(hit.lat.abs() < 1e-9);
    assert!(hit.lon.abs() < 1e-9);

    let factor = trajectory.center_factor(&hit);
    assert!((factor - 0.5).abs() < 1e-6);
}

#[test]
fn no_crossing_when_trajectory_does_not_reach_boundary() {
    let boundary = Segment::new(p(0.005, 0.0), p(-0.005, 0.0));
    let trajectory = Segment::new(p(0.0, -0.005), p(0.0, -0.003));
    assert!(boundary.intersect(&trajectory, IntersectFilter::Any).is_none());
}

#[test]
fn any_iff_toward_or_away_from_apex() {
    let boundary = Segment::new(p(0.005, 0.0), p(-0.005, 0.0));
    let forward = Segment::new(p(0.0, -0.001), p(0.0, 0.001));
    let backward = Segment::new(p(0.0, 0.001), p(0.0, -0.001));

    for trajectory in [forward, backward] {
        let any = boundary.intersect(&trajectory, IntersectFilter::Any).is_some();
        let toward = boundary
            .intersect(&trajectory, IntersectFilter::TowardApex)
            .is_some();
        let away = boundary
            .intersect(&trajectory, IntersectFilter::AwayFromApex)
            .is_some();
        assert_eq!(any, toward || away);
        assert!(!(toward && away));
    }
}

#[test]
fn center_factor_is_zero_at_identical_points() {
    let s = Segment::new(p(1.0, 1.0), p(1.0, 1.0));
    assert_eq!(s.center_factor(&p(1.0, 1.0)), 0.0);
}

#[test]
fn projection_factor_clamps_to_unit_interval() {
    let s = Segment::new(p(0.0, 0.0), p(0.0, 1.0));
    assert_eq!(s.projection_factor(&p(0.0, -5.0)), 0.0);
    assert_eq!(s.projection_factor(&p(0.0, 5.0)), 1.0);
    assert!((s.projection_factor(&p(0.0, 0.5)) - 0.5).abs() < 1e-9);
}

#[test]
fn length_meters_matches_great_circle_distance() {
    let s = Segment::new(p(0.0, 0.0), p(0.0, 1.0));
    let expected = 1000.0 * p(0.0, 0.0).distance(&p(0.0, 1.0), DistanceUnit::Kilometers);
    assert!((s.length_meters() - expected).abs() < 1e-6);
}
