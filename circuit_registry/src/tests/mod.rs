use crate::CircuitRegistry;
use chrono::Utc;
use common::{fix::Fix, test_helper::circuit::get_circuit};
use geo::GeoPoint;

#[test]
fn get_by_code_is_case_insensitive() {
    let registry = CircuitRegistry::with_circuits(vec![get_circuit()]);
    assert!(registry.get_by_code("osl").is_some());
    assert!(registry.get_by_code("OsL").is_some());
    assert!(registry.get_by_code("other").is_none());
}

#[test]
fn get_by_code_resolves_a_duplicate_code_to_the_last_insertion() {
    let mut first = get_circuit();
    first.name = "First".to_string();
    let mut second = get_circuit();
    second.name = "Second".to_string();
    let registry = CircuitRegistry::with_circuits(vec![first, second]);

    let found = registry.get_by_code("osl").expect("code is present");
    assert_eq!(found.name, "Second");
}

#[test]
fn detect_returns_the_first_circuit_whose_bounding_box_contains_the_fix() {
    let registry = CircuitRegistry::with_circuits(vec![get_circuit()]);
    let inside = Fix::new(GeoPoint::new(52.0285, 11.2780, 0.0), Utc::now());
    let outside = Fix::new(GeoPoint::new(10.0, 10.0, 0.0), Utc::now());

    assert_eq!(registry.detect(&inside), Some(&get_circuit()));
    assert!(registry.detect(&outside).is_none());
}

#[test]
fn sync_reports_full_progress_and_stamps_updated() {
    let mut registry = CircuitRegistry::new();
    assert!(registry.updated().is_none());
    assert_eq!(registry.sync(52.0285, 11.2780, 1000.0), 1.0);
    assert!(registry.updated().is_some());
}
