use crate::circuit::CircuitType;
use crate::test_helper::circuit::get_circuit;

#[test]
fn sector_count_matches_segment_list() {
    let circuit = get_circuit();
    assert_eq!(circuit.sector_count(), 2);
}

#[test]
fn closed_circuit_completes_on_last_sector() {
    let circuit = get_circuit();
    assert_eq!(circuit.circuit_type, CircuitType::Closed);
    assert_eq!(circuit.completing_sector(), 2);
}

#[test]
fn open_circuit_completes_one_sector_early() {
    let mut circuit = get_circuit();
    circuit.circuit_type = CircuitType::Open;
    assert_eq!(circuit.completing_sector(), 1);
}
