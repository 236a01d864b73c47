mod test_circuit;
