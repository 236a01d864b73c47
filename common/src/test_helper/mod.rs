pub mod circuit;
pub mod elapsed_test_time_source;
