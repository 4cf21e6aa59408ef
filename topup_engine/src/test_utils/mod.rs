//! Helpers for tests that run against a real SQLite database. Only compiled with the `test_utils` feature.
pub mod prepare_env;
pub mod seed;
