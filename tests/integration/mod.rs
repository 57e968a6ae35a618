//! Deeper lifecycle and settlement integration tests

mod match_lifecycle;
