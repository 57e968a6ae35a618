//! Concurrency stress tests for match settlement and room fan-out

mod concurrent_submissions;
