//! Integration test crate for rategate.
//!
//! This crate has no library code. Its tests drive the validator, the gates
//! and the store together, without a running daemon process.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p rategate-integration-tests
//! ```
