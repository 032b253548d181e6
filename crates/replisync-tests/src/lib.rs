//! replisync integration testing support
//!
//! Shared fixtures for the integration tests in `tests/`: paired source and
//! replica trees, deterministic test data, and instrumented hashers and
//! replica operations for fault injection.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified test utilities
///
/// Common fixtures used across all integration tests to keep scenarios
/// short and consistent.
pub mod test_utils;
