//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - An in-memory backend standing in for the stored procedures
//! - A realtime transport that can be told to fail
//! - Entity fixtures and a ready-made configuration
//! - Custom assertion macros

pub mod fake_backend;
pub mod fixtures;

// Re-export commonly used utilities
pub use assertions::*;
pub use fake_backend::*;
pub use fixtures::*;
pub use flaky_transport::*;
