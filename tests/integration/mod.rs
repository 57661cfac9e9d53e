//! Integration tests
//!
//! Reconcilers are driven end to end against the in-memory backend and the
//! in-process realtime hub; the HTTP transport is tested against a mock
//! server.


#[cfg(feature = "http")]
pub mod remote_test;
