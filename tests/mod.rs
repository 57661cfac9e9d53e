//! Test suite for basket-sync
//!
//! This module organizes all tests

pub mod common;
pub mod integration;
