//! Unit tests for the ecsforge CLI
//!
//! These tests use in-memory ports and run fast without external I/O.

mod architecture;
mod mocks;
mod property_tests;
mod synth_service;
