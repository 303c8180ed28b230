//! Shared test utilities for trackmyprep integration tests.
//!
//! `TestHarness` runs the real router on an ephemeral port over a temporary
//! upload directory and an in-memory database.

pub mod harness;

pub use harness::{HarnessOptions, TestHarness, ALICE, ALICE_TOKEN, BOB, BOB_TOKEN};
