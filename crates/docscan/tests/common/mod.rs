//! Shared test utilities for docscan integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with a temporary scan directory
//! - In-memory fakes for the remote store and the OCR page reader

pub mod fakes;
pub mod harness;

pub use fakes::{FakePages, FakeStore};
pub use harness::{TestHarness, JPEG_BYTES};
