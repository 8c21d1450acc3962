//! Shared test utilities for journal-insights integration tests.
//!
//! This module provides:
//! - `TestHarness` for running the full pipeline against a temp database
//! - Scripted model and transcriber doubles
//! - Builder patterns for creating test configurations programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{RecordingTranscriber, ScriptedModel, TestHarness};
