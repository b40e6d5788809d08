//! # ScanTrail Common Library
//!
//! Shared code for the ScanTrail capture service:
//! - Database bootstrap, schema and models
//! - Scan outcome and mode types
//! - Event types (CaptureEvent enum) and EventBus
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod outcome;

pub use error::{Error, Result};
pub use outcome::{RejectReason, ScanMode, ScanOutcome};
