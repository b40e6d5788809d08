//! # ScanTrail Capture Service (scantrail-capture)
//!
//! Classification and deduplication pipeline for handheld scanner payloads.
//!
//! **Purpose:** Take raw decoded QR/barcode payloads from the scanner
//! boundary, classify them into the single / bulk / link workflows, apply
//! per-mode debouncing, persist the scan log and the per-asset projection,
//! and stream feedback outcomes over HTTP/SSE.

pub mod api;
pub mod capture;
pub mod enrich;
pub mod error;
pub mod location;
pub mod store;

pub use error::{Error, Result};
