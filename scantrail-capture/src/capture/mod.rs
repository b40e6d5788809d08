//! Scan classification pipeline
//!
//! Raw payload → normalizer → debounce gate → classifier → writer.
//! The pipeline owns the in-memory session state; everything else in the
//! service goes through it one payload at a time.

pub mod classifier;
pub mod extractor;
pub mod gate;
pub mod normalizer;
pub mod pipeline;
pub mod session;

pub use classifier::{classify, Action};
pub use gate::GateConfig;
pub use pipeline::CapturePipeline;
pub use session::{LinkStep, ScanSession};
