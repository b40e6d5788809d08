//! REST API for the capture service
//!
//! Serves the decoder boundary (POST /scan), record management, the export
//! endpoint and the SSE feedback stream.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::AppContext;
