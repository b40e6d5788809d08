//! Device location seam
//!
//! The capture service records where a single-mode scan happened, but the
//! actual fix comes from whatever the host platform offers. The trait keeps
//! that behind a seam so tests and headless deployments can run without
//! any location hardware.

use async_trait::async_trait;

/// Source of the device's last-known position
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Latest (latitude, longitude) fix, if any
    async fn last_known(&self) -> Option<(f64, f64)>;
}

/// Provider for deployments with no location source
///
/// Single-mode records fall back to the (0, 0) unknown sentinel.
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn last_known(&self) -> Option<(f64, f64)> {
        None
    }
}

/// Provider pinned to a fixed position, for stationary scan stations
pub struct FixedLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn last_known(&self) -> Option<(f64, f64)> {
        Some((self.latitude, self.longitude))
    }
}
