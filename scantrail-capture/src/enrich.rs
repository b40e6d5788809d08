//! Background address enrichment
//!
//! Single-mode captures store raw coordinates immediately; a detached task
//! reverse-geocodes them afterwards and fills in the address if the record
//! still exists. Enrichment is strictly fire-and-forget: failures are
//! logged and never surface to the operator.

use crate::error::{Error, Result};
use crate::store::ScanStore;
use async_trait::async_trait;
use scantrail_common::events::{CaptureEvent, EventBus};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Reverse geocoding seam
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve coordinates to a human-readable address, if the service
    /// knows one
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<String>>;
}

#[derive(Deserialize)]
struct NominatimResponse {
    display_name: Option<String>,
}

/// Geocoder backed by the public Nominatim API
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new() -> Self {
        Self::with_base_url("https://nominatim.openstreetmap.org")
    }

    /// Point the geocoder at a different endpoint (self-hosted instance,
    /// or a mock server in tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("scantrail-capture/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<String>> {
        let url = format!(
            "{}/reverse?format=jsonv2&lat={}&lon={}",
            self.base_url, latitude, longitude
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("Reverse geocode request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Http(format!(
                "Reverse geocode returned HTTP {}",
                response.status()
            )));
        }

        let body: NominatimResponse = response
            .json()
            .await
            .map_err(|e| Error::Http(format!("Reverse geocode response unparseable: {}", e)))?;

        Ok(body.display_name)
    }
}

/// Spawn the enrichment task for a freshly created single-mode record
///
/// The guarded update tolerates the record being deleted before the
/// geocoder answers.
pub fn spawn_address_enrichment(
    store: ScanStore,
    geocoder: Arc<dyn Geocoder>,
    events: EventBus,
    event_id: Uuid,
    latitude: f64,
    longitude: f64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let address = match geocoder.reverse(latitude, longitude).await {
            Ok(Some(address)) => address,
            Ok(None) => {
                debug!("No address known for ({}, {})", latitude, longitude);
                return;
            }
            Err(e) => {
                warn!("Address enrichment failed for {}: {}", event_id, e);
                return;
            }
        };

        match store.update_address_if_present(event_id, &address).await {
            Ok(true) => {
                events.emit_lossy(CaptureEvent::AddressResolved {
                    event_id,
                    address,
                    timestamp: chrono::Utc::now(),
                });
            }
            Ok(false) => {
                debug!("Record {} gone before enrichment landed", event_id);
            }
            Err(e) => {
                warn!("Could not store address for {}: {}", event_id, e);
            }
        }
    })
}
