//! Database models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// One accepted scan read, as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    pub guid: String,
    pub asset_id: String,
    pub display_name: String,
    /// 'single', 'bulk' or 'link' (CHECK-constrained)
    pub category: String,
    /// 0,0 sentinel = location unknown
    pub latitude: f64,
    pub longitude: f64,
    /// Reverse-geocoded address, filled in by background enrichment
    pub address: Option<String>,
    /// Secondary device identifier; present exactly when category = 'link'
    pub secondary_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Latest-known projection, one row per asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetState {
    pub asset_id: String,
    pub display_name: String,
    pub last_seen_at: chrono::DateTime<chrono::Utc>,
    pub last_latitude: f64,
    pub last_longitude: f64,
}
