//! Scan modes and per-payload feedback outcomes
//!
//! Every payload processed by the capture pipeline resolves to exactly one
//! `ScanOutcome`. The outcome carries the operator-facing hint text and the
//! feedback flags, so the UI layer never has to re-derive session state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Active capture workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// One-shot capture with location and optional photo
    Single,
    /// Rapid unlocated capture, deduplicated per session
    Bulk,
    /// Two-step pairing of a primary asset with a secondary device
    Link,
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanMode::Single => write!(f, "single"),
            ScanMode::Bulk => write!(f, "bulk"),
            ScanMode::Link => write!(f, "link"),
        }
    }
}

impl ScanMode {
    /// Parse a mode from its lowercase database/API string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "single" => Some(ScanMode::Single),
            "bulk" => Some(ScanMode::Bulk),
            "link" => Some(ScanMode::Link),
            _ => None,
        }
    }
}

/// Why a payload was rejected without any persisted trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Empty after normalization
    Empty,
    /// Link primary step requires a primary-asset-shaped code
    NotPrimaryShaped,
}

/// Result of processing one decoded payload
///
/// Serialized for the HTTP response to the decoder boundary and broadcast
/// over SSE so connected UIs can render hint text and sound feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScanOutcome {
    /// Single-mode capture persisted; asset projection updated
    AcceptedSingle { event_id: Uuid, asset_id: String },

    /// Bulk-mode capture persisted (first sighting this session)
    AcceptedBulkNew { event_id: Uuid, asset_id: String },

    /// Payload already recorded in the current bulk session; ignored
    BulkDuplicateIgnored { asset_id: String },

    /// Link step one complete; now awaiting the secondary device code
    LinkPrimaryCaptured { primary_id: String },

    /// Accidental re-read of the primary while awaiting the secondary
    LinkSecondaryRejected { pending_primary_id: String },

    /// Link pair persisted
    LinkCompleted {
        event_id: Uuid,
        primary_id: String,
        secondary_id: String,
    },

    /// Identical (primary, secondary) pair already registered; no new record
    LinkDuplicateIgnored {
        primary_id: String,
        secondary_id: String,
    },

    /// Malformed or policy-rejected payload; no persisted trace
    RejectedMalformed { reason: RejectReason },

    /// The storage engine refused the write; session is ready for retry
    SaveFailed { detail: String },
}

impl ScanOutcome {
    /// Outcome type as string for event filtering
    pub fn kind(&self) -> &'static str {
        match self {
            ScanOutcome::AcceptedSingle { .. } => "AcceptedSingle",
            ScanOutcome::AcceptedBulkNew { .. } => "AcceptedBulkNew",
            ScanOutcome::BulkDuplicateIgnored { .. } => "BulkDuplicateIgnored",
            ScanOutcome::LinkPrimaryCaptured { .. } => "LinkPrimaryCaptured",
            ScanOutcome::LinkSecondaryRejected { .. } => "LinkSecondaryRejected",
            ScanOutcome::LinkCompleted { .. } => "LinkCompleted",
            ScanOutcome::LinkDuplicateIgnored { .. } => "LinkDuplicateIgnored",
            ScanOutcome::RejectedMalformed { .. } => "RejectedMalformed",
            ScanOutcome::SaveFailed { .. } => "SaveFailed",
        }
    }

    /// Operator-facing hint for the next scan
    pub fn hint(&self) -> String {
        match self {
            ScanOutcome::AcceptedSingle { asset_id, .. } => {
                format!("Recorded {}", asset_id)
            }
            ScanOutcome::AcceptedBulkNew { asset_id, .. } => {
                format!("Added {}", asset_id)
            }
            ScanOutcome::BulkDuplicateIgnored { asset_id } => {
                format!("{} already scanned this session", asset_id)
            }
            ScanOutcome::LinkPrimaryCaptured { primary_id } => {
                format!("Asset {} captured, scan the device code", primary_id)
            }
            ScanOutcome::LinkSecondaryRejected { pending_primary_id } => {
                format!(
                    "Still waiting for the device code for {}",
                    pending_primary_id
                )
            }
            ScanOutcome::LinkCompleted {
                primary_id,
                secondary_id,
                ..
            } => format!("Linked {} to {}", primary_id, secondary_id),
            ScanOutcome::LinkDuplicateIgnored {
                primary_id,
                secondary_id,
            } => format!("{} is already linked to {}", primary_id, secondary_id),
            ScanOutcome::RejectedMalformed { reason } => match reason {
                RejectReason::Empty => "Unreadable code, try again".to_string(),
                RejectReason::NotPrimaryShaped => "Scan an asset code first".to_string(),
            },
            ScanOutcome::SaveFailed { .. } => "Save failed, scan again".to_string(),
        }
    }

    /// Whether the UI should sound/flash acknowledgment for this outcome
    ///
    /// Duplicates are acknowledged audibly so the operator knows the scan
    /// was read; silent rejects (malformed, wrong shape) are not.
    pub fn audible(&self) -> bool {
        !matches!(
            self,
            ScanOutcome::RejectedMalformed { .. } | ScanOutcome::LinkSecondaryRejected { .. }
        )
    }
}
