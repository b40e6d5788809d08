//! Pure classification of gate-passed reads
//!
//! `classify` turns a read into an `Action` and advances the session
//! state machine. It performs no I/O: the pipeline executes the
//! resulting action against storage and rolls session state back if a
//! write fails.

use super::extractor::extract_secondary;
use super::session::{LinkStep, ScanSession};
use scantrail_common::{RejectReason, ScanMode};

/// What the pipeline should do with a classified read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Record a single-mode capture
    CreateSingle { asset_id: String },
    /// Record a new bulk capture
    CreateBulk { asset_id: String },
    /// The payload was already captured in this bulk run
    BulkDuplicate { asset_id: String },
    /// First half of a link: primary captured, await the secondary
    CapturePrimary { primary_id: String },
    /// Second half of a link: attempt to persist the pairing
    CommitLink {
        primary_id: String,
        secondary_id: String,
    },
    /// Awaiting-secondary read looked like another primary; hold position
    LinkSecondaryReject { pending_primary_id: String },
    /// The read cannot be used in the current workflow
    RejectMalformed(RejectReason),
}

/// Whether a payload is shaped like a primary asset code
///
/// Primary codes start with a one- or two-character uppercase category
/// prefix and end in digits: an uppercase letter, then an uppercase
/// letter or digit, then nothing but digits ("E012345", "S020337").
pub fn is_primary_shaped(payload: &str) -> bool {
    let bytes = payload.as_bytes();
    if bytes.len() < 3 {
        return false;
    }
    bytes[0].is_ascii_uppercase()
        && (bytes[1].is_ascii_uppercase() || bytes[1].is_ascii_digit())
        && bytes[2..].iter().all(|b| b.is_ascii_digit())
}

/// Classify one gate-passed read and advance the session accordingly
///
/// `normalized` drives identity decisions; `raw` is kept for secondary
/// extraction, which operates on the payload as scanned.
pub fn classify(session: &mut ScanSession, normalized: &str, raw: &str) -> Action {
    if normalized.is_empty() {
        return Action::RejectMalformed(RejectReason::Empty);
    }

    match session.mode {
        ScanMode::Single => Action::CreateSingle {
            asset_id: normalized.to_string(),
        },
        ScanMode::Bulk => {
            if session.seen_in_bulk.contains(normalized) {
                Action::BulkDuplicate {
                    asset_id: normalized.to_string(),
                }
            } else {
                session.seen_in_bulk.insert(normalized.to_string());
                Action::CreateBulk {
                    asset_id: normalized.to_string(),
                }
            }
        }
        ScanMode::Link => classify_link(session, normalized, raw),
    }
}

fn classify_link(session: &mut ScanSession, normalized: &str, raw: &str) -> Action {
    match (session.link_step, session.pending_primary_id.clone()) {
        (LinkStep::AwaitingSecondary, Some(primary_id)) => {
            if normalized == primary_id || is_primary_shaped(normalized) {
                // Re-read of the primary, or a second primary: stay put.
                return Action::LinkSecondaryReject {
                    pending_primary_id: primary_id,
                };
            }
            // The pairing attempt always returns to awaiting-primary,
            // whether or not the commit succeeds.
            session.link_step = LinkStep::AwaitingPrimary;
            session.pending_primary_id = None;
            Action::CommitLink {
                primary_id,
                secondary_id: extract_secondary(raw),
            }
        }
        _ => {
            if is_primary_shaped(normalized) {
                session.link_step = LinkStep::AwaitingSecondary;
                session.pending_primary_id = Some(normalized.to_string());
                Action::CapturePrimary {
                    primary_id: normalized.to_string(),
                }
            } else {
                Action::RejectMalformed(RejectReason::NotPrimaryShaped)
            }
        }
    }
}
