//! In-memory capture session state
//!
//! One `ScanSession` exists per active capture pipeline. It is never
//! persisted: switching modes or restarting the service discards it.

use scantrail_common::ScanMode;
use std::collections::HashSet;
use std::time::Instant;

/// Position within the two-step link workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStep {
    /// Waiting for the primary asset code
    AwaitingPrimary,
    /// Primary captured; waiting for the secondary device code
    AwaitingSecondary,
}

/// Mutable session memory for the active capture workflow
#[derive(Debug)]
pub struct ScanSession {
    /// Currently active capture workflow
    pub mode: ScanMode,
    /// Only meaningful when `mode == Link`
    pub link_step: LinkStep,
    /// Primary asset id captured in the first half of a link
    pub pending_primary_id: Option<String>,
    /// Normalized payloads already recorded in the current bulk run
    pub seen_in_bulk: HashSet<String>,
    /// When the last bulk record was accepted (drives the bulk repeat window)
    pub last_bulk_accept_at: Option<Instant>,
    /// When the last link read passed the gate (accepted or policy-rejected)
    pub last_link_read_at: Option<Instant>,
    /// The previous gate-passed link payload (suppresses re-delivered frames)
    pub last_link_payload: Option<String>,
}

impl ScanSession {
    pub fn new(mode: ScanMode) -> Self {
        Self {
            mode,
            link_step: LinkStep::AwaitingPrimary,
            pending_primary_id: None,
            seen_in_bulk: HashSet::new(),
            last_bulk_accept_at: None,
            last_link_read_at: None,
            last_link_payload: None,
        }
    }

    /// Switch workflows, applying the reset semantics
    ///
    /// Entering bulk (including re-entering it) clears the dedup memory.
    /// Entering or leaving link always resets the sub-workflow to
    /// awaiting-primary and drops the pending primary.
    pub fn set_mode(&mut self, mode: ScanMode) {
        if mode == ScanMode::Bulk {
            self.seen_in_bulk.clear();
            self.last_bulk_accept_at = None;
        }
        if mode == ScanMode::Link || self.mode == ScanMode::Link {
            self.reset_link();
        }
        self.mode = mode;
    }

    /// Return the link sub-workflow to its ready state
    pub fn reset_link(&mut self) {
        self.link_step = LinkStep::AwaitingPrimary;
        self.pending_primary_id = None;
        self.last_link_read_at = None;
        self.last_link_payload = None;
    }

    /// Record that a bulk capture was accepted at `now`
    pub fn note_bulk_accept(&mut self, now: Instant) {
        self.last_bulk_accept_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reentering_bulk_clears_dedup_memory() {
        let mut session = ScanSession::new(ScanMode::Bulk);
        session.seen_in_bulk.insert("E012345".to_string());
        session.note_bulk_accept(Instant::now());

        session.set_mode(ScanMode::Bulk);

        assert!(session.seen_in_bulk.is_empty());
        assert!(session.last_bulk_accept_at.is_none());
    }

    #[test]
    fn test_leaving_link_resets_sub_workflow() {
        let mut session = ScanSession::new(ScanMode::Link);
        session.link_step = LinkStep::AwaitingSecondary;
        session.pending_primary_id = Some("E012345".to_string());

        session.set_mode(ScanMode::Single);

        assert_eq!(session.link_step, LinkStep::AwaitingPrimary);
        assert!(session.pending_primary_id.is_none());
    }

    #[test]
    fn test_entering_link_resets_sub_workflow() {
        let mut session = ScanSession::new(ScanMode::Single);
        session.pending_primary_id = Some("stale".to_string());

        session.set_mode(ScanMode::Link);

        assert_eq!(session.link_step, LinkStep::AwaitingPrimary);
        assert!(session.pending_primary_id.is_none());
    }

    #[test]
    fn test_switching_between_single_and_bulk_keeps_nothing_stale() {
        let mut session = ScanSession::new(ScanMode::Single);
        session.set_mode(ScanMode::Bulk);
        assert!(session.seen_in_bulk.is_empty());
        assert_eq!(session.mode, ScanMode::Bulk);
    }
}
