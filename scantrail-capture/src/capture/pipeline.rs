//! Capture pipeline orchestration
//!
//! Owns the session, executes classified actions against storage and
//! broadcasts the resulting outcomes. Exactly one payload is in flight at
//! a time; the HTTP layer serializes calls behind a mutex.

use super::classifier::{classify, Action};
use super::gate::{self, GateConfig};
use super::normalizer::normalize;
use super::session::ScanSession;
use crate::enrich::{spawn_address_enrichment, Geocoder};
use crate::location::LocationProvider;
use crate::store::{LinkCommit, ScanStore};
use scantrail_common::events::{CaptureEvent, EventBus};
use scantrail_common::{ScanMode, ScanOutcome};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The scan classification pipeline
pub struct CapturePipeline {
    store: ScanStore,
    session: ScanSession,
    gate: GateConfig,
    location: Arc<dyn LocationProvider>,
    geocoder: Option<Arc<dyn Geocoder>>,
    events: EventBus,
}

impl CapturePipeline {
    pub fn new(
        store: ScanStore,
        gate: GateConfig,
        location: Arc<dyn LocationProvider>,
        geocoder: Option<Arc<dyn Geocoder>>,
        events: EventBus,
        initial_mode: ScanMode,
    ) -> Self {
        Self {
            store,
            session: ScanSession::new(initial_mode),
            gate,
            location,
            geocoder,
            events,
        }
    }

    pub fn mode(&self) -> ScanMode {
        self.session.mode
    }

    /// How long the decoder should stay locked out after a processed read
    pub fn rearm_delay(&self) -> Duration {
        self.gate.rearm_delay(self.session.mode)
    }

    /// Switch the capture workflow, resetting session state as required
    pub fn set_mode(&mut self, mode: ScanMode) {
        let old_mode = self.session.mode;
        self.session.set_mode(mode);

        if old_mode != mode {
            info!("Capture mode changed: {} -> {}", old_mode, mode);
        }
        self.events.emit_lossy(CaptureEvent::ModeChanged {
            old_mode,
            new_mode: mode,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Process one decoded payload
    pub async fn handle_scan(&mut self, raw: &str) -> Option<ScanOutcome> {
        self.handle_scan_at(raw, Instant::now()).await
    }

    /// Process one decoded payload against an explicit clock reading
    ///
    /// Returns None when the debounce gate suppressed the read entirely;
    /// suppressed reads produce no outcome, no record and no event.
    pub async fn handle_scan_at(&mut self, raw: &str, now: Instant) -> Option<ScanOutcome> {
        let normalized = normalize(raw);

        if !gate::admit(&self.gate, &mut self.session, &normalized, now) {
            debug!("Gate suppressed {} read", self.session.mode);
            return None;
        }

        let action = classify(&mut self.session, &normalized, raw);
        let outcome = self.apply(action, now).await;

        self.events.emit_lossy(CaptureEvent::ScanProcessed {
            outcome: outcome.clone(),
            mode: self.session.mode,
            timestamp: chrono::Utc::now(),
        });

        Some(outcome)
    }

    async fn apply(&mut self, action: Action, now: Instant) -> ScanOutcome {
        match action {
            Action::CreateSingle { asset_id } => {
                let fix = self.location.last_known().await;
                let (latitude, longitude) = fix.unwrap_or((0.0, 0.0));

                match self.store.insert_single(&asset_id, latitude, longitude).await {
                    Ok(event_id) => {
                        if fix.is_some() {
                            if let Some(geocoder) = &self.geocoder {
                                spawn_address_enrichment(
                                    self.store.clone(),
                                    Arc::clone(geocoder),
                                    self.events.clone(),
                                    event_id,
                                    latitude,
                                    longitude,
                                );
                            }
                        }
                        ScanOutcome::AcceptedSingle { event_id, asset_id }
                    }
                    Err(e) => {
                        warn!("Single capture write failed for {}: {}", asset_id, e);
                        ScanOutcome::SaveFailed {
                            detail: e.to_string(),
                        }
                    }
                }
            }
            Action::CreateBulk { asset_id } => match self.store.insert_bulk(&asset_id).await {
                Ok(event_id) => {
                    self.session.note_bulk_accept(now);
                    ScanOutcome::AcceptedBulkNew { event_id, asset_id }
                }
                Err(e) => {
                    // Roll the dedup memory back so a retry of the same
                    // payload is not mistaken for a duplicate.
                    self.session.seen_in_bulk.remove(&asset_id);
                    warn!("Bulk capture write failed for {}: {}", asset_id, e);
                    ScanOutcome::SaveFailed {
                        detail: e.to_string(),
                    }
                }
            },
            Action::BulkDuplicate { asset_id } => ScanOutcome::BulkDuplicateIgnored { asset_id },
            Action::CapturePrimary { primary_id } => {
                ScanOutcome::LinkPrimaryCaptured { primary_id }
            }
            Action::LinkSecondaryReject { pending_primary_id } => {
                ScanOutcome::LinkSecondaryRejected { pending_primary_id }
            }
            Action::CommitLink {
                primary_id,
                secondary_id,
            } => match self.store.commit_link(&primary_id, &secondary_id).await {
                Ok(LinkCommit::Created(event_id)) => ScanOutcome::LinkCompleted {
                    event_id,
                    primary_id,
                    secondary_id,
                },
                Ok(LinkCommit::Duplicate) => ScanOutcome::LinkDuplicateIgnored {
                    primary_id,
                    secondary_id,
                },
                // The link sub-workflow already returned to awaiting-primary;
                // a failed commit does not resurrect the pending pair.
                Err(e) => {
                    warn!("Link commit failed for ({}, {}): {}", primary_id, secondary_id, e);
                    ScanOutcome::SaveFailed {
                        detail: e.to_string(),
                    }
                }
            },
            Action::RejectMalformed(reason) => ScanOutcome::RejectedMalformed { reason },
        }
    }
}
