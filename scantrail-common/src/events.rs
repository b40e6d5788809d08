//! Event types for the ScanTrail event system
//!
//! Provides the shared event enum and the EventBus used to fan scan
//! outcomes and record mutations out to SSE clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::outcome::{ScanMode, ScanOutcome};

/// ScanTrail event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CaptureEvent {
    /// A payload finished the pipeline with an outcome
    ///
    /// Triggers:
    /// - SSE: update hint text, play feedback sound if `outcome.audible()`
    ScanProcessed {
        /// The resolved outcome, including hint context
        outcome: ScanOutcome,
        /// Mode the outcome was produced in
        mode: ScanMode,
        /// When the payload was processed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Capture workflow switched
    ///
    /// Triggers:
    /// - SSE: update mode indicator, clear stale hint text
    ModeChanged {
        old_mode: ScanMode,
        new_mode: ScanMode,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A scan event was deleted (and possibly its asset projection)
    ///
    /// Triggers:
    /// - SSE: refresh record list
    RecordDeleted {
        event_id: Uuid,
        asset_id: String,
        /// Whether the asset_state row was cascaded away
        projection_removed: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Background enrichment resolved an address for a record
    ///
    /// Triggers:
    /// - SSE: update the record row in place
    AddressResolved {
        event_id: Uuid,
        address: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl CaptureEvent {
    /// Get event type as string for SSE event naming and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            CaptureEvent::ScanProcessed { .. } => "ScanProcessed",
            CaptureEvent::ModeChanged { .. } => "ModeChanged",
            CaptureEvent::RecordDeleted { .. } => "RecordDeleted",
            CaptureEvent::AddressResolved { .. } => "AddressResolved",
        }
    }
}

/// Central event distribution bus
///
/// Backed by tokio::broadcast: non-blocking publish, multiple concurrent
/// subscribers, automatic cleanup when subscribers drop.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CaptureEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Feedback events are advisory; a capture session with no connected
    /// UI must keep accepting scans.
    pub fn emit_lossy(&self, event: CaptureEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
