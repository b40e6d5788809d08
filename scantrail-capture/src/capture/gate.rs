//! Time-based read admission
//!
//! Handheld scanners re-deliver the same frame many times per second
//! while the trigger is held. The gate decides, per workflow, whether a
//! decoded read is even worth classifying. Rejected reads leave the
//! session untouched so the next read sees identical state.

use super::session::ScanSession;
use scantrail_common::db::init::get_setting_i64;
use scantrail_common::{Result, ScanMode};
use sqlx::{Pool, Sqlite};
use std::time::{Duration, Instant};

/// Debounce windows and decoder re-arm delays, loaded from settings
#[derive(Debug, Clone, Copy)]
pub struct GateConfig {
    /// Minimum gap between accepted bulk captures
    pub bulk_repeat_window: Duration,
    /// Minimum gap between gate-passed link reads
    pub link_min_interval: Duration,
    /// Decoder lockout after a single-mode capture
    pub rearm_single: Duration,
    /// Decoder lockout after a bulk-mode capture
    pub rearm_bulk: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            bulk_repeat_window: Duration::from_millis(600),
            link_min_interval: Duration::from_millis(250),
            rearm_single: Duration::from_millis(1000),
            rearm_bulk: Duration::from_millis(250),
        }
    }
}

impl GateConfig {
    /// Load the gate windows from the settings table
    pub async fn load(pool: &Pool<Sqlite>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            bulk_repeat_window: Duration::from_millis(
                get_setting_i64(
                    pool,
                    "gate_bulk_repeat_window_ms",
                    defaults.bulk_repeat_window.as_millis() as i64,
                )
                .await? as u64,
            ),
            link_min_interval: Duration::from_millis(
                get_setting_i64(
                    pool,
                    "gate_link_min_interval_ms",
                    defaults.link_min_interval.as_millis() as i64,
                )
                .await? as u64,
            ),
            rearm_single: Duration::from_millis(
                get_setting_i64(
                    pool,
                    "rearm_single_ms",
                    defaults.rearm_single.as_millis() as i64,
                )
                .await? as u64,
            ),
            rearm_bulk: Duration::from_millis(
                get_setting_i64(pool, "rearm_bulk_ms", defaults.rearm_bulk.as_millis() as i64)
                    .await? as u64,
            ),
        })
    }

    /// How long the decoder should stay locked out after a processed read
    pub fn rearm_delay(&self, mode: ScanMode) -> Duration {
        match mode {
            ScanMode::Single => self.rearm_single,
            ScanMode::Bulk => self.rearm_bulk,
            ScanMode::Link => Duration::ZERO,
        }
    }
}

/// Decide whether a decoded read may proceed to classification
///
/// Single mode never suppresses here: its 1 s re-arm delay is enforced
/// at the decoder, not the gate. Bulk suppresses any read inside the
/// repeat window after the last accepted capture. Link suppresses reads
/// inside the minimum interval as well as immediate re-deliveries of
/// the previous payload; a read that passes advances the link
/// bookkeeping even if the classifier later rejects it.
pub fn admit(
    config: &GateConfig,
    session: &mut ScanSession,
    normalized: &str,
    now: Instant,
) -> bool {
    match session.mode {
        ScanMode::Single => true,
        ScanMode::Bulk => match session.last_bulk_accept_at {
            Some(last) if now.duration_since(last) < config.bulk_repeat_window => false,
            _ => true,
        },
        ScanMode::Link => {
            if let Some(last) = session.last_link_read_at {
                if now.duration_since(last) < config.link_min_interval {
                    return false;
                }
            }
            if session.last_link_payload.as_deref() == Some(normalized) {
                return false;
            }
            session.last_link_read_at = Some(now);
            session.last_link_payload = Some(normalized.to_string());
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> GateConfig {
        GateConfig::default()
    }

    #[test]
    fn test_single_mode_never_suppresses() {
        let mut session = ScanSession::new(ScanMode::Single);
        let base = Instant::now();
        assert!(admit(&gate(), &mut session, "E012345", base));
        assert!(admit(&gate(), &mut session, "E012345", base));
    }

    #[test]
    fn test_bulk_suppresses_inside_repeat_window() {
        let mut session = ScanSession::new(ScanMode::Bulk);
        let base = Instant::now();

        assert!(admit(&gate(), &mut session, "E012345", base));
        session.note_bulk_accept(base);

        // Any payload inside the window is suppressed, not just repeats.
        assert!(!admit(
            &gate(),
            &mut session,
            "S020337",
            base + Duration::from_millis(300)
        ));
        assert!(admit(
            &gate(),
            &mut session,
            "S020337",
            base + Duration::from_millis(600)
        ));
    }

    #[test]
    fn test_bulk_window_measured_from_accept_not_attempt() {
        let mut session = ScanSession::new(ScanMode::Bulk);
        let base = Instant::now();
        session.note_bulk_accept(base);

        // A suppressed attempt must not extend the window.
        assert!(!admit(
            &gate(),
            &mut session,
            "E012345",
            base + Duration::from_millis(500)
        ));
        assert!(admit(
            &gate(),
            &mut session,
            "E012345",
            base + Duration::from_millis(700)
        ));
    }

    #[test]
    fn test_link_suppresses_rapid_reads_of_distinct_payloads() {
        let mut session = ScanSession::new(ScanMode::Link);
        let base = Instant::now();

        assert!(admit(&gate(), &mut session, "E012345", base));
        assert!(!admit(
            &gate(),
            &mut session,
            "864431040521538",
            base + Duration::from_millis(100)
        ));
        // The rejected read must not have advanced the clock.
        assert!(admit(
            &gate(),
            &mut session,
            "864431040521538",
            base + Duration::from_millis(260)
        ));
    }

    #[test]
    fn test_link_suppresses_repeated_payload_regardless_of_time() {
        let mut session = ScanSession::new(ScanMode::Link);
        let base = Instant::now();

        assert!(admit(&gate(), &mut session, "E012345", base));
        assert!(!admit(
            &gate(),
            &mut session,
            "E012345",
            base + Duration::from_secs(5)
        ));
    }

    #[test]
    fn test_link_reset_forgets_previous_payload() {
        let mut session = ScanSession::new(ScanMode::Link);
        let base = Instant::now();

        assert!(admit(&gate(), &mut session, "E012345", base));
        session.reset_link();
        assert!(admit(
            &gate(),
            &mut session,
            "E012345",
            base + Duration::from_secs(1)
        ));
    }

    #[test]
    fn test_rearm_delay_per_mode() {
        let config = gate();
        assert_eq!(config.rearm_delay(ScanMode::Single), Duration::from_millis(1000));
        assert_eq!(config.rearm_delay(ScanMode::Bulk), Duration::from_millis(250));
        assert_eq!(config.rearm_delay(ScanMode::Link), Duration::ZERO);
    }
}
