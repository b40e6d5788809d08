//! End-to-end pipeline flows against an in-memory database
//!
//! Exercises the full normalize → gate → classify → persist path the way
//! a handheld session would drive it.

use scantrail_capture::capture::{CapturePipeline, GateConfig};
use scantrail_capture::location::NoLocation;
use scantrail_capture::store::ScanStore;
use scantrail_common::db::init::apply_schema;
use scantrail_common::events::EventBus;
use scantrail_common::{ScanMode, ScanOutcome};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::{Duration, Instant};

async fn pipeline(mode: ScanMode) -> (CapturePipeline, ScanStore) {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    apply_schema(&pool).await.unwrap();
    let store = ScanStore::new(pool);
    let pipeline = CapturePipeline::new(
        store.clone(),
        GateConfig::default(),
        Arc::new(NoLocation),
        None,
        EventBus::new(64),
        mode,
    );
    (pipeline, store)
}

#[tokio::test]
async fn test_bulk_session_records_each_payload_once() {
    let (mut pipeline, store) = pipeline(ScanMode::Bulk).await;
    let base = Instant::now();

    // A run of trigger pulls: two assets, each re-read several times,
    // spaced past the repeat window.
    let reads = [
        "E012345", "E012345", "S020337", "E012345", "S020337", "S020337",
    ];
    for (i, payload) in reads.iter().enumerate() {
        pipeline
            .handle_scan_at(payload, base + Duration::from_millis(700 * i as u64))
            .await;
    }

    let events = store.list_events(Some(ScanMode::Bulk)).await.unwrap();
    assert_eq!(events.len(), 2);

    let mut ids: Vec<_> = events.iter().map(|e| e.asset_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["E012345", "S020337"]);

    // Bulk never touches the projection.
    assert!(store.list_asset_states().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bulk_dedup_resets_when_mode_reentered() {
    let (mut pipeline, store) = pipeline(ScanMode::Bulk).await;
    let base = Instant::now();

    pipeline.handle_scan_at("E012345", base).await;
    pipeline.set_mode(ScanMode::Bulk);
    pipeline
        .handle_scan_at("E012345", base + Duration::from_secs(1))
        .await;

    let events = store.list_events(Some(ScanMode::Bulk)).await.unwrap();
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_link_pairing_with_underscore_device_label() {
    let (mut pipeline, store) = pipeline(ScanMode::Link).await;
    let base = Instant::now();

    let first = pipeline.handle_scan_at("E012345", base).await.unwrap();
    assert!(matches!(first, ScanOutcome::LinkPrimaryCaptured { .. }));

    let second = pipeline
        .handle_scan_at("OEM-RS-001_RBEF7B", base + Duration::from_secs(1))
        .await
        .unwrap();
    match second {
        ScanOutcome::LinkCompleted {
            primary_id,
            secondary_id,
            ..
        } => {
            assert_eq!(primary_id, "E012345");
            assert_eq!(secondary_id, "RBEF7B");
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let events = store.list_events(Some(ScanMode::Link)).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].asset_id, "E012345");
    assert_eq!(events[0].secondary_id.as_deref(), Some("RBEF7B"));
}

#[tokio::test]
async fn test_link_pairing_with_imei_style_device_code() {
    let (mut pipeline, store) = pipeline(ScanMode::Link).await;
    let base = Instant::now();

    pipeline.handle_scan_at("S020337", base).await;
    let outcome = pipeline
        .handle_scan_at(
            "2010700099-ZK105MGC-864431040521538",
            base + Duration::from_secs(1),
        )
        .await
        .unwrap();

    match outcome {
        ScanOutcome::LinkCompleted { secondary_id, .. } => {
            assert_eq!(secondary_id, "864431040521538");
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let events = store.list_events(Some(ScanMode::Link)).await.unwrap();
    assert_eq!(events[0].secondary_id.as_deref(), Some("864431040521538"));
}

#[tokio::test]
async fn test_repeated_pair_produces_no_second_record() {
    let (mut pipeline, store) = pipeline(ScanMode::Link).await;
    let base = Instant::now();

    pipeline.handle_scan_at("E012345", base).await;
    pipeline
        .handle_scan_at("RBEF7B", base + Duration::from_secs(1))
        .await;

    pipeline
        .handle_scan_at("E012345", base + Duration::from_secs(2))
        .await;
    let repeat = pipeline
        .handle_scan_at("RBEF7B", base + Duration::from_secs(3))
        .await
        .unwrap();
    assert!(matches!(repeat, ScanOutcome::LinkDuplicateIgnored { .. }));

    assert_eq!(
        store.list_events(Some(ScanMode::Link)).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_free_text_never_starts_a_link() {
    let (mut pipeline, store) = pipeline(ScanMode::Link).await;
    let base = Instant::now();

    let outcome = pipeline.handle_scan_at("RANDOM123", base).await.unwrap();
    assert!(matches!(outcome, ScanOutcome::RejectedMalformed { .. }));

    // A following valid primary still starts from step one.
    let next = pipeline
        .handle_scan_at("E012345", base + Duration::from_secs(1))
        .await
        .unwrap();
    assert!(matches!(next, ScanOutcome::LinkPrimaryCaptured { .. }));
    assert!(store.list_events(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_cascade_after_capture_session() {
    let (mut pipeline, store) = pipeline(ScanMode::Single).await;

    let first = pipeline.handle_scan("E012345").await.unwrap();
    let first_id = match first {
        ScanOutcome::AcceptedSingle { event_id, .. } => event_id,
        other => panic!("unexpected outcome {:?}", other),
    };
    let second = pipeline.handle_scan("E012345").await.unwrap();
    let second_id = match second {
        ScanOutcome::AcceptedSingle { event_id, .. } => event_id,
        other => panic!("unexpected outcome {:?}", other),
    };

    let deleted = store.delete_event(first_id).await.unwrap();
    assert!(!deleted.projection_removed);
    assert_eq!(store.list_asset_states().await.unwrap().len(), 1);

    let deleted = store.delete_event(second_id).await.unwrap();
    assert!(deleted.projection_removed);
    assert!(store.list_asset_states().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_url_and_plain_payloads_share_identity() {
    let (mut pipeline, store) = pipeline(ScanMode::Bulk).await;
    let base = Instant::now();

    pipeline.handle_scan_at("E012345", base).await;
    let outcome = pipeline
        .handle_scan_at(
            "https://assets.example.com/item?id=E012345",
            base + Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert!(matches!(outcome, ScanOutcome::BulkDuplicateIgnored { .. }));
    assert_eq!(store.list_events(None).await.unwrap().len(), 1);
}
