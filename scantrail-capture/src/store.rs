//! Persistent scan log and asset projection
//!
//! All writes funnel through `ScanStore`. The single-writer pipeline means
//! the link duplicate check can be a plain check-then-insert; the pair
//! index keeps the lookup cheap.

use crate::error::{Error, Result};
use chrono::Utc;
use scantrail_common::db::models::{AssetState, ScanEvent};
use scantrail_common::ScanMode;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

/// Result of a link pairing attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommit {
    /// A new link record was created
    Created(Uuid),
    /// The identical (primary, secondary) pair is already registered
    Duplicate,
}

/// What a deletion removed
#[derive(Debug, Clone)]
pub struct DeletedRecord {
    pub asset_id: String,
    pub category: String,
    /// Whether the asset_state row was cascaded away with it
    pub projection_removed: bool,
}

/// Storage facade over the scan_events and asset_state tables
#[derive(Clone)]
pub struct ScanStore {
    db: SqlitePool,
}

impl ScanStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Record a single-mode capture and refresh the asset projection
    ///
    /// The projection's display_name follows the first non-empty name seen;
    /// an operator rename on the projection is never clobbered by later scans.
    pub async fn insert_single(
        &self,
        asset_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<Uuid> {
        let guid = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO scan_events
                (guid, asset_id, display_name, category, latitude, longitude, created_at)
            VALUES (?, ?, ?, 'single', ?, ?, ?)
            "#,
        )
        .bind(guid.to_string())
        .bind(asset_id)
        .bind(asset_id)
        .bind(latitude)
        .bind(longitude)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO asset_state
                (asset_id, display_name, last_seen_at, last_latitude, last_longitude)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(asset_id) DO UPDATE SET
                last_seen_at = excluded.last_seen_at,
                last_latitude = excluded.last_latitude,
                last_longitude = excluded.last_longitude,
                display_name = CASE
                    WHEN asset_state.display_name = '' THEN excluded.display_name
                    ELSE asset_state.display_name
                END
            "#,
        )
        .bind(asset_id)
        .bind(asset_id)
        .bind(now)
        .bind(latitude)
        .bind(longitude)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(guid)
    }

    /// Record a bulk-mode capture (no location, no projection update)
    pub async fn insert_bulk(&self, asset_id: &str) -> Result<Uuid> {
        let guid = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO scan_events (guid, asset_id, display_name, category, created_at)
            VALUES (?, ?, ?, 'bulk', ?)
            "#,
        )
        .bind(guid.to_string())
        .bind(asset_id)
        .bind(asset_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(guid)
    }

    /// Persist a link pairing unless the identical pair already exists
    pub async fn commit_link(&self, primary_id: &str, secondary_id: &str) -> Result<LinkCommit> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM scan_events
                WHERE category = 'link' AND asset_id = ? AND secondary_id = ?
            )
            "#,
        )
        .bind(primary_id)
        .bind(secondary_id)
        .fetch_one(&self.db)
        .await?;

        if exists {
            debug!("Link pair ({}, {}) already registered", primary_id, secondary_id);
            return Ok(LinkCommit::Duplicate);
        }

        let guid = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO scan_events
                (guid, asset_id, display_name, category, secondary_id, created_at)
            VALUES (?, ?, ?, 'link', ?, ?)
            "#,
        )
        .bind(guid.to_string())
        .bind(primary_id)
        .bind(primary_id)
        .bind(secondary_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(LinkCommit::Created(guid))
    }

    /// Delete a scan event, cascading the asset projection when the last
    /// single-category event for the asset disappears
    pub async fn delete_event(&self, event_id: Uuid) -> Result<DeletedRecord> {
        let row = sqlx::query("SELECT asset_id, category FROM scan_events WHERE guid = ?")
            .bind(event_id.to_string())
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Scan event {} not found", event_id)))?;

        let asset_id: String = row.get("asset_id");
        let category: String = row.get("category");

        sqlx::query("DELETE FROM scan_events WHERE guid = ?")
            .bind(event_id.to_string())
            .execute(&self.db)
            .await?;

        let mut projection_removed = false;
        if category == "single" {
            // Re-query rather than count down: deletes are rare and the
            // re-check is immune to drift.
            let remaining: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM scan_events WHERE asset_id = ? AND category = 'single'",
            )
            .bind(&asset_id)
            .fetch_one(&self.db)
            .await?;

            if remaining == 0 {
                let result = sqlx::query("DELETE FROM asset_state WHERE asset_id = ?")
                    .bind(&asset_id)
                    .execute(&self.db)
                    .await?;
                projection_removed = result.rows_affected() > 0;
            }
        }

        Ok(DeletedRecord {
            asset_id,
            category,
            projection_removed,
        })
    }

    /// Rename a scan event (post-hoc operator edit)
    pub async fn update_display_name(&self, event_id: Uuid, display_name: &str) -> Result<()> {
        let result = sqlx::query("UPDATE scan_events SET display_name = ? WHERE guid = ?")
            .bind(display_name)
            .bind(event_id.to_string())
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Scan event {} not found", event_id)));
        }
        Ok(())
    }

    /// Attach a photo to a single-category event
    pub async fn attach_photo(&self, event_id: Uuid, photo: &[u8]) -> Result<()> {
        let category: Option<String> =
            sqlx::query_scalar("SELECT category FROM scan_events WHERE guid = ?")
                .bind(event_id.to_string())
                .fetch_optional(&self.db)
                .await?;

        match category.as_deref() {
            None => Err(Error::NotFound(format!("Scan event {} not found", event_id))),
            Some("single") => {
                sqlx::query("UPDATE scan_events SET photo = ? WHERE guid = ?")
                    .bind(photo)
                    .bind(event_id.to_string())
                    .execute(&self.db)
                    .await?;
                Ok(())
            }
            Some(other) => Err(Error::InvalidCategory(format!(
                "Photos attach to single-category events only, {} is {}",
                event_id, other
            ))),
        }
    }

    /// Store a resolved address unless the record has since been deleted
    ///
    /// Returns whether the update landed. Enrichment races deletion by
    /// design, so a vanished record is not an error.
    pub async fn update_address_if_present(&self, event_id: Uuid, address: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE scan_events SET address = ? WHERE guid = ? AND category = 'single'",
        )
        .bind(address)
        .bind(event_id.to_string())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_event(&self, event_id: Uuid) -> Result<Option<ScanEvent>> {
        let row = sqlx::query(
            r#"
            SELECT guid, asset_id, display_name, category, latitude, longitude,
                   address, secondary_id, created_at
            FROM scan_events WHERE guid = ?
            "#,
        )
        .bind(event_id.to_string())
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|r| row_to_event(&r)))
    }

    /// List scan events, newest first, optionally filtered by category
    pub async fn list_events(&self, category: Option<ScanMode>) -> Result<Vec<ScanEvent>> {
        let rows = match category {
            Some(mode) => {
                sqlx::query(
                    r#"
                    SELECT guid, asset_id, display_name, category, latitude, longitude,
                           address, secondary_id, created_at
                    FROM scan_events WHERE category = ?
                    ORDER BY created_at DESC, guid
                    "#,
                )
                .bind(mode.to_string())
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT guid, asset_id, display_name, category, latitude, longitude,
                           address, secondary_id, created_at
                    FROM scan_events
                    ORDER BY created_at DESC, guid
                    "#,
                )
                .fetch_all(&self.db)
                .await?
            }
        };

        Ok(rows.iter().map(row_to_event).collect())
    }

    /// List the per-asset projection, most recently seen first
    pub async fn list_asset_states(&self) -> Result<Vec<AssetState>> {
        let rows = sqlx::query(
            r#"
            SELECT asset_id, display_name, last_seen_at, last_latitude, last_longitude
            FROM asset_state
            ORDER BY last_seen_at DESC, asset_id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .iter()
            .map(|r| AssetState {
                asset_id: r.get("asset_id"),
                display_name: r.get("display_name"),
                last_seen_at: r.get("last_seen_at"),
                last_latitude: r.get("last_latitude"),
                last_longitude: r.get("last_longitude"),
            })
            .collect())
    }

    /// Build the plain-text export, one row per scan event
    ///
    /// Link rows are labeled with their display name, single/bulk rows with
    /// the asset id.
    pub async fn export_rows(&self, category: Option<ScanMode>) -> Result<Vec<String>> {
        let events = self.list_events(category).await?;

        Ok(events
            .iter()
            .map(|e| {
                let label = if e.category == "link" {
                    e.display_name.as_str()
                } else {
                    e.asset_id.as_str()
                };
                format!(
                    "{}\t{}\t{}\t{}",
                    label,
                    e.category,
                    e.secondary_id.as_deref().unwrap_or(""),
                    e.created_at.to_rfc3339(),
                )
            })
            .collect())
    }
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> ScanEvent {
    ScanEvent {
        guid: row.get("guid"),
        asset_id: row.get("asset_id"),
        display_name: row.get("display_name"),
        category: row.get("category"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        address: row.get("address"),
        secondary_id: row.get("secondary_id"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scantrail_common::db::init::apply_schema;

    async fn test_store() -> ScanStore {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        apply_schema(&pool).await.unwrap();
        ScanStore::new(pool)
    }

    #[tokio::test]
    async fn test_insert_single_creates_event_and_projection() {
        let store = test_store().await;

        let id = store.insert_single("E012345", 51.5, -0.1).await.unwrap();

        let event = store.fetch_event(id).await.unwrap().unwrap();
        assert_eq!(event.asset_id, "E012345");
        assert_eq!(event.category, "single");
        assert_eq!(event.latitude, 51.5);

        let assets = store.list_asset_states().await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].asset_id, "E012345");
        assert_eq!(assets[0].display_name, "E012345");
    }

    #[tokio::test]
    async fn test_repeat_single_updates_projection_in_place() {
        let store = test_store().await;

        store.insert_single("E012345", 51.5, -0.1).await.unwrap();
        store.insert_single("E012345", 48.9, 2.3).await.unwrap();

        let assets = store.list_asset_states().await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].last_latitude, 48.9);
        assert_eq!(assets[0].last_longitude, 2.3);
    }

    #[tokio::test]
    async fn test_bulk_insert_does_not_touch_projection() {
        let store = test_store().await;

        store.insert_bulk("S020337").await.unwrap();

        assert!(store.list_asset_states().await.unwrap().is_empty());
        let events = store.list_events(Some(ScanMode::Bulk)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category, "bulk");
    }

    #[tokio::test]
    async fn test_commit_link_dedups_identical_pair() {
        let store = test_store().await;

        let first = store.commit_link("E012345", "RBEF7B").await.unwrap();
        assert!(matches!(first, LinkCommit::Created(_)));

        let second = store.commit_link("E012345", "RBEF7B").await.unwrap();
        assert_eq!(second, LinkCommit::Duplicate);

        // Same primary with a different secondary is a new pairing.
        let third = store.commit_link("E012345", "864431040521538").await.unwrap();
        assert!(matches!(third, LinkCommit::Created(_)));

        let events = store.list_events(Some(ScanMode::Link)).await.unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_last_single_cascades_projection() {
        let store = test_store().await;

        let id = store.insert_single("E012345", 0.0, 0.0).await.unwrap();
        let deleted = store.delete_event(id).await.unwrap();

        assert!(deleted.projection_removed);
        assert!(store.list_asset_states().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_one_of_two_singles_keeps_projection() {
        let store = test_store().await;

        let first = store.insert_single("E012345", 0.0, 0.0).await.unwrap();
        store.insert_single("E012345", 1.0, 1.0).await.unwrap();

        let deleted = store.delete_event(first).await.unwrap();
        assert!(!deleted.projection_removed);
        assert_eq!(store.list_asset_states().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_event_is_not_found() {
        let store = test_store().await;
        let err = store.delete_event(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_photo_attaches_to_single_only() {
        let store = test_store().await;

        let single = store.insert_single("E012345", 0.0, 0.0).await.unwrap();
        store.attach_photo(single, b"jpeg bytes").await.unwrap();

        let bulk = store.insert_bulk("S020337").await.unwrap();
        let err = store.attach_photo(bulk, b"jpeg bytes").await.unwrap_err();
        assert!(matches!(err, Error::InvalidCategory(_)));
    }

    #[tokio::test]
    async fn test_address_update_is_noop_after_delete() {
        let store = test_store().await;

        let id = store.insert_single("E012345", 51.5, -0.1).await.unwrap();
        store.delete_event(id).await.unwrap();

        let applied = store
            .update_address_if_present(id, "1 Depot Rd")
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn test_rename_event() {
        let store = test_store().await;

        let id = store.insert_single("E012345", 0.0, 0.0).await.unwrap();
        store.update_display_name(id, "Forklift 3").await.unwrap();

        let event = store.fetch_event(id).await.unwrap().unwrap();
        assert_eq!(event.display_name, "Forklift 3");
    }

    #[tokio::test]
    async fn test_export_labels_by_category() {
        let store = test_store().await;

        store.insert_single("E012345", 0.0, 0.0).await.unwrap();
        store.commit_link("S020337", "RBEF7B").await.unwrap();

        let rows = store.export_rows(None).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.starts_with("E012345\tsingle\t\t")));
        assert!(rows.iter().any(|r| r.starts_with("S020337\tlink\tRBEF7B\t")));
    }
}
