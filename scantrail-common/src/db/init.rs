//! Database initialization
//!
//! Creates the database on first run, applies the schema idempotently and
//! seeds default settings. Safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows SSE readers and the export endpoint to query while
    // the capture pipeline writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    apply_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent - safe to call multiple times)
///
/// Exposed separately so tests can apply the schema to in-memory pools.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_scan_events_table(pool).await?;
    create_asset_state_table(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the scan_events table
///
/// The category is an explicit tagged column; the CHECK constraint keeps
/// the three workflows mutually exclusive and directly queryable.
pub async fn create_scan_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scan_events (
            guid TEXT PRIMARY KEY,
            asset_id TEXT NOT NULL,
            display_name TEXT NOT NULL,
            category TEXT NOT NULL CHECK (category IN ('single', 'bulk', 'link')),
            latitude REAL NOT NULL DEFAULT 0,
            longitude REAL NOT NULL DEFAULT 0,
            address TEXT,
            photo BLOB,
            secondary_id TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (asset_id <> ''),
            CHECK (category = 'link' OR secondary_id IS NULL),
            CHECK (category = 'single' OR (photo IS NULL AND address IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_scan_events_asset ON scan_events(asset_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_scan_events_category ON scan_events(category)")
        .execute(pool)
        .await?;
    // Supports the link duplicate check; a future multi-writer version can
    // tighten this into a UNIQUE constraint
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_scan_events_pair ON scan_events(asset_id, secondary_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the asset_state table
///
/// Derived projection: rows exist only while at least one single-category
/// scan event references the asset.
pub async fn create_asset_state_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS asset_state (
            asset_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL DEFAULT '',
            last_seen_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_latitude REAL NOT NULL DEFAULT 0,
            last_longitude REAL NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values and resets
/// NULL values to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Debounce gate timings (milliseconds)
    ensure_setting(pool, "gate_bulk_repeat_window_ms", "600").await?;
    ensure_setting(pool, "gate_link_min_interval_ms", "250").await?;

    // Decoder re-arm lockouts after an accepted read (milliseconds)
    ensure_setting(pool, "rearm_single_ms", "1000").await?;
    ensure_setting(pool, "rearm_bulk_ms", "250").await?;

    // HTTP server settings
    ensure_setting(pool, "http_port", "5780").await?;

    // Enrichment settings
    ensure_setting(pool, "enrich_addresses", "true").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it is created with the default.
/// If the setting exists but has a NULL value, it is reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Read a setting as an integer, falling back to the given default
pub async fn get_setting_i64(pool: &SqlitePool, key: &str, default: i64) -> Result<i64> {
    let value: Option<i64> =
        sqlx::query_scalar("SELECT CAST(value AS INTEGER) FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.unwrap_or(default))
}
