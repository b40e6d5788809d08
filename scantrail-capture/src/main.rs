//! ScanTrail Capture Service - Main entry point
//!
//! Boots the database, builds the scan classification pipeline and serves
//! the HTTP API the handheld decoder and the operator UI talk to.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scantrail_capture::api::{server, AppContext};
use scantrail_capture::capture::{CapturePipeline, GateConfig};
use scantrail_capture::enrich::{Geocoder, NominatimGeocoder};
use scantrail_capture::location::NoLocation;
use scantrail_capture::store::ScanStore;
use scantrail_common::config::{db_path, resolve_root_folder};
use scantrail_common::db::init::{get_setting_i64, init_database};
use scantrail_common::events::EventBus;
use scantrail_common::ScanMode;

/// Command-line arguments for scantrail-capture
#[derive(Parser, Debug)]
#[command(name = "scantrail-capture")]
#[command(about = "Scan classification and deduplication service for ScanTrail")]
#[command(version)]
struct Args {
    /// Port to listen on (falls back to the http_port setting)
    #[arg(short, long, env = "SCANTRAIL_PORT")]
    port: Option<u16>,

    /// Root folder holding the ScanTrail database
    #[arg(short, long)]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scantrail_capture=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), "SCANTRAIL_ROOT_FOLDER")
        .context("Failed to resolve root folder")?;
    info!("Root folder: {}", root_folder.display());

    let pool = init_database(&db_path(&root_folder))
        .await
        .context("Failed to initialize database")?;

    let port = match args.port {
        Some(port) => port,
        None => get_setting_i64(&pool, "http_port", 5780).await? as u16,
    };

    let gate = GateConfig::load(&pool)
        .await
        .context("Failed to load gate configuration")?;

    let enrich_addresses: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'enrich_addresses'")
            .fetch_optional(&pool)
            .await?;
    let geocoder: Option<Arc<dyn Geocoder>> = if enrich_addresses.as_deref() == Some("true") {
        Some(Arc::new(NominatimGeocoder::new()))
    } else {
        info!("Address enrichment disabled");
        None
    };

    let store = ScanStore::new(pool.clone());
    let events = EventBus::new(256);

    let pipeline = CapturePipeline::new(
        store.clone(),
        gate,
        // No location hardware on the server itself; deployments wire a
        // provider in through the platform integration layer.
        Arc::new(NoLocation),
        geocoder,
        events.clone(),
        ScanMode::Single,
    );
    info!("Capture pipeline initialized in single mode");

    let ctx = AppContext {
        pipeline: Arc::new(Mutex::new(pipeline)),
        store,
        events,
        db_pool: pool,
    };

    server::run(ctx, port).await?;

    info!("Server shutdown complete");
    Ok(())
}
