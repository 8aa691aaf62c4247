mod config;
mod db;
mod errors;
mod export;
mod models;
mod persistence;
mod render;
mod routes;
mod share;
mod state;
mod wizard;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::export::rasterizer::BlockRasterizer;
use crate::export::{ExportPipeline, ExportSettings, S3ArtifactStore};
use crate::persistence::RedisSnapshotStorage;
use crate::routes::build_router;
use crate::share::{PgShareStore, ShareService};
use crate::state::AppState;
use crate::wizard::session::SessionRegistry;

/// How often idle sessions and finished export jobs are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting wizard API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (share links and access logs)
    let db = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    info!("Database migrations applied");

    // Initialize Redis (draft snapshots)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO (export artifacts)
    let s3 = build_s3_client(&config).await;
    let artifacts = Arc::new(S3ArtifactStore::new(s3, config.s3_bucket.clone()));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let sessions = Arc::new(SessionRegistry::new(
        Arc::new(RedisSnapshotStorage::new(redis)),
        config.snapshot_debounce,
    ));
    sessions.spawn_idle_sweep(config.session_idle_timeout, SWEEP_INTERVAL);
    info!(
        "Draft snapshots debounced at {}ms, idle sessions evicted after {}s",
        config.snapshot_debounce.as_millis(),
        config.session_idle_timeout.as_secs()
    );

    let exports = Arc::new(ExportPipeline::new(
        Arc::new(BlockRasterizer),
        artifacts.clone(),
        ExportSettings {
            timeout: config.export_timeout,
            max_bytes: config.export_max_bytes,
            public_base_url: config.public_base_url.clone(),
            ..ExportSettings::default()
        },
    ));
    exports.spawn_prune_sweep(config.export_retention, SWEEP_INTERVAL);

    let shares = Arc::new(ShareService::new(
        Arc::new(PgShareStore::new(db)),
        artifacts,
        config.public_base_url.clone(),
    ));

    // Build app state
    let state = AppState {
        sessions,
        exports,
        shares,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to PUBLIC_BASE_URL in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "wizard-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
