//! # TeamBoard API Server
//!
//! REST API for multi-tenant project and task management.
//!
//! ## Startup
//!
//! 1. Load configuration from the environment (and `.env`)
//! 2. Initialize error reporting (when `SENTRY_DSN` is set) and logging
//! 3. Connect to PostgreSQL and apply pending migrations
//! 4. Serve `/v1` until Ctrl+C, then drain connections
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p teamboard-api
//! ```

use teamboard_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat},
};
use teamboard_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, health_check, DatabaseConfig as PoolConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Sentry must be initialized before the runtime starts its threads.
    let _sentry = config.sentry.dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.sentry.environment.clone().into()),
                ..Default::default()
            },
        ))
    });

    init_tracing(config.log_format);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config))
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "teamboard_api=debug,teamboard_shared=debug,tower_http=debug".into());

    let json = (format == LogFormat::Json).then(|| tracing_subscriber::fmt::layer().json());
    let pretty = (format == LogFormat::Pretty).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .with(sentry_tracing::layer())
        .init();
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "TeamBoard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(PoolConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    let db_time = health_check(&pool).await?;
    tracing::debug!(%db_time, "Database reachable");

    if config.database.run_migrations {
        run_migrations(&pool).await?;
    }

    let bind_address = config.bind_address();
    let state = AppState::new(pool.clone(), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received, closing database pool...");
    close_pool(pool).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
