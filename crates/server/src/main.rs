use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use debridfs_core::{
    load_config, validate_config, ChangePoller, FileTree, GarbageCollector, IntervalPoller,
    PollHandler, PollerHandle, RealDebridClient, Reconciler, RemoteOrigin, SqliteIndex,
    SqliteTree, StreamResolver, TriggerSource,
};
use debridfs_server::api::create_router;
use debridfs_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("DEBRIDFS_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Index database: {:?}", config.database.index_path);
    info!("Tree database: {:?}", config.database.tree_path);
    info!(
        root_dir = %config.library.root_dir,
        naming = ?config.library.naming,
        "Library layout"
    );

    // Storage
    let index = Arc::new(
        SqliteIndex::new(&config.database.index_path).context("Failed to open index database")?,
    );
    info!("Index initialized");

    let tree: Arc<dyn FileTree> = Arc::new(
        SqliteTree::new(&config.database.tree_path).context("Failed to open tree database")?,
    );
    info!("File tree initialized");

    // Remote origin
    info!("Initializing origin client at {}", config.origin.api_url);
    let origin: Arc<dyn RemoteOrigin> = Arc::new(
        RealDebridClient::new(config.origin.clone()).context("Failed to create origin client")?,
    );

    // Core services
    let reconciler = Arc::new(Reconciler::new(
        Arc::clone(&index),
        Arc::clone(&tree),
        Arc::clone(&origin),
        config.library.clone(),
        &config.sync,
    ));

    let resolver = Arc::new(StreamResolver::new(
        Arc::clone(&index),
        Arc::clone(&tree),
        Arc::clone(&origin),
        config.library.content_type.clone(),
    ));

    let gc = Arc::new(GarbageCollector::new(
        Arc::clone(&tree),
        config.library.root_dir.clone(),
    ));

    // Initial pass
    if config.sync.sync_on_startup {
        info!("Starting initial reconciliation pass");
        reconciler.spawn_trigger(TriggerSource::Startup);
    }

    // Background tasks
    let mut handles: Vec<PollerHandle> = Vec::new();
    let handler: Arc<dyn PollHandler> = reconciler.clone();

    handles.push(
        IntervalPoller::new(Arc::clone(&handler))
            .spawn(Duration::from_secs(config.poller.fallback_interval_secs)),
    );
    info!(
        "Fallback poller started (every {}s)",
        config.poller.fallback_interval_secs
    );

    if let Some(ref poll_url) = config.poller.poll_url {
        match ChangePoller::new(
            poll_url.clone(),
            config.poller.element.clone(),
            Duration::from_secs(config.poller.timeout_secs),
            Arc::clone(&handler),
        ) {
            Ok(poller) => {
                handles.push(
                    Arc::new(poller).spawn(Duration::from_secs(config.poller.poll_interval_secs)),
                );
                info!(
                    url = %poll_url,
                    element = %config.poller.element,
                    "Change poller started (every {}s)",
                    config.poller.poll_interval_secs
                );
            }
            Err(e) => {
                warn!("Change poller disabled: {}", e);
            }
        }
    } else {
        info!("No poll_url configured, relying on the fallback poller");
    }

    if config.gc.enabled {
        handles.push(Arc::clone(&gc).spawn(Duration::from_secs(config.gc.interval_secs)));
        info!("Garbage collector started (every {}s)", config.gc.interval_secs);
    } else {
        info!("Garbage collector disabled in config");
    }

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        index,
        reconciler,
        resolver,
        gc,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    for handle in handles {
        let name = handle.name();
        handle.shutdown().await;
        info!("Stopped {} task", name);
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
