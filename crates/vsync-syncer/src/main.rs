use std::{env, sync::Arc};

use tokio_util::sync::CancellationToken;
use vsync_core::BroadcastEventRecorder;
use vsync_db_memory::InMemoryStore;
use vsync_storage::EventedStore;
use vsync_syncer::Controller;
use vsync_syncer::config::loader::load_config;
use vsync_syncer::observability;

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From VSYNC_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (vsync.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (VSYNC_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv()
        && !matches!(
            e,
            dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound
        )
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    observability::init_tracing();

    let (config_path, source) = resolve_config_path();
    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path,
        source = %source,
        instance = %cfg.instance.name,
        "Configuration loaded"
    );
    observability::apply_logging_level(&cfg.logging.level);

    // Local mode: both sides are in-memory stores
    let physical = Arc::new(EventedStore::new(InMemoryStore::new("physical")));
    let virtual_store = Arc::new(EventedStore::new(InMemoryStore::new("virtual")));
    let physical_rx = physical.subscribe();
    let virtual_rx = virtual_store.subscribe();

    let recorder = BroadcastEventRecorder::new_shared();
    let mut recorded = recorder.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = recorded.recv().await {
            tracing::info!(
                event_type = %event.event_type,
                reason = %event.reason,
                object = %event.involved_object.name,
                "{}",
                event.message
            );
        }
    });

    let controller = match Controller::from_config(&cfg, physical, virtual_store, recorder) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Controller initialization failed: {e}");
            std::process::exit(2);
        }
    };

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        signal.cancel();
    });

    controller.run(physical_rx, virtual_rx, shutdown).await;
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: VSYNC_CONFIG
/// 3. Default: vsync.toml
fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (path, ConfigSource::CliArgument);
        }
    }

    if let Ok(path) = env::var("VSYNC_CONFIG")
        && !path.is_empty()
    {
        return (path, ConfigSource::EnvironmentVariable);
    }

    ("vsync.toml".to_string(), ConfigSource::Default)
}
