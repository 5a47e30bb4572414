use anyhow::{Context as _, Result};
use campusd::{
    billing::HttpBillingProvider, config::DaemonConfig, identity::HttpIdentityProvider, rest,
    storage::Storage, tracker, AppContext,
};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "campusd",
    about = "Campus Host — course platform backend daemon",
    version
)]
struct Args {
    /// REST API port
    #[arg(long, env = "CAMPUSD_PORT")]
    port: Option<u16>,

    /// Data directory for config.toml and the SQLite database
    #[arg(long, env = "CAMPUSD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CAMPUSD_LOG")]
    log: Option<String>,

    /// Bind address for the REST server (default: 127.0.0.1)
    #[arg(long, env = "CAMPUSD_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "CAMPUSD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Arc::new(DaemonConfig::new(
        args.port,
        args.data_dir,
        args.log,
        args.bind_address,
    ));
    let _log_guard = setup_logging(&config.log, args.log_file.as_deref(), &config.log_format);

    info!("campusd v{} starting", env!("CARGO_PKG_VERSION"));

    let storage = Arc::new(
        Storage::new(&config.data_dir)
            .await
            .context("open storage")?,
    );
    let identity = Arc::new(HttpIdentityProvider::new(&config.identity)?);
    let billing = Arc::new(HttpBillingProvider::new(&config.billing)?);
    let analytics = tracker::sink::spawn(config.clone());

    let ctx = Arc::new(AppContext {
        config,
        storage,
        identity,
        billing,
        analytics,
        started_at: std::time::Instant::now(),
    });

    rest::start_rest_server(ctx).await
}

/// Initialize tracing with stdout output and an optional daily-rotated file.
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("campusd.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}
