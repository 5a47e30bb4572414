use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

const DEFAULT_PORT: u16 = 4500;
const DEFAULT_IDENTITY_BASE_URL: &str = "https://id.campushq.io";
const DEFAULT_BILLING_BASE_URL: &str = "https://billing.campushq.io";
const DEFAULT_ANALYTICS_SINK_URL: &str = "https://ingest.campushq.io/events";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 60;
const DEFAULT_FLUSH_BATCH_SIZE: usize = 20;
const DEFAULT_LOGIN_PATH: &str = "/login";

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── IdentityConfig ───────────────────────────────────────────────────────────

/// Identity-provider integration (`[identity]` in config.toml).
///
/// The provider is the single source of truth for authentication state; the
/// daemon only introspects sessions, it never issues them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Base URL of the identity provider's introspection API.
    pub base_url: String,
    /// Per-call timeout in seconds. A slow provider must not hold requests
    /// past this; the gate fails closed on timeout.
    pub timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
        }
    }
}

// ─── BillingConfig ────────────────────────────────────────────────────────────

/// Payment-provider integration (`[billing]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Base URL of the payment provider's API.
    pub base_url: String,
    /// Where the billing portal sends the user back when they are done.
    /// Example: `"https://campushq.io/account"`.
    pub portal_return_url: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BILLING_BASE_URL.to_string(),
            portal_return_url: "https://campushq.io/account".to_string(),
            timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
        }
    }
}

// ─── AnalyticsConfig ──────────────────────────────────────────────────────────

/// Analytics sink + client tracker configuration (`[analytics]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// HTTP endpoint events are flushed to.
    pub sink_url: String,
    /// Flush cadence in seconds. Events also flush early when the batch
    /// threshold is reached.
    pub flush_interval_secs: u64,
    /// Number of buffered events that triggers an early flush.
    pub flush_batch_size: usize,
    /// Experiment keys the tracker reads variant cookies for.
    /// Example: `["exp_hero_headline", "exp_pricing_cta"]`.
    pub experiments: Vec<String>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            sink_url: DEFAULT_ANALYTICS_SINK_URL.to_string(),
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            flush_batch_size: DEFAULT_FLUSH_BATCH_SIZE,
            experiments: vec!["exp_hero_headline".to_string()],
        }
    }
}

// ─── TOML override layer ──────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    port: Option<u16>,
    bind_address: Option<String>,
    log: Option<String>,
    log_format: Option<String>,
    login_path: Option<String>,
    identity: Option<IdentityConfig>,
    billing: Option<BillingConfig>,
    analytics: Option<AnalyticsConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let raw = std::fs::read_to_string(&path).ok()?;
    match toml::from_str(&raw) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            warn!("ignoring malformed config.toml at {}: {e}", path.display());
            None
        }
    }
}

// ─── DaemonConfig ─────────────────────────────────────────────────────────────

/// Resolved daemon configuration. Read-only after startup.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub port: u16,
    pub bind_address: String,
    pub data_dir: PathBuf,
    pub log: String,
    pub log_format: String,
    /// Path unauthenticated visitors are redirected to by the access gate.
    pub login_path: String,
    pub identity: IdentityConfig,
    pub billing: BillingConfig,
    pub analytics: AnalyticsConfig,
}

impl DaemonConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());
        let log_format = toml.log_format.unwrap_or_else(|| "compact".to_string());

        let bind_address = bind_address
            .or(std::env::var("CAMPUSD_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let login_path = toml
            .login_path
            .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());

        let mut identity = toml.identity.unwrap_or_default();
        if let Ok(url) = std::env::var("CAMPUSD_IDENTITY_URL") {
            if !url.is_empty() {
                identity.base_url = url;
            }
        }

        let mut analytics = toml.analytics.unwrap_or_default();
        if let Ok(url) = std::env::var("CAMPUSD_SINK_URL") {
            if !url.is_empty() {
                analytics.sink_url = url;
            }
        }

        Self {
            port,
            bind_address,
            data_dir,
            log,
            log_format,
            login_path,
            identity,
            billing: toml.billing.unwrap_or_default(),
            analytics,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::new(None, None, None, None)
    }
}

fn default_data_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("campusd");
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return PathBuf::from(home).join(".campus");
        }
    }
    PathBuf::from(".campus")
}
