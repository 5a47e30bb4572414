pub mod account;
pub mod billing;
pub mod config;
pub mod gate;
pub mod identity;
pub mod rest;
pub mod storage;
pub mod tracker;

use std::sync::Arc;

use billing::BillingProvider;
use config::DaemonConfig;
use identity::IdentityProvider;
use storage::Storage;
use tracker::sink::AnalyticsSender;

/// Shared application state passed to every REST handler and background task.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<DaemonConfig>,
    pub storage: Arc<Storage>,
    pub identity: Arc<dyn IdentityProvider>,
    pub billing: Arc<dyn BillingProvider>,
    pub analytics: AnalyticsSender,
    pub started_at: std::time::Instant,
}
