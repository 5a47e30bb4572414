//! Payment-provider integration — billing portal sessions.
//!
//! The provider manages subscriptions and payment methods itself; the daemon
//! only asks it for a short-lived portal URL to hand to the browser.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::BillingConfig;

/// A short-lived, single-use billing portal session.
#[derive(Debug, Clone)]
pub struct PortalSession {
    /// Redirect target the browser is sent to.
    pub url: String,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Create a portal session for the provider's customer reference.
    async fn create_portal_session(
        &self,
        customer_ref: &str,
        return_url: &str,
    ) -> Result<PortalSession>;
}

// ─── HTTP implementation ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PortalSessionResponse {
    url: String,
}

pub struct HttpBillingProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBillingProvider {
    pub fn new(config: &BillingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("build billing provider HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl BillingProvider for HttpBillingProvider {
    async fn create_portal_session(
        &self,
        customer_ref: &str,
        return_url: &str,
    ) -> Result<PortalSession> {
        let url = format!("{}/v1/portal_sessions", self.base_url);
        let body: PortalSessionResponse = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "customer": customer_ref,
                "return_url": return_url,
            }))
            .send()
            .await
            .context("portal session request")?
            .error_for_status()
            .context("portal session status")?
            .json()
            .await
            .context("portal session body")?;

        Ok(PortalSession { url: body.url })
    }
}
