//! Billing configuration.
//!
//! Constructed once at process start and passed explicitly into the router
//! and handlers. Secrets are read server-side only; nothing here may reach
//! a browser bundle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::BillingCycle;

/// Environment variable holding the webhook shared secret.
pub const WEBHOOK_SECRET_VAR: &str = "PADDLE_WEBHOOK_SECRET";
/// Environment variables holding the store connection credentials.
pub const STORE_URL_VAR: &str = "SUPABASE_URL";
pub const STORE_SERVICE_ROLE_KEY_VAR: &str = "SUPABASE_SERVICE_ROLE_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("{0} must not be empty")]
    EmptyVar(&'static str),
}

/// A commercial plan and its provider price identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_price_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yearly_price_id: Option<String>,
}

impl Plan {
    /// The billing cycle a given provider price id sells, if it belongs to
    /// this plan.
    pub fn cycle_for_price_id(&self, price_id: &str) -> Option<BillingCycle> {
        if self.monthly_price_id.as_deref() == Some(price_id) {
            Some(BillingCycle::Monthly)
        } else if self.yearly_price_id.as_deref() == Some(price_id) {
            Some(BillingCycle::Yearly)
        } else {
            None
        }
    }
}

/// Store connection credentials (URL + service-role key).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreCredentials {
    pub url: String,
    pub service_role_key: String,
}

/// Paddle billing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaddleOptions {
    /// Shared secret for webhook signature verification.
    pub webhook_secret: String,

    /// Plan assumed when neither metadata nor the plan catalog resolves one.
    #[serde(default = "default_plan_id")]
    pub default_plan_id: String,

    /// Known plans, keyed by provider price ids.
    #[serde(default)]
    pub plans: Vec<Plan>,

    /// Store connection credentials, consumed by the production store
    /// backend at construction time.
    #[serde(default)]
    pub store: StoreCredentials,
}

fn default_plan_id() -> String {
    "pro".to_string()
}

impl PaddleOptions {
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
            default_plan_id: default_plan_id(),
            plans: Vec::new(),
            store: StoreCredentials::default(),
        }
    }

    /// Load configuration from the environment. The webhook secret is
    /// required and must be non-empty; store credentials default to empty
    /// strings for setups that construct the store elsewhere.
    pub fn from_env() -> Result<Self, ConfigError> {
        let webhook_secret = require_var(WEBHOOK_SECRET_VAR)?;
        Ok(Self {
            webhook_secret,
            default_plan_id: default_plan_id(),
            plans: Vec::new(),
            store: StoreCredentials {
                url: std::env::var(STORE_URL_VAR).unwrap_or_default(),
                service_role_key: std::env::var(STORE_SERVICE_ROLE_KEY_VAR).unwrap_or_default(),
            },
        })
    }

    /// Find a plan by its id.
    pub fn find_plan(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    /// Find the plan (and cycle) selling a given provider price id.
    pub fn find_plan_by_price_id(&self, price_id: &str) -> Option<(&Plan, BillingCycle)> {
        self.plans
            .iter()
            .find_map(|p| p.cycle_for_price_id(price_id).map(|c| (p, c)))
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    let value = std::env::var(name).map_err(|_| ConfigError::MissingVar(name))?;
    if value.is_empty() {
        return Err(ConfigError::EmptyVar(name));
    }
    Ok(value)
}
