//! Subscription domain types — statuses, billing cycles, the stored row,
//! and the checkout-side metadata contract.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Subscription lifecycle statuses.
///
/// Transitions are event-driven: each webhook event sets an absolute status,
/// so re-applying the same event is a no-op by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Paused,
    PastDue,
    Trialing,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Paused => "paused",
            Self::PastDue => "past_due",
            Self::Trialing => "trialing",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Commercial billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    /// Length of one paid period in days. Fixed-length periods: 30 for
    /// monthly, 365 for yearly (no leap-year adjustment).
    pub fn period_days(&self) -> i64 {
        match self {
            Self::Monthly => 30,
            Self::Yearly => 365,
        }
    }

    /// Compute the end of a paid period starting at `start`.
    pub fn period_end_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + Duration::days(self.period_days())
    }
}

/// One subscription row, at most one active per user.
///
/// `provider_subscription_id` is the only reliable correlation key between
/// inbound webhook events and stored rows; it is unique per provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Store-generated identifier.
    pub id: String,
    pub user_id: String,
    pub status: SubscriptionStatus,
    pub plan_id: String,
    pub billing_cycle: BillingCycle,
    pub provider_subscription_id: String,
    pub provider_customer_id: Option<String>,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    /// Distinguishes "cancelled but entitled until period end" from a hard
    /// cancellation.
    pub cancel_at_period_end: bool,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether the user is currently entitled to the paid plan.
    ///
    /// Active and trialing rows are entitled. A cancelled row with
    /// `cancel_at_period_end` remains entitled until the paid-for period
    /// runs out.
    pub fn is_entitled(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            SubscriptionStatus::Active | SubscriptionStatus::Trialing => true,
            SubscriptionStatus::Cancelled => {
                self.cancel_at_period_end && now < self.current_period_end
            }
            SubscriptionStatus::Paused | SubscriptionStatus::PastDue => false,
        }
    }
}

/// Fields for creating (or upserting) a subscription on
/// `subscription.created`.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub user_id: String,
    pub plan_id: String,
    pub billing_cycle: BillingCycle,
    pub provider_subscription_id: String,
    pub provider_customer_id: Option<String>,
}

/// Partial update applied to an existing row. `None` fields are left
/// untouched; the store bumps `updated_at` on every write.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    pub status: Option<SubscriptionStatus>,
    pub cancel_at_period_end: Option<bool>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
}

impl SubscriptionUpdate {
    pub fn status(status: SubscriptionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Checkout-side metadata contract.
///
/// The client attaches this as `custom_data` when opening checkout; the
/// provider echoes it back on every related webhook event. This is the only
/// channel carrying the application's user id into the webhook handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<BillingCycle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl CheckoutMetadata {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            plan_id: None,
            billing_cycle: None,
            source: None,
        }
    }

    pub fn with_plan(mut self, plan_id: impl Into<String>, cycle: BillingCycle) -> Self {
        self.plan_id = Some(plan_id.into());
        self.billing_cycle = Some(cycle);
        self
    }
}
