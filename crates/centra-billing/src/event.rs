//! Wire types for inbound Paddle events, and the closed event-kind
//! enumeration the router dispatches on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An inbound webhook event, parsed after signature verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaddleEvent {
    pub event_type: String,
    pub data: EventData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<String>,
}

/// The event payload. Everything is optional on the wire; handlers decide
/// per-event which correlators are required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventData {
    /// Provider object id. For `subscription.*` events this is the
    /// subscription id; for `transaction.*` events it is the transaction id.
    pub id: Option<String>,
    pub status: Option<String>,
    pub customer_id: Option<String>,
    /// Set on transaction events, pointing back at the subscription.
    pub subscription_id: Option<String>,
    pub product_id: Option<String>,
    pub custom_data: Option<CustomData>,
    pub items: Vec<EventItem>,
    pub next_billed_at: Option<DateTime<Utc>>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub scheduled_change: Option<serde_json::Value>,
    pub amount: Option<String>,
    pub currency: Option<String>,
}

impl EventData {
    /// The provider subscription id correlating this event to a stored row.
    /// Transaction events carry it in `subscription_id`; subscription
    /// events carry it as the object `id`.
    pub fn provider_subscription_id(&self) -> Option<&str> {
        self.subscription_id.as_deref().or(self.id.as_deref())
    }
}

/// Checkout metadata echoed back by the provider. All fields optional on
/// the wire: the creation handler rejects events missing `userId`, and the
/// plan/cycle fields fall through to inference when absent or malformed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomData {
    pub user_id: Option<String>,
    pub plan_id: Option<String>,
    /// Kept as a raw string so a malformed value degrades to inference
    /// instead of failing deserialization of the whole event.
    pub billing_cycle: Option<String>,
    pub source: Option<String>,
}

/// A purchased line item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventItem {
    pub price_id: Option<String>,
    pub quantity: Option<u32>,
}

/// The subscription lifecycle events this receiver acts on.
///
/// A closed enumeration so the router's dispatch is exhaustiveness-checked;
/// [`EventKind::parse`] returns `None` for event types the receiver
/// intentionally ignores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Updated,
    Cancelled,
    Paused,
    Resumed,
    Activated,
    Trialing,
    PaymentSucceeded,
    PaymentFailed,
    PaymentRefunded,
}

impl EventKind {
    /// Map a provider `event_type` string to a kind. Accepts both the
    /// `subscription.payment_*` names and the `transaction.*` aliases, and
    /// both spellings of "cancelled".
    pub fn parse(event_type: &str) -> Option<Self> {
        match event_type {
            "subscription.created" => Some(Self::Created),
            "subscription.updated" => Some(Self::Updated),
            "subscription.cancelled" | "subscription.canceled" => Some(Self::Cancelled),
            "subscription.paused" => Some(Self::Paused),
            "subscription.resumed" => Some(Self::Resumed),
            "subscription.activated" => Some(Self::Activated),
            "subscription.trialing" => Some(Self::Trialing),
            "subscription.payment_succeeded" | "transaction.completed" => {
                Some(Self::PaymentSucceeded)
            }
            "subscription.payment_failed" => Some(Self::PaymentFailed),
            "subscription.payment_refunded" | "transaction.refunded" => {
                Some(Self::PaymentRefunded)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "subscription.created",
            Self::Updated => "subscription.updated",
            Self::Cancelled => "subscription.cancelled",
            Self::Paused => "subscription.paused",
            Self::Resumed => "subscription.resumed",
            Self::Activated => "subscription.activated",
            Self::Trialing => "subscription.trialing",
            Self::PaymentSucceeded => "subscription.payment_succeeded",
            Self::PaymentFailed => "subscription.payment_failed",
            Self::PaymentRefunded => "subscription.payment_refunded",
        }
    }
}
