//! The subscription store contract.
//!
//! Persistence backends (Supabase in production, the in-memory store in
//! tests) implement [`SubscriptionStore`]. The webhook handlers receive the
//! store as an explicit parameter — never as ambient global state — so test
//! doubles can be injected.

use std::fmt;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{NewSubscription, Subscription, SubscriptionUpdate};

/// Persistence abstraction over the subscription table and its companion
/// role grants.
///
/// Plain lookups and field updates operate on the subscription table
/// directly. Creation and cancellation go through the atomic procedures
/// ([`activate_subscription`](Self::activate_subscription),
/// [`cancel_subscription`](Self::cancel_subscription)) which also grant or
/// revoke the user's premium role in the same transaction, so the
/// subscription table and the roles table cannot diverge.
///
/// Implementations must carry a bounded timeout on every call: a webhook
/// request has to complete within the provider's delivery window.
#[async_trait]
pub trait SubscriptionStore: Send + Sync + fmt::Debug {
    /// Look up a row by the provider's subscription identifier — the sole
    /// correlation key for update/cancel/pause/resume/payment events.
    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> StoreResult<Option<Subscription>>;

    /// Look up a user's subscription row.
    async fn find_by_user_id(&self, user_id: &str) -> StoreResult<Option<Subscription>>;

    /// Apply a partial update to the row with the given store id.
    /// Returns the updated row, or `None` when no row matched.
    async fn update_fields(
        &self,
        id: &str,
        update: SubscriptionUpdate,
    ) -> StoreResult<Option<Subscription>>;

    /// Atomic procedure: upsert an active subscription for the user and
    /// grant the premium role in one transaction. Upserts rather than
    /// inserts so a redelivered `subscription.created` stays idempotent.
    async fn activate_subscription(&self, new: NewSubscription) -> StoreResult<Subscription>;

    /// Atomic procedure: mark the user's subscription cancelled and revoke
    /// the premium role in one transaction. Returns the updated row, or
    /// `None` when the user has no subscription.
    async fn cancel_subscription(
        &self,
        user_id: &str,
        cancel_at_period_end: bool,
    ) -> StoreResult<Option<Subscription>>;
}
