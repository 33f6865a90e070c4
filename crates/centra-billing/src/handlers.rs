//! Per-event state transition handlers.
//!
//! Each handler extracts its correlators, looks up (or creates) the
//! subscription row, applies an absolute status write, and persists. A
//! missing correlator is unrecoverable — retrying the delivery can never
//! populate it — so those cases log and return [`HandlerOutcome::Ignored`]
//! for the HTTP layer to acknowledge with a success response. Store
//! failures propagate as [`StoreError`] and invite a provider retry.

use chrono::Utc;

use centra_billing_core::config::PaddleOptions;
use centra_billing_core::error::StoreResult;
use centra_billing_core::store::SubscriptionStore;
use centra_billing_core::types::{
    NewSubscription, Subscription, SubscriptionStatus, SubscriptionUpdate,
};

use crate::event::EventData;
use crate::plan;

/// What a handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The store was mutated.
    Applied,
    /// Acknowledged without mutation: missing correlator, no matching row,
    /// or an event the handler records but does not act on.
    Ignored,
}

/// `subscription.created` — the only event permitted to insert a row.
///
/// Requires the application user id from checkout metadata; without it the
/// event cannot be attributed to anyone and is dropped with an error log.
/// Goes through the atomic activate procedure so the subscription row and
/// the premium role grant land in one transaction.
pub async fn on_subscription_created(
    data: &EventData,
    store: &dyn SubscriptionStore,
    options: &PaddleOptions,
) -> StoreResult<HandlerOutcome> {
    let Some(user_id) = data
        .custom_data
        .as_ref()
        .and_then(|c| c.user_id.as_deref())
        .filter(|u| !u.is_empty())
    else {
        tracing::error!(
            subscription_id = data.id.as_deref(),
            "subscription.created without userId in custom_data; cannot attribute, dropping"
        );
        return Ok(HandlerOutcome::Ignored);
    };
    let Some(provider_subscription_id) = data.provider_subscription_id() else {
        tracing::error!(user_id, "subscription.created without a subscription id; dropping");
        return Ok(HandlerOutcome::Ignored);
    };

    let (plan_id, billing_cycle) = plan::resolve_plan(data, options);
    store
        .activate_subscription(NewSubscription {
            user_id: user_id.to_string(),
            plan_id: plan_id.clone(),
            billing_cycle,
            provider_subscription_id: provider_subscription_id.to_string(),
            provider_customer_id: data.customer_id.clone(),
        })
        .await?;

    tracing::info!(
        user_id,
        provider_subscription_id,
        plan_id,
        cycle = ?billing_cycle,
        "subscription activated"
    );
    Ok(HandlerOutcome::Applied)
}

/// `subscription.updated` — only an incoming "active" status is acted on,
/// treated as a reactivation of a known row.
pub async fn on_subscription_updated(
    data: &EventData,
    store: &dyn SubscriptionStore,
) -> StoreResult<HandlerOutcome> {
    if data.status.as_deref() != Some("active") {
        tracing::debug!(
            status = data.status.as_deref(),
            "subscription.updated with non-active status; no transition defined"
        );
        return Ok(HandlerOutcome::Ignored);
    }
    let Some(sub) = find_correlated(data, store, "subscription.updated").await? else {
        return Ok(HandlerOutcome::Ignored);
    };
    apply_status(store, &sub, SubscriptionStatus::Active).await
}

/// `subscription.cancelled` — soft cancellation: the user stays entitled
/// until the paid-for period ends. Goes through the atomic cancel
/// procedure so the role revocation cannot split from the status write.
pub async fn on_subscription_cancelled(
    data: &EventData,
    store: &dyn SubscriptionStore,
) -> StoreResult<HandlerOutcome> {
    let Some(sub) = find_correlated(data, store, "subscription.cancelled").await? else {
        return Ok(HandlerOutcome::Ignored);
    };
    store.cancel_subscription(&sub.user_id, true).await?;
    tracing::info!(
        user_id = %sub.user_id,
        provider_subscription_id = %sub.provider_subscription_id,
        "subscription cancelled, entitled until period end"
    );
    Ok(HandlerOutcome::Applied)
}

/// `subscription.paused`.
pub async fn on_subscription_paused(
    data: &EventData,
    store: &dyn SubscriptionStore,
) -> StoreResult<HandlerOutcome> {
    let Some(sub) = find_correlated(data, store, "subscription.paused").await? else {
        return Ok(HandlerOutcome::Ignored);
    };
    apply_status(store, &sub, SubscriptionStatus::Paused).await
}

/// `subscription.resumed`.
pub async fn on_subscription_resumed(
    data: &EventData,
    store: &dyn SubscriptionStore,
) -> StoreResult<HandlerOutcome> {
    let Some(sub) = find_correlated(data, store, "subscription.resumed").await? else {
        return Ok(HandlerOutcome::Ignored);
    };
    apply_status(store, &sub, SubscriptionStatus::Active).await
}

/// `subscription.activated` — idempotent with `created` for rows that
/// already exist.
pub async fn on_subscription_activated(
    data: &EventData,
    store: &dyn SubscriptionStore,
) -> StoreResult<HandlerOutcome> {
    let Some(sub) = find_correlated(data, store, "subscription.activated").await? else {
        return Ok(HandlerOutcome::Ignored);
    };
    apply_status(store, &sub, SubscriptionStatus::Active).await
}

/// `subscription.trialing` — also adopts the provider's trial end as the
/// current period end when supplied.
pub async fn on_subscription_trialing(
    data: &EventData,
    store: &dyn SubscriptionStore,
) -> StoreResult<HandlerOutcome> {
    let Some(sub) = find_correlated(data, store, "subscription.trialing").await? else {
        return Ok(HandlerOutcome::Ignored);
    };
    let update = SubscriptionUpdate {
        status: Some(SubscriptionStatus::Trialing),
        current_period_end: data.trial_ends_at,
        ..Default::default()
    };
    store.update_fields(&sub.id, update).await?;
    Ok(HandlerOutcome::Applied)
}

/// `subscription.payment_succeeded` / `transaction.completed` — the only
/// place billing periods are computed: start = now, end = now + cycle
/// length, status back to active.
pub async fn on_payment_succeeded(
    data: &EventData,
    store: &dyn SubscriptionStore,
) -> StoreResult<HandlerOutcome> {
    let Some(sub) = find_correlated(data, store, "subscription.payment_succeeded").await? else {
        tracing::error!(
            subscription_id = data.provider_subscription_id(),
            "payment succeeded for unknown subscription"
        );
        return Ok(HandlerOutcome::Ignored);
    };
    let now = Utc::now();
    let update = SubscriptionUpdate {
        status: Some(SubscriptionStatus::Active),
        current_period_start: Some(now),
        current_period_end: Some(sub.billing_cycle.period_end_from(now)),
        ..Default::default()
    };
    store.update_fields(&sub.id, update).await?;
    tracing::info!(
        user_id = %sub.user_id,
        provider_subscription_id = %sub.provider_subscription_id,
        cycle = ?sub.billing_cycle,
        "payment succeeded, period renewed"
    );
    Ok(HandlerOutcome::Applied)
}

/// `subscription.payment_failed`.
pub async fn on_payment_failed(
    data: &EventData,
    store: &dyn SubscriptionStore,
) -> StoreResult<HandlerOutcome> {
    let Some(sub) = find_correlated(data, store, "subscription.payment_failed").await? else {
        return Ok(HandlerOutcome::Ignored);
    };
    tracing::warn!(
        user_id = %sub.user_id,
        provider_subscription_id = %sub.provider_subscription_id,
        "payment failed, marking past due"
    );
    apply_status(store, &sub, SubscriptionStatus::PastDue).await
}

/// `subscription.payment_refunded` / `transaction.refunded` — audit only.
///
/// Policy: a refund does not revoke access; the subscription runs out at
/// period end as usual. The event is logged with full correlators for the
/// billing audit trail.
pub async fn on_payment_refunded(
    data: &EventData,
    _store: &dyn SubscriptionStore,
) -> StoreResult<HandlerOutcome> {
    tracing::warn!(
        subscription_id = data.provider_subscription_id(),
        transaction_id = data.id.as_deref(),
        amount = data.amount.as_deref(),
        currency = data.currency.as_deref(),
        "payment refunded; no status change applied"
    );
    Ok(HandlerOutcome::Ignored)
}

/// Resolve the subscription row an event addresses, or `None` (logged)
/// when the correlator is missing or matches nothing.
async fn find_correlated(
    data: &EventData,
    store: &dyn SubscriptionStore,
    event: &str,
) -> StoreResult<Option<Subscription>> {
    let Some(provider_subscription_id) = data.provider_subscription_id() else {
        tracing::warn!(event, "event without a subscription id; ignoring");
        return Ok(None);
    };
    let found = store
        .find_by_provider_subscription_id(provider_subscription_id)
        .await?;
    if found.is_none() {
        tracing::warn!(
            event,
            provider_subscription_id,
            "no subscription row matches; ignoring"
        );
    }
    Ok(found)
}

async fn apply_status(
    store: &dyn SubscriptionStore,
    sub: &Subscription,
    status: SubscriptionStatus,
) -> StoreResult<HandlerOutcome> {
    store
        .update_fields(&sub.id, SubscriptionUpdate::status(status))
        .await?;
    tracing::info!(
        user_id = %sub.user_id,
        provider_subscription_id = %sub.provider_subscription_id,
        status = %status,
        "subscription status updated"
    );
    Ok(HandlerOutcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CustomData, EventItem};
    use centra_billing_memory::MemoryStore;
    use chrono::Duration;

    fn created_data(user_id: Option<&str>) -> EventData {
        EventData {
            id: Some("sub_1".into()),
            customer_id: Some("ctm_1".into()),
            custom_data: Some(CustomData {
                user_id: user_id.map(Into::into),
                plan_id: Some("pro".into()),
                billing_cycle: Some("monthly".into()),
                source: None,
            }),
            items: vec![EventItem {
                price_id: Some("pri_monthly_1".into()),
                quantity: Some(1),
            }],
            ..Default::default()
        }
    }

    fn by_subscription(provider_subscription_id: &str) -> EventData {
        EventData {
            id: Some(provider_subscription_id.into()),
            ..Default::default()
        }
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .activate_subscription(NewSubscription {
                user_id: "u1".into(),
                plan_id: "pro".into(),
                billing_cycle: centra_billing_core::types::BillingCycle::Monthly,
                provider_subscription_id: "sub_1".into(),
                provider_customer_id: Some("ctm_1".into()),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn created_inserts_active_row_and_grants_role() {
        let store = MemoryStore::new();
        let options = PaddleOptions::new("s");
        let outcome = on_subscription_created(&created_data(Some("u1")), &store, &options)
            .await
            .unwrap();
        assert_eq!(outcome, HandlerOutcome::Applied);

        let sub = store
            .find_by_user_id("u1")
            .await
            .unwrap()
            .expect("row created");
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.plan_id, "pro");
        assert_eq!(sub.provider_subscription_id, "sub_1");
        assert_eq!(store.role_of("u1").await.as_deref(), Some("premium"));
    }

    #[tokio::test]
    async fn created_without_user_id_creates_nothing() {
        let store = MemoryStore::new();
        let options = PaddleOptions::new("s");
        let outcome = on_subscription_created(&created_data(None), &store, &options)
            .await
            .unwrap();
        assert_eq!(outcome, HandlerOutcome::Ignored);
        assert_eq!(store.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_created_upserts_instead_of_duplicating() {
        let store = MemoryStore::new();
        let options = PaddleOptions::new("s");
        let data = created_data(Some("u1"));
        on_subscription_created(&data, &store, &options).await.unwrap();
        on_subscription_created(&data, &store, &options).await.unwrap();
        assert_eq!(store.subscription_count().await, 1);
    }

    #[tokio::test]
    async fn cancelled_is_idempotent() {
        let store = seeded_store().await;
        let data = by_subscription("sub_1");

        on_subscription_cancelled(&data, &store).await.unwrap();
        let first = store.find_by_user_id("u1").await.unwrap().unwrap();

        on_subscription_cancelled(&data, &store).await.unwrap();
        let second = store.find_by_user_id("u1").await.unwrap().unwrap();

        assert_eq!(first.status, SubscriptionStatus::Cancelled);
        assert!(first.cancel_at_period_end);
        assert_eq!(second.status, first.status);
        assert_eq!(second.cancel_at_period_end, first.cancel_at_period_end);
        assert_eq!(store.role_of("u1").await, None);
    }

    #[tokio::test]
    async fn cancelled_for_unknown_subscription_is_a_noop() {
        let store = seeded_store().await;
        let outcome = on_subscription_cancelled(&by_subscription("sub_missing"), &store)
            .await
            .unwrap();
        assert_eq!(outcome, HandlerOutcome::Ignored);
        let sub = store.find_by_user_id("u1").await.unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn pause_resume_duplicate_pause_lands_on_paused() {
        let store = seeded_store().await;
        let data = by_subscription("sub_1");

        on_subscription_paused(&data, &store).await.unwrap();
        on_subscription_resumed(&data, &store).await.unwrap();
        on_subscription_paused(&data, &store).await.unwrap();

        let sub = store.find_by_user_id("u1").await.unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Paused);
    }

    #[tokio::test]
    async fn updated_with_active_status_reactivates() {
        let store = seeded_store().await;
        on_subscription_paused(&by_subscription("sub_1"), &store)
            .await
            .unwrap();

        let data = EventData {
            id: Some("sub_1".into()),
            status: Some("active".into()),
            ..Default::default()
        };
        let outcome = on_subscription_updated(&data, &store).await.unwrap();
        assert_eq!(outcome, HandlerOutcome::Applied);
        let sub = store.find_by_user_id("u1").await.unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn updated_with_other_status_is_ignored() {
        let store = seeded_store().await;
        let data = EventData {
            id: Some("sub_1".into()),
            status: Some("past_due".into()),
            ..Default::default()
        };
        let outcome = on_subscription_updated(&data, &store).await.unwrap();
        assert_eq!(outcome, HandlerOutcome::Ignored);
        let sub = store.find_by_user_id("u1").await.unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn trialing_adopts_trial_end() {
        let store = seeded_store().await;
        let trial_end = Utc::now() + Duration::days(14);
        let data = EventData {
            id: Some("sub_1".into()),
            trial_ends_at: Some(trial_end),
            ..Default::default()
        };
        on_subscription_trialing(&data, &store).await.unwrap();
        let sub = store.find_by_user_id("u1").await.unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Trialing);
        assert_eq!(sub.current_period_end, trial_end);
    }

    #[tokio::test]
    async fn payment_succeeded_renews_monthly_period() {
        let store = seeded_store().await;
        let before = Utc::now();
        on_payment_succeeded(&by_subscription("sub_1"), &store)
            .await
            .unwrap();
        let sub = store.find_by_user_id("u1").await.unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.current_period_start >= before);
        assert_eq!(
            sub.current_period_end - sub.current_period_start,
            Duration::days(30)
        );
    }

    #[tokio::test]
    async fn payment_succeeded_renews_yearly_period() {
        let store = MemoryStore::new();
        store
            .activate_subscription(NewSubscription {
                user_id: "u2".into(),
                plan_id: "pro".into(),
                billing_cycle: centra_billing_core::types::BillingCycle::Yearly,
                provider_subscription_id: "sub_2".into(),
                provider_customer_id: None,
            })
            .await
            .unwrap();
        on_payment_succeeded(&by_subscription("sub_2"), &store)
            .await
            .unwrap();
        let sub = store.find_by_user_id("u2").await.unwrap().unwrap();
        assert_eq!(
            sub.current_period_end - sub.current_period_start,
            Duration::days(365)
        );
    }

    #[tokio::test]
    async fn payment_succeeded_correlates_transaction_events() {
        let store = seeded_store().await;
        let data = EventData {
            id: Some("txn_77".into()),
            subscription_id: Some("sub_1".into()),
            ..Default::default()
        };
        let outcome = on_payment_succeeded(&data, &store).await.unwrap();
        assert_eq!(outcome, HandlerOutcome::Applied);
    }

    #[tokio::test]
    async fn payment_failed_marks_past_due() {
        let store = seeded_store().await;
        on_payment_failed(&by_subscription("sub_1"), &store)
            .await
            .unwrap();
        let sub = store.find_by_user_id("u1").await.unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
    }

    #[tokio::test]
    async fn refund_changes_nothing() {
        let store = seeded_store().await;
        let data = EventData {
            id: Some("txn_9".into()),
            subscription_id: Some("sub_1".into()),
            amount: Some("9.99".into()),
            currency: Some("USD".into()),
            ..Default::default()
        };
        let outcome = on_payment_refunded(&data, &store).await.unwrap();
        assert_eq!(outcome, HandlerOutcome::Ignored);
        let sub = store.find_by_user_id("u1").await.unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let store = seeded_store().await;
        store.fail_next_call().await;
        let err = on_payment_failed(&by_subscription("sub_1"), &store)
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
