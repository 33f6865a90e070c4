//! HashMap-backed subscription store.
//!
//! Thread-safe via `tokio::sync::RwLock`. Data is lost on drop. A
//! `fail_next_call` switch lets tests exercise the transient-failure path
//! without a real backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use centra_billing_core::error::{StoreError, StoreResult};
use centra_billing_core::store::SubscriptionStore;
use centra_billing_core::types::{
    NewSubscription, Subscription, SubscriptionStatus, SubscriptionUpdate,
};

/// Inner state shared behind one lock so the atomic procedures really are
/// atomic with respect to concurrent readers.
#[derive(Debug, Default)]
struct Inner {
    /// Subscription rows keyed by store id.
    subscriptions: HashMap<String, Subscription>,
    /// Role grants keyed by user id (value is the role name).
    roles: HashMap<String, String>,
    /// When set, the next store call fails with a connection error.
    fail_next: bool,
}

/// In-memory subscription store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot failure: the next store call returns a connection
    /// error, then normal behavior resumes.
    pub async fn fail_next_call(&self) {
        self.inner.write().await.fail_next = true;
    }

    /// Number of subscription rows held.
    pub async fn subscription_count(&self) -> usize {
        self.inner.read().await.subscriptions.len()
    }

    /// The role currently granted to a user, if any.
    pub async fn role_of(&self, user_id: &str) -> Option<String> {
        self.inner.read().await.roles.get(user_id).cloned()
    }

    /// Snapshot of all subscription rows (for debugging/tests).
    pub async fn snapshot(&self) -> Vec<Subscription> {
        self.inner.read().await.subscriptions.values().cloned().collect()
    }

    async fn check_fail(&self) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.fail_next {
            inner.fail_next = false;
            return Err(StoreError::Connection("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> StoreResult<Option<Subscription>> {
        self.check_fail().await?;
        let inner = self.inner.read().await;
        Ok(inner
            .subscriptions
            .values()
            .find(|s| s.provider_subscription_id == provider_subscription_id)
            .cloned())
    }

    async fn find_by_user_id(&self, user_id: &str) -> StoreResult<Option<Subscription>> {
        self.check_fail().await?;
        let inner = self.inner.read().await;
        Ok(inner
            .subscriptions
            .values()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn update_fields(
        &self,
        id: &str,
        update: SubscriptionUpdate,
    ) -> StoreResult<Option<Subscription>> {
        self.check_fail().await?;
        let mut inner = self.inner.write().await;
        let Some(sub) = inner.subscriptions.get_mut(id) else {
            return Ok(None);
        };
        if let Some(status) = update.status {
            sub.status = status;
        }
        if let Some(flag) = update.cancel_at_period_end {
            sub.cancel_at_period_end = flag;
        }
        if let Some(start) = update.current_period_start {
            sub.current_period_start = start;
        }
        if let Some(end) = update.current_period_end {
            sub.current_period_end = end;
        }
        sub.updated_at = Utc::now();
        Ok(Some(sub.clone()))
    }

    async fn activate_subscription(&self, new: NewSubscription) -> StoreResult<Subscription> {
        self.check_fail().await?;
        let now = Utc::now();
        let mut inner = self.inner.write().await;

        // Upsert keyed on user: one subscription row per user.
        let existing_id = inner
            .subscriptions
            .values()
            .find(|s| s.user_id == new.user_id)
            .map(|s| s.id.clone());

        let sub = match existing_id {
            Some(id) => {
                let sub = inner
                    .subscriptions
                    .get_mut(&id)
                    .expect("row present under held lock");
                sub.status = SubscriptionStatus::Active;
                sub.plan_id = new.plan_id;
                sub.billing_cycle = new.billing_cycle;
                sub.provider_subscription_id = new.provider_subscription_id;
                sub.provider_customer_id = new.provider_customer_id;
                sub.cancel_at_period_end = false;
                sub.current_period_start = now;
                sub.current_period_end = new.billing_cycle.period_end_from(now);
                sub.updated_at = now;
                sub.clone()
            }
            None => {
                let sub = Subscription {
                    id: uuid::Uuid::new_v4().to_string(),
                    user_id: new.user_id.clone(),
                    status: SubscriptionStatus::Active,
                    plan_id: new.plan_id,
                    billing_cycle: new.billing_cycle,
                    provider_subscription_id: new.provider_subscription_id,
                    provider_customer_id: new.provider_customer_id,
                    current_period_start: now,
                    current_period_end: new.billing_cycle.period_end_from(now),
                    cancel_at_period_end: false,
                    updated_at: now,
                };
                inner.subscriptions.insert(sub.id.clone(), sub.clone());
                sub
            }
        };

        inner.roles.insert(new.user_id, "premium".to_string());
        Ok(sub)
    }

    async fn cancel_subscription(
        &self,
        user_id: &str,
        cancel_at_period_end: bool,
    ) -> StoreResult<Option<Subscription>> {
        self.check_fail().await?;
        let mut inner = self.inner.write().await;

        let Some(id) = inner
            .subscriptions
            .values()
            .find(|s| s.user_id == user_id)
            .map(|s| s.id.clone())
        else {
            return Ok(None);
        };

        let sub = inner
            .subscriptions
            .get_mut(&id)
            .expect("row present under held lock");
        sub.status = SubscriptionStatus::Cancelled;
        sub.cancel_at_period_end = cancel_at_period_end;
        sub.updated_at = Utc::now();
        let updated = sub.clone();

        inner.roles.remove(user_id);
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use centra_billing_core::types::BillingCycle;

    fn new_sub(user_id: &str, provider_subscription_id: &str) -> NewSubscription {
        NewSubscription {
            user_id: user_id.into(),
            plan_id: "pro".into(),
            billing_cycle: BillingCycle::Monthly,
            provider_subscription_id: provider_subscription_id.into(),
            provider_customer_id: Some("ctm_1".into()),
        }
    }

    #[tokio::test]
    async fn activate_creates_row_and_grants_role() {
        let store = MemoryStore::new();
        let sub = store.activate_subscription(new_sub("u1", "sub_1")).await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(!sub.id.is_empty());
        assert_eq!(store.role_of("u1").await.as_deref(), Some("premium"));

        let found = store
            .find_by_provider_subscription_id("sub_1")
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn activate_twice_keeps_one_row_per_user() {
        let store = MemoryStore::new();
        let first = store.activate_subscription(new_sub("u1", "sub_1")).await.unwrap();
        let second = store.activate_subscription(new_sub("u1", "sub_2")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.subscription_count().await, 1);
        assert_eq!(second.provider_subscription_id, "sub_2");
    }

    #[tokio::test]
    async fn cancel_marks_row_and_revokes_role() {
        let store = MemoryStore::new();
        store.activate_subscription(new_sub("u1", "sub_1")).await.unwrap();

        let cancelled = store.cancel_subscription("u1", true).await.unwrap().unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
        assert!(cancelled.cancel_at_period_end);
        assert_eq!(store.role_of("u1").await, None);
        // Row survives cancellation; this subsystem never hard-deletes.
        assert_eq!(store.subscription_count().await, 1);
    }

    #[tokio::test]
    async fn cancel_unknown_user_returns_none() {
        let store = MemoryStore::new();
        assert!(store.cancel_subscription("ghost", true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_fields_merges_partial_updates() {
        let store = MemoryStore::new();
        let sub = store.activate_subscription(new_sub("u1", "sub_1")).await.unwrap();

        let updated = store
            .update_fields(&sub.id, SubscriptionUpdate::status(SubscriptionStatus::Paused))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, SubscriptionStatus::Paused);
        // Untouched fields survive.
        assert_eq!(updated.plan_id, "pro");
        assert_eq!(updated.provider_subscription_id, "sub_1");
    }

    #[tokio::test]
    async fn update_fields_on_missing_row_returns_none() {
        let store = MemoryStore::new();
        let result = store
            .update_fields("missing", SubscriptionUpdate::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn fail_next_call_is_one_shot() {
        let store = MemoryStore::new();
        store.fail_next_call().await;

        let err = store.find_by_user_id("u1").await.unwrap_err();
        assert!(err.is_transient());

        // Next call succeeds again.
        assert!(store.find_by_user_id("u1").await.unwrap().is_none());
    }
}
