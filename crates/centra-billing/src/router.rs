//! Event routing: one verified, parsed event in, exactly one handler out.

use centra_billing_core::config::PaddleOptions;
use centra_billing_core::error::StoreResult;
use centra_billing_core::store::SubscriptionStore;

use crate::event::{EventKind, PaddleEvent};
use crate::handlers::{self, HandlerOutcome};

/// Dispatch a verified event to its handler.
///
/// The match over [`EventKind`] is exhaustive; event types outside the
/// closed enumeration are logged at info and acknowledged as a no-op so
/// the provider does not keep retrying deliveries we intentionally ignore.
///
/// Callers must verify the webhook signature before invoking this — no
/// store access happens for unverified requests.
pub async fn process_event(
    event: &PaddleEvent,
    store: &dyn SubscriptionStore,
    options: &PaddleOptions,
) -> StoreResult<HandlerOutcome> {
    let Some(kind) = EventKind::parse(&event.event_type) else {
        tracing::info!(
            event_type = %event.event_type,
            "ignoring unrecognized webhook event type"
        );
        return Ok(HandlerOutcome::Ignored);
    };

    tracing::debug!(event_type = kind.as_str(), "processing webhook event");

    let data = &event.data;
    match kind {
        EventKind::Created => handlers::on_subscription_created(data, store, options).await,
        EventKind::Updated => handlers::on_subscription_updated(data, store).await,
        EventKind::Cancelled => handlers::on_subscription_cancelled(data, store).await,
        EventKind::Paused => handlers::on_subscription_paused(data, store).await,
        EventKind::Resumed => handlers::on_subscription_resumed(data, store).await,
        EventKind::Activated => handlers::on_subscription_activated(data, store).await,
        EventKind::Trialing => handlers::on_subscription_trialing(data, store).await,
        EventKind::PaymentSucceeded => handlers::on_payment_succeeded(data, store).await,
        EventKind::PaymentFailed => handlers::on_payment_failed(data, store).await,
        EventKind::PaymentRefunded => handlers::on_payment_refunded(data, store).await,
    }
}
