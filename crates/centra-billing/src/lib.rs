//! # centra-billing
//!
//! Paddle webhook reconciliation for CentraBudget. Translates inbound
//! billing events into authoritative subscription state:
//!
//! 1. [`webhook::verify_webhook_signature`] — HMAC-SHA256 over the raw
//!    request bytes, before anything else touches the payload.
//! 2. [`router::process_event`] — dispatches a verified, parsed event to
//!    exactly one handler.
//! 3. [`handlers`] — one idempotent state transition per lifecycle event,
//!    run against a [`centra_billing_core::store::SubscriptionStore`].
//!
//! Delivery is at-least-once and unordered; every handler applies absolute
//! status writes so duplicates and reordering are harmless.

pub mod event;
pub mod handlers;
pub mod plan;
pub mod router;
pub mod webhook;

pub use event::{EventData, EventKind, PaddleEvent};
pub use handlers::HandlerOutcome;
pub use router::process_event;
pub use webhook::{verify_webhook_signature, SIGNATURE_HEADER};
