//! # centra-billing-axum
//!
//! Axum integration for the Paddle webhook receiver.
//!
//! ## Endpoint
//! - `POST /api/paddle-webhook` — verify, parse, and reconcile a billing
//!   event. Non-POST methods on the path answer 405 via method routing.
//!
//! The handler reads the raw body bytes and verifies the signature before
//! any parsing or store access. Response mapping:
//! - `200 {"success":true}` — applied, intentionally ignored, or
//!   unrecoverable-but-logged (stops provider retries)
//! - `401 {"error":"Unauthorized"}` — missing signature or secret
//! - `401 {"error":"Invalid signature"}` — digest mismatch
//! - `500 {"error":"Internal server error"}` — transient store failure
//!   (invites a provider retry)

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};

use centra_billing::event::PaddleEvent;
use centra_billing::router::process_event;
use centra_billing::webhook::{verify_webhook_signature, SIGNATURE_HEADER};
use centra_billing_core::config::PaddleOptions;
use centra_billing_core::error::WebhookError;
use centra_billing_core::store::SubscriptionStore;

/// Webhook endpoint path.
pub const WEBHOOK_PATH: &str = "/api/paddle-webhook";

/// Shared request state: configuration plus the injected store.
#[derive(Clone)]
struct WebhookState {
    options: Arc<PaddleOptions>,
    store: Arc<dyn SubscriptionStore>,
}

/// The Paddle webhook receiver.
///
/// Constructed once at process start with explicit configuration and a
/// store — no ambient globals — and merged into the application's router.
///
/// # Example
///
/// ```rust,ignore
/// let options = PaddleOptions::from_env()?;
/// let store = Arc::new(SupabaseStore::new(&options.store)?);
/// let app = axum::Router::new()
///     .merge(PaddleWebhook::new(options, store).router());
/// ```
pub struct PaddleWebhook {
    state: WebhookState,
}

impl PaddleWebhook {
    pub fn new(options: PaddleOptions, store: Arc<dyn SubscriptionStore>) -> Self {
        Self {
            state: WebhookState {
                options: Arc::new(options),
                store,
            },
        }
    }

    /// Build the router exposing [`WEBHOOK_PATH`].
    pub fn router(&self) -> Router {
        Router::new()
            .route(WEBHOOK_PATH, post(handle_webhook))
            .with_state(self.state.clone())
    }
}

fn ok_response() -> Response {
    Json(serde_json::json!({"success": true})).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({"error": message}))).into_response()
}

async fn handle_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Signature first, over the raw bytes, before any parsing or store
    // access — even for event types the router would ignore.
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    match verify_webhook_signature(&body, signature, &state.options.webhook_secret) {
        Ok(()) => {}
        Err(WebhookError::MissingSecret) | Err(WebhookError::MissingSignature) => {
            tracing::warn!("webhook rejected: missing signature or secret");
            return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
        }
        Err(_) => {
            return error_response(StatusCode::UNAUTHORIZED, "Invalid signature");
        }
    }

    let event: PaddleEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(err) => {
            // The provider signed this exact body; a retry cannot produce a
            // parseable one. Log and acknowledge.
            tracing::error!(error = %err, "could not parse authenticated webhook body");
            return ok_response();
        }
    };

    match process_event(&event, state.store.as_ref(), &state.options).await {
        Ok(_) => ok_response(),
        Err(err) if err.is_transient() => {
            tracing::error!(
                event_type = %event.event_type,
                error = %err,
                "store failure while processing webhook; asking provider to retry"
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
        Err(err) => {
            tracing::error!(
                event_type = %event.event_type,
                error = %err,
                "non-retryable store failure while processing webhook"
            );
            ok_response()
        }
    }
}
