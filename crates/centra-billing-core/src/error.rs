//! Error taxonomy for the webhook pipeline.
//!
//! Three outcomes matter to the HTTP layer: authentication failures (401,
//! no retry benefit), unrecoverable data problems (logged, answered 200 so
//! the provider stops retrying), and transient store failures (500, retry
//! invited). The split lives here; HTTP status mapping lives only in the
//! axum crate.

use thiserror::Error;

/// Failures raised by a [`crate::store::SubscriptionStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store call timed out: {0}")]
    Timeout(String),

    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl StoreError {
    /// Whether a provider retry could plausibly succeed.
    ///
    /// Conflicts come from idempotency races (the row already reflects the
    /// event) and are acknowledged rather than retried; everything else is
    /// treated as transient.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Conflict(_))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures in the webhook request pipeline itself.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The shared secret is empty or unset; verification fails closed.
    #[error("webhook secret is not configured")]
    MissingSecret,

    /// No signature header was supplied with the request.
    #[error("missing webhook signature header")]
    MissingSignature,

    /// The supplied signature does not match the computed digest.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// The body failed to parse after passing signature verification.
    /// The provider signed it, so retrying cannot produce a different body.
    #[error("could not parse webhook body: {0}")]
    MalformedBody(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WebhookError {
    /// Authentication failures are answered 401 and never retried.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::MissingSecret | Self::MissingSignature | Self::InvalidSignature
        )
    }
}
