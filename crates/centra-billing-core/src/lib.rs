//! # centra-billing-core
//!
//! Core contracts for CentraBudget's subscription billing:
//! the subscription data model, the [`store::SubscriptionStore`] trait that
//! persistence backends implement, the error taxonomy shared by the webhook
//! pipeline, and configuration/environment plumbing.
//!
//! The webhook handlers themselves live in the `centra-billing` crate; the
//! HTTP surface lives in `centra-billing-axum`.

pub mod config;
pub mod env;
pub mod error;
pub mod store;
pub mod types;

pub use config::*;
pub use env::{detect_env_mode, init_logger, is_production, EnvMode};
pub use error::*;
pub use types::*;
