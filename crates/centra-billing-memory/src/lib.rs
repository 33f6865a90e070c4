//! # centra-billing-memory
//!
//! In-memory [`SubscriptionStore`] backend. Used as the test double for the
//! webhook pipeline and as the reference semantics for the atomic
//! procedures: activation and cancellation touch the subscription map and
//! the role map under one write lock, mirroring the single-transaction
//! stored procedures of the production backend.

mod store;

pub use store::MemoryStore;

#[doc(inline)]
pub use centra_billing_core::store::SubscriptionStore;
