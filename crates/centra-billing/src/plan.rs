//! Plan and billing-cycle resolution.
//!
//! Explicit checkout metadata is authoritative. When it is absent or
//! malformed, fall back to the plan catalog keyed by price id, then to
//! substring inference on the price id, and finally to the configured
//! defaults (plan "pro", monthly).

use centra_billing_core::config::PaddleOptions;
use centra_billing_core::types::BillingCycle;

use crate::event::EventData;

/// Resolve the plan id and billing cycle for a creation event.
pub fn resolve_plan(data: &EventData, options: &PaddleOptions) -> (String, BillingCycle) {
    let custom = data.custom_data.as_ref();
    let price_id = first_price_id(data);

    let catalog_hit = price_id.and_then(|p| options.find_plan_by_price_id(p));

    let plan_id = custom
        .and_then(|c| c.plan_id.clone())
        .filter(|p| !p.is_empty())
        .or_else(|| catalog_hit.map(|(plan, _)| plan.id.clone()))
        .unwrap_or_else(|| options.default_plan_id.clone());

    let cycle = custom
        .and_then(|c| c.billing_cycle.as_deref())
        .and_then(parse_cycle)
        .or_else(|| catalog_hit.map(|(_, cycle)| cycle))
        .or_else(|| price_id.and_then(infer_cycle_from_price_id))
        .unwrap_or(BillingCycle::Monthly);

    (plan_id, cycle)
}

fn first_price_id(data: &EventData) -> Option<&str> {
    data.items.iter().find_map(|item| item.price_id.as_deref())
}

/// Parse an explicit billing-cycle value from metadata, leniently.
fn parse_cycle(value: &str) -> Option<BillingCycle> {
    match value.to_ascii_lowercase().as_str() {
        "monthly" | "month" => Some(BillingCycle::Monthly),
        "yearly" | "year" | "annual" | "annually" => Some(BillingCycle::Yearly),
        _ => None,
    }
}

/// Infer a cycle from a price identifier by substring match
/// (e.g. "pri_pro_monthly_1" sells a monthly period).
fn infer_cycle_from_price_id(price_id: &str) -> Option<BillingCycle> {
    let p = price_id.to_ascii_lowercase();
    if p.contains("year") || p.contains("annual") {
        Some(BillingCycle::Yearly)
    } else if p.contains("month") {
        Some(BillingCycle::Monthly)
    } else {
        None
    }
}
