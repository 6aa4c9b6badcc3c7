//! Advisory validation of datasets and computed distributions.
//!
//! Warnings are non-fatal: the result is still returned to the caller, but
//! a result carrying warnings is not cached, so a transient bad snapshot
//! heals itself on the next natural cache miss.

use crate::ingest::records::OrderRecord;
use crate::reports::round1;
use serde::{Deserialize, Serialize};

/// Fraction of populated-but-unparseable timestamps above which the dataset
/// is considered suspicious.
pub const MAX_INVALID_TIMESTAMP_RATIO: f64 = 0.2;

/// Allowed deviation of a distribution's percentage sum from 100.
pub const PERCENTAGE_TOLERANCE: f64 = 0.5;

/// A single advisory finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationWarning {
    pub code: String,
    pub detail: String,
}

impl ValidationWarning {
    fn new(code: &str, detail: String) -> Self {
        Self { code: code.to_owned(), detail }
    }
}

/// Checks the order dataset for structurally valid but suspicious data.
#[must_use]
pub fn validate_orders(orders: &[OrderRecord]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if orders.is_empty() {
        warnings.push(ValidationWarning::new("empty_dataset", "order export contained no data rows".to_owned()));
        return warnings;
    }

    let total_amount: f64 = orders.iter().map(|order| order.amount).sum();
    if total_amount < 0.0 {
        warnings.push(ValidationWarning::new(
            "negative_total",
            format!("total order amount is negative ({total_amount:.2})"),
        ));
    }

    let populated =
        orders.iter().filter(|order| !order.raw_checkout.is_empty()).count();
    let invalid = orders
        .iter()
        .filter(|order| !order.raw_checkout.is_empty() && order.checkout.is_none())
        .count();
    if populated > 0 {
        let ratio = invalid as f64 / populated as f64;
        if ratio > MAX_INVALID_TIMESTAMP_RATIO {
            warnings.push(ValidationWarning::new(
                "invalid_timestamps",
                format!(
                    "{invalid} of {populated} populated timestamps did not parse ({:.0}%)",
                    round1(ratio * 100.0)
                ),
            ));
        }
    }

    warnings
}

/// Checks that a distribution's percentages reconcile to 100.
///
/// Only meaningful for a non-empty distribution with a positive total; an
/// empty month legitimately sums to zero.
#[must_use]
pub fn validate_distribution(total_amount: f64, percentages: &[f64]) -> Vec<ValidationWarning> {
    if total_amount <= 0.0 || percentages.is_empty() {
        return Vec::new();
    }
    let sum: f64 = percentages.iter().sum();
    if (sum - 100.0).abs() > PERCENTAGE_TOLERANCE {
        return vec![ValidationWarning::new(
            "percentage_sum",
            format!("distribution percentages sum to {sum:.1}, expected 100"),
        )];
    }
    Vec::new()
}
