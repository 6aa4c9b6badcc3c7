//! Distribution reports: category, payment method, and order type shares.
//!
//! Unmapped values are labeled rather than dropped — `"uncategorized"` for
//! products missing from the master, `"unknown"` for blank methods/types —
//! so slice totals always reconcile with the dataset total.

use crate::ingest::records::{OrderRecord, ProductCatalog, ProductSaleRecord};
use crate::reports::types::{
    CategoryDistribution, CategorySlice, MatchStats, MethodSlice, OrderTypeSlice,
};
use crate::reports::{percentage, round1, round2};
use indexmap::IndexMap;

/// Label for sales whose product is not in the master list.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Label for blank payment methods and order types.
pub const UNKNOWN: &str = "unknown";

/// Which level of the two-level category to distribute over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryLevel {
    Large,
    Small,
}

fn sale_in_month(sale: &ProductSaleRecord, month: Option<&str>) -> bool {
    match month {
        None => true,
        Some(month) => sale.checkout.as_ref().is_some_and(|d| d.month_key == month),
    }
}

fn order_in_month(order: &OrderRecord, month: Option<&str>) -> bool {
    match month {
        None => true,
        Some(month) => order.checkout.as_ref().is_some_and(|d| d.month_key == month),
    }
}

/// Sales joined to the product master by exact name, grouped by category.
///
/// The join quality is reported through [`MatchStats`]; unmatched products
/// land in the `"uncategorized"` slice and still count toward the total.
#[must_use]
pub fn category_distribution(
    sales: &[ProductSaleRecord],
    catalog: &ProductCatalog,
    month: Option<&str>,
    level: CategoryLevel,
) -> CategoryDistribution {
    let mut amounts: IndexMap<String, f64> = IndexMap::new();
    let mut total = 0.0;
    let mut matched = 0u64;
    let mut unmatched = 0u64;
    let mut unmatched_samples: Vec<String> = Vec::new();

    for sale in sales.iter().filter(|sale| sale_in_month(sale, month)) {
        let category = match catalog.lookup(&sale.product_name) {
            Some(pair) => {
                matched += 1;
                match level {
                    CategoryLevel::Large => pair.large.clone(),
                    CategoryLevel::Small => pair.small.clone(),
                }
            }
            None => {
                unmatched += 1;
                if unmatched_samples.len() < 10
                    && !unmatched_samples.contains(&sale.product_name)
                {
                    unmatched_samples.push(sale.product_name.clone());
                }
                UNCATEGORIZED.to_owned()
            }
        };

        *amounts.entry(category).or_insert(0.0) += sale.amount;
        total += sale.amount;
    }

    let mut slices: Vec<CategorySlice> = amounts
        .into_iter()
        .map(|(category, amount)| CategorySlice {
            category,
            amount: round2(amount),
            percentage: percentage(amount, total),
        })
        .collect();
    slices.sort_by(|a, b| b.amount.total_cmp(&a.amount));

    let joined = matched + unmatched;
    let match_rate = if joined > 0 { round1(matched as f64 / joined as f64 * 100.0) } else { 0.0 };

    CategoryDistribution {
        slices,
        total_amount: round2(total),
        match_stats: MatchStats { matched, unmatched, match_rate, unmatched_samples },
    }
}

/// Orders grouped by payment method.
#[must_use]
pub fn payment_distribution(orders: &[OrderRecord], month: Option<&str>) -> Vec<MethodSlice> {
    let mut stats: IndexMap<String, (u64, f64)> = IndexMap::new();
    let mut total = 0.0;

    for order in orders.iter().filter(|order| order_in_month(order, month)) {
        let method = if order.payment_method.is_empty() {
            UNKNOWN.to_owned()
        } else {
            order.payment_method.clone()
        };
        let entry = stats.entry(method).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += order.amount;
        total += order.amount;
    }

    let mut slices: Vec<MethodSlice> = stats
        .into_iter()
        .map(|(method, (count, amount))| MethodSlice {
            method,
            count,
            amount: round2(amount),
            percentage: percentage(amount, total),
        })
        .collect();
    slices.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    slices
}

/// Normalizes free-form order type labels to a small fixed vocabulary.
///
/// The export mixes vendor wordings for the same service mode; anything that
/// matches none of the known fragments passes through unchanged so new modes
/// stay visible.
#[must_use]
pub fn normalize_order_type(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return UNKNOWN.to_owned();
    }
    let lowered = raw.to_lowercase();
    let contains_any =
        |fragments: &[&str]| fragments.iter().any(|fragment| lowered.contains(fragment));

    if contains_any(&["內用", "堂食", "dine"]) {
        "dine-in".to_owned()
    } else if contains_any(&["外帶", "帶走", "take"]) {
        "takeout".to_owned()
    } else if contains_any(&["外送", "送餐", "delivery"]) {
        "delivery".to_owned()
    } else {
        raw.to_owned()
    }
}

/// Orders grouped by normalized order type.
#[must_use]
pub fn order_type_distribution(orders: &[OrderRecord], month: Option<&str>) -> Vec<OrderTypeSlice> {
    let mut stats: IndexMap<String, (u64, f64)> = IndexMap::new();
    let mut total = 0.0;

    for order in orders.iter().filter(|order| order_in_month(order, month)) {
        let order_type = normalize_order_type(&order.order_type);
        let entry = stats.entry(order_type).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += order.amount;
        total += order.amount;
    }

    let mut slices: Vec<OrderTypeSlice> = stats
        .into_iter()
        .map(|(order_type, (count, amount))| OrderTypeSlice {
            order_type,
            count,
            amount: round2(amount),
            percentage: percentage(amount, total),
        })
        .collect();
    slices.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    slices
}
