//! Customer spending and visit-frequency rankings.
//!
//! Customers are identified by phone number; rows with a missing or
//! placeholder phone cannot be grouped and are excluded from the ranking,
//! but their amounts still count toward the month-wide total so the ranking
//! can be read against real revenue. The display name follows the
//! customer's most recent order.

use crate::ingest::records::{parse_line_items, OrderRecord, ProductCatalog};
use crate::reports::round2;
use crate::reports::types::{CustomerRankingEntry, CustomerRankings};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Which metric orders the ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerMetric {
    Spending,
    Frequency,
}

struct CustomerAccum {
    name: String,
    order_count: u64,
    total_amount: f64,
    last_order: NaiveDateTime,
    has_alcohol: bool,
}

fn usable_phone(phone: &str) -> bool {
    !phone.is_empty() && phone != "--"
}

/// Ranks the month's customers by `metric`.
///
/// `alcohol_category` names the large category whose products flag a
/// customer as an alcohol buyer; line items are matched against the catalog
/// by exact name.
#[must_use]
pub fn customer_rankings(
    orders: &[OrderRecord],
    catalog: &ProductCatalog,
    month: &str,
    limit: usize,
    metric: CustomerMetric,
    alcohol_category: &str,
) -> CustomerRankings {
    let alcohol_names: HashSet<&str> = catalog
        .iter()
        .filter(|(_, pair)| pair.large == alcohol_category)
        .map(|(name, _)| name.as_str())
        .collect();

    let mut customers: IndexMap<&str, CustomerAccum> = IndexMap::new();
    let mut monthly_total = 0.0;

    for order in orders {
        let Some(derived) = &order.checkout else { continue };
        if derived.month_key != month {
            continue;
        }
        monthly_total += order.amount;

        let phone = order.customer_phone.trim();
        if !usable_phone(phone) {
            continue;
        }

        let accum = customers.entry(phone).or_insert_with(|| CustomerAccum {
            name: order.customer_name.clone(),
            order_count: 0,
            total_amount: 0.0,
            last_order: derived.timestamp,
            has_alcohol: false,
        });
        accum.order_count += 1;
        accum.total_amount += order.amount;

        if derived.timestamp >= accum.last_order {
            accum.last_order = derived.timestamp;
            accum.name = order.customer_name.clone();
        }

        if !accum.has_alcohol {
            accum.has_alcohol = parse_line_items(&order.line_items)
                .iter()
                .any(|item| alcohol_names.contains(item.as_str()));
        }
    }

    let customer_count = customers.len();

    let mut ranked: Vec<(&str, &CustomerAccum)> =
        customers.iter().map(|(phone, accum)| (*phone, accum)).collect();
    match metric {
        CustomerMetric::Spending => {
            ranked.sort_by(|a, b| b.1.total_amount.total_cmp(&a.1.total_amount));
        }
        CustomerMetric::Frequency => {
            ranked.sort_by(|a, b| b.1.order_count.cmp(&a.1.order_count));
        }
    }

    let entries = ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, (phone, accum))| CustomerRankingEntry {
            rank: index as u32 + 1,
            name: accum.name.clone(),
            phone: phone.to_owned(),
            order_count: accum.order_count,
            total_amount: round2(accum.total_amount),
            last_order: accum.last_order.format("%Y-%m-%d %H:%M").to_string(),
            has_alcohol: accum.has_alcohol,
        })
        .collect();

    CustomerRankings {
        entries,
        monthly_total_amount: round2(monthly_total),
        customer_count,
    }
}
