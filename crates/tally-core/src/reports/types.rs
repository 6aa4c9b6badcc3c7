//! Report result structures.
//!
//! All of these are immutable once produced, serialize with the camelCase
//! field names the dashboard consumes, and are what the report cache stores
//! (as serialized JSON values).

use serde::{Deserialize, Serialize};

/// One month of the fixed 13-month sales window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySalesPoint {
    pub month: String,
    pub month_display: String,
    pub amount: f64,
    pub order_count: u64,
    pub avg_order_value: f64,
    pub product_item_count: usize,
}

/// One month of the discount trend series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountPoint {
    pub month: String,
    pub month_display: String,
    pub discount_amount: f64,
}

/// One category's share of a distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySlice {
    pub category: String,
    pub amount: f64,
    pub percentage: f64,
}

/// How well sales records joined against the product master.
///
/// Unmatched products are counted and sampled rather than silently dropped,
/// so a drifting master list is visible in the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    pub matched: u64,
    pub unmatched: u64,
    /// `matched / (matched + unmatched)` as a 1-decimal percentage.
    pub match_rate: f64,
    /// Up to ten distinct unmatched product names, first-seen order.
    pub unmatched_samples: Vec<String>,
}

/// A category distribution plus its join quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDistribution {
    pub slices: Vec<CategorySlice>,
    pub total_amount: f64,
    pub match_stats: MatchStats,
}

/// One payment method's share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSlice {
    pub method: String,
    pub count: u64,
    pub amount: f64,
    pub percentage: f64,
}

/// One order type's share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTypeSlice {
    pub order_type: String,
    pub count: u64,
    pub amount: f64,
    pub percentage: f64,
}

/// One weekday's share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdaySlice {
    pub weekday: String,
    pub count: u64,
    pub amount: f64,
    pub percentage: f64,
}

/// Aggregates for one time-of-day band within a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    pub amount: f64,
    pub order_count: u64,
    pub avg_order_value: f64,
}

/// Regular vs night-owl trading for one business month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePeriodPoint {
    pub month: String,
    pub month_display: String,
    pub regular: PeriodStats,
    pub night_owl: PeriodStats,
}

/// One product in a ranking, with a dense 1-based rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub rank: u32,
    pub name: String,
    pub quantity: u64,
    pub amount: f64,
    pub category: String,
}

/// Totals over the full (untruncated) product set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingTotals {
    pub total_quantity: u64,
    pub total_amount: f64,
    pub total_products: usize,
}

/// The three product rankings plus combined totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRankings {
    pub quantity_ranking: Vec<RankingEntry>,
    pub amount_ranking: Vec<RankingEntry>,
    pub alcohol_ranking: Vec<RankingEntry>,
    pub totals: RankingTotals,
}

/// One customer in a spending or frequency ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRankingEntry {
    pub rank: u32,
    pub name: String,
    pub phone: String,
    pub order_count: u64,
    pub total_amount: f64,
    pub last_order: String,
    pub has_alcohol: bool,
}

/// A customer ranking plus month-wide context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRankings {
    pub entries: Vec<CustomerRankingEntry>,
    /// Total amount of every order in the month, including orders with no
    /// usable phone number.
    pub monthly_total_amount: f64,
    /// Distinct customers seen in the month, before truncation.
    pub customer_count: usize,
}
