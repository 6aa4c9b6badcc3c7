//! Monthly sales and discount trend series.
//!
//! Both reports run over a fixed window of month keys (the most recent 13
//! calendar months including the current one). Every month in the window is
//! initialized to zero so the output series has no gaps.

use crate::ingest::records::{month_display, OrderRecord, ProductSaleRecord};
use crate::reports::round2;
use crate::reports::types::{DiscountPoint, MonthlySalesPoint};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct MonthAccum<'a> {
    amount: f64,
    order_count: u64,
    products: HashSet<&'a str>,
}

/// Monthly sales over `months` (ascending `YYYY-MM` keys).
///
/// Order rows contribute the amount and order count; product sale rows
/// contribute the distinct-product count. Rows without derived time fields
/// fall outside every month bucket and are skipped.
#[must_use]
pub fn monthly_sales(
    orders: &[OrderRecord],
    sales: &[ProductSaleRecord],
    months: &[String],
) -> Vec<MonthlySalesPoint> {
    let mut stats: HashMap<&str, MonthAccum<'_>> =
        months.iter().map(|month| (month.as_str(), MonthAccum::default())).collect();

    for order in orders {
        let Some(derived) = &order.checkout else { continue };
        if let Some(accum) = stats.get_mut(derived.month_key.as_str()) {
            accum.order_count += 1;
            accum.amount += order.amount;
        }
    }

    for sale in sales {
        let Some(derived) = &sale.checkout else { continue };
        if let Some(accum) = stats.get_mut(derived.month_key.as_str()) {
            accum.products.insert(sale.product_name.as_str());
        }
    }

    months
        .iter()
        .map(|month| {
            let accum = &stats[month.as_str()];
            let avg_order_value = if accum.order_count > 0 {
                round2(accum.amount / accum.order_count as f64)
            } else {
                0.0
            };
            MonthlySalesPoint {
                month: month.clone(),
                month_display: month_display(month),
                amount: round2(accum.amount),
                order_count: accum.order_count,
                avg_order_value,
                product_item_count: accum.products.len(),
            }
        })
        .collect()
}

/// Total absolute discount per month over `months`.
///
/// Discounts are exported as negative amounts; the trend reports their
/// magnitude.
#[must_use]
pub fn discount_trends(orders: &[OrderRecord], months: &[String]) -> Vec<DiscountPoint> {
    let mut totals: HashMap<&str, f64> =
        months.iter().map(|month| (month.as_str(), 0.0)).collect();

    for order in orders {
        let Some(derived) = &order.checkout else { continue };
        if let Some(total) = totals.get_mut(derived.month_key.as_str()) {
            *total += order.discount.abs();
        }
    }

    months
        .iter()
        .map(|month| DiscountPoint {
            month: month.clone(),
            month_display: month_display(month),
            discount_amount: round2(totals[month.as_str()]),
        })
        .collect()
}
