//! Time-of-day and weekday aggregations.
//!
//! Time-period trends bucket orders by *business* month (05:00 day
//! boundary) and split each month into regular vs night-owl trading.
//! The weekday distribution uses the calendar weekday of the checkout
//! timestamp.

use crate::ingest::records::{month_display, DayPart, OrderRecord};
use crate::reports::types::{PeriodStats, TimePeriodPoint, WeekdaySlice};
use crate::reports::{percentage, round2};
use chrono::Weekday;
use std::collections::HashMap;

#[derive(Default, Clone, Copy)]
struct BandAccum {
    amount: f64,
    order_count: u64,
}

impl BandAccum {
    fn into_stats(self) -> PeriodStats {
        let avg_order_value = if self.order_count > 0 {
            round2(self.amount / self.order_count as f64)
        } else {
            0.0
        };
        PeriodStats { amount: round2(self.amount), order_count: self.order_count, avg_order_value }
    }
}

/// Regular vs night-owl trading per business month, newest month first.
///
/// `months` is the ascending 13-month window; every month appears in the
/// output even with no trade.
#[must_use]
pub fn time_period_trends(orders: &[OrderRecord], months: &[String]) -> Vec<TimePeriodPoint> {
    let mut bands: HashMap<&str, (BandAccum, BandAccum)> =
        months.iter().map(|month| (month.as_str(), Default::default())).collect();

    for order in orders {
        let Some(derived) = &order.checkout else { continue };
        let Some((regular, night_owl)) = bands.get_mut(derived.business_month_key.as_str())
        else {
            continue;
        };
        let band = match derived.day_part {
            DayPart::Regular => regular,
            DayPart::NightOwl => night_owl,
        };
        band.amount += order.amount;
        band.order_count += 1;
    }

    months
        .iter()
        .rev()
        .map(|month| {
            let (regular, night_owl) = bands[month.as_str()];
            TimePeriodPoint {
                month: month.clone(),
                month_display: month_display(month),
                regular: regular.into_stats(),
                night_owl: night_owl.into_stats(),
            }
        })
        .collect()
}

const WEEKDAYS: [(Weekday, &str); 7] = [
    (Weekday::Mon, "Monday"),
    (Weekday::Tue, "Tuesday"),
    (Weekday::Wed, "Wednesday"),
    (Weekday::Thu, "Thursday"),
    (Weekday::Fri, "Friday"),
    (Weekday::Sat, "Saturday"),
    (Weekday::Sun, "Sunday"),
];

/// Order share per calendar weekday, Monday through Sunday, zero-filled.
#[must_use]
pub fn weekday_distribution(orders: &[OrderRecord], month: Option<&str>) -> Vec<WeekdaySlice> {
    let mut stats: HashMap<Weekday, (u64, f64)> = HashMap::new();
    let mut total = 0.0;

    for order in orders {
        let Some(derived) = &order.checkout else { continue };
        if let Some(month) = month {
            if derived.month_key != month {
                continue;
            }
        }
        let entry = stats.entry(derived.weekday).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += order.amount;
        total += order.amount;
    }

    WEEKDAYS
        .iter()
        .map(|&(weekday, name)| {
            let (count, amount) = stats.get(&weekday).copied().unwrap_or((0, 0.0));
            WeekdaySlice {
                weekday: name.to_owned(),
                count,
                amount: round2(amount),
                percentage: percentage(amount, total),
            }
        })
        .collect()
}
