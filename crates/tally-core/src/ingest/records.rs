//! Typed records built from parsed CSV rows, with derived time fields.
//!
//! Derived fields exist only when the source timestamp parses; records
//! without them are excluded from time-bucketed aggregations but still count
//! toward plain totals when they carry a valid amount.

use crate::ingest::columns::{Field, HeaderMap};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};
use std::collections::HashMap;

/// Hour at which a business day rolls over: times before 05:00 belong to the
/// previous calendar day.
pub const DAY_BOUNDARY_HOUR: u32 = 5;

/// Start of the night-owl band, in minutes past midnight (22:30).
const NIGHT_OWL_START_MINUTES: u32 = 22 * 60 + 30;

/// Coarse time-of-day bucket. Night owl covers >= 22:30 and < 05:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPart {
    Regular,
    NightOwl,
}

/// Fields derived deterministically from a parsed checkout timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTime {
    pub timestamp: NaiveDateTime,
    pub year: i32,
    /// Calendar month key, `YYYY-MM`.
    pub month_key: String,
    pub date: NaiveDate,
    pub hour: u32,
    pub weekday: Weekday,
    pub day_part: DayPart,
    /// Calendar day shifted by the 05:00 business-day boundary.
    pub business_date: NaiveDate,
    /// Month key of `business_date`.
    pub business_month_key: String,
}

/// One row of the order export.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub raw_checkout: String,
    pub checkout: Option<DerivedTime>,
    pub amount: f64,
    pub discount: f64,
    pub payment_method: String,
    pub order_type: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub line_items: String,
}

/// One row of the product sales export.
#[derive(Debug, Clone)]
pub struct ProductSaleRecord {
    pub product_name: String,
    pub amount: f64,
    pub checkout: Option<DerivedTime>,
}

/// Two-level category resolved from the product master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPair {
    pub large: String,
    pub small: String,
}

/// Name → category lookup built from the product master export.
///
/// Both the original and the replacement product name map to the row's
/// categories; later master rows overwrite earlier ones for the same name.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    by_name: HashMap<String, CategoryPair>,
    row_count: usize,
}

impl ProductCatalog {
    #[must_use]
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let Some((headers, data_rows)) = rows.split_first() else {
            return Self::default();
        };
        let map = HeaderMap::resolve(
            headers,
            &[Field::MasterName, Field::MasterNewName, Field::LargeCategory, Field::SmallCategory],
        );

        let mut by_name = HashMap::new();
        for row in data_rows {
            let name = map.text(row, Field::MasterName);
            let new_name = map.text(row, Field::MasterNewName);
            let pair = CategoryPair {
                large: non_empty_or(map.text(row, Field::LargeCategory), "uncategorized"),
                small: non_empty_or(map.text(row, Field::SmallCategory), "uncategorized"),
            };

            if !name.is_empty() {
                by_name.insert(name.to_owned(), pair.clone());
            }
            if !new_name.is_empty() && new_name != name {
                by_name.insert(new_name.to_owned(), pair);
            }
        }

        Self { by_name, row_count: data_rows.len() }
    }

    #[must_use]
    pub fn lookup(&self, product_name: &str) -> Option<&CategoryPair> {
        self.by_name.get(product_name)
    }

    /// Iterates all known (name, category) mappings.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CategoryPair)> {
        self.by_name.iter()
    }

    /// Number of master rows the catalog was built from.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() { fallback.to_owned() } else { value.to_owned() }
}

/// Derives the time fields from a raw timestamp cell.
///
/// Accepts `YYYY-MM-DD HH:MM[:SS]` and the slash-separated variant the
/// spreadsheets also produce; date-only cells parse to midnight. Returns
/// `None` for blank or unparseable cells.
#[must_use]
pub fn derive_time(raw: &str) -> Option<DerivedTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let normalized = raw.replace('/', "-");
    let timestamp = parse_timestamp(&normalized)?;

    let business = timestamp - Duration::hours(i64::from(DAY_BOUNDARY_HOUR));
    let minute_of_day = timestamp.hour() * 60 + timestamp.minute();
    let day_part = if minute_of_day >= NIGHT_OWL_START_MINUTES
        || minute_of_day < DAY_BOUNDARY_HOUR * 60
    {
        DayPart::NightOwl
    } else {
        DayPart::Regular
    };

    Some(DerivedTime {
        year: timestamp.year(),
        month_key: month_key(timestamp.year(), timestamp.month()),
        date: timestamp.date(),
        hour: timestamp.hour(),
        weekday: timestamp.weekday(),
        day_part,
        business_date: business.date(),
        business_month_key: month_key(business.year(), business.month()),
        timestamp,
    })
}

fn parse_timestamp(normalized: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
    for format in FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(normalized, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Formats a `YYYY-MM` month key.
#[must_use]
pub fn month_key(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

/// Human-readable month label for a `YYYY-MM` key (e.g. `Feb 2024`). Falls
/// back to the key itself when it does not parse.
#[must_use]
pub fn month_display(month_key: &str) -> String {
    NaiveDate::parse_from_str(&format!("{month_key}-01"), "%Y-%m-%d")
        .map(|date| date.format("%b %Y").to_string())
        .unwrap_or_else(|_| month_key.to_owned())
}

/// The most recent `count` month keys ending at (and including) the month of
/// `reference`, oldest first, with no gaps.
#[must_use]
pub fn recent_months(reference: NaiveDate, count: usize) -> Vec<String> {
    let mut months = Vec::with_capacity(count);
    let mut year = reference.year();
    let mut month = reference.month();
    for _ in 0..count {
        months.push(month_key(year, month));
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }
    months.reverse();
    months
}

/// Builds order records from tokenized rows (header row first).
#[must_use]
pub fn order_records(rows: &[Vec<String>]) -> Vec<OrderRecord> {
    let Some((headers, data_rows)) = rows.split_first() else {
        return Vec::new();
    };
    let map = HeaderMap::resolve(
        headers,
        &[
            Field::CheckoutTime,
            Field::CheckoutAmount,
            Field::DiscountAmount,
            Field::PaymentMethod,
            Field::OrderType,
            Field::CustomerName,
            Field::CustomerPhone,
            Field::LineItems,
        ],
    );

    data_rows
        .iter()
        .map(|row| {
            let raw_checkout = map.text(row, Field::CheckoutTime).to_owned();
            OrderRecord {
                checkout: derive_time(&raw_checkout),
                raw_checkout,
                amount: map.amount(row, Field::CheckoutAmount),
                discount: map.amount(row, Field::DiscountAmount),
                payment_method: map.text(row, Field::PaymentMethod).to_owned(),
                order_type: map.text(row, Field::OrderType).to_owned(),
                customer_name: map.text(row, Field::CustomerName).to_owned(),
                customer_phone: map.text(row, Field::CustomerPhone).to_owned(),
                line_items: map.text(row, Field::LineItems).to_owned(),
            }
        })
        .collect()
}

/// Builds product sale records from tokenized rows (header row first).
///
/// Rows without a product name or with a non-positive amount are line noise
/// (voids, subtotal rows) and are dropped here.
#[must_use]
pub fn product_sale_records(rows: &[Vec<String>]) -> Vec<ProductSaleRecord> {
    let Some((headers, data_rows)) = rows.split_first() else {
        return Vec::new();
    };
    let map =
        HeaderMap::resolve(headers, &[Field::ProductName, Field::LineAmount, Field::CheckoutTime]);

    data_rows
        .iter()
        .filter_map(|row| {
            let product_name = map.text(row, Field::ProductName);
            let amount = map.amount(row, Field::LineAmount);
            if product_name.is_empty() || amount <= 0.0 {
                return None;
            }
            Some(ProductSaleRecord {
                product_name: product_name.to_owned(),
                amount,
                checkout: derive_time(map.text(row, Field::CheckoutTime)),
            })
        })
        .collect()
}

/// Splits an order's raw line-items cell into product names.
///
/// The export packs items as `name $price, name $price, ...`; the trailing
/// price fragment is stripped from each name.
#[must_use]
pub fn parse_line_items(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item.rfind(" $") {
            Some(index) => item[..index].trim().to_owned(),
            None => item.to_owned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(csv: &str) -> Vec<Vec<String>> {
        crate::ingest::csv::parse(csv)
    }

    #[test]
    fn test_derive_time_dash_format() {
        let derived = derive_time("2024-02-15 19:30:00").unwrap();
        assert_eq!(derived.year, 2024);
        assert_eq!(derived.month_key, "2024-02");
        assert_eq!(derived.hour, 19);
        assert_eq!(derived.weekday, Weekday::Thu);
        assert_eq!(derived.day_part, DayPart::Regular);
        assert_eq!(derived.business_month_key, "2024-02");
    }

    #[test]
    fn test_derive_time_slash_format_without_seconds() {
        let derived = derive_time("2024/02/15 19:30").unwrap();
        assert_eq!(derived.month_key, "2024-02");
        assert_eq!(derived.hour, 19);
    }

    #[test]
    fn test_derive_time_invalid_inputs() {
        assert!(derive_time("").is_none());
        assert!(derive_time("   ").is_none());
        assert!(derive_time("not a date").is_none());
        assert!(derive_time("2024-13-40 12:00").is_none());
    }

    #[test]
    fn test_early_morning_belongs_to_previous_business_day() {
        // 03:30 on March 1st trades as the last hours of February 29th.
        let derived = derive_time("2024-03-01 03:30").unwrap();
        assert_eq!(derived.month_key, "2024-03");
        assert_eq!(derived.business_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(derived.business_month_key, "2024-02");
        assert_eq!(derived.day_part, DayPart::NightOwl);
    }

    #[test]
    fn test_night_owl_band_edges() {
        assert_eq!(derive_time("2024-02-01 22:30").unwrap().day_part, DayPart::NightOwl);
        assert_eq!(derive_time("2024-02-01 22:29").unwrap().day_part, DayPart::Regular);
        assert_eq!(derive_time("2024-02-01 04:59").unwrap().day_part, DayPart::NightOwl);
        assert_eq!(derive_time("2024-02-01 05:00").unwrap().day_part, DayPart::Regular);
    }

    #[test]
    fn test_recent_months_window() {
        let reference = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let months = recent_months(reference, 13);

        assert_eq!(months.len(), 13);
        assert_eq!(months.first().map(String::as_str), Some("2023-02"));
        assert_eq!(months.last().map(String::as_str), Some("2024-02"));
        // Consecutive, no gaps across the year boundary.
        assert!(months.contains(&"2023-12".to_owned()));
        assert!(months.contains(&"2024-01".to_owned()));
    }

    #[test]
    fn test_month_display() {
        assert_eq!(month_display("2024-02"), "Feb 2024");
        assert_eq!(month_display("bogus"), "bogus");
    }

    #[test]
    fn test_order_records_from_csv() {
        let csv = "Checkout Time,Checkout Amount,Discount,Payment,Order Type,Customer Name,Customer Phone,Items\n\
                   2024-02-01 12:00,100,-10,card,Dine-in,Alice,0911000111,\"Beer $80, Rice $20\"\n\
                   ,50,0,cash,Takeout,,,\n";
        let records = order_records(&rows(csv));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].amount, 100.0);
        assert_eq!(records[0].discount, -10.0);
        assert_eq!(records[0].customer_phone, "0911000111");
        assert!(records[0].checkout.is_some());
        // The second row has no timestamp: no derived fields, amount kept.
        assert!(records[1].checkout.is_none());
        assert_eq!(records[1].amount, 50.0);
    }

    #[test]
    fn test_product_sale_records_filter_noise() {
        let csv = "Product Name,Amount,Checkout Time\n\
                   Beer,80,2024-02-01 12:00\n\
                   ,100,2024-02-01 12:00\n\
                   Void Item,0,2024-02-01 12:00\n\
                   Refund,-80,2024-02-01 12:00\n";
        let records = product_sale_records(&rows(csv));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product_name, "Beer");
        assert_eq!(records[0].amount, 80.0);
    }

    #[test]
    fn test_catalog_maps_both_names() {
        let csv = "Product Name,New Product Name,Large Category,Small Category\n\
                   Old Beer,Asahi Draft,alcohol,beer\n\
                   Rice,,staple,rice\n";
        let catalog = ProductCatalog::from_rows(&rows(csv));

        assert_eq!(catalog.row_count(), 2);
        assert_eq!(catalog.lookup("Old Beer").unwrap().large, "alcohol");
        assert_eq!(catalog.lookup("Asahi Draft").unwrap().small, "beer");
        assert_eq!(catalog.lookup("Rice").unwrap().large, "staple");
        assert!(catalog.lookup("Unknown").is_none());
    }

    #[test]
    fn test_catalog_blank_category_falls_back() {
        let csv = "Product Name,New Product Name,Large Category,Small Category\n\
                   Mystery,,,\n";
        let catalog = ProductCatalog::from_rows(&rows(csv));
        let pair = catalog.lookup("Mystery").unwrap();
        assert_eq!(pair.large, "uncategorized");
        assert_eq!(pair.small, "uncategorized");
    }

    #[test]
    fn test_parse_line_items_strips_prices() {
        let items = parse_line_items("Beer $80, Grilled Squid $120, Rice");
        assert_eq!(items, vec!["Beer", "Grilled Squid", "Rice"]);
        assert!(parse_line_items("").is_empty());
    }
}
