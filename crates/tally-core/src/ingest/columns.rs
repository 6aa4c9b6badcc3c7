//! Alias-based column resolution.
//!
//! The source spreadsheets are hand-maintained and their column order and
//! exact header wording are not stable, so logical fields are resolved
//! against an ordered alias list instead of fixed positions. Each alias is
//! matched by case-insensitive substring containment; the first header (in
//! header order) containing the first matching alias wins, which also
//! settles duplicated headers. A field whose aliases match nothing degrades
//! to a documented fallback (empty text / zero amount) rather than failing
//! the parse.

use std::collections::HashMap;

/// Logical columns the record builders and aggregations consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    // Order export
    CheckoutTime,
    CheckoutAmount,
    DiscountAmount,
    PaymentMethod,
    OrderType,
    CustomerName,
    CustomerPhone,
    LineItems,
    // Product sales export
    ProductName,
    LineAmount,
    // Product master export
    MasterName,
    MasterNewName,
    LargeCategory,
    SmallCategory,
}

impl Field {
    /// Ordered header aliases, all lowercase. The upstream sheets carry the
    /// POS vendor's original headers, so those fragments lead each list.
    #[must_use]
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::CheckoutTime => &["結帳時間", "發票時間", "checkout time", "invoice time"],
            Self::CheckoutAmount => {
                &["結帳金額", "發票金額", "checkout amount", "invoice amount", "total"]
            }
            Self::DiscountAmount => &["折扣金額", "discount"],
            Self::PaymentMethod => &["支付方式", "付款方式", "付款類型", "payment"],
            Self::OrderType => &["訂單類型", "用餐方式", "服務方式", "order type", "service type"],
            Self::CustomerName => &["顧客姓名", "customer name"],
            Self::CustomerPhone => &["顧客電話", "customer phone"],
            Self::LineItems => &["品項", "items"],
            Self::ProductName => &["商品名稱", "品項名稱", "product name", "item name"],
            Self::LineAmount => &["金額", "價格", "amount", "price"],
            Self::MasterName => &["商品名稱", "product name"],
            Self::MasterNewName => &["新商品名稱", "new product name"],
            Self::LargeCategory => &["大分類", "large category", "category"],
            Self::SmallCategory => &["小分類", "small category", "subcategory"],
        }
    }
}

/// A resolved field → column-index mapping for one parsed sheet.
///
/// Built once per parse call; row accessors then read by index with the
/// fallback policy applied.
#[derive(Debug, Clone)]
pub struct HeaderMap {
    indices: HashMap<Field, usize>,
}

impl HeaderMap {
    /// Resolves `fields` against the header row.
    #[must_use]
    pub fn resolve(headers: &[String], fields: &[Field]) -> Self {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

        let mut indices = HashMap::new();
        for &field in fields {
            if let Some(index) = find_header(&lowered, field.aliases()) {
                indices.insert(field, index);
            }
        }
        Self { indices }
    }

    #[must_use]
    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.indices.get(&field).copied()
    }

    #[must_use]
    pub fn has(&self, field: Field) -> bool {
        self.indices.contains_key(&field)
    }

    /// Trimmed cell text for `field`, or `""` when the column is absent or
    /// the row is short.
    #[must_use]
    pub fn text<'a>(&self, row: &'a [String], field: Field) -> &'a str {
        self.index_of(field)
            .and_then(|index| row.get(index))
            .map_or("", |cell| cell.trim())
    }

    /// Numeric cell value for `field`, or `0.0` when the column is absent or
    /// the cell does not parse. Currency symbols and thousands separators
    /// are stripped before parsing.
    #[must_use]
    pub fn amount(&self, row: &[String], field: Field) -> f64 {
        let raw = self.text(row, field);
        if raw.is_empty() {
            return 0.0;
        }
        let cleaned: String =
            raw.chars().filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.').collect();
        cleaned.parse().unwrap_or(0.0)
    }
}

fn find_header(lowered_headers: &[String], aliases: &[&str]) -> Option<usize> {
    for alias in aliases {
        if let Some(index) = lowered_headers.iter().position(|h| h.contains(alias)) {
            return Some(index);
        }
    }
    None
}
