//! Builds the textual report digest handed to the chat provider.
//!
//! The digest reuses the report service, so it rides the same cache and
//! singleflight as the dashboard and never touches raw data directly.

use crate::service::{ReportError, ReportPayload, ReportService};
use serde_json::Value;
use std::sync::Arc;

/// Question categories the chat endpoint accepts; each selects the reports
/// that go into the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCategory {
    /// Product performance: rankings plus monthly sales.
    Product,
    /// Order behavior: monthly sales, time periods, payment and order types.
    Order,
    /// Category mix: large and small category distributions.
    Category,
}

impl ChatCategory {
    /// Parses the wire name (`product` / `order` / `category`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "product" => Some(Self::Product),
            "order" => Some(Self::Order),
            "category" => Some(Self::Category),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Order => "order",
            Self::Category => "category",
        }
    }
}

const MAX_ROWS_PER_SECTION: usize = 30;

/// Builds the digest for `category` from the (cached) reports.
///
/// # Errors
///
/// Fails when a required report cannot be computed (upstream down).
pub async fn build_digest(
    service: &Arc<ReportService>,
    category: ChatCategory,
) -> Result<String, Arc<ReportError>> {
    let mut sections: Vec<(&str, ReportPayload)> = Vec::new();

    match category {
        ChatCategory::Product => {
            sections.push(("Monthly sales (13 months)", service.monthly_sales().await?));
            sections.push(("Product rankings (current month)", service.product_rankings(None, None).await?));
        }
        ChatCategory::Order => {
            sections.push(("Monthly sales (13 months)", service.monthly_sales().await?));
            sections.push(("Time-period trends", service.time_period_trends().await?));
            sections.push(("Payment distribution", service.payment_distribution(None).await?));
            sections.push(("Order-type distribution", service.order_type_distribution(None).await?));
        }
        ChatCategory::Category => {
            sections.push(("Category distribution", service.category_distribution(None).await?));
            sections.push((
                "Small-category distribution",
                service.small_category_distribution(None).await?,
            ));
        }
    }

    let mut digest = String::from("# Report digest\n");
    for (title, payload) in &sections {
        render_section(&mut digest, title, &payload.data);
    }
    Ok(digest)
}

fn render_section(digest: &mut String, title: &str, data: &Value) {
    digest.push_str(&format!("\n## {title}\n"));
    match data.as_array() {
        Some(rows) => {
            digest.push_str(&format!("{} rows\n", rows.len()));
            for (index, row) in rows.iter().take(MAX_ROWS_PER_SECTION).enumerate() {
                digest.push_str(&format!("{}. {}\n", index + 1, compact(row)));
            }
            if rows.len() > MAX_ROWS_PER_SECTION {
                digest.push_str(&format!(
                    "... {} more rows omitted\n",
                    rows.len() - MAX_ROWS_PER_SECTION
                ));
            }
        }
        None => {
            digest.push_str(&compact(data));
            digest.push('\n');
        }
    }
}

/// Flattens a JSON value to one readable line.
fn compact(value: &Value) -> String {
    match value.as_object() {
        Some(object) => object
            .iter()
            .map(|(key, value)| format!("{key}: {}", compact(value)))
            .collect::<Vec<_>>()
            .join(", "),
        None => value.to_string(),
    }
}
