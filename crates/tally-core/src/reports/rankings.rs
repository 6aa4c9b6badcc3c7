//! Product rankings.
//!
//! Products are summarized per name (quantity = number of sale lines,
//! amount = summed line amounts), sorted by the requested metric
//! descending, and assigned dense 1-based ranks. Ties keep first-seen input
//! order: accumulation preserves insertion order and the sorts are stable.
//! Display lists truncate to the requested top-N while the totals cover the
//! full product set.

use crate::ingest::records::{ProductCatalog, ProductSaleRecord};
use crate::reports::distribution::UNCATEGORIZED;
use crate::reports::round2;
use crate::reports::types::{ProductRankings, RankingEntry, RankingTotals};
use indexmap::IndexMap;

struct ProductAccum {
    quantity: u64,
    amount: f64,
    category: String,
}

fn rank_entries<'a, I>(products: I, limit: usize) -> Vec<RankingEntry>
where
    I: Iterator<Item = (&'a String, &'a ProductAccum)>,
{
    products
        .take(limit)
        .enumerate()
        .map(|(index, (name, accum))| RankingEntry {
            rank: index as u32 + 1,
            name: name.clone(),
            quantity: accum.quantity,
            amount: round2(accum.amount),
            category: accum.category.clone(),
        })
        .collect()
}

/// Builds the quantity, amount, and category-filtered rankings for one
/// month of product sales.
///
/// `category_filter` names the large category of the specialized ranking
/// (the alcohol list in the shipped dashboard). Totals always describe the
/// unfiltered set.
#[must_use]
pub fn product_rankings(
    sales: &[ProductSaleRecord],
    catalog: &ProductCatalog,
    month: Option<&str>,
    limit: usize,
    category_filter: &str,
) -> ProductRankings {
    let mut products: IndexMap<String, ProductAccum> = IndexMap::new();

    for sale in sales {
        if let Some(month) = month {
            let in_month = sale.checkout.as_ref().is_some_and(|d| d.month_key == month);
            if !in_month {
                continue;
            }
        }
        let accum = products.entry(sale.product_name.clone()).or_insert_with(|| ProductAccum {
            quantity: 0,
            amount: 0.0,
            category: catalog
                .lookup(&sale.product_name)
                .map_or_else(|| UNCATEGORIZED.to_owned(), |pair| pair.large.clone()),
        });
        accum.quantity += 1;
        accum.amount += sale.amount;
    }

    let mut by_quantity: Vec<(&String, &ProductAccum)> = products.iter().collect();
    by_quantity.sort_by(|a, b| b.1.quantity.cmp(&a.1.quantity));

    let mut by_amount: Vec<(&String, &ProductAccum)> = products.iter().collect();
    by_amount.sort_by(|a, b| b.1.amount.total_cmp(&a.1.amount));

    let mut filtered: Vec<(&String, &ProductAccum)> =
        products.iter().filter(|(_, accum)| accum.category == category_filter).collect();
    filtered.sort_by(|a, b| b.1.quantity.cmp(&a.1.quantity));

    let totals = RankingTotals {
        total_quantity: products.values().map(|accum| accum.quantity).sum(),
        total_amount: round2(products.values().map(|accum| accum.amount).sum()),
        total_products: products.len(),
    };

    ProductRankings {
        quantity_ranking: rank_entries(by_quantity.into_iter(), limit),
        amount_ranking: rank_entries(by_amount.into_iter(), limit),
        alcohol_ranking: rank_entries(filtered.into_iter(), limit),
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::records::derive_time;

    fn sale(name: &str, amount: f64, time: &str) -> ProductSaleRecord {
        ProductSaleRecord { product_name: name.to_owned(), amount, checkout: derive_time(time) }
    }

    fn catalog() -> ProductCatalog {
        let rows = crate::ingest::csv::parse(
            "Product Name,New Product Name,Large Category,Small Category\n\
             Beer,,alcohol,beer\n\
             Sake,,alcohol,sake\n\
             Rice,,staple,rice\n\
             Squid,,grill,seafood\n",
        );
        ProductCatalog::from_rows(&rows)
    }

    fn fixture() -> Vec<ProductSaleRecord> {
        vec![
            sale("Beer", 80.0, "2024-02-01 12:00"),
            sale("Beer", 80.0, "2024-02-02 12:00"),
            sale("Beer", 80.0, "2024-02-03 12:00"),
            sale("Rice", 20.0, "2024-02-01 12:00"),
            sale("Rice", 20.0, "2024-02-02 12:00"),
            sale("Squid", 500.0, "2024-02-01 12:00"),
            sale("Sake", 120.0, "2024-02-01 12:00"),
        ]
    }

    #[test]
    fn test_quantity_ranking_dense_and_ordered() {
        let rankings = product_rankings(&fixture(), &catalog(), Some("2024-02"), 20, "alcohol");
        let ranking = &rankings.quantity_ranking;

        assert_eq!(ranking[0].name, "Beer");
        assert_eq!(ranking[0].rank, 1);
        assert_eq!(ranking[0].quantity, 3);
        assert_eq!(ranking[0].amount, 240.0);
        assert_eq!(ranking[0].category, "alcohol");

        // Dense 1-based ranks, metric non-increasing.
        for (index, entry) in ranking.iter().enumerate() {
            assert_eq!(entry.rank, index as u32 + 1);
        }
        for pair in ranking.windows(2) {
            assert!(pair[0].quantity >= pair[1].quantity);
        }
    }

    #[test]
    fn test_quantity_ties_keep_first_seen_order() {
        // Rice, Squid, and Sake all have quantity below Beer; Rice has 2,
        // Squid and Sake tie at 1 — Squid appeared first in the input.
        let rankings = product_rankings(&fixture(), &catalog(), Some("2024-02"), 20, "alcohol");
        let names: Vec<&str> =
            rankings.quantity_ranking.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Beer", "Rice", "Squid", "Sake"]);
    }

    #[test]
    fn test_amount_ranking() {
        let rankings = product_rankings(&fixture(), &catalog(), Some("2024-02"), 20, "alcohol");
        let ranking = &rankings.amount_ranking;

        assert_eq!(ranking[0].name, "Squid");
        assert_eq!(ranking[0].amount, 500.0);
        for pair in ranking.windows(2) {
            assert!(pair[0].amount >= pair[1].amount);
        }
    }

    #[test]
    fn test_category_filtered_ranking_with_full_totals() {
        let rankings = product_rankings(&fixture(), &catalog(), Some("2024-02"), 20, "alcohol");

        let names: Vec<&str> =
            rankings.alcohol_ranking.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Beer", "Sake"]);

        // Totals describe the unfiltered set.
        assert_eq!(rankings.totals.total_products, 4);
        assert_eq!(rankings.totals.total_quantity, 7);
        assert_eq!(rankings.totals.total_amount, 900.0);
    }

    #[test]
    fn test_truncation_to_limit() {
        let rankings = product_rankings(&fixture(), &catalog(), Some("2024-02"), 2, "alcohol");
        assert_eq!(rankings.quantity_ranking.len(), 2);
        assert_eq!(rankings.amount_ranking.len(), 2);
        // Totals still cover everything.
        assert_eq!(rankings.totals.total_products, 4);
    }

    #[test]
    fn test_month_filter_excludes_other_months() {
        let mut sales = fixture();
        sales.push(sale("Beer", 80.0, "2024-01-15 12:00"));
        let rankings = product_rankings(&sales, &catalog(), Some("2024-02"), 20, "alcohol");
        assert_eq!(rankings.quantity_ranking[0].quantity, 3);
    }

    #[test]
    fn test_unknown_product_gets_uncategorized() {
        let sales = vec![sale("Mystery", 10.0, "2024-02-01 12:00")];
        let rankings = product_rankings(&sales, &catalog(), Some("2024-02"), 20, "alcohol");
        assert_eq!(rankings.quantity_ranking[0].category, UNCATEGORIZED);
        assert!(rankings.alcohol_ranking.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let rankings = product_rankings(&[], &catalog(), None, 20, "alcohol");
        assert!(rankings.quantity_ranking.is_empty());
        assert_eq!(rankings.totals.total_products, 0);
        assert_eq!(rankings.totals.total_amount, 0.0);
    }
}
