//! Cached, deduplicated access to the parsed upstream datasets.
//!
//! Each dataset (orders, product sales, product master) gets its own TTL
//! cache entry and its own singleflight key, so a burst of report requests
//! triggers at most one upstream fetch per dataset. Raw records are produced
//! fresh on every cache miss and never persisted.

use crate::cache::{Singleflight, TtlCache};
use crate::config::CacheConfig;
use crate::ingest::errors::IngestError;
use crate::ingest::records::{
    order_records, product_sale_records, OrderRecord, ProductCatalog, ProductSaleRecord,
};
use crate::ingest::source::{Dataset, SheetSource};
use crate::ingest::csv;
use chrono::Duration;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Shared ingest error: every coalesced waiter receives the same failure.
pub type SharedIngestError = Arc<IngestError>;

type LoadResult<T> = Result<Arc<T>, SharedIngestError>;

/// One dataset's cache + flight coordination.
struct CachedDataset<T> {
    cache: Arc<TtlCache<Arc<T>>>,
    flights: Singleflight<LoadResult<T>>,
    key: &'static str,
    ttl: Duration,
}

impl<T> CachedDataset<T>
where
    T: Send + Sync + 'static,
{
    fn new(key: &'static str, ttl: Duration) -> Self {
        Self { cache: Arc::new(TtlCache::new()), flights: Singleflight::new(), key, ttl }
    }

    /// Returns the cached dataset, or loads it exactly once under the
    /// flight while concurrent callers wait for the same outcome.
    async fn get_or_load<F, Fut>(&self, load: F) -> LoadResult<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, IngestError>> + Send + 'static,
    {
        if let Some(value) = self.cache.get(self.key) {
            return Ok(value);
        }

        let cache = Arc::clone(&self.cache);
        let key = self.key;
        let ttl = self.ttl;
        self.flights
            .run(key, move || async move {
                // Double-check inside the flight: a flight that settled
                // between our miss and this registration may have populated
                // the cache already.
                if let Some(value) = cache.get(key) {
                    return Ok(value);
                }
                let value = Arc::new(load().await.map_err(Arc::new)?);
                cache.set(key, Arc::clone(&value), ttl);
                Ok(value)
            })
            .await
    }
}

/// Process-wide access point for the parsed upstream datasets.
pub struct DatasetService {
    source: Arc<dyn SheetSource>,
    orders: CachedDataset<Vec<OrderRecord>>,
    sales: CachedDataset<Vec<ProductSaleRecord>>,
    catalog: CachedDataset<ProductCatalog>,
}

impl DatasetService {
    #[must_use]
    pub fn new(source: Arc<dyn SheetSource>, cache_config: &CacheConfig) -> Self {
        let dataset_ttl = cache_config.dataset_ttl();
        // The master changes rarely; it gets a longer TTL.
        let master_ttl = cache_config.master_ttl();
        Self {
            source,
            orders: CachedDataset::new("dataset_orders", dataset_ttl),
            sales: CachedDataset::new("dataset_product_sales", dataset_ttl),
            catalog: CachedDataset::new("dataset_product_master", master_ttl),
        }
    }

    /// Parsed order records, fetched at most once per TTL window.
    pub async fn orders(&self) -> LoadResult<Vec<OrderRecord>> {
        let source = Arc::clone(&self.source);
        self.orders
            .get_or_load(move || async move {
                let body = source.fetch_csv(Dataset::Orders).await?;
                let records = order_records(&csv::parse(&body));
                info!(records = records.len(), "order dataset loaded");
                Ok(records)
            })
            .await
    }

    /// Parsed product sale records.
    pub async fn product_sales(&self) -> LoadResult<Vec<ProductSaleRecord>> {
        let source = Arc::clone(&self.source);
        self.sales
            .get_or_load(move || async move {
                let body = source.fetch_csv(Dataset::ProductSales).await?;
                let records = product_sale_records(&csv::parse(&body));
                info!(records = records.len(), "product sales dataset loaded");
                Ok(records)
            })
            .await
    }

    /// The product master resolved into a name → category catalog.
    pub async fn catalog(&self) -> LoadResult<ProductCatalog> {
        let source = Arc::clone(&self.source);
        self.catalog
            .get_or_load(move || async move {
                let body = source.fetch_csv(Dataset::ProductMaster).await?;
                let catalog = ProductCatalog::from_rows(&csv::parse(&body));
                info!(mappings = catalog.iter().count(), "product master loaded");
                Ok(catalog)
            })
            .await
    }

    /// Drops all cached datasets; the next access refetches.
    pub fn clear(&self) {
        self.orders.cache.clear();
        self.sales.cache.clear();
        self.catalog.cache.clear();
    }

    /// Sweeps leaked flight registrations across all datasets.
    pub fn purge_stale_flights(&self, max_age: std::time::Duration) -> usize {
        self.orders.flights.purge_stale(max_age)
            + self.sales.flights.purge_stale(max_age)
            + self.catalog.flights.purge_stale(max_age)
    }
}
