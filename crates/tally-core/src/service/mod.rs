//! The report service: cache lookup, flight coalescing, aggregation, and
//! the manual refresh batch.
//!
//! Per report key the lifecycle is `UNCACHED → COMPUTING → CACHED → (TTL
//! expiry) → UNCACHED`. A request against an uncached key computes under a
//! singleflight so concurrent requests share one fetch+aggregate cycle;
//! success populates the cache, failure leaves the key uncached and
//! propagates the same error to every waiter. Results carrying validation
//! warnings are returned but deliberately not cached.

pub mod errors;

use crate::cache::{Singleflight, TtlCache};
use crate::config::AppConfig;
use crate::ingest::records::recent_months;
use crate::ingest::DatasetService;
use crate::reports::customers::{customer_rankings, CustomerMetric};
use crate::reports::distribution::{
    category_distribution, order_type_distribution, payment_distribution, CategoryLevel,
};
use crate::reports::monthly::{discount_trends, monthly_sales};
use crate::reports::rankings::product_rankings;
use crate::reports::timeband::{time_period_trends, weekday_distribution};
use crate::reports::validation::{self, ValidationWarning};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

pub use errors::ReportError;

/// Cache key constants. Month-scoped reports append `_{month}` (and
/// rankings additionally `_top{limit}`).
pub mod keys {
    pub const MONTHLY_SALES: &str = "monthly_sales";
    pub const DISCOUNT_TRENDS: &str = "discount_trends";
    pub const CATEGORY_DISTRIBUTION: &str = "category_distribution";
    pub const SMALL_CATEGORY_DISTRIBUTION: &str = "small_category_distribution";
    pub const PAYMENT_DISTRIBUTION: &str = "payment_distribution";
    pub const ORDER_TYPE_DISTRIBUTION: &str = "order_type_distribution";
    pub const WEEKDAY_DISTRIBUTION: &str = "weekday_distribution";
    pub const TIME_PERIODS: &str = "time_periods_sales";
    pub const RANKINGS: &str = "rankings";
    pub const CUSTOMER_SPENDING: &str = "customer_spending_ranking";
    pub const CUSTOMER_FREQUENCY: &str = "customer_frequency_ranking";

    #[must_use]
    pub fn scoped(base: &str, month: &str) -> String {
        format!("{base}_{month}")
    }
}

/// A served report: the (possibly cached) data plus freshness metadata.
#[derive(Debug, Clone)]
pub struct ReportPayload {
    pub data: Arc<Value>,
    pub cached: bool,
    pub cache_timestamp: Option<DateTime<Utc>>,
    pub warnings: Vec<ValidationWarning>,
}

/// One unit of the manual refresh batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshUnit {
    pub key: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A live cache entry, for operational introspection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryInfo {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Length of the serialized value in bytes; an approximation of entry
    /// size, not an allocation measurement.
    pub approx_size_bytes: usize,
}

/// Structured outcome of a manual refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub units: Vec<RefreshUnit>,
    pub entries: Vec<CacheEntryInfo>,
}

impl RefreshSummary {
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.units.iter().filter(|unit| !unit.success).count()
    }
}

/// What a settled flight hands every waiter: the data, any warnings, and
/// whether it was served from cache by the in-flight double-check.
type FlightValue = (Arc<Value>, Vec<ValidationWarning>, bool);
type FlightResult = Result<FlightValue, Arc<ReportError>>;

/// Orchestrates report computation over the TTL cache and singleflight.
///
/// Constructed once at process start and shared as `Arc<ReportService>`;
/// there is one report cache per process instance and no cross-instance
/// coherence.
pub struct ReportService {
    datasets: DatasetService,
    cache: TtlCache<Arc<Value>>,
    flights: Singleflight<FlightResult>,
    report_ttl: chrono::Duration,
    window_months: usize,
    default_limit: usize,
    alcohol_category: String,
}

impl ReportService {
    #[must_use]
    pub fn new(datasets: DatasetService, config: &AppConfig) -> Self {
        Self {
            datasets,
            cache: TtlCache::new(),
            flights: Singleflight::new(),
            report_ttl: config.cache.report_ttl(),
            window_months: config.reports.window_months,
            default_limit: config.reports.default_limit,
            alcohol_category: config.reports.alcohol_category.clone(),
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn current_month() -> String {
        Self::today().format("%Y-%m").to_string()
    }

    fn window(&self) -> Vec<String> {
        recent_months(Self::today(), self.window_months)
    }

    fn validate_month(month: &str) -> Result<(), Arc<ReportError>> {
        // Strict `YYYY-MM`: derived month keys are zero-padded, so a
        // loosely-formed filter like `2024-2` would never match anything.
        let bytes = month.as_bytes();
        let well_formed = bytes.len() == 7
            && bytes[4] == b'-'
            && month[..4].chars().all(|c| c.is_ascii_digit())
            && month[5..].chars().all(|c| c.is_ascii_digit())
            && NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").is_ok();
        if well_formed {
            Ok(())
        } else {
            Err(Arc::new(ReportError::InvalidMonth(month.to_owned())))
        }
    }

    /// Serves `key` from the cache or computes it under a flight.
    ///
    /// The flight registration happens before the compute path first
    /// suspends, so concurrent misses for the same key coalesce onto one
    /// computation.
    async fn cached_report<F, Fut>(
        self: &Arc<Self>,
        key: String,
        compute: F,
    ) -> Result<ReportPayload, Arc<ReportError>>
    where
        F: FnOnce(Arc<Self>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(Value, Vec<ValidationWarning>), ReportError>>
            + Send
            + 'static,
    {
        if let Some(data) = self.cache.get(&key) {
            return Ok(ReportPayload {
                data,
                cached: true,
                cache_timestamp: self.cache.created_at(&key),
                warnings: Vec::new(),
            });
        }

        let svc = Arc::clone(self);
        let flight_key = key.clone();
        let result = self
            .flights
            .run(&key, move || async move {
                // Double-check inside the flight: a flight that settled
                // between our miss and this registration may have cached
                // the value already.
                if let Some(data) = svc.cache.get(&flight_key) {
                    return Ok((data, Vec::new(), true));
                }

                let (value, warnings) =
                    compute(Arc::clone(&svc)).await.map_err(Arc::new)?;
                let data = Arc::new(value);
                if warnings.is_empty() {
                    svc.cache.set(&flight_key, Arc::clone(&data), svc.report_ttl);
                } else {
                    warn!(
                        key = %flight_key,
                        warnings = warnings.len(),
                        "report held out of cache pending a clean validation pass"
                    );
                }
                Ok((data, warnings, false))
            })
            .await;

        let (data, warnings, from_cache) = result?;
        let cache_timestamp =
            if from_cache { self.cache.created_at(&key) } else { None };
        Ok(ReportPayload { data, cached: from_cache, cache_timestamp, warnings })
    }

    /// Monthly sales over the 13-month window.
    pub async fn monthly_sales(self: &Arc<Self>) -> Result<ReportPayload, Arc<ReportError>> {
        self.cached_report(keys::MONTHLY_SALES.to_owned(), |svc| async move {
            let orders = svc.datasets.orders().await?;
            let sales = svc.datasets.product_sales().await?;
            let points = monthly_sales(&orders, &sales, &svc.window());
            let warnings = validation::validate_orders(&orders);
            Ok((serde_json::to_value(points)?, warnings))
        })
        .await
    }

    /// Discount trend over the 13-month window.
    pub async fn discount_trends(self: &Arc<Self>) -> Result<ReportPayload, Arc<ReportError>> {
        self.cached_report(keys::DISCOUNT_TRENDS.to_owned(), |svc| async move {
            let orders = svc.datasets.orders().await?;
            let points = discount_trends(&orders, &svc.window());
            let warnings = validation::validate_orders(&orders);
            Ok((serde_json::to_value(points)?, warnings))
        })
        .await
    }

    /// Large-category distribution, optionally filtered to one month.
    pub async fn category_distribution(
        self: &Arc<Self>,
        month: Option<String>,
    ) -> Result<ReportPayload, Arc<ReportError>> {
        self.category_distribution_at(month, CategoryLevel::Large, keys::CATEGORY_DISTRIBUTION)
            .await
    }

    /// Small-category distribution, optionally filtered to one month.
    pub async fn small_category_distribution(
        self: &Arc<Self>,
        month: Option<String>,
    ) -> Result<ReportPayload, Arc<ReportError>> {
        self.category_distribution_at(
            month,
            CategoryLevel::Small,
            keys::SMALL_CATEGORY_DISTRIBUTION,
        )
        .await
    }

    async fn category_distribution_at(
        self: &Arc<Self>,
        month: Option<String>,
        level: CategoryLevel,
        base_key: &str,
    ) -> Result<ReportPayload, Arc<ReportError>> {
        if let Some(month) = &month {
            Self::validate_month(month)?;
        }
        let key = month
            .as_deref()
            .map_or_else(|| base_key.to_owned(), |m| keys::scoped(base_key, m));

        self.cached_report(key, move |svc| async move {
            let sales = svc.datasets.product_sales().await?;
            let catalog = svc.datasets.catalog().await?;
            let dist = category_distribution(&sales, &catalog, month.as_deref(), level);
            let percentages: Vec<f64> =
                dist.slices.iter().map(|slice| slice.percentage).collect();
            let warnings = validation::validate_distribution(dist.total_amount, &percentages);
            Ok((serde_json::to_value(dist)?, warnings))
        })
        .await
    }

    /// Payment-method distribution, optionally filtered to one month.
    pub async fn payment_distribution(
        self: &Arc<Self>,
        month: Option<String>,
    ) -> Result<ReportPayload, Arc<ReportError>> {
        if let Some(month) = &month {
            Self::validate_month(month)?;
        }
        let key = month
            .as_deref()
            .map_or_else(|| keys::PAYMENT_DISTRIBUTION.to_owned(), |m| {
                keys::scoped(keys::PAYMENT_DISTRIBUTION, m)
            });

        self.cached_report(key, move |svc| async move {
            let orders = svc.datasets.orders().await?;
            let slices = payment_distribution(&orders, month.as_deref());
            let total: f64 = slices.iter().map(|slice| slice.amount).sum();
            let percentages: Vec<f64> = slices.iter().map(|slice| slice.percentage).collect();
            let warnings = validation::validate_distribution(total, &percentages);
            Ok((serde_json::to_value(slices)?, warnings))
        })
        .await
    }

    /// Order-type distribution, optionally filtered to one month.
    pub async fn order_type_distribution(
        self: &Arc<Self>,
        month: Option<String>,
    ) -> Result<ReportPayload, Arc<ReportError>> {
        if let Some(month) = &month {
            Self::validate_month(month)?;
        }
        let key = month
            .as_deref()
            .map_or_else(|| keys::ORDER_TYPE_DISTRIBUTION.to_owned(), |m| {
                keys::scoped(keys::ORDER_TYPE_DISTRIBUTION, m)
            });

        self.cached_report(key, move |svc| async move {
            let orders = svc.datasets.orders().await?;
            let slices = order_type_distribution(&orders, month.as_deref());
            let total: f64 = slices.iter().map(|slice| slice.amount).sum();
            let percentages: Vec<f64> = slices.iter().map(|slice| slice.percentage).collect();
            let warnings = validation::validate_distribution(total, &percentages);
            Ok((serde_json::to_value(slices)?, warnings))
        })
        .await
    }

    /// Weekday distribution, optionally filtered to one month.
    pub async fn weekday_distribution(
        self: &Arc<Self>,
        month: Option<String>,
    ) -> Result<ReportPayload, Arc<ReportError>> {
        if let Some(month) = &month {
            Self::validate_month(month)?;
        }
        let key = month
            .as_deref()
            .map_or_else(|| keys::WEEKDAY_DISTRIBUTION.to_owned(), |m| {
                keys::scoped(keys::WEEKDAY_DISTRIBUTION, m)
            });

        self.cached_report(key, move |svc| async move {
            let orders = svc.datasets.orders().await?;
            let slices = weekday_distribution(&orders, month.as_deref());
            Ok((serde_json::to_value(slices)?, Vec::new()))
        })
        .await
    }

    /// Regular vs night-owl trading per business month.
    pub async fn time_period_trends(
        self: &Arc<Self>,
    ) -> Result<ReportPayload, Arc<ReportError>> {
        self.cached_report(keys::TIME_PERIODS.to_owned(), |svc| async move {
            let orders = svc.datasets.orders().await?;
            let points = time_period_trends(&orders, &svc.window());
            let warnings = validation::validate_orders(&orders);
            Ok((serde_json::to_value(points)?, warnings))
        })
        .await
    }

    /// Product rankings for a month (default: the current month).
    pub async fn product_rankings(
        self: &Arc<Self>,
        month: Option<String>,
        limit: Option<usize>,
    ) -> Result<ReportPayload, Arc<ReportError>> {
        let month = month.unwrap_or_else(Self::current_month);
        Self::validate_month(&month)?;
        let limit = limit.unwrap_or(self.default_limit);
        let key = format!("{}_top{limit}", keys::scoped(keys::RANKINGS, &month));

        self.cached_report(key, move |svc| async move {
            let sales = svc.datasets.product_sales().await?;
            let catalog = svc.datasets.catalog().await?;
            let rankings =
                product_rankings(&sales, &catalog, Some(&month), limit, &svc.alcohol_category);
            Ok((serde_json::to_value(rankings)?, Vec::new()))
        })
        .await
    }

    /// Customer spending ranking for a month (default: the current month).
    pub async fn customer_spending_ranking(
        self: &Arc<Self>,
        month: Option<String>,
        limit: Option<usize>,
    ) -> Result<ReportPayload, Arc<ReportError>> {
        self.customer_ranking(month, limit, CustomerMetric::Spending, keys::CUSTOMER_SPENDING)
            .await
    }

    /// Customer visit-frequency ranking for a month (default: the current
    /// month).
    pub async fn customer_frequency_ranking(
        self: &Arc<Self>,
        month: Option<String>,
        limit: Option<usize>,
    ) -> Result<ReportPayload, Arc<ReportError>> {
        self.customer_ranking(month, limit, CustomerMetric::Frequency, keys::CUSTOMER_FREQUENCY)
            .await
    }

    async fn customer_ranking(
        self: &Arc<Self>,
        month: Option<String>,
        limit: Option<usize>,
        metric: CustomerMetric,
        base_key: &str,
    ) -> Result<ReportPayload, Arc<ReportError>> {
        let month = month.unwrap_or_else(Self::current_month);
        Self::validate_month(&month)?;
        let limit = limit.unwrap_or(self.default_limit);
        let key = format!("{}_top{limit}", keys::scoped(base_key, &month));

        self.cached_report(key, move |svc| async move {
            let orders = svc.datasets.orders().await?;
            let catalog = svc.datasets.catalog().await?;
            let rankings = customer_rankings(
                &orders,
                &catalog,
                &month,
                limit,
                metric,
                &svc.alcohol_category,
            );
            Ok((serde_json::to_value(rankings)?, Vec::new()))
        })
        .await
    }

    /// Clears all report keys and recomputes: the core series eagerly, then
    /// every per-month detail report in a batch that tolerates individual
    /// failures.
    ///
    /// # Errors
    ///
    /// Fails only when the eager core recompute cannot reach the data
    /// source; batch-unit failures are reported in the summary instead.
    pub async fn refresh_all(self: &Arc<Self>) -> Result<RefreshSummary, Arc<ReportError>> {
        info!("manual report cache refresh started");
        self.cache.clear();
        self.datasets.clear();

        let mut units = Vec::new();

        self.monthly_sales().await?;
        units.push(RefreshUnit { key: keys::MONTHLY_SALES.to_owned(), success: true, error: None });
        self.discount_trends().await?;
        units.push(RefreshUnit {
            key: keys::DISCOUNT_TRENDS.to_owned(),
            success: true,
            error: None,
        });

        for month in self.window() {
            let month_units: Vec<(String, Result<ReportPayload, Arc<ReportError>>)> = vec![
                (
                    keys::scoped(keys::CATEGORY_DISTRIBUTION, &month),
                    self.category_distribution(Some(month.clone())).await,
                ),
                (
                    keys::scoped(keys::SMALL_CATEGORY_DISTRIBUTION, &month),
                    self.small_category_distribution(Some(month.clone())).await,
                ),
                (
                    keys::scoped(keys::PAYMENT_DISTRIBUTION, &month),
                    self.payment_distribution(Some(month.clone())).await,
                ),
                (
                    keys::scoped(keys::ORDER_TYPE_DISTRIBUTION, &month),
                    self.order_type_distribution(Some(month.clone())).await,
                ),
                (
                    keys::scoped(keys::RANKINGS, &month),
                    self.product_rankings(Some(month.clone()), None).await,
                ),
            ];

            for (key, result) in month_units {
                match result {
                    Ok(_) => units.push(RefreshUnit { key, success: true, error: None }),
                    Err(error) => {
                        warn!(key = %key, error = %error, "refresh unit failed, continuing");
                        units.push(RefreshUnit {
                            key,
                            success: false,
                            error: Some(error.to_string()),
                        });
                    }
                }
            }
        }

        let summary = RefreshSummary { units, entries: self.cache_entries() };
        info!(
            refreshed = summary.units.len() - summary.failed_count(),
            failed = summary.failed_count(),
            "manual report cache refresh finished"
        );
        Ok(summary)
    }

    /// Lists all live report cache entries with approximate sizes.
    #[must_use]
    pub fn cache_entries(&self) -> Vec<CacheEntryInfo> {
        let mut entries: Vec<CacheEntryInfo> = self
            .cache
            .live_entries()
            .into_iter()
            .map(|entry| CacheEntryInfo {
                key: entry.key,
                created_at: entry.created_at,
                expires_at: entry.expires_at,
                approx_size_bytes: serde_json::to_string(&*entry.value)
                    .map(|s| s.len())
                    .unwrap_or(0),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Clears the report cache and the parsed dataset caches.
    pub fn clear_all(&self) {
        self.cache.clear();
        self.datasets.clear();
        info!("report and dataset caches cleared");
    }

    /// Sweeps leaked flight registrations; returns how many were dropped.
    pub fn purge_stale_flights(&self, max_age: std::time::Duration) -> usize {
        self.flights.purge_stale(max_age) + self.datasets.purge_stale_flights(max_age)
    }

    /// Direct dataset access for the chat digest builder.
    #[must_use]
    pub fn datasets(&self) -> &DatasetService {
        &self.datasets
    }
}
