//! Upstream sheet export fetching.
//!
//! The raw data source is a remote CSV export reachable over plain HTTP GET
//! (header row + data rows, no authentication). The trait seam exists so the
//! service and tests can substitute a counting or canned source.

use crate::config::SourceConfig;
use crate::ingest::errors::IngestError;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, warn};

/// The three upstream exports the reports are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Orders,
    ProductSales,
    ProductMaster,
}

impl Dataset {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::ProductSales => "product_sales",
            Self::ProductMaster => "product_master",
        }
    }
}

/// Fetches raw CSV text for a dataset.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch_csv(&self, dataset: Dataset) -> Result<String, IngestError>;
}

/// HTTP implementation fetching the configured export URLs.
pub struct HttpSheetSource {
    client: Client,
    config: SourceConfig,
}

impl HttpSheetSource {
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new(config: SourceConfig) -> Result<Self, IngestError> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.fetch_timeout_seconds))
            .user_agent(concat!("tally/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    fn url_for(&self, dataset: Dataset) -> &str {
        match dataset {
            Dataset::Orders => &self.config.orders_url,
            Dataset::ProductSales => &self.config.product_sales_url,
            Dataset::ProductMaster => &self.config.product_master_url,
        }
    }
}

#[async_trait]
impl SheetSource for HttpSheetSource {
    async fn fetch_csv(&self, dataset: Dataset) -> Result<String, IngestError> {
        let url = self.url_for(dataset);
        debug!(dataset = dataset.as_str(), "fetching sheet export");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(
                dataset = dataset.as_str(),
                status = status.as_u16(),
                "sheet export returned non-success status"
            );
            return Err(IngestError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(IngestError::EmptySheet(dataset.as_str().to_owned()));
        }
        Ok(body)
    }
}
