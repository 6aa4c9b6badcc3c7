//! Upstream data ingestion: CSV export fetching and record construction.
//!
//! The source spreadsheets are hand-maintained, so nothing about them is
//! trusted: column order varies, headers drift, cells carry stray quoting
//! and currency symbols. The pipeline is fetch ([`source`]) → tokenize
//! ([`csv`]) → resolve columns ([`columns`]) → build typed records
//! ([`records`]), with per-dataset caching and fetch deduplication in
//! [`datasets`].

pub mod columns;
pub mod csv;
pub mod datasets;
pub mod errors;
pub mod records;
pub mod source;

pub use datasets::DatasetService;
pub use errors::IngestError;
pub use source::{Dataset, HttpSheetSource, SheetSource};
