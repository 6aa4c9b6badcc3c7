//! Caching primitives for the report layer.
//!
//! - [`store::TtlCache`]: generic key/value store with per-entry expiration
//!   and lazy eviction.
//! - [`singleflight::Singleflight`]: collapses concurrent computations for
//!   the same key into a single in-flight execution.

pub mod singleflight;
pub mod store;

pub use singleflight::Singleflight;
pub use store::{LiveEntry, TtlCache};
