//! End-to-end integration tests.
//!
//! These exercise the full stack — router, report service, caches,
//! singleflight, and the real HTTP sheet source — against a mock upstream.

#[cfg(test)]
mod e2e;
