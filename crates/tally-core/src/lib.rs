//! # Tally Core
//!
//! Core library for the tally business-reporting backend.
//!
//! This crate provides the foundational components for:
//!
//! - **[`cache`]**: Process-wide TTL cache store and the singleflight request
//!   deduplicator that collapses concurrent recomputations of the same report.
//!
//! - **[`ingest`]**: Upstream CSV export fetching, quote-aware CSV tokenizing,
//!   alias-based column resolution, and typed record construction with derived
//!   business-date fields.
//!
//! - **[`reports`]**: The aggregation engine — monthly sales, discount trends,
//!   category/payment/order-type/weekday distributions, time-period trends,
//!   product rankings, and customer rankings.
//!
//! - **[`service`]**: The report orchestrator tying cache, singleflight, and
//!   aggregation together, plus the manual refresh batch and cache
//!   introspection.
//!
//! - **[`chat`]**: A thin digest builder and LLM provider client that turns
//!   pre-computed report data into prose answers.
//!
//! ## Request Flow
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌───────────────┐
//! │ ReportService │
//! └──────┬────────┘
//!        │
//!        ▼
//! ┌───────────────┐
//! │  Cache Check  │ ─── Hit ──► Cached Result
//! └──────┬────────┘
//!        │ Miss
//!        ▼
//! ┌───────────────┐
//! │  Singleflight │ ─── Joined ──► Shared In-Flight Result
//! └──────┬────────┘
//!        │ Leader
//!        ▼
//! ┌───────────────┐     ┌───────────────┐     ┌───────────────┐
//! │  Fetch CSV    │ ──► │ Parse Records │ ──► │   Aggregate   │
//! └───────────────┘     └───────────────┘     └──────┬────────┘
//!                                                    │
//!                                       clean ───────┴─── warnings
//!                                         │                  │
//!                                         ▼                  ▼
//!                                   Cache Insert      Skip Cache
//!                                         │                  │
//!                                         └───────┬──────────┘
//!                                                 ▼
//!                                        Response to Client
//! ```

pub mod cache;
pub mod chat;
pub mod config;
pub mod ingest;
pub mod reports;
pub mod service;
