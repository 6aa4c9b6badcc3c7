//! HTTP layer for the tally reporting backend.
//!
//! The binary in `main.rs` wires configuration, logging, the report
//! service, and the background flight sweeper, then serves the router built
//! here.

pub mod admin;
pub mod middleware;
pub mod router;

use std::sync::Arc;
use tally_core::chat::ChatProvider;
use tally_core::config::AppConfig;
use tally_core::service::ReportService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReportService>,
    pub chat: Option<Arc<dyn ChatProvider>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(
        service: Arc<ReportService>,
        chat: Option<Arc<dyn ChatProvider>>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self { service, chat, config }
    }
}
