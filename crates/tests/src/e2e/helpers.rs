//! Shared fixtures for the end-to-end tests.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use server::{router, AppState};
use std::sync::Arc;
use tally_core::config::AppConfig;
use tally_core::ingest::{DatasetService, HttpSheetSource};
use tally_core::service::ReportService;
use tower::ServiceExt;

/// The current month key; fixtures pin their rows here so the 13-month
/// window and default-month rankings see them.
pub fn fixture_month() -> String {
    chrono::Utc::now().format("%Y-%m").to_string()
}

pub fn orders_csv() -> String {
    let month = fixture_month();
    format!(
        "Checkout Time,Checkout Amount,Discount,Payment,Order Type,Customer Name,Customer Phone,Items\n\
         {month}-01 12:00,100,0,card,dine-in,Wu,0911000111,\"Beer $80, Rice $20\"\n\
         {month}-15 19:30,200,-20,cash,takeout,Lin,0922000222,Rice $20\n"
    )
}

pub fn product_sales_csv() -> String {
    let month = fixture_month();
    format!(
        "Product Name,Amount,Checkout Time\n\
         Beer,80,{month}-01 12:00\n\
         Rice,20,{month}-01 12:00\n\
         Rice,20,{month}-15 19:30\n"
    )
}

pub fn product_master_csv() -> String {
    "Product Name,New Product Name,Large Category,Small Category\n\
     Beer,,alcohol,beer\n\
     Rice,,staple,rice\n"
        .to_owned()
}

/// Config pointed at the mock upstream. `report_ttl_minutes` is exposed so
/// expiry behavior can be tested without waiting hours.
pub fn config_for(upstream_url: &str, report_ttl_minutes: u64) -> AppConfig {
    let mut config = AppConfig::default();
    config.source.orders_url = format!("{upstream_url}/orders");
    config.source.product_sales_url = format!("{upstream_url}/product-sales");
    config.source.product_master_url = format!("{upstream_url}/product-master");
    config.cache.report_ttl_minutes = report_ttl_minutes;
    config
}

pub fn build_app(config: AppConfig) -> (Router, Arc<ReportService>) {
    let source =
        Arc::new(HttpSheetSource::new(config.source.clone()).expect("client builds"));
    let datasets = DatasetService::new(source, &config.cache);
    let service = Arc::new(ReportService::new(datasets, &config));
    let state = AppState::new(Arc::clone(&service), None, Arc::new(config));
    (router::create_router(state), service)
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request builds"))
        .await
        .expect("request succeeds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body reads");
    (status, serde_json::from_slice(&bytes).expect("body is json"))
}

pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .uri(uri)
                .method("POST")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request succeeds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body reads");
    (status, serde_json::from_slice(&bytes).expect("body is json"))
}
