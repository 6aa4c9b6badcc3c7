//! Full-stack report flows against a mock upstream.

use crate::e2e::helpers::*;
use axum::http::StatusCode;

async fn mock_all(
    server: &mut mockito::ServerGuard,
) -> (mockito::Mock, mockito::Mock, mockito::Mock) {
    let orders = server
        .mock("GET", "/orders")
        .with_status(200)
        .with_body(orders_csv())
        .create_async()
        .await;
    let sales = server
        .mock("GET", "/product-sales")
        .with_status(200)
        .with_body(product_sales_csv())
        .create_async()
        .await;
    let master = server
        .mock("GET", "/product-master")
        .with_status(200)
        .with_body(product_master_csv())
        .create_async()
        .await;
    (orders, sales, master)
}

#[tokio::test]
async fn test_monthly_sales_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let _mocks = mock_all(&mut server).await;
    let (app, _service) = build_app(config_for(&server.url(), 120));

    let (status, body) = get_json(app, "/reports/monthly-sales").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["cached"], false);

    let points = body["data"].as_array().expect("data is an array");
    assert_eq!(points.len(), 13);
    let current = points.last().expect("window is non-empty");
    assert_eq!(current["month"].as_str().expect("month is a string"), fixture_month());
    assert_eq!(current["orderCount"], 2);
    assert_eq!(current["amount"], 300.0);
    assert_eq!(current["avgOrderValue"], 150.0);
}

#[tokio::test]
async fn test_second_request_is_cache_hit_without_refetch() {
    let mut server = mockito::Server::new_async().await;
    let orders = server
        .mock("GET", "/orders")
        .with_status(200)
        .with_body(orders_csv())
        // One upstream fetch serves both requests.
        .expect(1)
        .create_async()
        .await;
    let _sales = server
        .mock("GET", "/product-sales")
        .with_status(200)
        .with_body(product_sales_csv())
        .expect(1)
        .create_async()
        .await;
    let (app, _service) = build_app(config_for(&server.url(), 120));

    let (_, first) = get_json(app.clone(), "/reports/monthly-sales").await;
    assert_eq!(first["cached"], false);

    let (_, second) = get_json(app, "/reports/monthly-sales").await;
    assert_eq!(second["cached"], true);
    assert!(second.get("cacheTimestamp").is_some());
    assert_eq!(first["data"], second["data"]);

    orders.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_uncached_requests_fetch_upstream_once() {
    let mut server = mockito::Server::new_async().await;
    let _orders = server
        .mock("GET", "/orders")
        .with_status(200)
        .with_body(orders_csv())
        .create_async()
        .await;
    let sales = server
        .mock("GET", "/product-sales")
        .with_status(200)
        .with_body(product_sales_csv())
        .expect(1)
        .create_async()
        .await;
    let master = server
        .mock("GET", "/product-master")
        .with_status(200)
        .with_body(product_master_csv())
        .expect(1)
        .create_async()
        .await;
    let (app, _service) = build_app(config_for(&server.url(), 120));

    let month = fixture_month();
    let uri = format!("/reports/category-distribution?month={month}");
    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        let uri = uri.clone();
        handles.push(tokio::spawn(async move { get_json(app, &uri).await }));
    }

    let mut bodies = Vec::new();
    for handle in handles {
        let (status, body) = handle.await.expect("task completes");
        assert_eq!(status, StatusCode::OK);
        bodies.push(body["data"].clone());
    }
    // Every caller saw the same aggregation.
    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));

    sales.assert_async().await;
    master.assert_async().await;
}

#[tokio::test]
async fn test_upstream_failure_maps_to_bad_gateway_and_recovers() {
    let mut server = mockito::Server::new_async().await;
    let broken = server.mock("GET", "/orders").with_status(500).create_async().await;
    let (app, _service) = build_app(config_for(&server.url(), 120));

    let (status, body) = get_json(app.clone(), "/reports/discount-trends").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);

    // Failure was not cached: once the upstream recovers, the next request
    // succeeds immediately.
    broken.remove_async().await;
    let _orders = server
        .mock("GET", "/orders")
        .with_status(200)
        .with_body(orders_csv())
        .create_async()
        .await;

    let (status, body) = get_json(app, "/reports/discount-trends").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["cached"], false);
}

#[tokio::test]
async fn test_expired_entry_recomputes() {
    let mut server = mockito::Server::new_async().await;
    let orders = server
        .mock("GET", "/orders")
        .with_status(200)
        .with_body(orders_csv())
        .expect_at_least(1)
        .create_async()
        .await;
    let _sales = server
        .mock("GET", "/product-sales")
        .with_status(200)
        .with_body(product_sales_csv())
        .create_async()
        .await;
    // Zero-minute TTL: every entry is expired by the time it is read back.
    let (app, service) = build_app(config_for(&server.url(), 0));

    let (_, first) = get_json(app.clone(), "/reports/monthly-sales").await;
    assert_eq!(first["cached"], false);

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(service.cache_entries().is_empty());

    let (_, second) = get_json(app, "/reports/monthly-sales").await;
    assert_eq!(second["cached"], false);

    orders.assert_async().await;
}

#[tokio::test]
async fn test_rankings_and_customer_flows() {
    let mut server = mockito::Server::new_async().await;
    let _mocks = mock_all(&mut server).await;
    let (app, _service) = build_app(config_for(&server.url(), 120));

    let (status, body) = get_json(app.clone(), "/reports/rankings").await;
    assert_eq!(status, StatusCode::OK);
    let quantity = body["data"]["quantityRanking"].as_array().expect("ranking array");
    assert_eq!(quantity[0]["name"], "Rice");
    assert_eq!(quantity[0]["quantity"], 2);
    assert_eq!(body["data"]["alcoholRanking"][0]["name"], "Beer");

    let (status, body) = get_json(app, "/reports/customer-spending").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"]["entries"].as_array().expect("entries array");
    assert_eq!(entries[0]["phone"], "0922000222");
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(body["data"]["monthlyTotalAmount"], 300.0);
}

#[tokio::test]
async fn test_manual_refresh_repopulates_cache() {
    let mut server = mockito::Server::new_async().await;
    let _mocks = mock_all(&mut server).await;
    let (app, _service) = build_app(config_for(&server.url(), 120));

    let (status, body) = post_empty(app.clone(), "/admin/cache/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["failedUnits"], 0);
    // 2 eager units + 5 per month across the 13-month window.
    assert_eq!(body["units"].as_array().expect("units array").len(), 2 + 5 * 13);
    assert!(!body["entries"].as_array().expect("entries array").is_empty());

    // The refresh warmed the cache: reports come back as hits.
    let (_, monthly) = get_json(app.clone(), "/reports/monthly-sales").await;
    assert_eq!(monthly["cached"], true);

    let month = fixture_month();
    let (_, category) =
        get_json(app, &format!("/reports/category-distribution?month={month}")).await;
    assert_eq!(category["cached"], true);
}

#[tokio::test]
async fn test_refresh_is_idempotent_for_unchanged_upstream() {
    let mut server = mockito::Server::new_async().await;
    let _mocks = mock_all(&mut server).await;
    let (app, _service) = build_app(config_for(&server.url(), 120));

    let (_, _) = post_empty(app.clone(), "/admin/cache/refresh").await;
    let (_, first) = get_json(app.clone(), "/reports/monthly-sales").await;

    let (_, _) = post_empty(app.clone(), "/admin/cache/refresh").await;
    let (_, second) = get_json(app, "/reports/monthly-sales").await;

    assert_eq!(first["data"], second["data"]);
}

#[tokio::test]
async fn test_distribution_percentages_reconcile() {
    let mut server = mockito::Server::new_async().await;
    let _mocks = mock_all(&mut server).await;
    let (app, _service) = build_app(config_for(&server.url(), 120));

    let month = fixture_month();
    let (status, body) =
        get_json(app, &format!("/reports/category-distribution?month={month}")).await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    let slices = data["slices"].as_array().expect("slices array");
    let pct_sum: f64 = slices.iter().map(|s| s["percentage"].as_f64().unwrap_or(0.0)).sum();
    assert!((pct_sum - 100.0).abs() < 0.5);

    let amount_sum: f64 = slices.iter().map(|s| s["amount"].as_f64().unwrap_or(0.0)).sum();
    let total = data["totalAmount"].as_f64().expect("total amount");
    assert!((amount_sum - total).abs() < 0.01);
    assert_eq!(data["matchStats"]["matchRate"], 100.0);
}
