mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

async fn tenant_via_api(app: &TestApp, name: &str) -> String {
    let (status, body) = app
        .request(Method::POST, "/api/v1/tenants", Some(json!({ "name": name })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn product_via_api(app: &TestApp, tenant: &str, name: &str, price: &str, stock: i32) -> String {
    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/tenants/{tenant}/products"),
            Some(json!({
                "name": name,
                "price": price,
                "stock_quantity": stock,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn order_via_api(app: &TestApp, tenant: &str, customer: &str, product: &str, quantity: i32) -> Value {
    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/tenants/{tenant}/orders"),
            Some(json!({
                "customer_name": customer,
                "payment_method": "pix",
                "items": [{ "product_id": product, "quantity": quantity }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

#[tokio::test]
async fn health_and_status_respond() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["checks"]["database"], "healthy");

    let (status, body) = app.request(Method::GET, "/api/v1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["service"], "cantina-api");
    assert_eq!(body["data"]["environment"], "test");
}

#[tokio::test]
async fn invalid_payloads_list_every_field_error() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(Method::POST, "/api/v1/tenants", Some(json!({ "name": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().starts_with("name:"));

    let tenant = tenant_via_api(&app, "Validation").await;
    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/tenants/{tenant}/orders"),
            Some(json!({
                "customer_name": "Ana",
                "payment_method": "cash",
                "items": [],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn tenant_rename_over_http() {
    let app = TestApp::new().await;
    let tenant = tenant_via_api(&app, "Old Name").await;

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/v1/tenants/{tenant}"),
            Some(json!({ "name": "New Name" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["name"], "New Name");

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/tenants/{tenant}"),
            Some(json!({ "name": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_resources_are_not_found() {
    let app = TestApp::new().await;
    let missing = uuid::Uuid::new_v4();

    let (status, _) = app
        .request(Method::GET, &format!("/api/v1/tenants/{missing}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let tenant = tenant_via_api(&app, "Lookup").await;
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/tenants/{tenant}/orders/{missing}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");

    let (status, _) = app
        .request(Method::GET, &format!("/api/v1/track/{missing}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_flow_over_http() {
    let app = TestApp::new().await;
    let tenant = tenant_via_api(&app, "Http Cantina").await;
    let coxinha = product_via_api(&app, &tenant, "Coxinha", "7.50", 20).await;

    let order = order_via_api(&app, &tenant, "Beatriz Nunes", &coxinha, 2).await;
    assert_eq!(order["display_number"], "0001");
    assert_eq!(order["status"], "pending");
    let total: Decimal = order["total"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, dec!(15));
    let order_id = order["id"].as_str().unwrap().to_string();
    let token = order["tracking_token"].as_str().unwrap().to_string();

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/v1/tenants/{tenant}/orders/{order_id}/status"),
            Some(json!({ "status": "preparing" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "preparing");

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/v1/tenants/{tenant}/orders/{order_id}/status"),
            Some(json!({ "status": "lost" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("lost"));

    let (status, body) = app
        .request(Method::GET, &format!("/api/v1/track/{token}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["customer_first_name"], "Beatriz");
    assert_eq!(body["data"]["status"], "preparing");
    assert!(body["data"].get("customer_name").is_none());
    assert!(body["data"].get("total").is_none());

    let (status, body) = app
        .request(Method::GET, &format!("/api/v1/tenants/{tenant}/orders/active"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["counts"]["preparing"], 1);

    let (status, body) = app
        .request(Method::GET, &format!("/api/v1/tenants/{tenant}/products/{coxinha}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock_quantity"], 18);

    let (status, body) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/tenants/{tenant}/orders/{order_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (_, body) = app
        .request(Method::GET, &format!("/api/v1/tenants/{tenant}/products/{coxinha}"), None)
        .await;
    assert_eq!(body["data"]["stock_quantity"], 20);
}

#[tokio::test]
async fn order_listing_paginates_and_filters() {
    let app = TestApp::new().await;
    let tenant = tenant_via_api(&app, "Pages").await;
    let water = product_via_api(&app, &tenant, "Water", "3.00", 100).await;

    for customer in ["A", "B", "C", "D", "E"] {
        order_via_api(&app, &tenant, customer, &water, 1).await;
    }

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/tenants/{tenant}/orders?page=2&limit=2"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["total"], 5);
    assert_eq!(data["page"], 2);
    assert_eq!(data["limit"], 2);
    assert_eq!(data["total_pages"], 3);
    assert_eq!(data["items"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/tenants/{tenant}/orders?status=ready"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 0);

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/v1/tenants/{tenant}/orders?status=teleported"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn combo_configuration_over_http() {
    let app = TestApp::new().await;
    let tenant = tenant_via_api(&app, "Combo Http").await;
    let fries = product_via_api(&app, &tenant, "Fries", "9.00", 10).await;
    let combo = product_via_api(&app, &tenant, "Snack Box", "14.00", 0).await;

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/v1/tenants/{tenant}/products/{combo}/combo"),
            Some(json!({
                "slots": [{ "name": "Side", "items": [{ "product_id": fries, "debit_quantity": 2 }] }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["is_valid"], true);
    let slot_id = body["data"]["slots"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/tenants/{tenant}/products/combo-eligible"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let eligible = body["data"].as_array().unwrap();
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0]["id"], fries.as_str());

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/tenants/{tenant}/orders"),
            Some(json!({
                "customer_name": "Caio",
                "payment_method": "credit",
                "items": [{
                    "product_id": combo,
                    "quantity": 2,
                    "choices": [{ "slot_id": slot_id, "product_id": fries }],
                }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["items"][0]["choices"][0]["quantity_debited"], 4);

    let (_, body) = app
        .request(Method::GET, &format!("/api/v1/tenants/{tenant}/products/{fries}"), None)
        .await;
    assert_eq!(body["data"]["stock_quantity"], 6);
}
