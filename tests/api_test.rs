//! HTTP surface: envelopes, authentication, validation and pagination.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{response_json, schedule, TestApp};

async fn create_bom(app: &TestApp, product_code: &str) -> Value {
    let stock = app
        .request_authenticated(
            Method::POST,
            "/api/v1/inventory",
            Some(json!({
                "sku": format!("SHEET-{}", product_code),
                "name": "Steel sheet",
                "unit": "kg",
                "quantity_on_hand": "250",
                "reorder_level": "40"
            })),
        )
        .await;
    assert_eq!(stock.status(), StatusCode::CREATED);
    let stock = response_json(stock).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/boms",
            Some(json!({
                "product_code": product_code,
                "name": "Frame assembly",
                "components": [
                    {
                        "sequence_order": 10,
                        "type": "RAW_MATERIAL",
                        "stock_item_id": stock["data"]["id"],
                        "quantity": "2.5",
                        "unit": "kg"
                    },
                    {
                        "sequence_order": 20,
                        "type": "PROCESS",
                        "operation": "Welding",
                        "quantity": "1",
                        "unit": "pcs"
                    }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await
}

async fn create_work_order(app: &TestApp, bom_id: &Value) -> Value {
    let (start, end) = schedule(1, 3);
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/work-orders",
            Some(json!({
                "bom_id": bom_id,
                "quantity_ordered": "4",
                "priority": "HIGH",
                "planned_start": start,
                "planned_end": end
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn api_requires_a_valid_bearer_token() {
    let app = TestApp::new().await;

    let missing = app
        .request(Method::GET, "/api/v1/work-orders", None, None)
        .await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(missing).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let forged = app
        .request(Method::GET, "/api/v1/work-orders", None, Some("not-a-jwt"))
        .await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn created_resources_use_the_success_envelope() {
    let app = TestApp::new().await;
    let bom = create_bom(&app, "FRAME-A").await;
    assert_eq!(bom["success"], true);
    assert_eq!(bom["data"]["bom_number"], "BOM-00001");
    assert_eq!(bom["data"]["components"].as_array().unwrap().len(), 2);
    assert_eq!(bom["data"]["components"][1]["component_type"], "PROCESS");

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/work-orders",
            Some(json!({
                "bom_id": bom["data"]["id"],
                "quantity_ordered": "4",
                "planned_start": schedule(1, 3).0,
                "planned_end": schedule(1, 3).1
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .expect("request id header");
    let body = response_json(response).await;

    assert_eq!(body["data"]["status"], "PLANNED");
    assert_eq!(body["data"]["priority"], "NORMAL");
    assert_eq!(body["data"]["created_by"], "planner-1");
    assert_eq!(body["meta"]["request_id"], request_id.as_str());
    assert!(body["data"]["order_number"]
        .as_str()
        .unwrap()
        .starts_with("WO-"));
}

#[tokio::test]
async fn domain_errors_carry_code_and_details() {
    let app = TestApp::new().await;
    let bom = create_bom(&app, "FRAME-A").await;
    let order = create_work_order(&app, &bom["data"]["id"]).await;
    let id = order["data"]["id"].as_str().unwrap();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/work-orders/{}/status", id),
            Some(json!({ "status": "COMPLETED" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INVALID_STATUS_TRANSITION");
    assert_eq!(body["error"]["details"]["from"], "PLANNED");
    assert_eq!(body["error"]["details"]["to"], "COMPLETED");
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/machines/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn malformed_and_invalid_bodies_are_validation_errors() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/machines",
            Some(json!({ "name": "Lathe" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["error"]["code"], "VALIDATION_ERROR");

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sales-orders",
            Some(json!({
                "customer_name": "Acme",
                "customer_email": "nope",
                "due_date": "2026-12-01",
                "lines": [{ "product_code": "FRAME-A", "quantity": "1" }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["details"]["customer_email"].is_array());
}

#[tokio::test]
async fn lists_are_paginated_and_capped() {
    let app = TestApp::new().await;
    for code in ["CNC-01", "CNC-02", "CNC-03"] {
        let response = app
            .request_authenticated(
                Method::POST,
                "/api/v1/machines",
                Some(json!({ "code": code, "name": format!("Machine {}", code) })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .request_authenticated(Method::GET, "/api/v1/machines?page=2&per_page=2", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["total_pages"], 2);
    assert_eq!(body["data"]["items"][0]["code"], "CNC-03");

    let response = app
        .request_authenticated(Method::GET, "/api/v1/machines?per_page=5000", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["per_page"], 100);

    let response = app
        .request_authenticated(
            Method::GET,
            "/api/v1/machines?page=18446744073709551615&per_page=100",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["page"], i64::MAX as u64 / 100);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn production_flow_over_http() {
    let app = TestApp::new().await;
    let bom = create_bom(&app, "FRAME-A").await;
    let order = create_work_order(&app, &bom["data"]["id"]).await;
    let id = order["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/work-orders/{}/sub-work-orders", id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let ops = response_json(response).await;
    let weld = ops["data"][1]["id"].as_str().unwrap().to_string();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/sub-work-orders/{}/outputs", weld),
            Some(json!({ "quantity": "3", "quality_status": "GOOD" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/sub-work-orders/{}/outputs", weld),
            Some(json!({ "quantity": "2", "quality_status": "SCRAP" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response_json(response).await["error"]["code"],
        "OUTPUT_EXCEEDS_ORDER"
    );

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/sub-work-orders/{}/outputs", weld),
            None,
        )
        .await;
    let outputs = response_json(response).await;
    assert_eq!(outputs["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn sales_orders_ship_and_cancel_over_http() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sales-orders",
            Some(json!({
                "customer_name": "Acme",
                "customer_email": "buyer@acme.example",
                "due_date": "2026-12-01",
                "lines": [{ "product_code": "FRAME-A", "quantity": "2" }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = response_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/sales-orders/{}/ship", id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_STATUS_TRANSITION");
    assert_eq!(body["error"]["details"]["from"], "DRAFT");

    for action in ["confirm", "ship"] {
        let response = app
            .request_authenticated(
                Method::POST,
                &format!("/api/v1/sales-orders/{}/{}", id, action),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/sales-orders/{}", id), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "SHIPPED");
    assert!(body["data"]["shipped_at"].is_string());

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/sales-orders/{}/cancel", id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
