#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use manufacturing_erp::{
    config::AppConfig,
    db,
    entities::{bom_component::ComponentKind, machine, stock_item},
    events::{Event, EventSender},
    services::{
        bom::{BomWithComponents, ComponentInput, CreateBomInput},
        inventory::CreateStockItemInput,
        machines::CreateMachineInput,
        work_orders::CreateWorkOrderInput,
        RequestContext,
    },
    AppState,
};

pub const TEST_SECRET: &str =
    "k3Jq9vX2mP8sT4wL7nB1cR6yH0dF5gA2zE9uI3oQ8xV4tN7mK1jS6pW0rY5bC2hD";

/// Application state over a fresh in-memory SQLite database. Published
/// events stay in the channel so tests can inspect them.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub ctx: RequestContext,
    token: String,
    events: Mutex<mpsc::Receiver<Event>>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.jwt_issuer = Some("manufacturing-erp".to_string());
        cfg.jobs.enabled = false;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let state = AppState::new(Arc::new(pool), cfg, EventSender::new(event_tx));
        let token = state
            .auth
            .issue_token("planner-1", vec!["planner".to_string()], Duration::hours(1))
            .expect("issue test token");
        let router = manufacturing_erp::build_router(state.clone());

        Self {
            router,
            state,
            ctx: RequestContext::new("planner-1", None),
            token,
            events: Mutex::new(event_rx),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Events published so far, oldest first.
    pub async fn drain_events(&self) -> Vec<Event> {
        let mut rx = self.events.lock().await;
        let mut drained = Vec::new();
        while let Ok(event) = rx.try_recv() {
            drained.push(event);
        }
        drained
    }

    /// Sends a request through the full router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router error during test request")
    }

    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    pub async fn seed_stock_item(
        &self,
        sku: &str,
        on_hand: Decimal,
        reorder_level: Decimal,
    ) -> stock_item::Model {
        self.state
            .services
            .inventory
            .create_stock_item(
                &self.ctx,
                CreateStockItemInput {
                    sku: sku.to_string(),
                    name: format!("Stock {}", sku),
                    unit: "pcs".to_string(),
                    quantity_on_hand: on_hand,
                    reorder_level,
                },
            )
            .await
            .expect("seed stock item")
    }

    /// A BOM for `product_code` with one raw material line (2 per unit) and
    /// one process step.
    pub async fn seed_bom(&self, product_code: &str) -> BomWithComponents {
        let steel = self
            .seed_stock_item(
                &format!("RAW-{}-{}", product_code, &Uuid::new_v4().simple().to_string()[..8]),
                dec!(500),
                dec!(50),
            )
            .await;
        self.state
            .services
            .boms
            .create_bom(
                &self.ctx,
                CreateBomInput {
                    product_code: product_code.to_string(),
                    name: format!("{} assembly", product_code),
                    version: None,
                    components: vec![
                        ComponentInput {
                            sequence_order: 10,
                            kind: ComponentKind::RawMaterial {
                                stock_item_id: steel.id,
                            },
                            quantity: dec!(2),
                            unit: "kg".to_string(),
                        },
                        ComponentInput {
                            sequence_order: 20,
                            kind: ComponentKind::Process {
                                operation: "Welding".to_string(),
                            },
                            quantity: dec!(1),
                            unit: "pcs".to_string(),
                        },
                    ],
                },
            )
            .await
            .expect("seed bom")
    }

    pub async fn seed_machine(&self, code: &str) -> machine::Model {
        self.state
            .services
            .machines
            .create_machine(&self.ctx, machine_input(code))
            .await
            .expect("seed machine")
    }
}

pub fn machine_input(code: &str) -> CreateMachineInput {
    CreateMachineInput {
        code: code.to_string(),
        name: format!("Machine {}", code),
        department: Some("Fabrication".to_string()),
        maintenance_interval_days: Some(30),
        last_maintenance_date: Some(Utc::now().date_naive()),
        next_maintenance_date: None,
    }
}

pub fn schedule(days_from_now: i64, length_days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc::now() + Duration::days(days_from_now);
    (start, start + Duration::days(length_days))
}

pub fn work_order_input(bom_id: Uuid, quantity: Decimal) -> CreateWorkOrderInput {
    let (planned_start, planned_end) = schedule(1, 5);
    CreateWorkOrderInput {
        order_number: None,
        bom_id,
        sales_order_line_id: None,
        quantity_ordered: quantity,
        priority: Default::default(),
        planned_start,
        planned_end,
        notes: None,
        draft: false,
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&body).expect("response body is json")
}
