mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

use common::{machine_input, TestApp};
use manufacturing_erp::{
    config::JobsConfig,
    events::Event,
    jobs::{scan_low_stock, scan_maintenance_due, scan_overdue_sales_orders, spawn_jobs},
    services::sales_orders::{CreateSalesOrderInput, SalesOrderLineInput},
};

#[tokio::test]
async fn low_stock_scan_reports_items_at_or_below_reorder_level() {
    let app = TestApp::new().await;
    app.seed_stock_item("BOLT-M8", dec!(10), dec!(100)).await;
    app.seed_stock_item("NUT-M8", dec!(100), dec!(100)).await;
    app.seed_stock_item("WASHER-M8", dec!(101), dec!(100)).await;

    let hits = scan_low_stock(&app.state.services.inventory, &app.state.event_sender)
        .await
        .unwrap();
    assert_eq!(hits, 2);

    let skus: Vec<String> = app
        .drain_events()
        .await
        .into_iter()
        .filter_map(|e| match e {
            Event::LowStock { sku, .. } => Some(sku),
            _ => None,
        })
        .collect();
    assert_eq!(skus, vec!["BOLT-M8".to_string(), "NUT-M8".to_string()]);
}

#[tokio::test]
async fn overdue_scan_reports_confirmed_late_orders() {
    let app = TestApp::new().await;
    let today = Utc::now().date_naive();
    let service = &app.state.services.sales_orders;
    let late = service
        .create_sales_order(
            &app.ctx,
            CreateSalesOrderInput {
                customer_name: "Acme".to_string(),
                customer_email: "buyer@acme.example".to_string(),
                due_date: today - Duration::days(3),
                lines: vec![SalesOrderLineInput {
                    product_code: "FRAME-A".to_string(),
                    quantity: dec!(1),
                }],
            },
        )
        .await
        .unwrap();
    service
        .confirm_sales_order(&app.ctx, late.order.id)
        .await
        .unwrap();
    app.drain_events().await;

    let hits = scan_overdue_sales_orders(service, &app.state.event_sender, today)
        .await
        .unwrap();
    assert_eq!(hits, 1);
    assert_matches!(
        app.drain_events().await.as_slice(),
        [Event::SalesOrderOverdue { sales_order_id, .. }] if *sales_order_id == late.order.id
    );
}

#[tokio::test]
async fn maintenance_scan_reports_due_machines() {
    let app = TestApp::new().await;
    let today = Utc::now().date_naive();
    let mut due = machine_input("CNC-01");
    due.next_maintenance_date = Some(today);
    app.state
        .services
        .machines
        .create_machine(&app.ctx, due)
        .await
        .unwrap();
    app.seed_machine("CNC-02").await;

    let hits = scan_maintenance_due(&app.state.services.machines, &app.state.event_sender, today)
        .await
        .unwrap();
    assert_eq!(hits, 1);
    assert_matches!(
        app.drain_events().await.as_slice(),
        [Event::MaintenanceDue { code, next_maintenance_date, .. }]
            if code == "CNC-01" && *next_maintenance_date == today
    );
}

#[tokio::test]
async fn disabled_jobs_spawn_nothing() {
    let app = TestApp::new().await;
    let config = JobsConfig {
        enabled: false,
        ..JobsConfig::default()
    };
    let handles = spawn_jobs(&config, &app.state.services, app.state.event_sender.clone());
    assert!(handles.is_empty());
}

#[tokio::test]
async fn enabled_jobs_run_on_first_tick() {
    let app = TestApp::new().await;
    app.seed_stock_item("BOLT-M8", dec!(1), dec!(5)).await;

    let handles = spawn_jobs(
        &JobsConfig::default(),
        &app.state.services,
        app.state.event_sender.clone(),
    );
    assert_eq!(handles.len(), 3);

    let mut saw_low_stock = false;
    for _ in 0..50 {
        if app
            .drain_events()
            .await
            .iter()
            .any(|e| matches!(e, Event::LowStock { .. }))
        {
            saw_low_stock = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    for handle in handles {
        handle.abort();
    }
    assert!(saw_low_stock);
}
