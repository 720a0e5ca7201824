mod common;

use assert_matches::assert_matches;
use chrono::{Datelike, Duration, Utc};
use rust_decimal_macros::dec;

use common::{schedule, TestApp};
use manufacturing_erp::{
    entities::{SalesOrderStatus, WorkOrderStatus},
    errors::{ErrorCode, ServiceError},
    events::Event,
    services::sales_orders::{CommitLineInput, CreateSalesOrderInput, SalesOrderLineInput},
};

fn order_input(product_code: &str, days_until_due: i64) -> CreateSalesOrderInput {
    CreateSalesOrderInput {
        customer_name: "Acme Fabrication".to_string(),
        customer_email: "buyer@acme.example".to_string(),
        due_date: Utc::now().date_naive() + Duration::days(days_until_due),
        lines: vec![
            SalesOrderLineInput {
                product_code: product_code.to_string(),
                quantity: dec!(12),
            },
            SalesOrderLineInput {
                product_code: "SPARE-KIT".to_string(),
                quantity: dec!(3),
            },
        ],
    }
}

fn commit_input(bom_id: uuid::Uuid) -> CommitLineInput {
    let (planned_start, planned_end) = schedule(1, 4);
    CommitLineInput {
        bom_id,
        planned_start,
        planned_end,
        priority: Default::default(),
    }
}

#[tokio::test]
async fn orders_are_numbered_and_lines_sequenced() {
    let app = TestApp::new().await;
    let created = app
        .state
        .services
        .sales_orders
        .create_sales_order(&app.ctx, order_input("FRAME-A", 14))
        .await
        .unwrap();

    assert_eq!(
        created.order.order_number,
        format!("SO-{}-00001", Utc::now().year())
    );
    assert_eq!(created.order.status, SalesOrderStatus::Draft);
    assert_eq!(
        created.lines.iter().map(|l| l.line_number).collect::<Vec<_>>(),
        vec![1, 2]
    );
}

#[tokio::test]
async fn invalid_orders_are_rejected() {
    let app = TestApp::new().await;
    let service = &app.state.services.sales_orders;

    let mut no_lines = order_input("FRAME-A", 14);
    no_lines.lines.clear();
    assert_matches!(
        service.create_sales_order(&app.ctx, no_lines).await,
        Err(ServiceError::InvalidFields(_))
    );

    let mut bad_email = order_input("FRAME-A", 14);
    bad_email.customer_email = "not-an-email".to_string();
    assert_matches!(
        service.create_sales_order(&app.ctx, bad_email).await,
        Err(ServiceError::InvalidFields(_))
    );

    let mut zero_line = order_input("FRAME-A", 14);
    zero_line.lines[0].quantity = dec!(0);
    let err = service
        .create_sales_order(&app.ctx, zero_line)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidQuantity);
}

#[tokio::test]
async fn confirmation_happens_once_and_notifies() {
    let app = TestApp::new().await;
    let service = &app.state.services.sales_orders;
    let created = service
        .create_sales_order(&app.ctx, order_input("FRAME-A", 14))
        .await
        .unwrap();

    let confirmed = service
        .confirm_sales_order(&app.ctx, created.order.id)
        .await
        .unwrap();
    assert_eq!(confirmed.status, SalesOrderStatus::Confirmed);

    let err = service
        .confirm_sales_order(&app.ctx, created.order.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStatusTransition);

    let events = app.drain_events().await;
    assert_matches!(
        events.as_slice(),
        [Event::SalesOrderConfirmed { customer_email, .. }] if customer_email == "buyer@acme.example"
    );
}

#[tokio::test]
async fn committing_a_line_creates_a_linked_work_order() {
    let app = TestApp::new().await;
    let bom = app.seed_bom("FRAME-A").await;
    let service = &app.state.services.sales_orders;
    let created = service
        .create_sales_order(&app.ctx, order_input("FRAME-A", 14))
        .await
        .unwrap();
    let line = created.lines[0].clone();

    let err = service
        .commit_line_to_production(&app.ctx, line.id, commit_input(bom.bom.id))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::OrderNotConfirmed);

    service
        .confirm_sales_order(&app.ctx, created.order.id)
        .await
        .unwrap();
    let work_order = service
        .commit_line_to_production(&app.ctx, line.id, commit_input(bom.bom.id))
        .await
        .unwrap();
    assert_eq!(work_order.status, WorkOrderStatus::Planned);
    assert_eq!(work_order.quantity_ordered, dec!(12));
    assert_eq!(work_order.sales_order_line_id, Some(line.id));

    let reloaded = service.get_sales_order(created.order.id).await.unwrap();
    assert_eq!(reloaded.lines[0].work_order_id, Some(work_order.id));

    let err = service
        .commit_line_to_production(&app.ctx, line.id, commit_input(bom.bom.id))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::LineAlreadyCommitted);
}

#[tokio::test]
async fn committing_with_another_products_bom_fails() {
    let app = TestApp::new().await;
    let wrong = app.seed_bom("FRAME-B").await;
    let service = &app.state.services.sales_orders;
    let created = service
        .create_sales_order(&app.ctx, order_input("FRAME-A", 14))
        .await
        .unwrap();
    service
        .confirm_sales_order(&app.ctx, created.order.id)
        .await
        .unwrap();

    let err = service
        .commit_line_to_production(&app.ctx, created.lines[0].id, commit_input(wrong.bom.id))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn overdue_means_confirmed_and_past_due() {
    let app = TestApp::new().await;
    let service = &app.state.services.sales_orders;
    let today = Utc::now().date_naive();

    let late = service
        .create_sales_order(&app.ctx, order_input("FRAME-A", -2))
        .await
        .unwrap();
    service
        .confirm_sales_order(&app.ctx, late.order.id)
        .await
        .unwrap();
    let due_today = service
        .create_sales_order(&app.ctx, order_input("FRAME-A", 0))
        .await
        .unwrap();
    service
        .confirm_sales_order(&app.ctx, due_today.order.id)
        .await
        .unwrap();
    service
        .create_sales_order(&app.ctx, order_input("FRAME-A", -5))
        .await
        .unwrap();

    let overdue = service.overdue_sales_orders(today).await.unwrap();
    assert_eq!(
        overdue.iter().map(|o| o.id).collect::<Vec<_>>(),
        vec![late.order.id]
    );
}

#[tokio::test]
async fn shipped_and_cancelled_orders_are_not_overdue() {
    let app = TestApp::new().await;
    let service = &app.state.services.sales_orders;
    let today = Utc::now().date_naive();

    let mut late = Vec::new();
    for _ in 0..3 {
        let created = service
            .create_sales_order(&app.ctx, order_input("FRAME-A", -4))
            .await
            .unwrap();
        service
            .confirm_sales_order(&app.ctx, created.order.id)
            .await
            .unwrap();
        late.push(created.order.id);
    }

    let shipped = service.ship_sales_order(&app.ctx, late[0]).await.unwrap();
    assert_eq!(shipped.status, SalesOrderStatus::Shipped);
    assert!(shipped.shipped_at.is_some());

    let cancelled = service.cancel_sales_order(&app.ctx, late[1]).await.unwrap();
    assert_eq!(cancelled.status, SalesOrderStatus::Cancelled);

    let overdue = service.overdue_sales_orders(today).await.unwrap();
    assert_eq!(
        overdue.iter().map(|o| o.id).collect::<Vec<_>>(),
        vec![late[2]]
    );
}

#[tokio::test]
async fn shipping_and_cancelling_follow_the_lifecycle() {
    let app = TestApp::new().await;
    let service = &app.state.services.sales_orders;

    let draft = service
        .create_sales_order(&app.ctx, order_input("FRAME-A", 14))
        .await
        .unwrap();
    let err = service
        .ship_sales_order(&app.ctx, draft.order.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStatusTransition);
    let details = err.details();
    assert_eq!(details["from"], "DRAFT");
    assert_eq!(details["to"], "SHIPPED");

    let cancelled = service
        .cancel_sales_order(&app.ctx, draft.order.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, SalesOrderStatus::Cancelled);
    assert_matches!(
        service.confirm_sales_order(&app.ctx, draft.order.id).await,
        Err(err) if err.code() == ErrorCode::InvalidStatusTransition
    );

    let confirmed = service
        .create_sales_order(&app.ctx, order_input("FRAME-A", 14))
        .await
        .unwrap();
    service
        .confirm_sales_order(&app.ctx, confirmed.order.id)
        .await
        .unwrap();
    service
        .ship_sales_order(&app.ctx, confirmed.order.id)
        .await
        .unwrap();
    let err = service
        .cancel_sales_order(&app.ctx, confirmed.order.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStatusTransition);
}
