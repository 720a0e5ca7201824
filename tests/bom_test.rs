mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;

use common::TestApp;
use manufacturing_erp::{
    entities::bom_component::{ComponentKind, ComponentType},
    errors::{ErrorCode, ServiceError},
    services::bom::{ComponentInput, CreateBomInput},
};

fn process(sequence_order: i32, operation: &str) -> ComponentInput {
    ComponentInput {
        sequence_order,
        kind: ComponentKind::Process {
            operation: operation.to_string(),
        },
        quantity: dec!(1),
        unit: "pcs".to_string(),
    }
}

#[tokio::test]
async fn versions_increment_per_product() {
    let app = TestApp::new().await;
    let first = app.seed_bom("FRAME-A").await;
    let second = app.seed_bom("FRAME-A").await;
    let other = app.seed_bom("FRAME-B").await;

    assert_eq!(first.bom.version, 1);
    assert_eq!(second.bom.version, 2);
    assert_eq!(other.bom.version, 1);
    assert!(first.bom.is_active);

    let page = app
        .state
        .services
        .boms
        .list_boms(Some("FRAME-A".to_string()), 1, 20)
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].version, 2);
}

#[tokio::test]
async fn components_come_back_in_sequence_order() {
    let app = TestApp::new().await;
    let seeded = app.seed_bom("FRAME-A").await;
    let boms = &app.state.services.boms;

    boms.add_component(&app.ctx, seeded.bom.id, process(15, "Deburr"))
        .await
        .unwrap();

    let loaded = boms.get_bom_with_components(seeded.bom.id).await.unwrap();
    let orders: Vec<i32> = loaded.components.iter().map(|c| c.sequence_order).collect();
    assert_eq!(orders, vec![10, 15, 20]);
    assert_eq!(loaded.components[0].component_type, ComponentType::RawMaterial);
    assert_eq!(loaded.components[1].operation.as_deref(), Some("Deburr"));
}

#[tokio::test]
async fn duplicate_sequence_orders_are_rejected() {
    let app = TestApp::new().await;
    let boms = &app.state.services.boms;

    let err = boms
        .create_bom(
            &app.ctx,
            CreateBomInput {
                product_code: "FRAME-A".to_string(),
                name: "Frame".to_string(),
                version: None,
                components: vec![process(10, "Cut"), process(10, "Weld")],
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DuplicateSequenceOrder);

    let seeded = app.seed_bom("FRAME-A").await;
    let err = boms
        .add_component(&app.ctx, seeded.bom.id, process(20, "Paint"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DuplicateSequenceOrder);
}

#[tokio::test]
async fn references_must_exist_and_not_loop() {
    let app = TestApp::new().await;
    let seeded = app.seed_bom("FRAME-A").await;
    let boms = &app.state.services.boms;

    let err = boms
        .add_component(
            &app.ctx,
            seeded.bom.id,
            ComponentInput {
                sequence_order: 30,
                kind: ComponentKind::RawMaterial {
                    stock_item_id: uuid::Uuid::new_v4(),
                },
                quantity: dec!(1),
                unit: "kg".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = boms
        .add_component(
            &app.ctx,
            seeded.bom.id,
            ComponentInput {
                sequence_order: 30,
                kind: ComponentKind::SemiFinished {
                    bom_id: seeded.bom.id,
                },
                quantity: dec!(1),
                unit: "pcs".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let sub = app.seed_bom("BRACKET").await;
    let added = boms
        .add_component(
            &app.ctx,
            seeded.bom.id,
            ComponentInput {
                sequence_order: 30,
                kind: ComponentKind::SemiFinished { bom_id: sub.bom.id },
                quantity: dec!(4),
                unit: "pcs".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(added.reference_id, Some(sub.bom.id));
}

#[tokio::test]
async fn component_quantity_must_be_positive() {
    let app = TestApp::new().await;
    let seeded = app.seed_bom("FRAME-A").await;
    let mut input = process(40, "Inspect");
    input.quantity = dec!(0);

    let err = app
        .state
        .services
        .boms
        .add_component(&app.ctx, seeded.bom.id, input)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidQuantity);
}
