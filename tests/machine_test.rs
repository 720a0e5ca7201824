mod common;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal_macros::dec;
use test_case::test_case;

use common::{machine_input, work_order_input, TestApp};
use manufacturing_erp::{
    entities::MachineStatus,
    errors::ErrorCode,
    services::machines::{MachineFilter, RecordMaintenanceInput, UpdateMachineStatusInput},
};

fn status(status: MachineStatus) -> UpdateMachineStatusInput {
    UpdateMachineStatusInput {
        status,
        is_active: None,
    }
}

#[tokio::test]
async fn next_maintenance_is_derived_from_interval() {
    let app = TestApp::new().await;
    let last = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
    let mut input = machine_input("CNC-01");
    input.last_maintenance_date = Some(last);
    input.maintenance_interval_days = Some(30);

    let machine = app
        .state
        .services
        .machines
        .create_machine(&app.ctx, input)
        .await
        .unwrap();

    assert_eq!(machine.status, MachineStatus::Available);
    assert!(machine.is_active);
    assert_eq!(
        machine.next_maintenance_date,
        NaiveDate::from_ymd_opt(2026, 3, 2)
    );
}

#[test_case(MachineStatus::Maintenance, ErrorCode::MachineMaintenance ; "under maintenance")]
#[test_case(MachineStatus::Broken, ErrorCode::MachineBroken ; "broken")]
#[test_case(MachineStatus::Retired, ErrorCode::MachineInactive ; "retired")]
#[tokio::test]
async fn unavailable_machines_cannot_be_assigned(machine_status: MachineStatus, expected: ErrorCode) {
    let app = TestApp::new().await;
    let bom = app.seed_bom("FRAME-A").await;
    let machine = app.seed_machine("CNC-01").await;
    let machines = &app.state.services.machines;
    let work_orders = &app.state.services.work_orders;

    machines
        .update_machine_status(&app.ctx, machine.id, status(machine_status))
        .await
        .unwrap();

    let order = work_orders
        .create_work_order(&app.ctx, work_order_input(bom.bom.id, dec!(1)))
        .await
        .unwrap();
    let op = work_orders
        .plan_sub_work_orders(&app.ctx, order.id)
        .await
        .unwrap()
        .remove(0);

    let err = work_orders
        .assign_machine(&app.ctx, op.id, machine.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), expected);
}

#[tokio::test]
async fn overdue_machine_is_refused_until_serviced() {
    let app = TestApp::new().await;
    let bom = app.seed_bom("FRAME-A").await;
    let mut input = machine_input("PRESS-02");
    input.next_maintenance_date = Some(Utc::now().date_naive() - Duration::days(1));
    let machine = app
        .state
        .services
        .machines
        .create_machine(&app.ctx, input)
        .await
        .unwrap();

    let work_orders = &app.state.services.work_orders;
    let order = work_orders
        .create_work_order(&app.ctx, work_order_input(bom.bom.id, dec!(1)))
        .await
        .unwrap();
    let op = work_orders
        .plan_sub_work_orders(&app.ctx, order.id)
        .await
        .unwrap()
        .remove(0);

    let err = work_orders
        .assign_machine(&app.ctx, op.id, machine.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MachineMaintenanceOverdue);

    app.state
        .services
        .machines
        .record_maintenance(&app.ctx, machine.id, RecordMaintenanceInput::default())
        .await
        .unwrap();
    let assigned = work_orders
        .assign_machine(&app.ctx, op.id, machine.id)
        .await
        .unwrap();
    assert_eq!(assigned.machine_id, Some(machine.id));
}

#[tokio::test]
async fn in_use_machine_can_take_more_work() {
    let app = TestApp::new().await;
    let bom = app.seed_bom("FRAME-A").await;
    let machine = app.seed_machine("CNC-01").await;
    app.state
        .services
        .machines
        .update_machine_status(&app.ctx, machine.id, status(MachineStatus::InUse))
        .await
        .unwrap();

    let work_orders = &app.state.services.work_orders;
    let order = work_orders
        .create_work_order(&app.ctx, work_order_input(bom.bom.id, dec!(1)))
        .await
        .unwrap();
    let op = work_orders
        .plan_sub_work_orders(&app.ctx, order.id)
        .await
        .unwrap()
        .remove(0);

    assert!(work_orders.assign_machine(&app.ctx, op.id, machine.id).await.is_ok());
}

#[tokio::test]
async fn retiring_deactivates_and_maintenance_returns_to_service() {
    let app = TestApp::new().await;
    let machines = &app.state.services.machines;
    let machine = app.seed_machine("CNC-01").await;

    let retired = machines
        .update_machine_status(
            &app.ctx,
            machine.id,
            UpdateMachineStatusInput {
                status: MachineStatus::Retired,
                is_active: Some(true),
            },
        )
        .await
        .unwrap();
    assert!(!retired.is_active);

    let other = app.seed_machine("CNC-02").await;
    machines
        .update_machine_status(&app.ctx, other.id, status(MachineStatus::Maintenance))
        .await
        .unwrap();
    let performed_on = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
    let serviced = machines
        .record_maintenance(
            &app.ctx,
            other.id,
            RecordMaintenanceInput {
                performed_on: Some(performed_on),
            },
        )
        .await
        .unwrap();
    assert_eq!(serviced.status, MachineStatus::Available);
    assert_eq!(serviced.last_maintenance_date, Some(performed_on));
    assert_eq!(serviced.next_maintenance_date, NaiveDate::from_ymd_opt(2026, 5, 31));

    let retired_machines = machines
        .list_machines(
            MachineFilter {
                status: Some(MachineStatus::Retired),
                department: None,
            },
            1,
            20,
        )
        .await
        .unwrap();
    assert_eq!(retired_machines.total, 1);
}

#[tokio::test]
async fn due_for_maintenance_skips_retired_and_future() {
    let app = TestApp::new().await;
    let machines = &app.state.services.machines;
    let today = Utc::now().date_naive();

    let mut due = machine_input("DUE-01");
    due.next_maintenance_date = Some(today);
    machines.create_machine(&app.ctx, due).await.unwrap();

    let mut future = machine_input("LATER-01");
    future.next_maintenance_date = Some(today + Duration::days(7));
    machines.create_machine(&app.ctx, future).await.unwrap();

    let mut retired = machine_input("OLD-01");
    retired.next_maintenance_date = Some(today - Duration::days(30));
    let retired = machines.create_machine(&app.ctx, retired).await.unwrap();
    machines
        .update_machine_status(&app.ctx, retired.id, status(MachineStatus::Retired))
        .await
        .unwrap();

    let found = machines.machines_due_for_maintenance(today).await.unwrap();
    assert_eq!(
        found.iter().map(|m| m.code.as_str()).collect::<Vec<_>>(),
        vec!["DUE-01"]
    );
}
