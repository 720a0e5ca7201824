//! Periodic scans: hourly low stock, daily overdue sales orders and daily
//! maintenance due dates. Each scan publishes one event per hit; the jobs
//! run independently of each other.

use chrono::{NaiveDate, Utc};
use metrics::counter;
use std::{future::Future, time::Duration};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{error, info, info_span, Instrument};

use crate::{
    config::JobsConfig,
    errors::ServiceError,
    events::{Event, EventSender},
    handlers::AppServices,
    services::{
        inventory::InventoryService, machines::MachineService, sales_orders::SalesOrderService,
        RequestContext,
    },
};

pub const LOW_STOCK_JOB: &str = "low_stock_scan";
pub const OVERDUE_ORDERS_JOB: &str = "overdue_sales_order_scan";
pub const MAINTENANCE_JOB: &str = "maintenance_due_scan";

/// Publishes a LowStock event for every item at or below its reorder level.
pub async fn scan_low_stock(
    inventory: &InventoryService,
    events: &EventSender,
) -> Result<usize, ServiceError> {
    let items = inventory.low_stock_items().await?;
    let hits = items.len();
    for item in items {
        events
            .send_or_log(Event::LowStock {
                stock_item_id: item.id,
                sku: item.sku,
                name: item.name,
                quantity_on_hand: item.quantity_on_hand,
                reorder_level: item.reorder_level,
            })
            .await;
    }
    Ok(hits)
}

/// Publishes a SalesOrderOverdue event for every confirmed order past its due date.
pub async fn scan_overdue_sales_orders(
    sales_orders: &SalesOrderService,
    events: &EventSender,
    today: NaiveDate,
) -> Result<usize, ServiceError> {
    let orders = sales_orders.overdue_sales_orders(today).await?;
    let hits = orders.len();
    for order in orders {
        events
            .send_or_log(Event::SalesOrderOverdue {
                sales_order_id: order.id,
                order_number: order.order_number,
                customer_name: order.customer_name,
                due_date: order.due_date,
            })
            .await;
    }
    Ok(hits)
}

/// Publishes a MaintenanceDue event for every machine due on or before `today`.
pub async fn scan_maintenance_due(
    machines: &MachineService,
    events: &EventSender,
    today: NaiveDate,
) -> Result<usize, ServiceError> {
    let due = machines.machines_due_for_maintenance(today).await?;
    let mut hits = 0;
    for machine in due {
        if let Some(next_maintenance_date) = machine.next_maintenance_date {
            events
                .send_or_log(Event::MaintenanceDue {
                    machine_id: machine.id,
                    code: machine.code,
                    name: machine.name,
                    next_maintenance_date,
                })
                .await;
            hits += 1;
        }
    }
    Ok(hits)
}

/// Starts the three scans. Returns nothing when jobs are disabled.
pub fn spawn_jobs(
    config: &JobsConfig,
    services: &AppServices,
    events: EventSender,
) -> Vec<JoinHandle<()>> {
    if !config.enabled {
        info!("periodic jobs disabled");
        return Vec::new();
    }

    let inventory = services.inventory.clone();
    let low_stock_events = events.clone();
    let low_stock = spawn_periodic(
        LOW_STOCK_JOB,
        Duration::from_secs(config.low_stock_interval_secs),
        move || {
            let inventory = inventory.clone();
            let events = low_stock_events.clone();
            async move { scan_low_stock(&inventory, &events).await }
        },
    );

    let sales_orders = services.sales_orders.clone();
    let overdue_events = events.clone();
    let overdue = spawn_periodic(
        OVERDUE_ORDERS_JOB,
        Duration::from_secs(config.overdue_orders_interval_secs),
        move || {
            let sales_orders = sales_orders.clone();
            let events = overdue_events.clone();
            async move {
                scan_overdue_sales_orders(&sales_orders, &events, Utc::now().date_naive()).await
            }
        },
    );

    let machines = services.machines.clone();
    let maintenance = spawn_periodic(
        MAINTENANCE_JOB,
        Duration::from_secs(config.maintenance_interval_secs),
        move || {
            let machines = machines.clone();
            let events = events.clone();
            async move { scan_maintenance_due(&machines, &events, Utc::now().date_naive()).await }
        },
    );

    vec![low_stock, overdue, maintenance]
}

fn spawn_periodic<F, Fut>(name: &'static str, period: Duration, mut scan: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<usize, ServiceError>> + Send + 'static,
{
    let ctx = RequestContext::system(name);
    info!(job = name, period_secs = period.as_secs(), "scheduling periodic job");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let span = info_span!("job", job = name, actor = %ctx.actor);
            match scan().instrument(span).await {
                Ok(hits) => {
                    counter!("manufacturing_erp.jobs.runs", 1, "job" => name);
                    info!(job = name, hits, "scan finished");
                }
                Err(e) => {
                    counter!("manufacturing_erp.jobs.failures", 1, "job" => name);
                    error!(job = name, error = %e, "scan failed");
                }
            }
        }
    })
}
