use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::notifications::Notifier;

/// Domain events published after a state change commits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    WorkOrderCreated {
        work_order_id: Uuid,
        order_number: String,
    },
    WorkOrderStatusChanged {
        work_order_id: Uuid,
        order_number: String,
        from: String,
        to: String,
    },
    SalesOrderConfirmed {
        sales_order_id: Uuid,
        order_number: String,
        customer_name: String,
        customer_email: String,
        due_date: NaiveDate,
    },
    SalesOrderOverdue {
        sales_order_id: Uuid,
        order_number: String,
        customer_name: String,
        due_date: NaiveDate,
    },
    LowStock {
        stock_item_id: Uuid,
        sku: String,
        name: String,
        quantity_on_hand: Decimal,
        reorder_level: Decimal,
    },
    MaintenanceDue {
        machine_id: Uuid,
        code: String,
        name: String,
        next_maintenance_date: NaiveDate,
    },
    QualityNonconformance {
        work_order_id: Uuid,
        order_number: String,
        sub_work_order_id: Uuid,
        quantity: Decimal,
        notes: Option<String>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::WorkOrderCreated { .. } => "work_order_created",
            Event::WorkOrderStatusChanged { .. } => "work_order_status_changed",
            Event::SalesOrderConfirmed { .. } => "sales_order_confirmed",
            Event::SalesOrderOverdue { .. } => "sales_order_overdue",
            Event::LowStock { .. } => "low_stock",
            Event::MaintenanceDue { .. } => "maintenance_due",
            Event::QualityNonconformance { .. } => "quality_nonconformance",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Best-effort send; a closed channel is logged, never surfaced.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "dropping event");
        }
    }
}

/// Drains the event channel, handing notification-worthy events to the
/// notifier. Returns when every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, notifier: Arc<Notifier>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        debug!(event = event.name(), "received event");
        notifier.dispatch(&event);
    }

    info!("Event processing loop stopped");
}
