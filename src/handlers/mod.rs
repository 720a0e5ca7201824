pub mod bom;
pub mod common;
pub mod health;
pub mod inventory;
pub mod machines;
pub mod sales_orders;
pub mod work_orders;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::events::EventSender;
use crate::services::{
    bom::BomService, inventory::InventoryService, machines::MachineService,
    sales_orders::SalesOrderService, work_orders::WorkOrderService,
};

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppServices {
    pub work_orders: Arc<WorkOrderService>,
    pub machines: Arc<MachineService>,
    pub boms: Arc<BomService>,
    pub sales_orders: Arc<SalesOrderService>,
    pub inventory: Arc<InventoryService>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            work_orders: Arc::new(WorkOrderService::new(db.clone(), event_sender.clone())),
            machines: Arc::new(MachineService::new(db.clone())),
            boms: Arc::new(BomService::new(db.clone())),
            sales_orders: Arc::new(SalesOrderService::new(db.clone(), event_sender)),
            inventory: Arc::new(InventoryService::new(db)),
        }
    }
}
