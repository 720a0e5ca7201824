//! Persistent schema for the manufacturing backend.

pub mod bom;
pub mod bom_component;
pub mod document_sequence;
pub mod machine;
pub mod material_allocation;
pub mod sales_order;
pub mod sales_order_line;
pub mod stock_item;
pub mod sub_work_order;
pub mod work_order;
pub mod work_order_output;

pub use bom_component::{ComponentKind, ComponentType};
pub use machine::MachineStatus;
pub use sales_order::SalesOrderStatus;
pub use sub_work_order::SubWorkOrderStatus;
pub use work_order::{WorkOrderPriority, WorkOrderStatus};
pub use work_order_output::QualityStatus;
