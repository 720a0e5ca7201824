use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::sequence::{
    next_sequence_number, reserve_sequence_number, SequenceScope, WORK_ORDER_PREFIX,
};
use super::{find_or_not_found, Page, RequestContext};
use crate::{
    entities::{
        bom, bom_component, machine, material_allocation, stock_item, sub_work_order,
        work_order, work_order_output, QualityStatus, SubWorkOrderStatus, WorkOrderPriority,
        WorkOrderStatus,
    },
    errors::{DomainError, ErrorCode, RuleViolation, ServiceError},
    events::{Event, EventSender},
    validation::{
        validate_date_range, validate_machine_availability,
        validate_material_allocation_quantity, validate_production_quantities,
        validate_transition, StatusTransitions,
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWorkOrderInput {
    /// Generated from the `WO` yearly series when absent
    #[validate(length(min = 1, max = 64))]
    pub order_number: Option<String>,
    pub bom_id: Uuid,
    #[serde(default)]
    pub sales_order_line_id: Option<Uuid>,
    pub quantity_ordered: Decimal,
    #[serde(default)]
    pub priority: WorkOrderPriority,
    pub planned_start: DateTime<Utc>,
    pub planned_end: DateTime<Utc>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Create in DRAFT instead of PLANNED
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordOutputInput {
    pub quantity: Decimal,
    pub quality_status: QualityStatus,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AllocateMaterialInput {
    pub stock_item_id: Uuid,
    pub required_quantity: Decimal,
    pub allocated_quantity: Decimal,
}

/// Filters for [`WorkOrderService::list_work_orders`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkOrderFilter {
    pub status: Option<WorkOrderStatus>,
    pub bom_id: Option<Uuid>,
}

/// Work orders, their operations, output and material allocations.
#[derive(Clone)]
pub struct WorkOrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl WorkOrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates a work order in PLANNED (or DRAFT) against an active BOM.
    #[instrument(skip(self, input), fields(actor = %ctx.actor, bom_id = %input.bom_id))]
    pub async fn create_work_order(
        &self,
        ctx: &RequestContext,
        input: CreateWorkOrderInput,
    ) -> Result<work_order::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let created = insert_work_order(&txn, ctx, input).await?;
        txn.commit().await?;

        counter!("manufacturing_erp.work_orders.created", 1);
        info!(
            work_order_id = %created.id,
            order_number = %created.order_number,
            "work order created"
        );

        self.event_sender
            .send_or_log(Event::WorkOrderCreated {
                work_order_id: created.id,
                order_number: created.order_number.clone(),
            })
            .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_work_order(&self, id: Uuid) -> Result<work_order::Model, ServiceError> {
        find_or_not_found::<work_order::Entity, _>(&*self.db, id, "Work order").await
    }

    #[instrument(skip(self))]
    pub async fn list_work_orders(
        &self,
        filter: WorkOrderFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<work_order::Model>, ServiceError> {
        let mut query = work_order::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(work_order::Column::Status.eq(status));
        }
        if let Some(bom_id) = filter.bom_id {
            query = query.filter(work_order::Column::BomId.eq(bom_id));
        }

        let paginator = query
            .order_by_desc(work_order::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    /// Moves a work order along the transition table.
    ///
    /// `completed_quantity`, when given, replaces `quantity_completed` and
    /// must stay within `quantity_ordered`.
    #[instrument(skip(self), fields(actor = %ctx.actor))]
    pub async fn transition_work_order(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        to: WorkOrderStatus,
        completed_quantity: Option<Decimal>,
    ) -> Result<work_order::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let current = find_or_not_found::<work_order::Entity, _>(&txn, id, "Work order").await?;
        let from = current.status;

        validate_transition(from, to)?;
        if let Some(completed) = completed_quantity {
            validate_production_quantities(
                completed,
                Decimal::ZERO,
                Some(current.quantity_ordered),
            )?;
        }

        let now = Utc::now();
        let started = current.actual_start.is_some();
        let mut active = current.into_active_model();
        active.status = Set(to);
        active.modified_by = Set(ctx.actor.clone());
        if let Some(completed) = completed_quantity {
            active.quantity_completed = Set(completed);
        }
        if to == WorkOrderStatus::InProgress && !started {
            active.actual_start = Set(Some(now));
        }
        if to == WorkOrderStatus::Completed {
            active.actual_end = Set(Some(now));
        }

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        counter!("manufacturing_erp.work_orders.transitions", 1);
        info!(
            work_order_id = %updated.id,
            from = %from,
            to = %to,
            "work order status changed"
        );

        self.event_sender
            .send_or_log(Event::WorkOrderStatusChanged {
                work_order_id: updated.id,
                order_number: updated.order_number.clone(),
                from: from.to_string(),
                to: to.to_string(),
            })
            .await;

        Ok(updated)
    }

    #[instrument(skip(self), fields(actor = %ctx.actor))]
    pub async fn reschedule_work_order(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        planned_start: DateTime<Utc>,
        planned_end: DateTime<Utc>,
    ) -> Result<work_order::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let current = find_or_not_found::<work_order::Entity, _>(&txn, id, "Work order").await?;
        ensure_open(&current)?;
        validate_date_range(planned_start, planned_end)?;

        let mut active = current.into_active_model();
        active.planned_start = Set(planned_start);
        active.planned_end = Set(planned_end);
        active.modified_by = Set(ctx.actor.clone());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(work_order_id = %updated.id, "work order rescheduled");
        Ok(updated)
    }

    /// Creates one sub-work-order per BOM component, in sequence order.
    ///
    /// Planning an order that already has operations returns them unchanged.
    #[instrument(skip(self), fields(actor = %ctx.actor))]
    pub async fn plan_sub_work_orders(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Vec<sub_work_order::Model>, ServiceError> {
        let txn = self.db.begin().await?;
        let order = find_or_not_found::<work_order::Entity, _>(&txn, id, "Work order").await?;
        ensure_open(&order)?;

        let existing = sub_work_orders_of(&txn, order.id).await?;
        if !existing.is_empty() {
            txn.commit().await?;
            return Ok(existing);
        }

        let components = bom_component::Entity::find()
            .filter(bom_component::Column::BomId.eq(order.bom_id))
            .order_by_asc(bom_component::Column::SequenceOrder)
            .all(&txn)
            .await?;

        let mut planned = Vec::with_capacity(components.len());
        for component in components {
            let operation = sub_work_order::ActiveModel {
                work_order_id: Set(order.id),
                bom_component_id: Set(component.id),
                sequence_order: Set(component.sequence_order),
                machine_id: Set(None),
                quantity: Set(component.quantity * order.quantity_ordered),
                planned_start: Set(order.planned_start),
                planned_end: Set(order.planned_end),
                actual_start: Set(None),
                actual_end: Set(None),
                created_by: Set(ctx.actor.clone()),
                modified_by: Set(ctx.actor.clone()),
                ..Default::default()
            };
            planned.push(operation.insert(&txn).await?);
        }
        txn.commit().await?;

        info!(
            work_order_id = %order.id,
            operations = planned.len(),
            "sub-work-orders planned"
        );
        Ok(planned)
    }

    #[instrument(skip(self))]
    pub async fn list_sub_work_orders(
        &self,
        work_order_id: Uuid,
    ) -> Result<Vec<sub_work_order::Model>, ServiceError> {
        find_or_not_found::<work_order::Entity, _>(&*self.db, work_order_id, "Work order")
            .await?;
        sub_work_orders_of(&*self.db, work_order_id).await
    }

    #[instrument(skip(self), fields(actor = %ctx.actor))]
    pub async fn transition_sub_work_order(
        &self,
        ctx: &RequestContext,
        sub_id: Uuid,
        to: SubWorkOrderStatus,
    ) -> Result<sub_work_order::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let (operation, _order) = load_open_operation(&txn, sub_id).await?;
        let from = operation.status;
        validate_transition(from, to)?;

        let now = Utc::now();
        let started = operation.actual_start.is_some();
        let mut active = operation.into_active_model();
        active.status = Set(to);
        active.modified_by = Set(ctx.actor.clone());
        if to == SubWorkOrderStatus::InProgress && !started {
            active.actual_start = Set(Some(now));
        }
        if to == SubWorkOrderStatus::Completed {
            active.actual_end = Set(Some(now));
        }
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(
            sub_work_order_id = %updated.id,
            from = %from,
            to = %to,
            "sub-work-order status changed"
        );
        Ok(updated)
    }

    /// Puts a machine on an operation after checking it can take work today.
    #[instrument(skip(self), fields(actor = %ctx.actor))]
    pub async fn assign_machine(
        &self,
        ctx: &RequestContext,
        sub_id: Uuid,
        machine_id: Uuid,
    ) -> Result<sub_work_order::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let (operation, _order) = load_open_operation(&txn, sub_id).await?;
        if operation.status.is_terminal() {
            return Err(closed_operation(&operation).into());
        }

        let machine = find_or_not_found::<machine::Entity, _>(&txn, machine_id, "Machine").await?;
        validate_machine_availability(&machine, Utc::now().date_naive())?;

        let mut active = operation.into_active_model();
        active.machine_id = Set(Some(machine.id));
        active.modified_by = Set(ctx.actor.clone());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        counter!("manufacturing_erp.machines.assigned", 1);
        info!(
            sub_work_order_id = %updated.id,
            machine_code = %machine.code,
            "machine assigned"
        );
        Ok(updated)
    }

    /// Appends a production record and rolls it into the operation totals.
    ///
    /// GOOD and SCRAP output together stay within the operation quantity.
    /// REWORK is recorded but not counted.
    #[instrument(skip(self, input), fields(actor = %ctx.actor, quality = %input.quality_status))]
    pub async fn record_output(
        &self,
        ctx: &RequestContext,
        sub_id: Uuid,
        input: RecordOutputInput,
    ) -> Result<work_order_output::Model, ServiceError> {
        input.validate()?;

        let (good_delta, scrap_delta) = match input.quality_status {
            QualityStatus::Good => (input.quantity, Decimal::ZERO),
            QualityStatus::Scrap => (Decimal::ZERO, input.quantity),
            QualityStatus::Rework => (input.quantity, Decimal::ZERO),
        };
        validate_production_quantities(good_delta, scrap_delta, None)?;
        if input.quantity.is_zero() {
            return Err(DomainError::Production(
                RuleViolation::new(ErrorCode::InvalidQuantity, "Output quantity must be positive")
                    .with_detail("quantity", input.quantity),
            )
            .into());
        }

        let txn = self.db.begin().await?;
        let (operation, order) = load_open_operation(&txn, sub_id).await?;
        if operation.status.is_terminal() {
            return Err(closed_operation(&operation).into());
        }

        let (good_total, scrap_total) = match input.quality_status {
            QualityStatus::Good => (operation.output_quantity + input.quantity, operation.scrap_quantity),
            QualityStatus::Scrap => (operation.output_quantity, operation.scrap_quantity + input.quantity),
            QualityStatus::Rework => (operation.output_quantity, operation.scrap_quantity),
        };
        validate_production_quantities(good_total, scrap_total, Some(operation.quantity))?;

        let record = work_order_output::ActiveModel {
            sub_work_order_id: Set(operation.id),
            quantity: Set(input.quantity),
            quality_status: Set(input.quality_status),
            notes: Set(input.notes.clone()),
            created_by: Set(ctx.actor.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let operation_id = operation.id;
        let mut active = operation.into_active_model();
        active.output_quantity = Set(good_total);
        active.scrap_quantity = Set(scrap_total);
        active.modified_by = Set(ctx.actor.clone());
        active.update(&txn).await?;
        txn.commit().await?;

        counter!("manufacturing_erp.production.outputs", 1);
        info!(
            sub_work_order_id = %operation_id,
            quantity = %record.quantity,
            quality = %record.quality_status,
            "production output recorded"
        );

        if record.quality_status == QualityStatus::Scrap {
            counter!("manufacturing_erp.production.scrap_records", 1);
            self.event_sender
                .send_or_log(Event::QualityNonconformance {
                    work_order_id: order.id,
                    order_number: order.order_number,
                    sub_work_order_id: operation_id,
                    quantity: record.quantity,
                    notes: record.notes.clone(),
                })
                .await;
        }

        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn list_outputs(
        &self,
        sub_id: Uuid,
    ) -> Result<Vec<work_order_output::Model>, ServiceError> {
        find_or_not_found::<sub_work_order::Entity, _>(&*self.db, sub_id, "Sub-work-order")
            .await?;
        Ok(work_order_output::Entity::find()
            .filter(work_order_output::Column::SubWorkOrderId.eq(sub_id))
            .order_by_asc(work_order_output::Column::RecordedAt)
            .all(&*self.db)
            .await?)
    }

    /// Creates or replaces the allocation of one stock item to a work order.
    #[instrument(skip(self, input), fields(actor = %ctx.actor, stock_item_id = %input.stock_item_id))]
    pub async fn allocate_material(
        &self,
        ctx: &RequestContext,
        work_order_id: Uuid,
        input: AllocateMaterialInput,
    ) -> Result<material_allocation::Model, ServiceError> {
        validate_material_allocation_quantity(input.required_quantity, input.allocated_quantity)?;

        let txn = self.db.begin().await?;
        let order =
            find_or_not_found::<work_order::Entity, _>(&txn, work_order_id, "Work order").await?;
        ensure_open(&order)?;
        find_or_not_found::<stock_item::Entity, _>(&txn, input.stock_item_id, "Stock item")
            .await?;

        let existing = material_allocation::Entity::find()
            .filter(material_allocation::Column::WorkOrderId.eq(order.id))
            .filter(material_allocation::Column::StockItemId.eq(input.stock_item_id))
            .one(&txn)
            .await?;

        let saved = match existing {
            Some(allocation) => {
                let mut active = allocation.into_active_model();
                active.required_quantity = Set(input.required_quantity);
                active.allocated_quantity = Set(input.allocated_quantity);
                active.modified_by = Set(ctx.actor.clone());
                active.update(&txn).await?
            }
            None => {
                material_allocation::ActiveModel {
                    work_order_id: Set(order.id),
                    stock_item_id: Set(input.stock_item_id),
                    required_quantity: Set(input.required_quantity),
                    allocated_quantity: Set(input.allocated_quantity),
                    created_by: Set(ctx.actor.clone()),
                    modified_by: Set(ctx.actor.clone()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };
        txn.commit().await?;

        info!(
            work_order_id = %order.id,
            allocated = %saved.allocated_quantity,
            required = %saved.required_quantity,
            "material allocated"
        );
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn list_allocations(
        &self,
        work_order_id: Uuid,
    ) -> Result<Vec<material_allocation::Model>, ServiceError> {
        find_or_not_found::<work_order::Entity, _>(&*self.db, work_order_id, "Work order").await?;
        Ok(material_allocation::Entity::find()
            .filter(material_allocation::Column::WorkOrderId.eq(work_order_id))
            .all(&*self.db)
            .await?)
    }
}

/// Validates and inserts a work order on `conn`. Shared with sales-order
/// commitment, which creates the order inside its own transaction.
pub(crate) async fn insert_work_order<C: ConnectionTrait>(
    conn: &C,
    ctx: &RequestContext,
    input: CreateWorkOrderInput,
) -> Result<work_order::Model, ServiceError> {
    input.validate()?;

    if input.quantity_ordered <= Decimal::ZERO {
        return Err(DomainError::WorkOrder(
            RuleViolation::new(
                ErrorCode::InvalidQuantity,
                "Ordered quantity must be greater than zero",
            )
            .with_detail("quantity_ordered", input.quantity_ordered),
        )
        .into());
    }
    validate_date_range(input.planned_start, input.planned_end)?;

    let bom = find_or_not_found::<bom::Entity, _>(conn, input.bom_id, "BOM").await?;
    if !bom.is_active {
        return Err(DomainError::WorkOrder(
            RuleViolation::new(
                ErrorCode::BomInactive,
                format!("BOM {} is not active", bom.bom_number),
            )
            .with_detail("bom_id", bom.id),
        )
        .into());
    }

    let order_number = match input.order_number {
        Some(number) => {
            reserve_sequence_number::<work_order::Entity, _>(
                conn,
                work_order::Column::OrderNumber,
                WORK_ORDER_PREFIX,
                SequenceScope::current_year(),
                &number,
            )
            .await?;
            number
        }
        None => {
            next_sequence_number::<work_order::Entity, _>(
                conn,
                work_order::Column::OrderNumber,
                WORK_ORDER_PREFIX,
                SequenceScope::current_year(),
            )
            .await?
        }
    };

    let status = if input.draft {
        WorkOrderStatus::Draft
    } else {
        WorkOrderStatus::Planned
    };

    let created = work_order::ActiveModel {
        order_number: Set(order_number),
        bom_id: Set(bom.id),
        sales_order_line_id: Set(input.sales_order_line_id),
        status: Set(status),
        priority: Set(input.priority),
        quantity_ordered: Set(input.quantity_ordered),
        planned_start: Set(input.planned_start),
        planned_end: Set(input.planned_end),
        actual_start: Set(None),
        actual_end: Set(None),
        notes: Set(input.notes),
        created_by: Set(ctx.actor.clone()),
        modified_by: Set(ctx.actor.clone()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    Ok(created)
}

async fn sub_work_orders_of<C: ConnectionTrait>(
    conn: &C,
    work_order_id: Uuid,
) -> Result<Vec<sub_work_order::Model>, ServiceError> {
    Ok(sub_work_order::Entity::find()
        .filter(sub_work_order::Column::WorkOrderId.eq(work_order_id))
        .order_by_asc(sub_work_order::Column::SequenceOrder)
        .all(conn)
        .await?)
}

/// Loads an operation and its parent, failing when the parent is closed.
async fn load_open_operation<C: ConnectionTrait>(
    conn: &C,
    sub_id: Uuid,
) -> Result<(sub_work_order::Model, work_order::Model), ServiceError> {
    let operation =
        find_or_not_found::<sub_work_order::Entity, _>(conn, sub_id, "Sub-work-order").await?;
    let order =
        find_or_not_found::<work_order::Entity, _>(conn, operation.work_order_id, "Work order")
            .await?;
    ensure_open(&order)?;
    Ok((operation, order))
}

/// COMPLETED, CANCELLED and DELAYED orders are frozen.
fn ensure_open(order: &work_order::Model) -> Result<(), DomainError> {
    if order.status.is_terminal() {
        return Err(DomainError::WorkOrder(
            RuleViolation::new(
                ErrorCode::WorkOrderClosed,
                format!(
                    "Work order {} is {} and cannot be modified",
                    order.order_number, order.status
                ),
            )
            .with_detail("work_order_id", order.id)
            .with_detail("status", order.status.to_string()),
        ));
    }
    Ok(())
}

fn closed_operation(operation: &sub_work_order::Model) -> DomainError {
    DomainError::WorkOrder(
        RuleViolation::new(
            ErrorCode::WorkOrderClosed,
            format!("Sub-work-order is {} and cannot be modified", operation.status),
        )
        .with_detail("sub_work_order_id", operation.id)
        .with_detail("status", operation.status.to_string()),
    )
}
