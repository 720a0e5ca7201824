use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::sequence::{next_sequence_number, SequenceScope, SALES_ORDER_PREFIX};
use super::work_orders::{insert_work_order, CreateWorkOrderInput};
use super::{find_or_not_found, RequestContext};
use crate::{
    entities::{
        bom, sales_order, sales_order_line, work_order, SalesOrderStatus, WorkOrderPriority,
    },
    errors::{DomainError, ErrorCode, RuleViolation, ServiceError},
    events::{Event, EventSender},
    validation::validate_transition,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SalesOrderLineInput {
    #[validate(length(min = 1, max = 64))]
    pub product_code: String,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSalesOrderInput {
    #[validate(length(min = 1, max = 255))]
    pub customer_name: String,
    #[validate(email)]
    pub customer_email: String,
    pub due_date: NaiveDate,
    #[validate(length(min = 1))]
    pub lines: Vec<SalesOrderLineInput>,
}

/// How a committed line should be produced.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommitLineInput {
    pub bom_id: Uuid,
    pub planned_start: DateTime<Utc>,
    pub planned_end: DateTime<Utc>,
    #[serde(default)]
    pub priority: WorkOrderPriority,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesOrderWithLines {
    #[serde(flatten)]
    pub order: sales_order::Model,
    pub lines: Vec<sales_order_line::Model>,
}

#[derive(Clone)]
pub struct SalesOrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl SalesOrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(actor = %ctx.actor, customer = %input.customer_name))]
    pub async fn create_sales_order(
        &self,
        ctx: &RequestContext,
        input: CreateSalesOrderInput,
    ) -> Result<SalesOrderWithLines, ServiceError> {
        input.validate()?;
        for line in &input.lines {
            line.validate()?;
            if line.quantity <= Decimal::ZERO {
                return Err(DomainError::BusinessRule(
                    RuleViolation::new(
                        ErrorCode::InvalidQuantity,
                        "Line quantity must be greater than zero",
                    )
                    .with_detail("product_code", &line.product_code)
                    .with_detail("quantity", line.quantity),
                )
                .into());
            }
        }

        let txn = self.db.begin().await?;
        let order_number = next_sequence_number::<sales_order::Entity, _>(
            &txn,
            sales_order::Column::OrderNumber,
            SALES_ORDER_PREFIX,
            SequenceScope::current_year(),
        )
        .await?;

        let order = sales_order::ActiveModel {
            order_number: Set(order_number),
            customer_name: Set(input.customer_name),
            customer_email: Set(input.customer_email),
            due_date: Set(input.due_date),
            confirmed_at: Set(None),
            shipped_at: Set(None),
            created_by: Set(ctx.actor.clone()),
            modified_by: Set(ctx.actor.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut lines = Vec::with_capacity(input.lines.len());
        for (line_number, line) in (1..).zip(input.lines) {
            let created = sales_order_line::ActiveModel {
                sales_order_id: Set(order.id),
                line_number: Set(line_number),
                product_code: Set(line.product_code),
                quantity: Set(line.quantity),
                work_order_id: Set(None),
                created_by: Set(ctx.actor.clone()),
                modified_by: Set(ctx.actor.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            lines.push(created);
        }
        txn.commit().await?;

        counter!("manufacturing_erp.sales_orders.created", 1);
        info!(
            sales_order_id = %order.id,
            order_number = %order.order_number,
            lines = lines.len(),
            "sales order created"
        );
        Ok(SalesOrderWithLines { order, lines })
    }

    #[instrument(skip(self))]
    pub async fn get_sales_order(&self, id: Uuid) -> Result<SalesOrderWithLines, ServiceError> {
        let order = find_or_not_found::<sales_order::Entity, _>(&*self.db, id, "Sales order")
            .await?;
        let lines = sales_order_line::Entity::find()
            .filter(sales_order_line::Column::SalesOrderId.eq(order.id))
            .order_by_asc(sales_order_line::Column::LineNumber)
            .all(&*self.db)
            .await?;
        Ok(SalesOrderWithLines { order, lines })
    }

    /// DRAFT to CONFIRMED; the customer gets a confirmation email.
    #[instrument(skip(self), fields(actor = %ctx.actor))]
    pub async fn confirm_sales_order(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<sales_order::Model, ServiceError> {
        let confirmed = self
            .change_status(ctx, id, SalesOrderStatus::Confirmed)
            .await?;
        counter!("manufacturing_erp.sales_orders.confirmed", 1);

        self.event_sender
            .send_or_log(Event::SalesOrderConfirmed {
                sales_order_id: confirmed.id,
                order_number: confirmed.order_number.clone(),
                customer_name: confirmed.customer_name.clone(),
                customer_email: confirmed.customer_email.clone(),
                due_date: confirmed.due_date,
            })
            .await;

        Ok(confirmed)
    }

    /// CONFIRMED to SHIPPED. Shipped orders are never reported overdue.
    #[instrument(skip(self), fields(actor = %ctx.actor))]
    pub async fn ship_sales_order(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<sales_order::Model, ServiceError> {
        let shipped = self.change_status(ctx, id, SalesOrderStatus::Shipped).await?;
        counter!("manufacturing_erp.sales_orders.shipped", 1);
        Ok(shipped)
    }

    /// DRAFT or CONFIRMED to CANCELLED. Work orders already committed from
    /// its lines are left for planners to cancel.
    #[instrument(skip(self), fields(actor = %ctx.actor))]
    pub async fn cancel_sales_order(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<sales_order::Model, ServiceError> {
        let cancelled = self
            .change_status(ctx, id, SalesOrderStatus::Cancelled)
            .await?;
        counter!("manufacturing_erp.sales_orders.cancelled", 1);
        Ok(cancelled)
    }

    async fn change_status(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        to: SalesOrderStatus,
    ) -> Result<sales_order::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let current = find_or_not_found::<sales_order::Entity, _>(&txn, id, "Sales order").await?;
        let from = current.status;
        validate_transition(from, to)
            .map_err(|err| DomainError::BusinessRule(err.violation().clone()))?;

        let now = Utc::now();
        let mut active = current.into_active_model();
        active.status = Set(to);
        match to {
            SalesOrderStatus::Confirmed => active.confirmed_at = Set(Some(now)),
            SalesOrderStatus::Shipped => active.shipped_at = Set(Some(now)),
            _ => {}
        }
        active.modified_by = Set(ctx.actor.clone());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(
            sales_order_id = %updated.id,
            order_number = %updated.order_number,
            from = %from,
            to = %to,
            "sales order status changed"
        );
        Ok(updated)
    }

    /// Creates a PLANNED work order for a line of a confirmed order and
    /// links the two.
    #[instrument(skip(self, input), fields(actor = %ctx.actor, bom_id = %input.bom_id))]
    pub async fn commit_line_to_production(
        &self,
        ctx: &RequestContext,
        line_id: Uuid,
        input: CommitLineInput,
    ) -> Result<work_order::Model, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        let line =
            find_or_not_found::<sales_order_line::Entity, _>(&txn, line_id, "Sales order line")
                .await?;
        let order =
            find_or_not_found::<sales_order::Entity, _>(&txn, line.sales_order_id, "Sales order")
                .await?;

        if order.status != SalesOrderStatus::Confirmed {
            return Err(DomainError::BusinessRule(
                RuleViolation::new(
                    ErrorCode::OrderNotConfirmed,
                    format!(
                        "Sales order {} must be confirmed before production",
                        order.order_number
                    ),
                )
                .with_detail("sales_order_id", order.id)
                .with_detail("status", order.status.to_string()),
            )
            .into());
        }
        if let Some(existing) = line.work_order_id {
            return Err(DomainError::BusinessRule(
                RuleViolation::new(
                    ErrorCode::LineAlreadyCommitted,
                    format!("Line {} is already in production", line.line_number),
                )
                .with_detail("sales_order_line_id", line.id)
                .with_detail("work_order_id", existing),
            )
            .into());
        }

        let recipe = find_or_not_found::<bom::Entity, _>(&txn, input.bom_id, "BOM").await?;
        if recipe.product_code != line.product_code {
            return Err(ServiceError::ValidationError(format!(
                "BOM {} builds {}, line {} orders {}",
                recipe.bom_number, recipe.product_code, line.line_number, line.product_code
            )));
        }

        let created = insert_work_order(
            &txn,
            ctx,
            CreateWorkOrderInput {
                order_number: None,
                bom_id: recipe.id,
                sales_order_line_id: Some(line.id),
                quantity_ordered: line.quantity,
                priority: input.priority,
                planned_start: input.planned_start,
                planned_end: input.planned_end,
                notes: Some(format!(
                    "Sales order {} line {}",
                    order.order_number, line.line_number
                )),
                draft: false,
            },
        )
        .await?;

        let mut active = line.into_active_model();
        active.work_order_id = Set(Some(created.id));
        active.modified_by = Set(ctx.actor.clone());
        active.update(&txn).await?;
        txn.commit().await?;

        counter!("manufacturing_erp.work_orders.created", 1);
        info!(
            work_order_id = %created.id,
            order_number = %created.order_number,
            sales_order = %order.order_number,
            "sales order line committed to production"
        );

        self.event_sender
            .send_or_log(Event::WorkOrderCreated {
                work_order_id: created.id,
                order_number: created.order_number.clone(),
            })
            .await;

        Ok(created)
    }

    /// Confirmed orders whose due date is before `today`.
    #[instrument(skip(self))]
    pub async fn overdue_sales_orders(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<sales_order::Model>, ServiceError> {
        Ok(sales_order::Entity::find()
            .filter(sales_order::Column::Status.eq(SalesOrderStatus::Confirmed))
            .filter(sales_order::Column::DueDate.lt(today))
            .order_by_asc(sales_order::Column::DueDate)
            .all(&*self.db)
            .await?)
    }
}
