use chrono::{NaiveDate, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::{find_or_not_found, Page, RequestContext};
use crate::{
    entities::{machine, MachineStatus},
    errors::ServiceError,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMachineInput {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub department: Option<String>,
    #[validate(range(min = 1, max = 3650))]
    pub maintenance_interval_days: Option<i32>,
    pub last_maintenance_date: Option<NaiveDate>,
    /// Derived from the last maintenance and the interval when absent
    pub next_maintenance_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateMachineStatusInput {
    pub status: MachineStatus,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordMaintenanceInput {
    /// Defaults to today
    pub performed_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MachineFilter {
    pub status: Option<MachineStatus>,
    pub department: Option<String>,
}

#[derive(Clone)]
pub struct MachineService {
    db: Arc<DatabaseConnection>,
}

impl MachineService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(actor = %ctx.actor, code = %input.code))]
    pub async fn create_machine(
        &self,
        ctx: &RequestContext,
        input: CreateMachineInput,
    ) -> Result<machine::Model, ServiceError> {
        input.validate()?;

        let next_maintenance_date = input.next_maintenance_date.or_else(|| {
            input.last_maintenance_date.and_then(|last| {
                machine::calculate_next_maintenance_date(last, input.maintenance_interval_days)
            })
        });

        let created = machine::ActiveModel {
            code: Set(input.code),
            name: Set(input.name),
            department: Set(input.department),
            maintenance_interval_days: Set(input.maintenance_interval_days),
            last_maintenance_date: Set(input.last_maintenance_date),
            next_maintenance_date: Set(next_maintenance_date),
            created_by: Set(ctx.actor.clone()),
            modified_by: Set(ctx.actor.clone()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(machine_id = %created.id, code = %created.code, "machine registered");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_machine(&self, id: Uuid) -> Result<machine::Model, ServiceError> {
        find_or_not_found::<machine::Entity, _>(&*self.db, id, "Machine").await
    }

    #[instrument(skip(self))]
    pub async fn list_machines(
        &self,
        filter: MachineFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<machine::Model>, ServiceError> {
        let mut query = machine::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(machine::Column::Status.eq(status));
        }
        if let Some(department) = filter.department {
            query = query.filter(machine::Column::Department.eq(department));
        }

        let paginator = query
            .order_by_asc(machine::Column::Code)
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

    /// Sets the operational status. Retiring a machine also deactivates it.
    #[instrument(skip(self), fields(actor = %ctx.actor))]
    pub async fn update_machine_status(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: UpdateMachineStatusInput,
    ) -> Result<machine::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let current = find_or_not_found::<machine::Entity, _>(&txn, id, "Machine").await?;
        let previous = current.status;

        let is_active = match (input.status, input.is_active) {
            (MachineStatus::Retired, _) => false,
            (_, Some(flag)) => flag,
            (_, None) => current.is_active,
        };

        let mut active = current.into_active_model();
        active.status = Set(input.status);
        active.is_active = Set(is_active);
        active.modified_by = Set(ctx.actor.clone());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        if updated.status == MachineStatus::Broken {
            warn!(machine_id = %updated.id, code = %updated.code, "machine reported broken");
        }
        info!(
            machine_id = %updated.id,
            from = %previous,
            to = %updated.status,
            "machine status updated"
        );
        Ok(updated)
    }

    /// Records a completed maintenance and schedules the next one.
    ///
    /// A machine in MAINTENANCE goes back to AVAILABLE.
    #[instrument(skip(self), fields(actor = %ctx.actor))]
    pub async fn record_maintenance(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: RecordMaintenanceInput,
    ) -> Result<machine::Model, ServiceError> {
        let performed_on = input
            .performed_on
            .unwrap_or_else(|| Utc::now().date_naive());

        let txn = self.db.begin().await?;
        let current = find_or_not_found::<machine::Entity, _>(&txn, id, "Machine").await?;
        let next = machine::calculate_next_maintenance_date(
            performed_on,
            current.maintenance_interval_days,
        );
        let back_in_service = current.status == MachineStatus::Maintenance;

        let mut active = current.into_active_model();
        active.last_maintenance_date = Set(Some(performed_on));
        active.next_maintenance_date = Set(next);
        if back_in_service {
            active.status = Set(MachineStatus::Available);
        }
        active.modified_by = Set(ctx.actor.clone());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        counter!("manufacturing_erp.machines.maintenance_recorded", 1);
        info!(
            machine_id = %updated.id,
            performed_on = %performed_on,
            next = ?updated.next_maintenance_date,
            "maintenance recorded"
        );
        Ok(updated)
    }

    /// Active, non-retired machines whose maintenance date is on or before `today`.
    #[instrument(skip(self))]
    pub async fn machines_due_for_maintenance(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<machine::Model>, ServiceError> {
        let machines = machine::Entity::find()
            .filter(machine::Column::IsActive.eq(true))
            .filter(machine::Column::Status.ne(MachineStatus::Retired))
            .filter(machine::Column::NextMaintenanceDate.lte(today))
            .order_by_asc(machine::Column::NextMaintenanceDate)
            .all(&*self.db)
            .await?;

        Ok(machines
            .into_iter()
            .filter(|m| m.is_due_for_maintenance(today))
            .collect())
    }
}
