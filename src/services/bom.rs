use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::sequence::{next_sequence_number, SequenceScope, BOM_PREFIX};
use super::{find_or_not_found, Page, RequestContext};
use crate::{
    entities::{bom, bom_component, stock_item, ComponentKind},
    errors::{DomainError, ErrorCode, RuleViolation, ServiceError},
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ComponentInput {
    #[validate(range(min = 1))]
    pub sequence_order: i32,
    #[serde(flatten)]
    pub kind: ComponentKind,
    /// Per unit of finished product
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 32))]
    pub unit: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBomInput {
    #[validate(length(min = 1, max = 64))]
    pub product_code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Next free version of the product when absent
    #[validate(range(min = 1))]
    pub version: Option<i32>,
    #[serde(default)]
    #[validate]
    pub components: Vec<ComponentInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BomWithComponents {
    #[serde(flatten)]
    pub bom: bom::Model,
    pub components: Vec<bom_component::Model>,
}

#[derive(Clone)]
pub struct BomService {
    db: Arc<DatabaseConnection>,
}

impl BomService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a BOM and its components in one transaction.
    #[instrument(skip(self, input), fields(actor = %ctx.actor, product_code = %input.product_code))]
    pub async fn create_bom(
        &self,
        ctx: &RequestContext,
        input: CreateBomInput,
    ) -> Result<BomWithComponents, ServiceError> {
        input.validate()?;

        let mut seen = HashSet::new();
        for component in &input.components {
            if !seen.insert(component.sequence_order) {
                return Err(duplicate_sequence(None, component.sequence_order).into());
            }
        }

        let txn = self.db.begin().await?;

        let version = match input.version {
            Some(version) => version,
            None => next_version(&txn, &input.product_code).await?,
        };
        let bom_number = next_sequence_number::<bom::Entity, _>(
            &txn,
            bom::Column::BomNumber,
            BOM_PREFIX,
            SequenceScope::Unscoped,
        )
        .await?;

        let created = bom::ActiveModel {
            bom_number: Set(bom_number),
            product_code: Set(input.product_code),
            name: Set(input.name),
            version: Set(version),
            created_by: Set(ctx.actor.clone()),
            modified_by: Set(ctx.actor.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut components = Vec::with_capacity(input.components.len());
        for component in input.components {
            components.push(insert_component(&txn, ctx, &created, component).await?);
        }
        txn.commit().await?;

        info!(
            bom_id = %created.id,
            bom_number = %created.bom_number,
            version = created.version,
            components = components.len(),
            "BOM created"
        );
        Ok(BomWithComponents {
            bom: created,
            components,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_bom_with_components(
        &self,
        id: Uuid,
    ) -> Result<BomWithComponents, ServiceError> {
        let bom = find_or_not_found::<bom::Entity, _>(&*self.db, id, "BOM").await?;
        let components = bom_component::Entity::find()
            .filter(bom_component::Column::BomId.eq(bom.id))
            .order_by_asc(bom_component::Column::SequenceOrder)
            .all(&*self.db)
            .await?;
        Ok(BomWithComponents { bom, components })
    }

    /// Adds a component; its sequence order must be free within the BOM.
    #[instrument(skip(self, input), fields(actor = %ctx.actor))]
    pub async fn add_component(
        &self,
        ctx: &RequestContext,
        bom_id: Uuid,
        input: ComponentInput,
    ) -> Result<bom_component::Model, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        let bom = find_or_not_found::<bom::Entity, _>(&txn, bom_id, "BOM").await?;

        let taken = bom_component::Entity::find()
            .filter(bom_component::Column::BomId.eq(bom.id))
            .filter(bom_component::Column::SequenceOrder.eq(input.sequence_order))
            .count(&txn)
            .await?;
        if taken > 0 {
            return Err(duplicate_sequence(Some(bom.id), input.sequence_order).into());
        }

        let created = insert_component(&txn, ctx, &bom, input).await?;
        txn.commit().await?;

        info!(
            bom_id = %bom.id,
            component_id = %created.id,
            sequence_order = created.sequence_order,
            "BOM component added"
        );
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list_boms(
        &self,
        product_code: Option<String>,
        page: u64,
        per_page: u64,
    ) -> Result<Page<bom::Model>, ServiceError> {
        let mut query = bom::Entity::find();
        if let Some(code) = product_code {
            query = query.filter(bom::Column::ProductCode.eq(code));
        }

        let paginator = query
            .order_by_asc(bom::Column::ProductCode)
            .order_by_desc(bom::Column::Version)
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
}

async fn next_version<C: ConnectionTrait>(
    conn: &C,
    product_code: &str,
) -> Result<i32, ServiceError> {
    let latest: Option<i32> = bom::Entity::find()
        .select_only()
        .column(bom::Column::Version)
        .filter(bom::Column::ProductCode.eq(product_code))
        .order_by_desc(bom::Column::Version)
        .into_tuple()
        .one(conn)
        .await?;
    Ok(latest.map_or(1, |v| v + 1))
}

/// Checks the component's reference and inserts it.
async fn insert_component<C: ConnectionTrait>(
    conn: &C,
    ctx: &RequestContext,
    bom: &bom::Model,
    input: ComponentInput,
) -> Result<bom_component::Model, ServiceError> {
    if input.quantity <= Decimal::ZERO {
        return Err(DomainError::BusinessRule(
            RuleViolation::new(
                ErrorCode::InvalidQuantity,
                "Component quantity must be greater than zero",
            )
            .with_detail("sequence_order", input.sequence_order)
            .with_detail("quantity", input.quantity),
        )
        .into());
    }

    match &input.kind {
        ComponentKind::RawMaterial { stock_item_id } => {
            find_or_not_found::<stock_item::Entity, _>(conn, *stock_item_id, "Stock item")
                .await?;
        }
        ComponentKind::SemiFinished { bom_id } => {
            if *bom_id == bom.id {
                return Err(ServiceError::ValidationError(
                    "A BOM cannot contain itself".to_string(),
                ));
            }
            find_or_not_found::<bom::Entity, _>(conn, *bom_id, "BOM").await?;
        }
        ComponentKind::Process { operation } => {
            if operation.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Process components need an operation".to_string(),
                ));
            }
        }
    }

    let created = bom_component::ActiveModel {
        bom_id: Set(bom.id),
        sequence_order: Set(input.sequence_order),
        component_type: Set(input.kind.component_type()),
        reference_id: Set(input.kind.reference_id()),
        operation: Set(input.kind.operation()),
        quantity: Set(input.quantity),
        unit: Set(input.unit),
        created_by: Set(ctx.actor.clone()),
        modified_by: Set(ctx.actor.clone()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    Ok(created)
}

fn duplicate_sequence(bom_id: Option<Uuid>, sequence_order: i32) -> DomainError {
    let mut violation = RuleViolation::new(
        ErrorCode::DuplicateSequenceOrder,
        format!("Sequence order {} is already used in this BOM", sequence_order),
    )
    .with_detail("sequence_order", sequence_order);
    if let Some(id) = bom_id {
        violation = violation.with_detail("bom_id", id);
    }
    DomainError::BusinessRule(violation)
}
