use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryOrder,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{find_or_not_found, Page, RequestContext};
use crate::{
    entities::stock_item,
    errors::{DomainError, ErrorCode, RuleViolation, ServiceError},
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStockItemInput {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub unit: String,
    #[serde(default)]
    pub quantity_on_hand: Decimal,
    #[serde(default)]
    pub reorder_level: Decimal,
}

#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(actor = %ctx.actor, sku = %input.sku))]
    pub async fn create_stock_item(
        &self,
        ctx: &RequestContext,
        input: CreateStockItemInput,
    ) -> Result<stock_item::Model, ServiceError> {
        input.validate()?;
        if input.quantity_on_hand < Decimal::ZERO || input.reorder_level < Decimal::ZERO {
            return Err(DomainError::BusinessRule(
                RuleViolation::new(
                    ErrorCode::NegativeQuantity,
                    "Stock quantities cannot be negative",
                )
                .with_detail("quantity_on_hand", input.quantity_on_hand)
                .with_detail("reorder_level", input.reorder_level),
            )
            .into());
        }

        let created = stock_item::ActiveModel {
            sku: Set(input.sku),
            name: Set(input.name),
            unit: Set(input.unit),
            quantity_on_hand: Set(input.quantity_on_hand),
            reorder_level: Set(input.reorder_level),
            created_by: Set(ctx.actor.clone()),
            modified_by: Set(ctx.actor.clone()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(stock_item_id = %created.id, sku = %created.sku, "stock item created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_stock_item(&self, id: Uuid) -> Result<stock_item::Model, ServiceError> {
        find_or_not_found::<stock_item::Entity, _>(&*self.db, id, "Stock item").await
    }

    #[instrument(skip(self))]
    pub async fn list_stock_items(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<Page<stock_item::Model>, ServiceError> {
        let paginator = stock_item::Entity::find()
            .order_by_asc(stock_item::Column::Sku)
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

    /// Items at or below their reorder level.
    // Compared in Rust: decimal columns are not reliably comparable in SQL on SQLite.
    #[instrument(skip(self))]
    pub async fn low_stock_items(&self) -> Result<Vec<stock_item::Model>, ServiceError> {
        let items = stock_item::Entity::find()
            .order_by_asc(stock_item::Column::Sku)
            .all(&*self.db)
            .await?;
        Ok(items.into_iter().filter(|item| item.is_low_stock()).collect())
    }
}
