use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityStatus {
    #[sea_orm(string_value = "GOOD")]
    Good,
    #[sea_orm(string_value = "REWORK")]
    Rework,
    #[sea_orm(string_value = "SCRAP")]
    Scrap,
}

/// Append-only production record for a sub-work-order.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "work_order_outputs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sub_work_order_id: Uuid,
    pub quantity: Decimal,
    pub quality_status: QualityStatus,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sub_work_order::Entity",
        from = "Column::SubWorkOrderId",
        to = "super::sub_work_order::Column::Id"
    )]
    SubWorkOrder,
}

impl Related<super::sub_work_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubWorkOrder.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            return Err(DbErr::Custom(
                "work order outputs are append-only".to_string(),
            ));
        }

        if let ActiveValue::NotSet = self.id {
            self.id = ActiveValue::Set(Uuid::new_v4());
        }
        if let ActiveValue::NotSet = self.recorded_at {
            self.recorded_at = ActiveValue::Set(Utc::now());
        }

        Ok(self)
    }
}
