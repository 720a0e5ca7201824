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
pub enum ComponentType {
    #[sea_orm(string_value = "RAW_MATERIAL")]
    RawMaterial,
    #[sea_orm(string_value = "SEMI_FINISHED")]
    SemiFinished,
    #[sea_orm(string_value = "PROCESS")]
    Process,
}

/// What a BOM line points at. Persisted as `component_type` plus either
/// `reference_id` or `operation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentKind {
    RawMaterial { stock_item_id: Uuid },
    SemiFinished { bom_id: Uuid },
    Process { operation: String },
}

impl ComponentKind {
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::RawMaterial { .. } => ComponentType::RawMaterial,
            Self::SemiFinished { .. } => ComponentType::SemiFinished,
            Self::Process { .. } => ComponentType::Process,
        }
    }

    pub fn reference_id(&self) -> Option<Uuid> {
        match self {
            Self::RawMaterial { stock_item_id } => Some(*stock_item_id),
            Self::SemiFinished { bom_id } => Some(*bom_id),
            Self::Process { .. } => None,
        }
    }

    pub fn operation(&self) -> Option<String> {
        match self {
            Self::Process { operation } => Some(operation.clone()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bom_components")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub bom_id: Uuid,
    /// Unique within a BOM
    pub sequence_order: i32,
    pub component_type: ComponentType,
    pub reference_id: Option<Uuid>,
    pub operation: Option<String>,
    /// Quantity per unit of the finished product
    pub quantity: Decimal,
    pub unit: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub created_by: String,
    pub modified_by: String,
}

impl Model {
    /// Rebuilds the typed component; `None` when the stored columns disagree
    /// with `component_type`.
    pub fn kind(&self) -> Option<ComponentKind> {
        match (self.component_type, self.reference_id, &self.operation) {
            (ComponentType::RawMaterial, Some(id), None) => {
                Some(ComponentKind::RawMaterial { stock_item_id: id })
            }
            (ComponentType::SemiFinished, Some(id), None) => {
                Some(ComponentKind::SemiFinished { bom_id: id })
            }
            (ComponentType::Process, None, Some(op)) => Some(ComponentKind::Process {
                operation: op.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bom::Entity",
        from = "Column::BomId",
        to = "super::bom::Column::Id"
    )]
    Bom,
}

impl Related<super::bom::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bom.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = self.id {
                self.id = ActiveValue::Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = self.created_at {
                self.created_at = ActiveValue::Set(now);
            }
        }

        self.modified_at = ActiveValue::Set(now);

        Ok(self)
    }
}
