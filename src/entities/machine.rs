use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};

/// Machine status enumeration
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
pub enum MachineStatus {
    #[sea_orm(string_value = "AVAILABLE")]
    Available,
    #[sea_orm(string_value = "IN_USE")]
    InUse,
    #[sea_orm(string_value = "MAINTENANCE")]
    Maintenance,
    #[sea_orm(string_value = "BROKEN")]
    Broken,
    #[sea_orm(string_value = "RETIRED")]
    Retired,
}

/// Machine entity model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "machines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub department: Option<String>,
    pub status: MachineStatus,
    pub is_active: bool,
    /// Days between scheduled maintenances
    pub maintenance_interval_days: Option<i32>,
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_maintenance_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub created_by: String,
    pub modified_by: String,
}

impl Model {
    /// Due on or after the scheduled date.
    pub fn is_due_for_maintenance(&self, current_date: NaiveDate) -> bool {
        self.next_maintenance_date
            .map_or(false, |next| current_date >= next)
    }

    /// Strictly past the scheduled date.
    pub fn is_maintenance_overdue(&self, current_date: NaiveDate) -> bool {
        self.next_maintenance_date
            .map_or(false, |next| next < current_date)
    }
}

/// Next maintenance date after a service on `maintenance_date`; `None` when
/// the machine has no maintenance interval.
pub fn calculate_next_maintenance_date(
    maintenance_date: NaiveDate,
    interval_days: Option<i32>,
) -> Option<NaiveDate> {
    interval_days
        .filter(|days| *days > 0)
        .map(|days| maintenance_date + Duration::days(i64::from(days)))
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sub_work_order::Entity")]
    SubWorkOrders,
}

impl Related<super::sub_work_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubWorkOrders.def()
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
            if let ActiveValue::NotSet = self.status {
                self.status = ActiveValue::Set(MachineStatus::Available);
            }
            if let ActiveValue::NotSet = self.is_active {
                self.is_active = ActiveValue::Set(true);
            }
        }

        self.modified_at = ActiveValue::Set(now);

        Ok(self)
    }
}
