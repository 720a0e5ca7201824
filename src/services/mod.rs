pub mod bom;
pub mod inventory;
pub mod machines;
pub mod sales_orders;
pub mod sequence;
pub mod work_orders;

use sea_orm::{ConnectionTrait, EntityTrait, PrimaryKeyTrait};

use crate::errors::ServiceError;

/// Who is acting and on behalf of which request.
///
/// Every mutating service call takes one; the actor is written to the
/// `created_by` / `modified_by` audit columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub actor: String,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn new(actor: impl Into<String>, request_id: Option<String>) -> Self {
        Self {
            actor: actor.into(),
            request_id,
        }
    }

    /// Context for background jobs.
    pub fn system(job: &str) -> Self {
        Self {
            actor: format!("system:{}", job),
            request_id: None,
        }
    }
}

/// One page of a listing plus the total row count.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Loads a row by primary key or fails with `NOT_FOUND`.
pub(crate) async fn find_or_not_found<E, C>(
    conn: &C,
    id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
    what: &str,
) -> Result<E::Model, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: std::fmt::Display + Clone,
{
    E::find_by_id(id.clone())
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("{} {} not found", what, id)))
}
