//! Document numbers such as `WO-2026-00042` and `BOM-00007`.
//!
//! Numbers come from a counter row in `document_sequences`, incremented with
//! a single `UPDATE ... SET last_value = last_value + 1` inside the caller's
//! transaction. The row lock taken by that update serializes concurrent
//! callers on the same scope. When no counter row exists yet it is seeded
//! from the greatest number already stored in the target column.
//! Caller-chosen numbers inside a series raise the counter past themselves.

use chrono::{Datelike, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use tracing::{debug, instrument};

use crate::entities::document_sequence;
use crate::errors::ServiceError;

/// Zero padding of the numeric segment.
pub const SEQUENCE_WIDTH: usize = 5;

pub const WORK_ORDER_PREFIX: &str = "WO";
pub const SALES_ORDER_PREFIX: &str = "SO";
pub const BOM_PREFIX: &str = "BOM";

/// Whether a series restarts every calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceScope {
    Yearly(i32),
    Unscoped,
}

impl SequenceScope {
    pub fn current_year() -> Self {
        Self::Yearly(Utc::now().year())
    }

    /// `WO-2026` for yearly series, the bare prefix otherwise.
    pub fn scoped_prefix(&self, prefix: &str) -> String {
        match self {
            Self::Yearly(year) => format!("{}-{:04}", prefix, year),
            Self::Unscoped => prefix.to_string(),
        }
    }
}

pub fn format_sequence_number(prefix: &str, scope: SequenceScope, value: i64) -> String {
    format!(
        "{}-{:0width$}",
        scope.scoped_prefix(prefix),
        value,
        width = SEQUENCE_WIDTH
    )
}

/// Parses the integer after the last hyphen.
pub fn parse_sequence_number(value: &str) -> Result<i64, ServiceError> {
    let format_error = || ServiceError::SequenceFormat {
        value: value.to_string(),
    };

    let (_, digits) = value.rsplit_once('-').ok_or_else(format_error)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format_error());
    }
    digits.parse::<i64>().map_err(|_| format_error())
}

/// Hands out the next number for `prefix` in `scope`.
///
/// `column` is the unique number column of `E`; it is only read when the
/// counter row for this scope does not exist yet.
#[instrument(skip(conn, column))]
pub async fn next_sequence_number<E, C>(
    conn: &C,
    column: E::Column,
    prefix: &str,
    scope: SequenceScope,
) -> Result<String, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let scoped = scope.scoped_prefix(prefix);
    ensure_counter::<E, C>(conn, column, &scoped).await?;

    document_sequence::Entity::update_many()
        .col_expr(
            document_sequence::Column::LastValue,
            Expr::col(document_sequence::Column::LastValue).add(1),
        )
        .filter(document_sequence::Column::Scope.eq(scoped.as_str()))
        .exec(conn)
        .await?;

    let counter = document_sequence::Entity::find_by_id(scoped.clone())
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::InternalError(format!("document sequence {} vanished", scoped))
        })?;

    Ok(format_sequence_number(prefix, scope, counter.last_value))
}

/// Admits a caller-chosen number.
///
/// The number must be unused. When it falls inside the `prefix`/`scope`
/// series its numeric segment must be well formed, and the counter is raised
/// to it so later generated numbers land past it.
#[instrument(skip(conn, column))]
pub async fn reserve_sequence_number<E, C>(
    conn: &C,
    column: E::Column,
    prefix: &str,
    scope: SequenceScope,
    number: &str,
) -> Result<(), ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let taken: Option<String> = E::find()
        .select_only()
        .column(column)
        .filter(column.eq(number))
        .into_tuple()
        .one(conn)
        .await?;
    if taken.is_some() {
        return Err(ServiceError::ValidationError(format!(
            "Number {} is already in use",
            number
        )));
    }

    let scoped = scope.scoped_prefix(prefix);
    let Some(digits) = number.strip_prefix(&format!("{}-", scoped)) else {
        return Ok(());
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ServiceError::ValidationError(format!(
            "Number {} does not match the {}-NNNNN format",
            number, scoped
        )));
    }
    let value = parse_sequence_number(number)
        .map_err(|_| ServiceError::ValidationError(format!("Number {} is out of range", number)))?;

    ensure_counter::<E, C>(conn, column, &scoped).await?;
    document_sequence::Entity::update_many()
        .col_expr(document_sequence::Column::LastValue, Expr::value(value))
        .filter(document_sequence::Column::Scope.eq(scoped.as_str()))
        .filter(document_sequence::Column::LastValue.lt(value))
        .exec(conn)
        .await?;

    debug!(scope = %scoped, value, "counter raised past caller-supplied number");
    Ok(())
}

/// Creates the counter row for `scoped` when missing, seeded from the
/// greatest number already stored in `column`.
async fn ensure_counter<E, C>(conn: &C, column: E::Column, scoped: &str) -> Result<(), ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let existing = document_sequence::Entity::find_by_id(scoped.to_string())
        .one(conn)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let seed = latest_persisted_number::<E, C>(conn, column, scoped).await?;
    debug!(scope = %scoped, seed, "bootstrapping document sequence");

    let row = document_sequence::ActiveModel {
        scope: Set(scoped.to_string()),
        last_value: Set(seed),
    };
    let inserted = document_sequence::Entity::insert(row)
        .on_conflict(
            OnConflict::column(document_sequence::Column::Scope)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await;
    match inserted {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn latest_persisted_number<E, C>(
    conn: &C,
    column: E::Column,
    scoped: &str,
) -> Result<i64, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let latest: Option<String> = E::find()
        .select_only()
        .column(column)
        .filter(column.starts_with(format!("{}-", scoped)))
        .order_by_desc(column)
        .into_tuple()
        .one(conn)
        .await?;

    match latest {
        Some(value) => parse_sequence_number(&value),
        None => Ok(0),
    }
}
