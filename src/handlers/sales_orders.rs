use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::common::{created_response, success_response, ValidatedJson};
use crate::{
    services::{
        sales_orders::{CommitLineInput, CreateSalesOrderInput},
        RequestContext,
    },
    ApiResult, AppState,
};

pub fn sales_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_sales_order))
        .route("/:id", get(get_sales_order))
        .route("/:id/confirm", post(confirm_sales_order))
        .route("/:id/ship", post(ship_sales_order))
        .route("/:id/cancel", post(cancel_sales_order))
}

pub fn sales_order_line_routes() -> Router<AppState> {
    Router::new().route("/:id/commit", post(commit_line_to_production))
}

async fn create_sales_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<CreateSalesOrderInput>,
) -> ApiResult<Response> {
    let created = state
        .services
        .sales_orders
        .create_sales_order(&ctx, payload)
        .await?;
    Ok(created_response(created))
}

async fn get_sales_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let order = state.services.sales_orders.get_sales_order(id).await?;
    Ok(success_response(order))
}

async fn confirm_sales_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let confirmed = state
        .services
        .sales_orders
        .confirm_sales_order(&ctx, id)
        .await?;
    Ok(success_response(confirmed))
}

async fn ship_sales_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let shipped = state.services.sales_orders.ship_sales_order(&ctx, id).await?;
    Ok(success_response(shipped))
}

async fn cancel_sales_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let cancelled = state
        .services
        .sales_orders
        .cancel_sales_order(&ctx, id)
        .await?;
    Ok(success_response(cancelled))
}

async fn commit_line_to_production(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CommitLineInput>,
) -> ApiResult<Response> {
    let work_order = state
        .services
        .sales_orders
        .commit_line_to_production(&ctx, id, payload)
        .await?;
    Ok(created_response(work_order))
}
