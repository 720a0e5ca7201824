use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::common::{
    created_response, success_response, PaginatedResponse, PaginationParams, ValidatedJson,
};
use crate::{
    services::{inventory::CreateStockItemInput, RequestContext},
    ApiResult, AppState,
};

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_stock_item).get(list_stock_items))
        .route("/low-stock", get(low_stock_items))
        .route("/:id", get(get_stock_item))
}

async fn create_stock_item(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<CreateStockItemInput>,
) -> ApiResult<Response> {
    let created = state
        .services
        .inventory
        .create_stock_item(&ctx, payload)
        .await?;
    Ok(created_response(created))
}

async fn list_stock_items(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Response> {
    let (page, per_page) = pagination.resolve(&state.config);
    let result = state
        .services
        .inventory
        .list_stock_items(page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::from(result)))
}

async fn get_stock_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let item = state.services.inventory.get_stock_item(id).await?;
    Ok(success_response(item))
}

async fn low_stock_items(State(state): State<AppState>) -> ApiResult<Response> {
    let items = state.services.inventory.low_stock_items().await?;
    Ok(success_response(items))
}
