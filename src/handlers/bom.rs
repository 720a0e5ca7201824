use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::{
    created_response, success_response, PaginatedResponse, PaginationParams, ValidatedJson,
};
use crate::{
    services::{
        bom::{ComponentInput, CreateBomInput},
        RequestContext,
    },
    ApiResult, AppState,
};

/// Creates the router for BOM endpoints
pub fn bom_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_bom).get(list_boms))
        .route("/:id", get(get_bom))
        .route("/:id/components", post(add_component))
}

#[derive(Debug, Default, Deserialize)]
pub struct BomQuery {
    pub product_code: Option<String>,
}

async fn create_bom(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<CreateBomInput>,
) -> ApiResult<Response> {
    let created = state.services.boms.create_bom(&ctx, payload).await?;
    Ok(created_response(created))
}

async fn list_boms(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<BomQuery>,
) -> ApiResult<Response> {
    let (page, per_page) = pagination.resolve(&state.config);
    let result = state
        .services
        .boms
        .list_boms(query.product_code, page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::from(result)))
}

async fn get_bom(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Response> {
    let bom = state.services.boms.get_bom_with_components(id).await?;
    Ok(success_response(bom))
}

async fn add_component(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ComponentInput>,
) -> ApiResult<Response> {
    let component = state.services.boms.add_component(&ctx, id, payload).await?;
    Ok(created_response(component))
}
