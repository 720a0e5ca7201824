use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::common::{
    created_response, success_response, PaginatedResponse, PaginationParams, ValidatedJson,
};
use crate::{
    entities::{SubWorkOrderStatus, WorkOrderStatus},
    services::{
        work_orders::{
            AllocateMaterialInput, CreateWorkOrderInput, RecordOutputInput, WorkOrderFilter,
        },
        RequestContext,
    },
    ApiResult, AppState,
};

/// Creates the router for work order endpoints
pub fn work_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_work_order).get(list_work_orders))
        .route("/:id", get(get_work_order))
        .route("/:id/status", post(transition_work_order))
        .route("/:id/schedule", put(reschedule_work_order))
        .route(
            "/:id/sub-work-orders",
            post(plan_sub_work_orders).get(list_sub_work_orders),
        )
        .route(
            "/:id/allocations",
            post(allocate_material).get(list_allocations),
        )
}

/// Creates the router for operation-level endpoints
pub fn sub_work_order_routes() -> Router<AppState> {
    Router::new()
        .route("/:id/status", post(transition_sub_work_order))
        .route("/:id/machine", post(assign_machine))
        .route("/:id/outputs", post(record_output).get(list_outputs))
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransitionWorkOrderRequest {
    pub status: WorkOrderStatus,
    pub completed_quantity: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RescheduleRequest {
    pub planned_start: DateTime<Utc>,
    pub planned_end: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransitionSubWorkOrderRequest {
    pub status: SubWorkOrderStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignMachineRequest {
    pub machine_id: Uuid,
}

async fn create_work_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<CreateWorkOrderInput>,
) -> ApiResult<Response> {
    let created = state
        .services
        .work_orders
        .create_work_order(&ctx, payload)
        .await?;
    Ok(created_response(created))
}

async fn list_work_orders(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<WorkOrderFilter>,
) -> ApiResult<Response> {
    let (page, per_page) = pagination.resolve(&state.config);
    let result = state
        .services
        .work_orders
        .list_work_orders(filter, page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::from(result)))
}

async fn get_work_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let order = state.services.work_orders.get_work_order(id).await?;
    Ok(success_response(order))
}

async fn transition_work_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<TransitionWorkOrderRequest>,
) -> ApiResult<Response> {
    let updated = state
        .services
        .work_orders
        .transition_work_order(&ctx, id, payload.status, payload.completed_quantity)
        .await?;
    Ok(success_response(updated))
}

async fn reschedule_work_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<RescheduleRequest>,
) -> ApiResult<Response> {
    let updated = state
        .services
        .work_orders
        .reschedule_work_order(&ctx, id, payload.planned_start, payload.planned_end)
        .await?;
    Ok(success_response(updated))
}

async fn plan_sub_work_orders(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let planned = state
        .services
        .work_orders
        .plan_sub_work_orders(&ctx, id)
        .await?;
    Ok(created_response(planned))
}

async fn list_sub_work_orders(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let operations = state.services.work_orders.list_sub_work_orders(id).await?;
    Ok(success_response(operations))
}

async fn allocate_material(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AllocateMaterialInput>,
) -> ApiResult<Response> {
    let allocation = state
        .services
        .work_orders
        .allocate_material(&ctx, id, payload)
        .await?;
    Ok(success_response(allocation))
}

async fn list_allocations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let allocations = state.services.work_orders.list_allocations(id).await?;
    Ok(success_response(allocations))
}

async fn transition_sub_work_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<TransitionSubWorkOrderRequest>,
) -> ApiResult<Response> {
    let updated = state
        .services
        .work_orders
        .transition_sub_work_order(&ctx, id, payload.status)
        .await?;
    Ok(success_response(updated))
}

async fn assign_machine(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AssignMachineRequest>,
) -> ApiResult<Response> {
    let updated = state
        .services
        .work_orders
        .assign_machine(&ctx, id, payload.machine_id)
        .await?;
    Ok(success_response(updated))
}

async fn record_output(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<RecordOutputInput>,
) -> ApiResult<Response> {
    let output = state
        .services
        .work_orders
        .record_output(&ctx, id, payload)
        .await?;
    Ok(created_response(output))
}

async fn list_outputs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let outputs = state.services.work_orders.list_outputs(id).await?;
    Ok(success_response(outputs))
}
