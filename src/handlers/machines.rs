use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use super::common::{
    created_response, success_response, PaginatedResponse, PaginationParams, ValidatedJson,
};
use crate::{
    services::{
        machines::{
            CreateMachineInput, MachineFilter, RecordMaintenanceInput, UpdateMachineStatusInput,
        },
        RequestContext,
    },
    ApiResult, AppState,
};

pub fn machine_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_machine).get(list_machines))
        .route("/:id", get(get_machine))
        .route("/:id/status", put(update_machine_status))
        .route("/:id/maintenance", post(record_maintenance))
}

async fn create_machine(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<CreateMachineInput>,
) -> ApiResult<Response> {
    let created = state.services.machines.create_machine(&ctx, payload).await?;
    Ok(created_response(created))
}

async fn list_machines(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<MachineFilter>,
) -> ApiResult<Response> {
    let (page, per_page) = pagination.resolve(&state.config);
    let result = state
        .services
        .machines
        .list_machines(filter, page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::from(result)))
}

async fn get_machine(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let machine = state.services.machines.get_machine(id).await?;
    Ok(success_response(machine))
}

async fn update_machine_status(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateMachineStatusInput>,
) -> ApiResult<Response> {
    let updated = state
        .services
        .machines
        .update_machine_status(&ctx, id, payload)
        .await?;
    Ok(success_response(updated))
}

/// The body is optional; without one maintenance is recorded for today.
async fn record_maintenance(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    payload: Option<Json<RecordMaintenanceInput>>,
) -> ApiResult<Response> {
    let input = payload.map(|Json(input)| input).unwrap_or_default();
    let updated = state
        .services
        .machines
        .record_maintenance(&ctx, id, input)
        .await?;
    Ok(success_response(updated))
}
