use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post, put},
    Extension, Json, Router,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::{
    AuditLogDto, BudgetDto, BudgetItemDto, ChangeStateRequest, EvidenceDto, EvidenceRequest,
    MechanicsRequest, NewWorkOrderRequest, NextNumberResponse, NotesRequest, OkResponse,
    OrderVehicleRequest, SearchQuery, TaskDto, WorkOrderDetailDto, WorkOrderDto,
};
use crate::models::{BudgetItem, Task};
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError};
use crate::utils::jwt::JwtClaims;

pub fn create_work_order_router() -> Router<AppState> {
    Router::new()
        .route("/", get(search_orders).post(create_order))
        .route("/siguiente-numero", get(next_number))
        .route("/:id", get(get_detail).delete(delete_order))
        .route("/:id/estado", patch(change_state))
        .route("/:id/notas", put(update_notes))
        .route("/:id/mecanicos", put(update_mechanics))
        .route("/:id/vehiculo", put(update_vehicle))
        .route("/:id/presupuesto", get(get_budget).put(save_budget))
        .route("/:id/presupuesto/aprobar", post(approve_budget))
        .route("/:id/presupuesto/items", post(add_budget_item))
        .route("/:id/tareas", get(get_tasks).put(save_tasks))
        .route("/:id/evidencias", post(add_evidence))
        .route("/:id/auditoria", get(get_audit_log))
}

fn ok(ok: bool) -> Json<OkResponse> {
    Json(OkResponse { ok })
}

async fn search_orders(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<WorkOrderDto>>, AppError> {
    let filters = query.into_filters()?;
    let orders = state.repository.search(&filters).await?;
    Ok(Json(orders.into_iter().map(WorkOrderDto::from).collect()))
}

async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<JwtClaims>,
    Json(request): Json<NewWorkOrderRequest>,
) -> Result<Json<WorkOrderDto>, AppError> {
    request.validate()?;
    let order = state.repository.create_order(request.into(), &claims.email).await?;
    info!("🆕 OT #{} creada por {}", order.number, claims.email);
    Ok(Json(order.into()))
}

async fn next_number(State(state): State<AppState>) -> Result<Json<NextNumberResponse>, AppError> {
    let numero = state.repository.next_number().await?;
    Ok(Json(NextNumberResponse { numero }))
}

async fn get_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkOrderDetailDto>, AppError> {
    let detail = state
        .repository
        .order_detail(id)
        .await?
        .ok_or_else(|| not_found_error("OT", &id.to_string()))?;
    Ok(Json(detail.into()))
}

async fn delete_order(
    State(state): State<AppState>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, AppError> {
    Ok(ok(state.repository.delete_order(id, &claims.email).await?))
}

async fn change_state(
    State(state): State<AppState>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeStateRequest>,
) -> Result<Json<OkResponse>, AppError> {
    Ok(ok(state.repository.change_state(id, request.estado, &claims.email).await?))
}

async fn update_notes(
    State(state): State<AppState>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<Uuid>,
    Json(request): Json<NotesRequest>,
) -> Result<Json<OkResponse>, AppError> {
    Ok(ok(state.repository.update_notes(id, request.notas, &claims.email).await?))
}

async fn update_mechanics(
    State(state): State<AppState>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<Uuid>,
    Json(request): Json<MechanicsRequest>,
) -> Result<Json<OkResponse>, AppError> {
    Ok(ok(state.repository.update_mechanics(id, request.mecanicos, &claims.email).await?))
}

async fn update_vehicle(
    State(state): State<AppState>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<Uuid>,
    Json(request): Json<OrderVehicleRequest>,
) -> Result<Json<OkResponse>, AppError> {
    Ok(ok(state.repository.update_order_vehicle(id, &request.patente, &claims.email).await?))
}

async fn get_budget(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BudgetDto>, AppError> {
    let budget = state
        .repository
        .budget(id)
        .await?
        .ok_or_else(|| not_found_error("Presupuesto", &id.to_string()))?;
    Ok(Json(budget.into()))
}

async fn save_budget(
    State(state): State<AppState>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<Uuid>,
    Json(request): Json<BudgetDto>,
) -> Result<Json<OkResponse>, AppError> {
    request.validate()?;
    let items = request.items.into_iter().map(BudgetItem::from).collect();
    let saved = state
        .repository
        .save_budget(id, items, request.aprobado, request.iva_porc, &claims.email)
        .await?;
    Ok(ok(saved))
}

async fn approve_budget(
    State(state): State<AppState>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, AppError> {
    state.repository.approve_budget(id, &claims.email).await?;
    Ok(ok(true))
}

async fn add_budget_item(
    State(state): State<AppState>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<Uuid>,
    Json(request): Json<BudgetItemDto>,
) -> Result<Json<OkResponse>, AppError> {
    request.validate()?;
    Ok(ok(state.repository.add_budget_item(id, request.into(), &claims.email).await?))
}

async fn get_tasks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TaskDto>>, AppError> {
    let tasks = state.repository.tasks(id).await?;
    Ok(Json(tasks.into_iter().map(TaskDto::from).collect()))
}

async fn save_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<Uuid>,
    Json(request): Json<Vec<TaskDto>>,
) -> Result<Json<OkResponse>, AppError> {
    for task in &request {
        task.validate()?;
    }
    let tasks: Vec<Task> = request.into_iter().map(Task::from).collect();
    Ok(ok(state.repository.save_tasks(id, tasks, &claims.email).await?))
}

async fn add_evidence(
    State(state): State<AppState>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<Uuid>,
    Json(request): Json<EvidenceRequest>,
) -> Result<Json<EvidenceDto>, AppError> {
    request.validate()?;
    let evidence = state
        .repository
        .add_evidence(id, request.etapa, &request.uri_local, &claims.email)
        .await?
        .ok_or_else(|| not_found_error("OT", &id.to_string()))?;
    Ok(Json(evidence.into()))
}

async fn get_audit_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AuditLogDto>>, AppError> {
    let entries = state.repository.audit_log(id).await?;
    Ok(Json(entries.into_iter().map(AuditLogDto::from).collect()))
}
