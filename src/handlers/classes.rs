// handlers/classes.rs - class records, enrolment counts and lineage

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Class;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::promotion::LineageView;
use crate::services::{ClassInput, ClassPatch};

/// POST /api/classes - create a class
///
/// Expected Input:
/// ```json
/// {
///   "tenant": "school-a",
///   "academicYear": 2025,
///   "academicLevel": "<level id>",
///   "stream": { "id": "<stream id>" },
///   "capacity": 40
/// }
/// ```
///
/// `classCode` is generated when absent; `className` is always derived.
pub async fn class_create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<ClassInput>,
) -> ApiResult<Class> {
    let tenant = user.write_tenant(input.tenant.as_deref(), state.elevated_roles())?;
    let class = state.classes().create(tenant, input).await?;
    Ok(ApiResponse::created(class))
}

/// GET /api/classes/:id
pub async fn class_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Class> {
    let class = state.classes().get(id).await?;
    user.ensure_access(&class.tenant, state.elevated_roles())?;
    Ok(ApiResponse::success(class))
}

/// PATCH /api/classes/:id - partial update; `classCode` is immutable
pub async fn class_update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ClassPatch>,
) -> ApiResult<Class> {
    let service = state.classes();
    let existing = service.get(id).await?;
    user.ensure_access(&existing.tenant, state.elevated_roles())?;

    Ok(ApiResponse::success(service.update(id, patch).await?))
}

/// DELETE /api/classes/:id - refused while students are enrolled
pub async fn class_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let service = state.classes();
    let existing = service.get(id).await?;
    user.ensure_access(&existing.tenant, state.elevated_roles())?;

    service.delete(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// POST /api/classes/:id/recount - refresh `studentCount` from enrolments
pub async fn class_recount(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Class> {
    let service = state.classes();
    let existing = service.get(id).await?;
    user.ensure_access(&existing.tenant, state.elevated_roles())?;

    Ok(ApiResponse::success(service.recount(id).await?))
}

/// GET /api/classes/:id/lineage - the promotion chain through this class
pub async fn class_lineage(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<LineageView> {
    let class = state.classes().get(id).await?;
    user.ensure_access(&class.tenant, state.elevated_roles())?;

    Ok(ApiResponse::success(state.orchestrator().lineage(id).await?))
}
