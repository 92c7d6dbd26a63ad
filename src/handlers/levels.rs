// handlers/levels.rs - academic levels and class streams

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{AcademicLevel, ClassStream};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{LevelInput, StreamInput};

/// POST /api/academic-levels - create a level (elevated roles only)
///
/// Levels are shared by all tenants and cannot be edited once written.
pub async fn level_create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<LevelInput>,
) -> ApiResult<AcademicLevel> {
    if !user.has_any_role(state.elevated_roles()) {
        return Err(ApiError::forbidden("Only administrators may define academic levels"));
    }
    let level = state.levels().create_level(input).await?;
    Ok(ApiResponse::created(level))
}

/// GET /api/academic-levels/:id
pub async fn level_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<AcademicLevel> {
    Ok(ApiResponse::success(state.levels().get_level(id).await?))
}

/// POST /api/streams
pub async fn stream_create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<StreamInput>,
) -> ApiResult<ClassStream> {
    let tenant = user.write_tenant(input.tenant.as_deref(), state.elevated_roles())?;
    let stream = state.levels().create_stream(tenant, input).await?;
    Ok(ApiResponse::created(stream))
}
