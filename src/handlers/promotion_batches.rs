// handlers/promotion_batches.rs - criteria-based student promotion

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::PromotionBatch;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::PromotionBatchInput;

/// POST /api/promotion-batches
///
/// Expected Input:
/// ```json
/// {
///   "name": "Form 3 to Form 4",
///   "fromAcademicYear": 2025,
///   "toAcademicYear": 2026,
///   "fromLevel": "<level id>",
///   "toLevel": "<level id>",
///   "rules": { "promotionCriteria": "COMBINED" },
///   "students": [{ "student": "<id>", "attendance": 92, "averageScore": 61 }]
/// }
/// ```
///
/// `promotedBy` is the caller.
pub async fn batch_create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<PromotionBatchInput>,
) -> ApiResult<PromotionBatch> {
    let tenant = user.write_tenant(input.tenant.as_deref(), state.elevated_roles())?;
    let batch = state.batches().create(tenant, user.id, input).await?;
    Ok(ApiResponse::created(batch))
}

/// GET /api/promotion-batches/:id
pub async fn batch_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<PromotionBatch> {
    let batch = state.batches().get(id).await?;
    user.ensure_access(&batch.tenant, state.elevated_roles())?;
    Ok(ApiResponse::success(batch))
}
