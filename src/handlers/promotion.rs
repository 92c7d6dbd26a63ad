// handlers/promotion.rs - annual, manual and preview promotion actions
//
// These three return their own documented shapes rather than the
// `{success, data}` envelope used by /api/*.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::{TenantQuery, YearTenantRequest};
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::promotion::{PromotionError, PromotionPreview, PromotionSummary, SinglePromotion};

/// POST /annual-promotion - promote every eligible class into the next year
///
/// Expected Input (all optional):
/// ```json
/// { "year": 2026, "tenant": "school-a" }
/// ```
///
/// Gated by the promotion guard: outside the calendar window only elevated
/// callers may run it (403 otherwise).
pub async fn annual_promotion(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Option<Json<YearTenantRequest>>,
) -> Result<Json<PromotionSummary>, ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();

    state.guard.check(&user, state.clock.today())?;
    let tenant = user.scope_tenant(request.tenant.as_deref(), state.elevated_roles())?;

    info!("Annual promotion requested by {} ({})", user.name, user.id);
    let summary = state.orchestrator().run_annual_promotion(request.year, tenant).await?;
    Ok(Json(summary))
}

/// POST /promote-class/:id - promote one class into next calendar year
pub async fn promote_class(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SinglePromotion>, ApiError> {
    let class = state
        .store
        .find_class(id)
        .await?
        .ok_or(PromotionError::ClassNotFound(id))?;
    user.ensure_access(&class.tenant, state.elevated_roles())?;

    let promotion = state.orchestrator().promote_single(id).await?;
    Ok(Json(promotion))
}

/// GET /promotion-preview[?tenant=] - classes the next batch would pick up
pub async fn promotion_preview(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<PromotionPreview>, ApiError> {
    let tenant = user.scope_tenant(query.tenant.as_deref(), state.elevated_roles())?;
    let preview = state.orchestrator().preview(tenant).await?;
    Ok(Json(preview))
}

/// POST /promotion-readiness - mark qualifying `active` classes `ready`
///
/// `year` defaults to the current calendar year.
pub async fn promotion_readiness(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Option<Json<YearTenantRequest>>,
) -> ApiResult<Value> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let tenant = user.scope_tenant(request.tenant.as_deref(), state.elevated_roles())?;

    let orchestrator = state.orchestrator();
    let year = request.year.unwrap_or_else(|| orchestrator.current_year());
    let updated = orchestrator.refresh_readiness(year, tenant).await?;

    Ok(ApiResponse::success(json!({ "year": year, "updated": updated })))
}
