// handlers/exams.rs - exams and graded results

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Exam, ExamResult};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{ExamInput, ExamResultInput};

/// POST /api/exams
pub async fn exam_create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<ExamInput>,
) -> ApiResult<Exam> {
    let tenant = user.write_tenant(input.tenant.as_deref(), state.elevated_roles())?;
    let exam = state.exams().create_exam(tenant, input).await?;
    Ok(ApiResponse::created(exam))
}

/// POST /api/exam-results - insert or replace a result
///
/// Expected Input:
/// ```json
/// { "exam": "<exam id>", "student": "<student id>", "totalMarks": 40 }
/// ```
///
/// `percentage`, `grade` and `gradePoints` are always recomputed.
pub async fn result_save(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<ExamResultInput>,
) -> ApiResult<ExamResult> {
    let tenant = user.write_tenant(input.tenant.as_deref(), state.elevated_roles())?;
    let result = state.exams().save_result(tenant, input).await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/exam-results/:id
pub async fn result_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<ExamResult> {
    let result = state.exams().get_result(id).await?;
    user.ensure_access(&result.tenant, state.elevated_roles())?;
    Ok(ApiResponse::success(result))
}
