// handlers/students.rs - POST /api/students

use axum::{extract::State, Extension, Json};

use crate::app::AppState;
use crate::database::models::Student;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::StudentInput;

/// Enrol a student; the class `studentCount` is recounted afterwards.
pub async fn student_create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<StudentInput>,
) -> ApiResult<Student> {
    let tenant = user.write_tenant(input.tenant.as_deref(), state.elevated_roles())?;
    let student = state.classes().enrol(tenant, input).await?;
    Ok(ApiResponse::created(student))
}
