// handlers/mod.rs - HTTP handlers
//
// Public (no auth): /, /health
// Protected (bearer JWT): promotion actions and /api/* records

pub mod classes;
pub mod exams;
pub mod levels;
pub mod promotion;
pub mod promotion_batches;
pub mod public;
pub mod students;

use serde::Deserialize;

/// Optional `{year, tenant}` body shared by the promotion actions
#[derive(Debug, Default, Deserialize)]
pub struct YearTenantRequest {
    pub year: Option<i32>,
    pub tenant: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TenantQuery {
    pub tenant: Option<String>,
}
