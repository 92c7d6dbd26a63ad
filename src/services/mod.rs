//! Record-level business rules applied before anything reaches the store.

pub mod class_service;
pub mod exam_service;
pub mod level_service;
pub mod promotion_batch_service;

use thiserror::Error;

use crate::database::DatabaseError;
use crate::grading::GradingError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Grading(#[from] GradingError),

    #[error(transparent)]
    Store(DatabaseError),
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => ServiceError::NotFound(what),
            DatabaseError::Conflict(constraint) => ServiceError::Conflict(conflict_message(&constraint)),
            other => ServiceError::Store(other),
        }
    }
}

fn conflict_message(constraint: &str) -> String {
    match constraint {
        "classes_class_code_key" => "A class with this code already exists".to_string(),
        "classes_tenant_class_name_key" => "A class with this name already exists".to_string(),
        "classes_one_successor_per_year" => "This class already has a successor for that year".to_string(),
        "exams_exam_code_key" => "An exam with this code already exists".to_string(),
        other => format!("Record violates {}", other),
    }
}

pub use class_service::{ClassInput, ClassPatch, ClassService, StudentInput};
pub use exam_service::{ExamInput, ExamResultInput, ExamService};
pub use level_service::{LevelInput, LevelService, StreamInput};
pub use promotion_batch_service::{PromotionBatchInput, PromotionBatchService};
