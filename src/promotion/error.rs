use thiserror::Error;
use uuid::Uuid;

use crate::database::DatabaseError;

#[derive(Debug, Error)]
pub enum PromotionError {
    #[error("Class {0} not found")]
    ClassNotFound(Uuid),

    #[error("Academic level {0} not found")]
    LevelNotFound(Uuid),

    #[error("Class {class_name} has no next academic level")]
    NoNextLevel { class_name: String },

    #[error("Class {class_name} is already promoted")]
    AlreadyPromoted { class_name: String },

    #[error("Class {class_name} is in its final year and cannot be promoted")]
    FinalYear { class_name: String },

    #[error("Class {class_id} has {count} successors for {year}")]
    DuplicateSuccessors { class_id: Uuid, year: i32, count: usize },

    #[error("Lineage of class {class_id} is inconsistent: {reason}")]
    BrokenLineage { class_id: Uuid, reason: String },

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] DatabaseError),
}
