use async_trait::async_trait;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{AcademicLevel, Class, ClassStream, Exam, ExamResult, PromotionBatch, Student};
use crate::filter::ClassFilter;

/// Document storage used by the services and the promotion engine.
///
/// Implementations must enforce, at write time:
/// - unique `class_code` and `class_name`
/// - at most one class per `(lineage.previous_class, academic_year)`
///
/// and report violations as `DatabaseError::Conflict`. `update_class` never
/// changes a stored `class_code`.
#[async_trait]
pub trait SchoolStore: Send + Sync {
    async fn find_classes(&self, filter: &ClassFilter, limit: Option<usize>) -> Result<Vec<Class>, DatabaseError>;
    async fn count_classes(&self, filter: &ClassFilter) -> Result<usize, DatabaseError>;
    async fn find_class(&self, id: Uuid) -> Result<Option<Class>, DatabaseError>;
    async fn create_class(&self, class: Class) -> Result<Class, DatabaseError>;
    async fn update_class(&self, class: Class) -> Result<Class, DatabaseError>;
    async fn delete_class(&self, id: Uuid) -> Result<(), DatabaseError>;

    async fn find_level(&self, id: Uuid) -> Result<Option<AcademicLevel>, DatabaseError>;
    async fn create_level(&self, level: AcademicLevel) -> Result<AcademicLevel, DatabaseError>;

    async fn find_stream(&self, id: Uuid) -> Result<Option<ClassStream>, DatabaseError>;
    async fn create_stream(&self, stream: ClassStream) -> Result<ClassStream, DatabaseError>;

    async fn create_student(&self, student: Student) -> Result<Student, DatabaseError>;
    async fn count_enrolled(&self, class_id: Uuid) -> Result<i64, DatabaseError>;

    async fn find_exam(&self, id: Uuid) -> Result<Option<Exam>, DatabaseError>;
    async fn create_exam(&self, exam: Exam) -> Result<Exam, DatabaseError>;

    async fn find_exam_result(&self, id: Uuid) -> Result<Option<ExamResult>, DatabaseError>;
    /// Insert or replace by id
    async fn save_exam_result(&self, result: ExamResult) -> Result<ExamResult, DatabaseError>;

    async fn find_promotion_batch(&self, id: Uuid) -> Result<Option<PromotionBatch>, DatabaseError>;
    async fn create_promotion_batch(&self, batch: PromotionBatch) -> Result<PromotionBatch, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;

    /// Like `find_class` but a missing record is an error
    async fn get_class(&self, id: Uuid) -> Result<Class, DatabaseError> {
        self.find_class(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("class {}", id)))
    }

    async fn get_level(&self, id: Uuid) -> Result<AcademicLevel, DatabaseError> {
        self.find_level(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("academic level {}", id)))
    }
}
