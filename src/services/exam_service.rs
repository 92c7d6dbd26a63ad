use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::ServiceError;
use crate::database::models::{Exam, ExamResult, ExamType, PaperScore, ResultStatus, SubjectRef, Term};
use crate::database::SchoolStore;
use crate::types::{deref_opt, Ref};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamInput {
    pub tenant: Option<String>,
    pub exam_name: String,
    pub exam_code: Option<String>,
    pub academic_year: i32,
    pub term: Term,
    #[serde(default)]
    pub exam_type: ExamType,
    pub subject: SubjectRef,
    pub class_id: Ref,
    pub max_score: Option<f64>,
}

/// Exam result as submitted. Computed fields (`percentage`, `grade`,
/// `gradePoints`) are not part of the input and are ignored if sent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultInput {
    pub id: Option<Uuid>,
    pub tenant: Option<String>,
    pub exam: Ref,
    pub student: Ref,
    pub subject: Option<SubjectRef>,
    pub class_id: Option<Ref>,
    pub teacher: Option<Ref>,
    pub total_marks: Option<f64>,
    pub max_score: Option<f64>,
    #[serde(default)]
    pub paper_scores: Vec<PaperScore>,
    pub remarks: Option<String>,
    #[serde(default)]
    pub status: ResultStatus,
    #[serde(default)]
    pub is_absent: bool,
    #[serde(default)]
    pub is_remarked: bool,
    pub remark_date: Option<NaiveDate>,
}

pub struct ExamService {
    store: Arc<dyn SchoolStore>,
}

impl ExamService {
    pub fn new(store: Arc<dyn SchoolStore>) -> Self {
        Self { store }
    }

    pub async fn create_exam(&self, tenant: String, input: ExamInput) -> Result<Exam, ServiceError> {
        if input.exam_name.trim().is_empty() {
            return Err(ServiceError::Validation("examName is required".into()));
        }
        let max_score = input.max_score.unwrap_or(100.0);
        if max_score.is_nan() || max_score <= 0.0 {
            return Err(ServiceError::Validation("maxScore must be positive".into()));
        }

        let class = self.store.get_class(input.class_id.id()).await?;
        if class.tenant != tenant {
            return Err(ServiceError::Validation("Class belongs to another tenant".into()));
        }

        let exam = Exam {
            id: Uuid::new_v4(),
            tenant,
            exam_name: input.exam_name.trim().to_string(),
            exam_code: input.exam_code,
            academic_year: input.academic_year,
            term: input.term,
            exam_type: input.exam_type,
            subject: input.subject,
            class_id: class.id,
            max_score,
        };
        Ok(self.store.create_exam(exam).await?)
    }

    /// Insert or replace a result, recomputing its grade from the marks.
    pub async fn save_result(&self, tenant: String, input: ExamResultInput) -> Result<ExamResult, ServiceError> {
        let exam_id = input.exam.id();
        let exam = self
            .store
            .find_exam(exam_id)
            .await?
            .ok_or_else(|| ServiceError::Validation(format!("Exam {} does not exist", exam_id)))?;
        if exam.tenant != tenant {
            return Err(ServiceError::Validation("Exam belongs to another tenant".into()));
        }

        let now = Utc::now();
        let mut result = ExamResult {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            tenant,
            exam: exam.id,
            student: input.student.id(),
            subject: input.subject,
            class_id: deref_opt(&input.class_id).or(Some(exam.class_id)),
            teacher: deref_opt(&input.teacher),
            total_marks: input.total_marks,
            max_score: input.max_score.or(Some(exam.max_score)),
            percentage: None,
            grade: None,
            grade_points: None,
            paper_scores: input.paper_scores,
            remarks: input.remarks,
            status: input.status,
            is_absent: input.is_absent,
            is_remarked: input.is_remarked,
            remark_date: input.remark_date,
            created_at: now,
            updated_at: now,
        };

        if let Some(existing) = self.store.find_exam_result(result.id).await? {
            if existing.tenant != result.tenant {
                return Err(ServiceError::Validation("Result belongs to another tenant".into()));
            }
        }

        let system = result.academic_system(Some(&exam));
        result.recompute(system)?;
        debug!(
            "Graded result {} under {}: {:?} ({:?})",
            result.id, system, result.grade, result.percentage
        );

        Ok(self.store.save_exam_result(result).await?)
    }

    pub async fn get_result(&self, id: Uuid) -> Result<ExamResult, ServiceError> {
        self.store
            .find_exam_result(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("exam result {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{AcademicLevel, Class};
    use crate::database::MemoryStore;
    use crate::grading::Grade;
    use crate::types::AcademicSystem;
    use serde_json::json;

    async fn exam(store: &Arc<MemoryStore>, system: AcademicSystem) -> Exam {
        let level = store
            .create_level(AcademicLevel::new("Grade 7", system, 7))
            .await
            .unwrap();
        let mut class = Class::new("school-a", 2025, level.id);
        class.class_code = format!("CLS-2025-{}", system);
        class.class_name = format!("Grade7/2025-{}", system);
        let class = store.create_class(class).await.unwrap();

        let svc = ExamService::new(store.clone());
        let input: ExamInput = serde_json::from_value(json!({
            "examName": "Science End Term",
            "academicYear": 2025,
            "term": "TERM_1",
            "subject": { "id": Uuid::new_v4(), "academicSystem": system },
            "classId": class.id,
            "maxScore": 50
        }))
        .unwrap();
        svc.create_exam("school-a".into(), input).await.unwrap()
    }

    #[tokio::test]
    async fn client_grade_is_replaced_by_computed_one() {
        let store = Arc::new(MemoryStore::new());
        let exam = exam(&store, AcademicSystem::EightFourFour).await;
        let svc = ExamService::new(store.clone());

        let input: ExamResultInput = serde_json::from_value(json!({
            "exam": exam.id,
            "student": Uuid::new_v4(),
            "totalMarks": 40,
            "percentage": 12,
            "grade": "E"
        }))
        .unwrap();
        let saved = svc.save_result("school-a".into(), input).await.unwrap();

        assert_eq!(saved.max_score, Some(50.0));
        assert_eq!(saved.percentage, Some(80.0));
        assert_eq!(saved.grade, Some(Grade::A));
        assert_eq!(saved.grade_points, Some(12));
    }

    #[tokio::test]
    async fn exam_subject_system_selects_the_table() {
        let store = Arc::new(MemoryStore::new());
        let exam = exam(&store, AcademicSystem::Cbc).await;
        let svc = ExamService::new(store.clone());

        let input: ExamResultInput = serde_json::from_value(json!({
            "exam": { "id": exam.id },
            "student": Uuid::new_v4(),
            "subject": { "id": Uuid::new_v4(), "academicSystem": "EIGHT_FOUR_FOUR" },
            "totalMarks": 36,
            "maxScore": 40
        }))
        .unwrap();
        let saved = svc.save_result("school-a".into(), input).await.unwrap();
        assert_eq!(saved.grade, Some(Grade::ExceedingExpectations));
    }

    #[tokio::test]
    async fn marks_above_maximum_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let exam = exam(&store, AcademicSystem::EightFourFour).await;
        let svc = ExamService::new(store.clone());

        let input: ExamResultInput = serde_json::from_value(json!({
            "exam": exam.id,
            "student": Uuid::new_v4(),
            "totalMarks": 60
        }))
        .unwrap();
        assert!(matches!(
            svc.save_result("school-a".into(), input).await,
            Err(ServiceError::Grading(_))
        ));
    }
}
