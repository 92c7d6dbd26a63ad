use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::exam::{Exam, SubjectRef};
use crate::grading::{self, Grade, GradingError};
use crate::types::AcademicSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperScore {
    pub paper: Option<String>,
    pub paper_code: Option<String>,
    pub marks_obtained: Option<f64>,
    pub max_marks: Option<f64>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub id: Uuid,
    pub tenant: String,
    pub exam: Uuid,
    pub student: Uuid,
    pub subject: Option<SubjectRef>,
    pub class_id: Option<Uuid>,
    pub teacher: Option<Uuid>,
    pub total_marks: Option<f64>,
    pub max_score: Option<f64>,
    pub percentage: Option<f64>,
    pub grade: Option<Grade>,
    pub grade_points: Option<u8>,
    pub paper_scores: Vec<PaperScore>,
    pub remarks: Option<String>,
    pub status: ResultStatus,
    pub is_absent: bool,
    pub is_remarked: bool,
    pub remark_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExamResult {
    /// System whose grading table applies: the exam's subject wins, then the
    /// result's own subject, then 8-4-4.
    pub fn academic_system(&self, exam: Option<&Exam>) -> AcademicSystem {
        exam.map(|e| e.subject.academic_system)
            .or_else(|| self.subject.map(|s| s.academic_system))
            .unwrap_or_default()
    }

    /// Overwrite the computed score fields from the raw marks.
    ///
    /// Whatever the client put in `percentage`, `grade` and `grade_points` is
    /// discarded first, so only server-derived values are ever persisted.
    pub fn recompute(&mut self, system: AcademicSystem) -> Result<(), GradingError> {
        self.percentage = None;
        self.grade = None;
        self.grade_points = None;

        if let Some(percentage) = grading::percentage(self.total_marks, self.max_score) {
            let graded = grading::grade(percentage, system)?;
            self.percentage = Some(percentage);
            self.grade = Some(graded.grade);
            self.grade_points = Some(graded.points);
        }
        Ok(())
    }
}
