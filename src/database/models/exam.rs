use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::AcademicSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Term {
    #[serde(rename = "TERM_1")]
    Term1,
    #[serde(rename = "TERM_2")]
    Term2,
    #[serde(rename = "TERM_3")]
    Term3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamType {
    BeginningOfTerm,
    Midterm,
    #[serde(rename = "MIDTERM_2")]
    Midterm2,
    #[serde(rename = "MIDTERM_3")]
    Midterm3,
    #[default]
    EndTerm,
    ContinuousAssessment,
    Practical,
    Project,
    Other,
}

/// Subject relationship. Subjects live in per-system collections, so the
/// reference carries which system it points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRef {
    pub id: Uuid,
    pub academic_system: AcademicSystem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: Uuid,
    pub tenant: String,
    pub exam_name: String,
    pub exam_code: Option<String>,
    pub academic_year: i32,
    pub term: Term,
    pub exam_type: ExamType,
    pub subject: SubjectRef,
    pub class_id: Uuid,
    pub max_score: f64,
}
