use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_BATCH_YEAR: i32 = 2000;
pub const MAX_BATCH_YEAR: i32 = 2100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    RolledBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionCriteria {
    #[default]
    Academic,
    Attendance,
    Behavioral,
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentOutcome {
    Promoted,
    Retained,
    Conditional,
    Graduated,
    Discontinued,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromotionRules {
    pub promotion_criteria: PromotionCriteria,
    pub min_attendance: f64,
    pub min_average_score: f64,
    pub max_failed_subjects: u32,
}

impl Default for PromotionRules {
    fn default() -> Self {
        Self {
            promotion_criteria: PromotionCriteria::Academic,
            min_attendance: 75.0,
            min_average_score: 40.0,
            max_failed_subjects: 2,
        }
    }
}

/// Year-end record for one student, as submitted with a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPerformance {
    pub student: Uuid,
    pub attendance: f64,
    pub average_score: f64,
    #[serde(default)]
    pub failed_subjects: u32,
    #[serde(default = "conduct_default")]
    pub conduct_cleared: bool,
    #[serde(default)]
    pub discontinued: bool,
}

fn conduct_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPromotion {
    pub student: Uuid,
    pub from_academic_level: Uuid,
    pub to_academic_level: Option<Uuid>,
    pub status: StudentOutcome,
    pub attendance: f64,
    pub average_score: f64,
    pub failed_subjects: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionBatch {
    pub id: Uuid,
    pub tenant: String,
    pub name: String,
    pub from_academic_year: i32,
    pub to_academic_year: i32,
    pub from_level: Uuid,
    pub to_level: Uuid,
    pub promotion_date: NaiveDate,
    pub promoted_by: Uuid,
    pub total_students: i32,
    pub promoted_count: i32,
    pub retained_count: i32,
    pub status: BatchStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub rules: PromotionRules,
    pub student_details: Vec<StudentPromotion>,
}

impl PromotionRules {
    fn academic_pass(&self, p: &StudentPerformance) -> bool {
        p.average_score >= self.min_average_score && p.failed_subjects <= self.max_failed_subjects
    }

    fn attendance_pass(&self, p: &StudentPerformance) -> bool {
        p.attendance >= self.min_attendance
    }

    /// Decide one student's outcome. `to_level_is_final` turns a promotion
    /// into the final level into a graduation.
    pub fn evaluate(&self, p: &StudentPerformance, to_level_is_final: bool) -> StudentOutcome {
        if p.discontinued {
            return StudentOutcome::Discontinued;
        }

        let outcome = match self.promotion_criteria {
            PromotionCriteria::Academic => {
                if self.academic_pass(p) {
                    StudentOutcome::Promoted
                } else if p.average_score >= self.min_average_score {
                    StudentOutcome::Conditional
                } else {
                    StudentOutcome::Retained
                }
            }
            PromotionCriteria::Attendance => {
                if self.attendance_pass(p) {
                    StudentOutcome::Promoted
                } else {
                    StudentOutcome::Retained
                }
            }
            PromotionCriteria::Behavioral => {
                if p.conduct_cleared {
                    StudentOutcome::Promoted
                } else {
                    StudentOutcome::Conditional
                }
            }
            PromotionCriteria::Combined => match (self.academic_pass(p), self.attendance_pass(p)) {
                (true, true) => StudentOutcome::Promoted,
                (false, false) => StudentOutcome::Retained,
                _ => StudentOutcome::Conditional,
            },
        };

        if outcome == StudentOutcome::Promoted && to_level_is_final {
            StudentOutcome::Graduated
        } else {
            outcome
        }
    }
}

impl PromotionBatch {
    /// Recompute the aggregate counters from `student_details`
    pub fn tally(&mut self) {
        self.total_students = self.student_details.len() as i32;
        self.promoted_count = self
            .student_details
            .iter()
            .filter(|d| matches!(d.status, StudentOutcome::Promoted | StudentOutcome::Graduated))
            .count() as i32;
        self.retained_count = self
            .student_details
            .iter()
            .filter(|d| d.status == StudentOutcome::Retained)
            .count() as i32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perf(attendance: f64, average: f64, failed: u32) -> StudentPerformance {
        StudentPerformance {
            student: Uuid::new_v4(),
            attendance,
            average_score: average,
            failed_subjects: failed,
            conduct_cleared: true,
            discontinued: false,
        }
    }

    #[test]
    fn academic_rules() {
        let rules = PromotionRules::default();
        assert_eq!(rules.evaluate(&perf(50.0, 55.0, 1), false), StudentOutcome::Promoted);
        assert_eq!(rules.evaluate(&perf(50.0, 55.0, 3), false), StudentOutcome::Conditional);
        assert_eq!(rules.evaluate(&perf(90.0, 30.0, 0), false), StudentOutcome::Retained);
    }

    #[test]
    fn combined_rules_need_both_for_promotion() {
        let rules = PromotionRules {
            promotion_criteria: PromotionCriteria::Combined,
            ..Default::default()
        };
        assert_eq!(rules.evaluate(&perf(80.0, 60.0, 0), false), StudentOutcome::Promoted);
        assert_eq!(rules.evaluate(&perf(60.0, 60.0, 0), false), StudentOutcome::Conditional);
        assert_eq!(rules.evaluate(&perf(60.0, 20.0, 5), false), StudentOutcome::Retained);
    }

    #[test]
    fn discontinued_and_graduation_override() {
        let rules = PromotionRules::default();
        let mut gone = perf(100.0, 100.0, 0);
        gone.discontinued = true;
        assert_eq!(rules.evaluate(&gone, false), StudentOutcome::Discontinued);
        assert_eq!(rules.evaluate(&perf(80.0, 70.0, 0), true), StudentOutcome::Graduated);
        assert_eq!(rules.evaluate(&perf(80.0, 10.0, 0), true), StudentOutcome::Retained);
    }

    #[test]
    fn rules_fill_missing_fields_with_defaults() {
        let rules: PromotionRules =
            serde_json::from_value(serde_json::json!({ "promotionCriteria": "ATTENDANCE" })).unwrap();
        assert_eq!(rules.promotion_criteria, PromotionCriteria::Attendance);
        assert_eq!(rules.min_attendance, 75.0);
        assert_eq!(rules.max_failed_subjects, 2);
    }
}
