use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::ServiceError;
use crate::database::models::{
    AcademicLevel, BatchStatus, PromotionBatch, PromotionRules, StudentOutcome, StudentPerformance, StudentPromotion,
    MAX_BATCH_YEAR, MIN_BATCH_YEAR,
};
use crate::database::SchoolStore;
use crate::promotion::Clock;
use crate::types::Ref;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionBatchInput {
    pub tenant: Option<String>,
    pub name: String,
    pub from_academic_year: i32,
    pub to_academic_year: i32,
    pub from_level: Ref,
    pub to_level: Ref,
    pub promotion_date: Option<NaiveDate>,
    #[serde(default)]
    pub rules: PromotionRules,
    #[serde(default)]
    pub students: Vec<StudentPerformance>,
}

/// Criteria-based promotion of individual students between two adjacent levels
pub struct PromotionBatchService {
    store: Arc<dyn SchoolStore>,
    clock: Arc<dyn Clock>,
}

impl PromotionBatchService {
    pub fn new(store: Arc<dyn SchoolStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Evaluate every submitted student and store the completed batch.
    /// `promoted_by` is always the caller.
    pub async fn create(
        &self,
        tenant: String,
        promoted_by: Uuid,
        input: PromotionBatchInput,
    ) -> Result<PromotionBatch, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("name is required".into()));
        }
        for year in [input.from_academic_year, input.to_academic_year] {
            if !(MIN_BATCH_YEAR..=MAX_BATCH_YEAR).contains(&year) {
                return Err(ServiceError::Validation(format!(
                    "Academic year {} is outside {}-{}",
                    year, MIN_BATCH_YEAR, MAX_BATCH_YEAR
                )));
            }
        }
        if input.to_academic_year != input.from_academic_year + 1 {
            return Err(ServiceError::Validation(
                "toAcademicYear must be exactly one year after fromAcademicYear".into(),
            ));
        }

        let (from_level, to_level) = self.adjacent_levels(&input.from_level, &input.to_level).await?;

        let student_details = input
            .students
            .iter()
            .map(|performance| {
                let status = input.rules.evaluate(performance, to_level.is_final);
                let to_academic_level = match status {
                    StudentOutcome::Promoted | StudentOutcome::Graduated | StudentOutcome::Conditional => {
                        Some(to_level.id)
                    }
                    StudentOutcome::Retained | StudentOutcome::Discontinued => None,
                };
                StudentPromotion {
                    student: performance.student,
                    from_academic_level: from_level.id,
                    to_academic_level,
                    status,
                    attendance: performance.attendance,
                    average_score: performance.average_score,
                    failed_subjects: performance.failed_subjects,
                }
            })
            .collect();

        let now = self.clock.now();
        let mut batch = PromotionBatch {
            id: Uuid::new_v4(),
            tenant,
            name: input.name.trim().to_string(),
            from_academic_year: input.from_academic_year,
            to_academic_year: input.to_academic_year,
            from_level: from_level.id,
            to_level: to_level.id,
            promotion_date: input.promotion_date.unwrap_or_else(|| now.date_naive()),
            promoted_by,
            total_students: 0,
            promoted_count: 0,
            retained_count: 0,
            status: BatchStatus::Completed,
            completed_at: Some(now),
            rules: input.rules,
            student_details,
        };
        batch.tally();

        let batch = self.store.create_promotion_batch(batch).await?;
        info!(
            "Promotion batch '{}' for {}: {} of {} promoted, {} retained",
            batch.name, batch.tenant, batch.promoted_count, batch.total_students, batch.retained_count
        );
        Ok(batch)
    }

    pub async fn get(&self, id: Uuid) -> Result<PromotionBatch, ServiceError> {
        self.store
            .find_promotion_batch(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("promotion batch {}", id)))
    }

    async fn adjacent_levels(&self, from: &Ref, to: &Ref) -> Result<(AcademicLevel, AcademicLevel), ServiceError> {
        let invalid = || ServiceError::Validation("Invalid academic levels provided".into());
        let from_level = self.store.find_level(from.id()).await?.ok_or_else(invalid)?;
        let to_level = self.store.find_level(to.id()).await?.ok_or_else(invalid)?;

        if from_level.academic_system != to_level.academic_system {
            return Err(ServiceError::Validation(
                "Cannot promote between different academic systems".into(),
            ));
        }
        if to_level.level_order != from_level.level_order + 1 {
            return Err(ServiceError::Validation(
                "toLevel must be the next academic level after fromLevel".into(),
            ));
        }
        Ok((from_level, to_level))
    }
}
