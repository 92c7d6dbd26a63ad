use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::PromotionError;
use super::guard::Clock;
use super::lineage::{self, LineageView};
use super::promoter::{PromotionOutcome, Promoter};
use super::selector;
use crate::database::models::{Class, PromotionStatus};
use crate::database::SchoolStore;
use crate::filter::ClassFilter;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotedClass {
    pub from_class: Uuid,
    pub from_class_name: String,
    pub to_class: Uuid,
    pub to_class_name: String,
    pub class_code: String,
    pub generation: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedClass {
    pub class_id: Uuid,
    pub class_name: String,
    pub successor: Option<Uuid>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionFailure {
    pub class_id: Uuid,
    pub class_name: String,
    pub error: String,
}

/// Outcome of one annual batch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionSummary {
    pub target_year: i32,
    pub tenant: Option<String>,
    pub readied: usize,
    pub total: usize,
    pub promoted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub promoted_classes: Vec<PromotedClass>,
    pub skipped_classes: Vec<SkippedClass>,
    pub failures: Vec<PromotionFailure>,
    pub truncated: bool,
    pub remaining: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SinglePromotion {
    pub success: bool,
    pub message: String,
    pub original_class: Class,
    pub promoted_class: Class,
    pub class_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionPreview {
    pub target_year: i32,
    pub eligible_count: usize,
    pub truncated: bool,
    pub classes: Vec<Class>,
}

/// Drives selection and per-class promotion
#[derive(Clone)]
pub struct PromotionOrchestrator {
    store: Arc<dyn SchoolStore>,
    clock: Arc<dyn Clock>,
    selector_limit: usize,
}

impl PromotionOrchestrator {
    pub fn new(store: Arc<dyn SchoolStore>, clock: Arc<dyn Clock>, selector_limit: usize) -> Self {
        Self {
            store,
            clock,
            selector_limit: selector_limit.max(1),
        }
    }

    pub fn current_year(&self) -> i32 {
        self.clock.current_year()
    }

    /// Year a manual promotion or preview targets
    pub fn next_year(&self) -> i32 {
        self.current_year() + 1
    }

    /// Move every `active` class that qualifies for `reference_year` to `ready`.
    pub async fn refresh_readiness(&self, reference_year: i32, tenant: Option<String>) -> Result<usize, PromotionError> {
        let filter = ClassFilter::new()
            .tenant(tenant)
            .year_before(reference_year)
            .status(PromotionStatus::Active)
            .eligible(true)
            .final_year(false)
            .active(true);

        let mut updated = 0;
        for mut class in self.store.find_classes(&filter, None).await? {
            if class.apply_readiness(reference_year) {
                self.store.update_class(class).await?;
                updated += 1;
            }
        }

        if updated > 0 {
            info!("Marked {} classes ready for {}", updated, reference_year);
        }
        Ok(updated)
    }

    /// Promote every eligible class into `target_year`.
    ///
    /// Per-class failures are collected in the summary and reset the class to
    /// `active`; only failures outside the per-class loop return `Err`.
    pub async fn run_annual_promotion(
        &self,
        target_year: Option<i32>,
        tenant: Option<String>,
    ) -> Result<PromotionSummary, PromotionError> {
        let started_at = self.clock.now();
        let target_year = target_year.unwrap_or_else(|| self.next_year());
        info!(
            "Annual promotion into {} started (tenant: {})",
            target_year,
            tenant.as_deref().unwrap_or("all")
        );

        // Readiness follows the calendar, not the target: a class of the
        // year that has just started stays `active`.
        let readied = self.refresh_readiness(self.current_year(), tenant.clone()).await?;

        let already_filter = ClassFilter::new()
            .tenant(tenant.clone())
            .year_before(target_year)
            .status(PromotionStatus::Promoted)
            .promoted_in(target_year);
        let already_count = self.store.count_classes(&already_filter).await?;
        let mut skipped_classes: Vec<SkippedClass> = self
            .store
            .find_classes(&already_filter, Some(self.selector_limit))
            .await?
            .into_iter()
            .map(|c| SkippedClass {
                class_id: c.id,
                successor: c.lineage.next_class,
                class_name: c.class_name,
                reason: format!("already promoted to {}", target_year),
            })
            .collect();
        let mut skipped = already_count;

        let selection = selector::select_candidates(&*self.store, target_year, tenant.clone(), self.selector_limit).await?;
        let promoter = Promoter::new(&*self.store);

        let mut promoted_classes = Vec::new();
        let mut failures = Vec::new();

        for class in &selection.classes {
            match promoter.promote(class, target_year).await {
                Ok(PromotionOutcome::Created { source, successor }) => promoted_classes.push(PromotedClass {
                    from_class: source.id,
                    from_class_name: source.class_name,
                    to_class: successor.id,
                    to_class_name: successor.class_name,
                    class_code: successor.class_code,
                    generation: successor.lineage.generation,
                }),
                Ok(PromotionOutcome::AlreadyPromoted { source, successor }) => {
                    skipped += 1;
                    skipped_classes.push(SkippedClass {
                        class_id: source.id,
                        class_name: source.class_name,
                        successor: Some(successor.id),
                        reason: format!("successor {} already exists", successor.class_name),
                    });
                }
                Err(err) => {
                    warn!("Promotion of {} into {} failed: {}", class.class_name, target_year, err);
                    self.reset_failed(class, target_year, &err).await;
                    failures.push(PromotionFailure {
                        class_id: class.id,
                        class_name: class.class_name.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        let finished_at = self.clock.now().max(started_at);
        let summary = PromotionSummary {
            target_year,
            tenant,
            readied,
            total: selection.classes.len() + already_count,
            promoted: promoted_classes.len(),
            skipped,
            failed: failures.len(),
            promoted_classes,
            skipped_classes,
            failures,
            truncated: selection.truncated,
            remaining: selection.remaining(),
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds(),
        };

        info!(
            "Annual promotion into {} finished: {} promoted, {} skipped, {} failed",
            target_year, summary.promoted, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    async fn reset_failed(&self, snapshot: &Class, target_year: i32, err: &PromotionError) {
        let mut class = match self.store.find_class(snapshot.id).await {
            Ok(Some(current)) => current,
            Ok(None) => return,
            Err(e) => {
                error!("Could not reload {} after failed promotion: {}", snapshot.class_name, e);
                return;
            }
        };
        class.reset_for_retry(format!("Promotion to {} failed: {}", target_year, err));
        if let Err(e) = self.store.update_class(class).await {
            error!("Could not reset {} after failed promotion: {}", snapshot.class_name, e);
        }
    }

    /// Promote one class into next calendar year
    pub async fn promote_single(&self, class_id: Uuid) -> Result<SinglePromotion, PromotionError> {
        let class = self
            .store
            .find_class(class_id)
            .await?
            .ok_or(PromotionError::ClassNotFound(class_id))?;

        if class.promotion_status == PromotionStatus::Promoted {
            return Err(PromotionError::AlreadyPromoted {
                class_name: class.class_name,
            });
        }
        if class.is_final_year {
            return Err(PromotionError::FinalYear {
                class_name: class.class_name,
            });
        }

        let target_year = self.next_year();
        let outcome = Promoter::new(&*self.store).promote(&class, target_year).await?;
        let message = match &outcome {
            PromotionOutcome::Created { source, successor } => {
                format!("Promoted {} to {}", source.class_name, successor.class_name)
            }
            PromotionOutcome::AlreadyPromoted { source, successor } => {
                format!("{} was already promoted to {}", source.class_name, successor.class_name)
            }
        };

        let (original_class, promoted_class) = match outcome {
            PromotionOutcome::Created { source, successor } | PromotionOutcome::AlreadyPromoted { source, successor } => {
                (source, successor)
            }
        };

        Ok(SinglePromotion {
            success: true,
            message,
            class_code: promoted_class.class_code.clone(),
            original_class,
            promoted_class,
        })
    }

    /// Read-only view of what the next batch would pick up. Inactive classes
    /// are included so administrators can see them.
    pub async fn preview(&self, tenant: Option<String>) -> Result<PromotionPreview, PromotionError> {
        let target_year = self.next_year();
        let filter = ClassFilter::promotion_candidates(target_year).without_active().tenant(tenant);
        let selection = selector::select(&*self.store, &filter, self.selector_limit).await?;

        Ok(PromotionPreview {
            target_year,
            eligible_count: selection.total,
            truncated: selection.truncated,
            classes: selection.classes,
        })
    }

    pub async fn lineage(&self, class_id: Uuid) -> Result<LineageView, PromotionError> {
        lineage::walk(&*self.store, class_id).await
    }
}
