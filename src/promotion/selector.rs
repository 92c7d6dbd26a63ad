use tracing::{debug, warn};

use super::error::PromotionError;
use crate::database::models::Class;
use crate::database::SchoolStore;
use crate::filter::ClassFilter;

/// Snapshot of promotion candidates for one target year
#[derive(Debug, Clone)]
pub struct Selection {
    pub classes: Vec<Class>,
    /// Candidates matching the filter, including any beyond the cap
    pub total: usize,
    pub truncated: bool,
}

impl Selection {
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.classes.len())
    }
}

/// Fetch up to `limit` classes matching `filter`, reporting how many were left out.
pub async fn select(store: &dyn SchoolStore, filter: &ClassFilter, limit: usize) -> Result<Selection, PromotionError> {
    let total = store.count_classes(filter).await?;
    let classes = store.find_classes(filter, Some(limit)).await?;
    let truncated = total > classes.len();

    debug!("Selector matched {} classes (cap {})", total, limit);
    if truncated {
        warn!(
            "Promotion selection truncated: {} of {} candidate classes returned; re-run to process the rest",
            classes.len(),
            total
        );
    }

    Ok(Selection {
        classes,
        total,
        truncated,
    })
}

/// Classes the annual batch should promote into `target_year`
pub async fn select_candidates(
    store: &dyn SchoolStore,
    target_year: i32,
    tenant: Option<String>,
    limit: usize,
) -> Result<Selection, PromotionError> {
    let filter = ClassFilter::promotion_candidates(target_year).tenant(tenant);
    select(store, &filter, limit).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::PromotionStatus;
    use crate::database::MemoryStore;
    use uuid::Uuid;

    async fn seed(store: &MemoryStore, tenant: &str, year: i32, n: usize) {
        for i in 0..n {
            let mut class = Class::new(tenant, year, Uuid::new_v4());
            class.class_code = format!("CLS-{}-{}-{}", tenant, year, i);
            class.class_name = format!("Form{}/{}", i + 1, year);
            class.promotion_status = PromotionStatus::Ready;
            store.create_class(class).await.unwrap();
        }
    }

    #[tokio::test]
    async fn cap_is_reported_not_silent() {
        let store = MemoryStore::new();
        seed(&store, "school-a", 2024, 5).await;

        let selection = select_candidates(&store, 2025, None, 3).await.unwrap();
        assert_eq!(selection.classes.len(), 3);
        assert_eq!(selection.total, 5);
        assert!(selection.truncated);
        assert_eq!(selection.remaining(), 2);
    }

    #[tokio::test]
    async fn tenant_filter_narrows_selection() {
        let store = MemoryStore::new();
        seed(&store, "school-a", 2024, 2).await;
        seed(&store, "school-b", 2024, 1).await;

        let selection = select_candidates(&store, 2025, Some("school-b".into()), 1000).await.unwrap();
        assert_eq!(selection.total, 1);
        assert!(!selection.truncated);
        assert!(selection.classes.iter().all(|c| c.tenant == "school-b"));
    }
}
