//! Class lineage: the chain of classes one cohort moves through, linked by
//! `previous_class` / `next_class` ids.

use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use super::error::PromotionError;
use crate::database::models::{Class, Lineage, PromotionStatus};
use crate::database::SchoolStore;

/// Root of the chain `class` belongs to
pub fn original_of(class: &Class) -> Uuid {
    class.lineage.original_class.unwrap_or(class.id)
}

pub fn next_generation(class: &Class) -> i32 {
    class.lineage.generation.max(1) + 1
}

/// Lineage for a class created as the successor of `source`
pub fn successor_lineage(source: &Class) -> Lineage {
    Lineage {
        original_class: Some(original_of(source)),
        previous_class: Some(source.id),
        next_class: None,
        generation: next_generation(source),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageEntry {
    pub id: Uuid,
    pub class_code: String,
    pub class_name: String,
    pub academic_year: i32,
    pub generation: i32,
    pub promotion_status: PromotionStatus,
    pub is_active: bool,
}

impl From<&Class> for LineageEntry {
    fn from(class: &Class) -> Self {
        Self {
            id: class.id,
            class_code: class.class_code.clone(),
            class_name: class.class_name.clone(),
            academic_year: class.academic_year,
            generation: class.lineage.generation,
            promotion_status: class.promotion_status,
            is_active: class.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageView {
    pub class_id: Uuid,
    pub original_class: Uuid,
    /// Root first, newest successor last
    pub chain: Vec<LineageEntry>,
    pub consistent: bool,
    pub problems: Vec<String>,
}

/// Load the whole chain around `class_id` and check its invariants.
pub async fn walk(store: &dyn SchoolStore, class_id: Uuid) -> Result<LineageView, PromotionError> {
    let start = store
        .find_class(class_id)
        .await?
        .ok_or(PromotionError::ClassNotFound(class_id))?;

    let mut problems = Vec::new();
    let mut seen: HashSet<Uuid> = HashSet::from([start.id]);

    let mut backwards: Vec<Class> = Vec::new();
    let mut cursor = start.lineage.previous_class;
    while let Some(id) = cursor {
        if !seen.insert(id) {
            problems.push(format!("cycle through class {}", id));
            break;
        }
        match store.find_class(id).await? {
            Some(class) => {
                cursor = class.lineage.previous_class;
                backwards.push(class);
            }
            None => {
                problems.push(format!("previous class {} is missing", id));
                break;
            }
        }
    }

    let mut chain: Vec<Class> = backwards.into_iter().rev().collect();
    chain.push(start.clone());

    let mut cursor = start.lineage.next_class;
    while let Some(id) = cursor {
        if !seen.insert(id) {
            problems.push(format!("cycle through class {}", id));
            break;
        }
        match store.find_class(id).await? {
            Some(class) => {
                cursor = class.lineage.next_class;
                chain.push(class);
            }
            None => {
                problems.push(format!("next class {} is missing", id));
                break;
            }
        }
    }

    problems.extend(verify(&chain));

    let original_class = chain.first().map(|c| c.id).unwrap_or(start.id);
    Ok(LineageView {
        class_id,
        original_class,
        chain: chain.iter().map(LineageEntry::from).collect(),
        consistent: problems.is_empty(),
        problems,
    })
}

/// Invariant violations in an ordered chain (root first)
pub fn verify(chain: &[Class]) -> Vec<String> {
    let mut problems = Vec::new();
    let Some(root) = chain.first() else {
        return problems;
    };

    if root.lineage.original_class.is_some_and(|id| id != root.id) {
        problems.push(format!("root {} points at another original class", root.class_name));
    }

    for pair in chain.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.lineage.generation != prev.lineage.generation + 1 {
            problems.push(format!(
                "generation jumps from {} ({}) to {} ({})",
                prev.lineage.generation, prev.class_name, next.lineage.generation, next.class_name
            ));
        }
        if original_of(next) != root.id {
            problems.push(format!("{} does not share the chain's original class", next.class_name));
        }
        if prev.lineage.next_class != Some(next.id) || next.lineage.previous_class != Some(prev.id) {
            problems.push(format!("{} and {} are not linked both ways", prev.class_name, next.class_name));
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_of(n: usize) -> Vec<Class> {
        let mut chain: Vec<Class> = Vec::new();
        for i in 0..n {
            let mut class = Class::new("school-a", 2020 + i as i32, Uuid::new_v4());
            class.class_name = format!("Form{}/{}", i + 1, 2020 + i);
            if let Some(prev) = chain.last_mut() {
                class.lineage = successor_lineage(prev);
                prev.lineage.next_class = Some(class.id);
            }
            chain.push(class);
        }
        chain
    }

    #[test]
    fn successor_carries_root_and_generation() {
        let chain = chain_of(3);
        assert_eq!(chain[2].lineage.generation, 3);
        assert_eq!(chain[2].lineage.original_class, Some(chain[0].id));
        assert_eq!(chain[2].lineage.previous_class, Some(chain[1].id));
        assert!(verify(&chain).is_empty());
    }

    #[test]
    fn detects_generation_gap_and_foreign_root() {
        let mut chain = chain_of(3);
        chain[2].lineage.generation = 5;
        chain[1].lineage.original_class = Some(Uuid::new_v4());
        let problems = verify(&chain);
        assert!(problems.iter().any(|p| p.contains("generation jumps")));
        assert!(problems.iter().any(|p| p.contains("original class")));
    }

    #[test]
    fn zero_generation_counts_as_original() {
        let mut root = Class::new("school-a", 2024, Uuid::new_v4());
        root.lineage.generation = 0;
        assert_eq!(next_generation(&root), 2);
        assert_eq!(original_of(&root), root.id);
    }
}
