use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use super::academic_level::AcademicLevel;
use super::stream::ClassStream;
use crate::types::AcademicSystem;

pub const DEFAULT_CAPACITY: i32 = 50;

/// Where a class stands in the yearly promotion cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromotionStatus {
    #[default]
    Active,
    Ready,
    Promoted,
    Archived,
}

impl PromotionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionStatus::Active => "active",
            PromotionStatus::Ready => "ready",
            PromotionStatus::Promoted => "promoted",
            PromotionStatus::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(PromotionStatus::Active),
            "ready" => Some(PromotionStatus::Ready),
            "promoted" => Some(PromotionStatus::Promoted),
            "archived" => Some(PromotionStatus::Archived),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            PromotionStatus::Active => 0,
            PromotionStatus::Ready => 1,
            PromotionStatus::Promoted => 2,
            PromotionStatus::Archived => 3,
        }
    }

    /// Forward-only ordering. Resets back to `active` go through
    /// `Class::reset_for_retry` instead.
    pub fn can_advance_to(&self, next: PromotionStatus) -> bool {
        next.rank() >= self.rank()
    }
}

impl fmt::Display for PromotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a class inside its promotion chain. Pointers are ids into the
/// class store; nothing here owns another class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lineage {
    pub original_class: Option<Uuid>,
    pub previous_class: Option<Uuid>,
    pub next_class: Option<Uuid>,
    pub generation: i32,
}

impl Default for Lineage {
    fn default() -> Self {
        Self {
            original_class: None,
            previous_class: None,
            next_class: None,
            generation: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: Uuid,
    pub tenant: String,
    pub class_code: String,
    pub class_name: String,
    pub academic_year: i32,
    pub academic_level: Uuid,
    pub next_academic_level: Option<Uuid>,
    pub stream: Option<Uuid>,
    pub capacity: i32,
    pub academic_system: AcademicSystem,
    pub student_count: i32,
    pub class_teacher: Option<Uuid>,
    pub promotion_eligible: bool,
    pub is_final_year: bool,
    pub auto_archive: bool,
    pub promotion_status: PromotionStatus,
    pub last_promoted_year: Option<i32>,
    pub is_active: bool,
    pub remarks: Option<String>,
    pub lineage: Lineage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Class {
    /// New class with the collection defaults applied. Name and code are
    /// filled in by the class service before persistence.
    pub fn new(tenant: impl Into<String>, academic_year: i32, academic_level: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant: tenant.into(),
            class_code: String::new(),
            class_name: String::new(),
            academic_year,
            academic_level,
            next_academic_level: None,
            stream: None,
            capacity: DEFAULT_CAPACITY,
            academic_system: AcademicSystem::default(),
            student_count: 0,
            class_teacher: None,
            promotion_eligible: true,
            is_final_year: false,
            auto_archive: true,
            promotion_status: PromotionStatus::Active,
            last_promoted_year: None,
            is_active: true,
            remarks: None,
            lineage: Lineage::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Lifecycle rule: an active, eligible, non-final class whose year lies
    /// before `reference_year` becomes ready. Returns true when it changed.
    pub fn apply_readiness(&mut self, reference_year: i32) -> bool {
        if self.promotion_status == PromotionStatus::Active
            && self.is_active
            && self.promotion_eligible
            && !self.is_final_year
            && self.academic_year < reference_year
        {
            self.promotion_status = PromotionStatus::Ready;
            return true;
        }
        false
    }

    /// Mark as promoted into `year`, archiving when configured to.
    pub fn mark_promoted(&mut self, year: i32, successor: Uuid) {
        self.promotion_status = PromotionStatus::Promoted;
        self.last_promoted_year = Some(year);
        self.is_active = !self.auto_archive;
        self.lineage.next_class = Some(successor);
        self.updated_at = Utc::now();
    }

    /// Put a class whose promotion failed back into a retryable state.
    pub fn reset_for_retry(&mut self, remark: impl Into<String>) {
        self.promotion_status = PromotionStatus::Active;
        self.remarks = Some(remark.into());
        self.updated_at = Utc::now();
    }

    /// Deterministic code for the class this one promotes into.
    pub fn successor_code(&self, year: i32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.class_code.as_bytes());
        hasher.update(b":");
        hasher.update(year.to_string().as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        format!("CLS-{}-{}", year, hash[..8].to_ascii_uppercase())
    }
}

/// Code for a freshly created class that has no predecessor
pub fn generate_class_code(year: i32, id: Uuid) -> String {
    let simple = id.simple().to_string();
    format!("CLS-{}-{}", year, simple[..8].to_ascii_uppercase())
}

/// `{level}{stream}/{year}`, e.g. `Form1East/2024`
pub fn derive_class_name(level: &AcademicLevel, stream: Option<&ClassStream>, year: i32) -> String {
    let stream_code = stream.map(|s| s.stream_code.as_str()).unwrap_or("");
    format!("{}{}/{}", level.compact_name(), stream_code, year)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(name: &str) -> AcademicLevel {
        AcademicLevel::new(name, AcademicSystem::EightFourFour, 1)
    }

    #[test]
    fn class_name_uses_compact_level_stream_and_year() {
        let stream = ClassStream::new("school-a", "East", "East");
        assert_eq!(derive_class_name(&level("Form 1"), Some(&stream), 2024), "Form1East/2024");
        assert_eq!(derive_class_name(&level("Grade 7"), None, 2025), "Grade7/2025");
    }

    #[test]
    fn readiness_requires_past_year_eligibility_and_non_final() {
        let mut class = Class::new("school-a", 2024, Uuid::new_v4());
        assert!(!class.apply_readiness(2024));
        assert!(class.apply_readiness(2025));
        assert_eq!(class.promotion_status, PromotionStatus::Ready);

        let mut final_year = Class::new("school-a", 2024, Uuid::new_v4());
        final_year.is_final_year = true;
        assert!(!final_year.apply_readiness(2025));

        let mut ineligible = Class::new("school-a", 2024, Uuid::new_v4());
        ineligible.promotion_eligible = false;
        assert!(!ineligible.apply_readiness(2025));
    }

    #[test]
    fn mark_promoted_archives_only_with_auto_archive() {
        let successor = Uuid::new_v4();

        let mut archived = Class::new("school-a", 2024, Uuid::new_v4());
        archived.mark_promoted(2025, successor);
        assert!(!archived.is_active);
        assert_eq!(archived.lineage.next_class, Some(successor));
        assert_eq!(archived.last_promoted_year, Some(2025));

        let mut kept = Class::new("school-a", 2024, Uuid::new_v4());
        kept.auto_archive = false;
        kept.mark_promoted(2025, successor);
        assert!(kept.is_active);
        assert_eq!(kept.promotion_status, PromotionStatus::Promoted);
    }

    #[test]
    fn successor_code_is_stable_per_year() {
        let mut class = Class::new("school-a", 2024, Uuid::new_v4());
        class.class_code = "CLS-2024-ABCDEF12".to_string();
        assert_eq!(class.successor_code(2025), class.successor_code(2025));
        assert_ne!(class.successor_code(2025), class.successor_code(2026));
        assert!(class.successor_code(2025).starts_with("CLS-2025-"));
    }

    #[test]
    fn status_only_moves_forward() {
        assert!(PromotionStatus::Active.can_advance_to(PromotionStatus::Ready));
        assert!(PromotionStatus::Ready.can_advance_to(PromotionStatus::Promoted));
        assert!(!PromotionStatus::Promoted.can_advance_to(PromotionStatus::Ready));
        assert!(!PromotionStatus::Ready.can_advance_to(PromotionStatus::Active));
    }
}
