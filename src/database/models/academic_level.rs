use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AcademicSystem, Identified};

/// One ordered step (grade / form) within an academic system.
/// There is no update path: once stored a level is immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicLevel {
    pub id: Uuid,
    pub level_code: Option<String>,
    pub display_name: String,
    pub academic_system: AcademicSystem,
    pub level_order: i32,
    pub next_level: Option<Uuid>,
    pub is_final: bool,
    pub description: Option<String>,
    pub subjects_required: Option<i32>,
    pub is_active: bool,
}

impl AcademicLevel {
    pub fn new(display_name: impl Into<String>, academic_system: AcademicSystem, level_order: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            level_code: None,
            display_name: display_name.into(),
            academic_system,
            level_order,
            next_level: None,
            is_final: false,
            description: None,
            subjects_required: None,
            is_active: true,
        }
    }

    /// Display name with whitespace stripped, as used in class names
    pub fn compact_name(&self) -> String {
        self.display_name.split_whitespace().collect()
    }
}

impl Identified for AcademicLevel {
    fn id(&self) -> Uuid {
        self.id
    }
}
