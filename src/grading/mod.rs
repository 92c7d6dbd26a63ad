//! Percentage → grade mapping per academic system.
//!
//! Each table is a list of bands `[min, max)`; the top band is closed at 100 so
//! a perfect score still matches. Tables must tile `[0, 100]` exactly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::AcademicSystem;

pub const MAX_PERCENTAGE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Grade {
    // 8-4-4 letter grades
    A,
    AMinus,
    BPlus,
    B,
    BMinus,
    CPlus,
    C,
    CMinus,
    DPlus,
    D,
    DMinus,
    E,
    F,
    // CBC competency levels
    ExceedingExpectations,
    MeetingExpectations,
    ApproachingExpectations,
    BelowExpectations,
    WellBelowExpectations,
}

impl Grade {
    pub fn label(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::DMinus => "D-",
            Grade::E => "E",
            Grade::F => "F",
            Grade::ExceedingExpectations => "Exceeding Expectations",
            Grade::MeetingExpectations => "Meeting Expectations",
            Grade::ApproachingExpectations => "Approaching Expectations",
            Grade::BelowExpectations => "Below Expectations",
            Grade::WellBelowExpectations => "Well Below Expectations",
        }
    }

    /// Wire value, e.g. `A_MINUS`
    pub fn code(&self) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    pub fn from_code(code: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(code.to_string())).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeBand {
    pub min: f64,
    pub max: f64,
    pub grade: Grade,
    pub points: u8,
}

impl GradeBand {
    const fn new(min: f64, max: f64, grade: Grade, points: u8) -> Self {
        Self { min, max, grade, points }
    }

    fn contains(&self, percentage: f64) -> bool {
        percentage >= self.min
            && (percentage < self.max || (self.max == MAX_PERCENTAGE && percentage <= MAX_PERCENTAGE))
    }
}

const EIGHT_FOUR_FOUR: &[GradeBand] = &[
    GradeBand::new(80.0, 100.0, Grade::A, 12),
    GradeBand::new(75.0, 80.0, Grade::AMinus, 11),
    GradeBand::new(70.0, 75.0, Grade::BPlus, 10),
    GradeBand::new(65.0, 70.0, Grade::B, 9),
    GradeBand::new(60.0, 65.0, Grade::BMinus, 8),
    GradeBand::new(55.0, 60.0, Grade::CPlus, 7),
    GradeBand::new(50.0, 55.0, Grade::C, 6),
    GradeBand::new(45.0, 50.0, Grade::CMinus, 5),
    GradeBand::new(40.0, 45.0, Grade::DPlus, 4),
    GradeBand::new(35.0, 40.0, Grade::D, 3),
    GradeBand::new(30.0, 35.0, Grade::DMinus, 2),
    GradeBand::new(20.0, 30.0, Grade::E, 1),
    GradeBand::new(0.0, 20.0, Grade::F, 0),
];

const CBC: &[GradeBand] = &[
    GradeBand::new(85.0, 100.0, Grade::ExceedingExpectations, 5),
    GradeBand::new(70.0, 85.0, Grade::MeetingExpectations, 4),
    GradeBand::new(50.0, 70.0, Grade::ApproachingExpectations, 3),
    GradeBand::new(30.0, 50.0, Grade::BelowExpectations, 2),
    GradeBand::new(0.0, 30.0, Grade::WellBelowExpectations, 1),
];

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GradingError {
    #[error("No {system} grade band matches percentage {percentage}")]
    NoMatchingBand { percentage: f64, system: AcademicSystem },

    #[error("Invalid {system} grading scale: {reason}")]
    InvalidScale { system: AcademicSystem, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    pub grade: Grade,
    pub points: u8,
}

/// Bands for a system, highest first
pub fn scale(system: AcademicSystem) -> &'static [GradeBand] {
    match system {
        AcademicSystem::EightFourFour => EIGHT_FOUR_FOUR,
        AcademicSystem::Cbc => CBC,
    }
}

/// First band containing `percentage`. Anything outside `[0, 100]` is a
/// data-integrity problem and is reported, not defaulted.
pub fn grade(percentage: f64, system: AcademicSystem) -> Result<GradeResult, GradingError> {
    scale(system)
        .iter()
        .find(|band| band.contains(percentage))
        .map(|band| GradeResult {
            grade: band.grade,
            points: band.points,
        })
        .ok_or(GradingError::NoMatchingBand { percentage, system })
}

/// `total / max × 100`, or None when the inputs cannot produce one
pub fn percentage(total_marks: Option<f64>, max_score: Option<f64>) -> Option<f64> {
    match (total_marks, max_score) {
        (Some(total), Some(max)) if max > 0.0 => Some(total / max * MAX_PERCENTAGE),
        _ => None,
    }
}

/// Check that a band table tiles `[0, 100]` with no gaps or overlaps.
pub fn validate_scale(system: AcademicSystem, bands: &[GradeBand]) -> Result<(), GradingError> {
    let invalid = |reason: String| GradingError::InvalidScale { system, reason };

    let mut ordered: Vec<&GradeBand> = bands.iter().collect();
    ordered.sort_by(|a, b| a.min.total_cmp(&b.min));

    let (first, last) = match (ordered.first(), ordered.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(invalid("scale has no bands".to_string())),
    };
    if first.min != 0.0 {
        return Err(invalid(format!("lowest band starts at {}", first.min)));
    }
    if last.max != MAX_PERCENTAGE {
        return Err(invalid(format!("highest band ends at {}", last.max)));
    }
    for pair in ordered.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        if lower.min >= lower.max {
            return Err(invalid(format!("band {:?} is empty", lower.grade)));
        }
        if lower.max != upper.min {
            return Err(invalid(format!(
                "{:?} ends at {} but {:?} starts at {}",
                lower.grade, lower.max, upper.grade, upper.min
            )));
        }
    }
    Ok(())
}
