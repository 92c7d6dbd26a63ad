/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Academic systems with their own level ladders and grading tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcademicSystem {
    #[default]
    EightFourFour,
    Cbc,
}

impl AcademicSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcademicSystem::EightFourFour => "EIGHT_FOUR_FOUR",
            AcademicSystem::Cbc => "CBC",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EIGHT_FOUR_FOUR" | "844" | "8-4-4" => Some(AcademicSystem::EightFourFour),
            "CBC" => Some(AcademicSystem::Cbc),
            _ => None,
        }
    }
}

impl fmt::Display for AcademicSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything addressable by a record id
pub trait Identified {
    fn id(&self) -> Uuid;
}

/// Relationship field as it arrives over the wire: either a bare id or an
/// expanded document carrying one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference<T> {
    Id(Uuid),
    Expanded(T),
}

impl<T: Identified> Reference<T> {
    /// Normalize to the referenced id. All comparisons and writes go through here.
    pub fn id(&self) -> Uuid {
        match self {
            Reference::Id(id) => *id,
            Reference::Expanded(doc) => doc.id(),
        }
    }
}

impl<T> From<Uuid> for Reference<T> {
    fn from(id: Uuid) -> Self {
        Reference::Id(id)
    }
}

/// Minimal expanded form accepted for any relationship: `{ "id": ... }` plus
/// whatever else the client chose to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordStub {
    pub id: Uuid,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl Identified for RecordStub {
    fn id(&self) -> Uuid {
        self.id
    }
}

pub type Ref = Reference<RecordStub>;

/// Dereference an optional relationship field.
pub fn deref_opt(reference: &Option<Ref>) -> Option<Uuid> {
    reference.as_ref().map(Reference::id)
}

/// Patch field that distinguishes "absent" (`None`) from explicit `null`
/// (`Some(None)`). Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
