use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::ServiceError;
use crate::database::models::{AcademicLevel, ClassStream};
use crate::database::SchoolStore;
use crate::types::{deref_opt, AcademicSystem, Ref};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelInput {
    pub level_code: Option<String>,
    pub display_name: String,
    pub academic_system: AcademicSystem,
    pub level_order: i32,
    pub next_level: Option<Ref>,
    #[serde(default)]
    pub is_final: bool,
    pub description: Option<String>,
    pub subjects_required: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInput {
    pub tenant: Option<String>,
    pub stream_name: String,
    pub stream_code: String,
}

/// Academic levels and class streams. Levels are write-once.
pub struct LevelService {
    store: Arc<dyn SchoolStore>,
}

impl LevelService {
    pub fn new(store: Arc<dyn SchoolStore>) -> Self {
        Self { store }
    }

    pub async fn create_level(&self, input: LevelInput) -> Result<AcademicLevel, ServiceError> {
        if input.display_name.trim().is_empty() {
            return Err(ServiceError::Validation("displayName is required".into()));
        }
        if input.level_order < 1 {
            return Err(ServiceError::Validation("levelOrder must be at least 1".into()));
        }

        let next_level = deref_opt(&input.next_level);
        if input.is_final && next_level.is_some() {
            return Err(ServiceError::Validation("A final level cannot have a next level".into()));
        }
        if let Some(next_id) = next_level {
            let next = self
                .store
                .find_level(next_id)
                .await?
                .ok_or_else(|| ServiceError::Validation(format!("Next level {} does not exist", next_id)))?;
            if next.academic_system != input.academic_system {
                return Err(ServiceError::Validation("Next level belongs to another academic system".into()));
            }
        }

        let mut level = AcademicLevel::new(input.display_name.trim(), input.academic_system, input.level_order);
        level.level_code = input.level_code;
        level.next_level = next_level;
        level.is_final = input.is_final;
        level.description = input.description;
        level.subjects_required = input.subjects_required;
        level.is_active = input.is_active.unwrap_or(true);

        Ok(self.store.create_level(level).await?)
    }

    pub async fn get_level(&self, id: Uuid) -> Result<AcademicLevel, ServiceError> {
        Ok(self.store.get_level(id).await?)
    }

    pub async fn create_stream(&self, tenant: String, input: StreamInput) -> Result<ClassStream, ServiceError> {
        let code = input.stream_code.trim();
        if code.is_empty() || code.contains(char::is_whitespace) {
            return Err(ServiceError::Validation("streamCode must be a single non-empty word".into()));
        }
        let stream = ClassStream::new(tenant, input.stream_name.trim(), code);
        Ok(self.store.create_stream(stream).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use serde_json::json;

    fn service() -> LevelService {
        LevelService::new(Arc::new(MemoryStore::new()))
    }

    fn input(value: serde_json::Value) -> LevelInput {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn final_level_with_next_is_rejected() {
        let svc = service();
        let form2 = svc
            .create_level(input(json!({ "displayName": "Form 2", "academicSystem": "EIGHT_FOUR_FOUR", "levelOrder": 2 })))
            .await
            .unwrap();

        let err = svc
            .create_level(input(json!({
                "displayName": "Form 1",
                "academicSystem": "EIGHT_FOUR_FOUR",
                "levelOrder": 1,
                "isFinal": true,
                "nextLevel": { "id": form2.id, "displayName": "Form 2" }
            })))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn next_level_must_share_the_system() {
        let svc = service();
        let grade7 = svc
            .create_level(input(json!({ "displayName": "Grade 7", "academicSystem": "CBC", "levelOrder": 7 })))
            .await
            .unwrap();

        let err = svc
            .create_level(input(json!({
                "displayName": "Form 1",
                "academicSystem": "EIGHT_FOUR_FOUR",
                "levelOrder": 1,
                "nextLevel": grade7.id
            })))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn stream_code_is_a_single_word() {
        let svc = service();
        let bad = StreamInput {
            tenant: None,
            stream_name: "North East".into(),
            stream_code: "North East".into(),
        };
        assert!(svc.create_stream("school-a".into(), bad).await.is_err());
    }
}
