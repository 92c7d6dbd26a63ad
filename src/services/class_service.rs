use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::ServiceError;
use crate::database::models::class::{derive_class_name, generate_class_code};
use crate::database::models::{Class, PromotionStatus, Student};
use crate::database::SchoolStore;
use crate::promotion::Clock;
use crate::types::{deref_opt, nullable, AcademicSystem, Ref, Reference};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInput {
    pub tenant: Option<String>,
    pub class_code: Option<String>,
    pub academic_year: i32,
    pub academic_level: Ref,
    pub next_academic_level: Option<Ref>,
    pub stream: Option<Ref>,
    pub capacity: Option<i32>,
    pub academic_system: Option<AcademicSystem>,
    pub class_teacher: Option<Ref>,
    pub promotion_eligible: Option<bool>,
    pub is_final_year: Option<bool>,
    pub auto_archive: Option<bool>,
    pub remarks: Option<String>,
}

/// Partial update. Nullable relationships use `Some(None)` for an explicit clear.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPatch {
    pub class_code: Option<String>,
    pub academic_year: Option<i32>,
    pub academic_level: Option<Ref>,
    #[serde(default, deserialize_with = "nullable")]
    pub next_academic_level: Option<Option<Ref>>,
    #[serde(default, deserialize_with = "nullable")]
    pub stream: Option<Option<Ref>>,
    pub capacity: Option<i32>,
    pub academic_system: Option<AcademicSystem>,
    #[serde(default, deserialize_with = "nullable")]
    pub class_teacher: Option<Option<Ref>>,
    pub promotion_eligible: Option<bool>,
    pub is_final_year: Option<bool>,
    pub auto_archive: Option<bool>,
    pub promotion_status: Option<PromotionStatus>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub remarks: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    pub tenant: Option<String>,
    pub full_name: String,
    pub admission_number: Option<String>,
    pub class_id: Option<Ref>,
}

/// Class records: name and code derivation, the final-year rule, readiness
/// and enrolment counts.
pub struct ClassService {
    store: Arc<dyn SchoolStore>,
    clock: Arc<dyn Clock>,
}

impl ClassService {
    pub fn new(store: Arc<dyn SchoolStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create(&self, tenant: String, input: ClassInput) -> Result<Class, ServiceError> {
        let mut class = Class::new(tenant, input.academic_year, input.academic_level.id());
        class.next_academic_level = deref_opt(&input.next_academic_level);
        class.stream = deref_opt(&input.stream);
        class.class_teacher = deref_opt(&input.class_teacher);
        if let Some(capacity) = input.capacity {
            class.capacity = capacity;
        }
        if let Some(eligible) = input.promotion_eligible {
            class.promotion_eligible = eligible;
        }
        if let Some(is_final) = input.is_final_year {
            class.is_final_year = is_final;
        }
        if let Some(auto_archive) = input.auto_archive {
            class.auto_archive = auto_archive;
        }
        class.remarks = input.remarks;

        class.class_code = match input.class_code.map(|c| c.trim().to_string()) {
            Some(code) if !code.is_empty() => code,
            _ => generate_class_code(class.academic_year, class.id),
        };

        self.prepare(&mut class, input.academic_system).await?;
        let class = self.store.create_class(class).await?;
        info!("Created class {} ({})", class.class_name, class.class_code);
        Ok(class)
    }

    pub async fn get(&self, id: Uuid) -> Result<Class, ServiceError> {
        Ok(self.store.get_class(id).await?)
    }

    pub async fn update(&self, id: Uuid, patch: ClassPatch) -> Result<Class, ServiceError> {
        let mut class = self.store.get_class(id).await?;

        if let Some(code) = patch.class_code {
            if code != class.class_code {
                return Err(ServiceError::Validation("classCode cannot be changed".into()));
            }
        }
        if let Some(status) = patch.promotion_status {
            if !class.promotion_status.can_advance_to(status) {
                return Err(ServiceError::Validation(format!(
                    "promotionStatus cannot move from {} to {}",
                    class.promotion_status, status
                )));
            }
            class.promotion_status = status;
        }

        if let Some(year) = patch.academic_year {
            class.academic_year = year;
        }
        if let Some(level) = patch.academic_level {
            class.academic_level = level.id();
        }
        if let Some(next) = patch.next_academic_level {
            class.next_academic_level = next.as_ref().map(Reference::id);
        }
        if let Some(stream) = patch.stream {
            class.stream = stream.as_ref().map(Reference::id);
        }
        if let Some(teacher) = patch.class_teacher {
            class.class_teacher = teacher.as_ref().map(Reference::id);
        }
        if let Some(capacity) = patch.capacity {
            class.capacity = capacity;
        }
        if let Some(eligible) = patch.promotion_eligible {
            class.promotion_eligible = eligible;
        }
        if let Some(is_final) = patch.is_final_year {
            class.is_final_year = is_final;
        }
        if let Some(auto_archive) = patch.auto_archive {
            class.auto_archive = auto_archive;
        }
        if let Some(active) = patch.is_active {
            class.is_active = active;
        }
        if let Some(remarks) = patch.remarks {
            class.remarks = remarks;
        }

        self.prepare(&mut class, patch.academic_system).await?;
        Ok(self.store.update_class(class).await?)
    }

    /// Hard delete, refused while students are enrolled
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let class = self.store.get_class(id).await?;
        let enrolled = self.store.count_enrolled(id).await?;
        if enrolled > 0 {
            return Err(ServiceError::Conflict(format!(
                "Class {} has {} enrolled students and cannot be deleted",
                class.class_name, enrolled
            )));
        }
        self.store.delete_class(id).await?;
        info!("Deleted class {}", class.class_name);
        Ok(())
    }

    /// Refresh `student_count` from the enrolment records
    pub async fn recount(&self, id: Uuid) -> Result<Class, ServiceError> {
        let mut class = self.store.get_class(id).await?;
        let enrolled = self.store.count_enrolled(id).await?;
        class.student_count = i32::try_from(enrolled).unwrap_or(i32::MAX);
        Ok(self.store.update_class(class).await?)
    }

    pub async fn enrol(&self, tenant: String, input: StudentInput) -> Result<Student, ServiceError> {
        if input.full_name.trim().is_empty() {
            return Err(ServiceError::Validation("fullName is required".into()));
        }

        let class_id = deref_opt(&input.class_id);
        if let Some(id) = class_id {
            let class = self.store.get_class(id).await?;
            if class.tenant != tenant {
                return Err(ServiceError::Validation("Class belongs to another tenant".into()));
            }
        }

        let student = self
            .store
            .create_student(Student {
                id: Uuid::new_v4(),
                tenant,
                full_name: input.full_name.trim().to_string(),
                admission_number: input.admission_number,
                class_id,
                is_active: true,
            })
            .await?;

        if let Some(id) = class_id {
            self.recount(id).await?;
        }
        Ok(student)
    }

    /// Validate references and apply derived fields before every save.
    async fn prepare(&self, class: &mut Class, system: Option<AcademicSystem>) -> Result<(), ServiceError> {
        if class.capacity < 1 {
            return Err(ServiceError::Validation("capacity must be positive".into()));
        }
        if class.is_final_year && class.next_academic_level.is_some() {
            return Err(ServiceError::Validation(
                "A final-year class cannot have a next academic level".into(),
            ));
        }

        let level = self.store.find_level(class.academic_level).await?.ok_or_else(|| {
            ServiceError::Validation(format!("Academic level {} does not exist", class.academic_level))
        })?;
        if let Some(next_id) = class.next_academic_level {
            if self.store.find_level(next_id).await?.is_none() {
                return Err(ServiceError::Validation(format!("Academic level {} does not exist", next_id)));
            }
        }

        let stream = match class.stream {
            Some(stream_id) => Some(
                self.store
                    .find_stream(stream_id)
                    .await?
                    .ok_or_else(|| ServiceError::Validation(format!("Stream {} does not exist", stream_id)))?,
            ),
            None => None,
        };

        class.academic_system = system.unwrap_or(level.academic_system);
        class.class_name = derive_class_name(&level, stream.as_ref(), class.academic_year);
        class.apply_readiness(self.clock.current_year());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{AcademicLevel, ClassStream};
    use crate::database::MemoryStore;
    use crate::promotion::FixedClock;
    use serde_json::json;

    struct Fixture {
        svc: ClassService,
        store: Arc<MemoryStore>,
        form1: AcademicLevel,
        form2: AcademicLevel,
        east: ClassStream,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let form2 = store
            .create_level(AcademicLevel::new("Form 2", AcademicSystem::EightFourFour, 2))
            .await
            .unwrap();
        let mut form1 = AcademicLevel::new("Form 1", AcademicSystem::EightFourFour, 1);
        form1.next_level = Some(form2.id);
        let form1 = store.create_level(form1).await.unwrap();
        let east = store
            .create_stream(ClassStream::new("school-a", "East", "East"))
            .await
            .unwrap();

        let svc = ClassService::new(store.clone(), Arc::new(FixedClock::on(2025, 3, 1)));
        Fixture { svc, store, form1, form2, east }
    }

    fn input(value: serde_json::Value) -> ClassInput {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn create_derives_name_code_and_readiness() {
        let f = fixture().await;
        let class = f
            .svc
            .create(
                "school-a".into(),
                input(json!({
                    "academicYear": 2024,
                    "academicLevel": { "id": f.form1.id, "displayName": "Form 1" },
                    "stream": f.east.id
                })),
            )
            .await
            .unwrap();

        assert_eq!(class.class_name, "Form1East/2024");
        assert!(class.class_code.starts_with("CLS-2024-"));
        assert_eq!(class.promotion_status, PromotionStatus::Ready);
        assert_eq!(class.academic_system, AcademicSystem::EightFourFour);
    }

    #[tokio::test]
    async fn final_year_with_next_level_is_rejected() {
        let f = fixture().await;
        let err = f
            .svc
            .create(
                "school-a".into(),
                input(json!({
                    "academicYear": 2025,
                    "academicLevel": f.form1.id,
                    "nextAcademicLevel": f.form2.id,
                    "isFinalYear": true
                })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn code_is_immutable_and_name_follows_changes() {
        let f = fixture().await;
        let class = f
            .svc
            .create(
                "school-a".into(),
                input(json!({ "academicYear": 2025, "academicLevel": f.form1.id, "classCode": "F1-2025" })),
            )
            .await
            .unwrap();

        let patch = ClassPatch {
            class_code: Some("OTHER".into()),
            ..Default::default()
        };
        assert!(matches!(f.svc.update(class.id, patch).await, Err(ServiceError::Validation(_))));

        let patch: ClassPatch = serde_json::from_value(json!({ "stream": f.east.id, "classCode": "F1-2025" })).unwrap();
        let updated = f.svc.update(class.id, patch).await.unwrap();
        assert_eq!(updated.class_name, "Form1East/2025");
        assert_eq!(updated.class_code, "F1-2025");
    }

    #[tokio::test]
    async fn status_cannot_move_backwards() {
        let f = fixture().await;
        let class = f
            .svc
            .create("school-a".into(), input(json!({ "academicYear": 2024, "academicLevel": f.form1.id })))
            .await
            .unwrap();
        assert_eq!(class.promotion_status, PromotionStatus::Ready);

        let patch: ClassPatch = serde_json::from_value(json!({ "promotionStatus": "active" })).unwrap();
        assert!(f.svc.update(class.id, patch).await.is_err());
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict() {
        let f = fixture().await;
        let body = json!({ "academicYear": 2025, "academicLevel": f.form1.id });
        f.svc.create("school-a".into(), input(body.clone())).await.unwrap();
        let err = f.svc.create("school-a".into(), input(body)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn enrolment_recounts_and_blocks_delete() {
        let f = fixture().await;
        let class = f
            .svc
            .create("school-a".into(), input(json!({ "academicYear": 2025, "academicLevel": f.form1.id })))
            .await
            .unwrap();

        let student = StudentInput {
            tenant: None,
            full_name: "Achieng Otieno".into(),
            admission_number: Some("ADM-001".into()),
            class_id: Some(class.id.into()),
        };
        f.svc.enrol("school-a".into(), student).await.unwrap();

        assert_eq!(f.store.get_class(class.id).await.unwrap().student_count, 1);
        assert!(matches!(f.svc.delete(class.id).await, Err(ServiceError::Conflict(_))));
    }
}
