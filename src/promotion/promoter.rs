use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::PromotionError;
use super::lineage;
use crate::database::models::class::derive_class_name;
use crate::database::models::{AcademicLevel, Class, PromotionStatus};
use crate::database::{DatabaseError, SchoolStore};
use crate::filter::ClassFilter;

/// Result of promoting one class
#[derive(Debug, Clone)]
pub enum PromotionOutcome {
    /// A new successor was written
    Created { source: Class, successor: Class },
    /// A successor for the year already existed; only the source was updated
    AlreadyPromoted { source: Class, successor: Class },
}

impl PromotionOutcome {
    pub fn source(&self) -> &Class {
        match self {
            PromotionOutcome::Created { source, .. } | PromotionOutcome::AlreadyPromoted { source, .. } => source,
        }
    }

    pub fn successor(&self) -> &Class {
        match self {
            PromotionOutcome::Created { successor, .. } | PromotionOutcome::AlreadyPromoted { successor, .. } => {
                successor
            }
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, PromotionOutcome::Created { .. })
    }
}

/// Creates successor classes and keeps lineage pointers in step
pub struct Promoter<'a> {
    store: &'a dyn SchoolStore,
}

impl<'a> Promoter<'a> {
    pub fn new(store: &'a dyn SchoolStore) -> Self {
        Self { store }
    }

    /// Promote `source` into `target_year`.
    ///
    /// Safe to repeat: an existing successor for the year is adopted instead of
    /// creating another one, including when a concurrent caller wins the insert.
    pub async fn promote(&self, source: &Class, target_year: i32) -> Result<PromotionOutcome, PromotionError> {
        let destination = self.destination_level(source).await?;

        if let Some(existing) = self.existing_successor(source, target_year).await? {
            return self.adopt(source, existing, target_year).await;
        }

        let successor = self.build_successor(source, &destination, target_year).await?;
        let successor = match self.store.create_class(successor).await {
            Ok(created) => created,
            // A racing promoter writes the same code and name, so any unique
            // violation may mean the successor now exists.
            Err(DatabaseError::Conflict(constraint)) => match self.existing_successor(source, target_year).await? {
                Some(existing) => {
                    warn!(
                        "Concurrent promotion of {} into {} detected; adopting the existing successor",
                        source.class_name, target_year
                    );
                    return self.adopt(source, existing, target_year).await;
                }
                None => return Err(DatabaseError::Conflict(constraint).into()),
            },
            Err(other) => return Err(other.into()),
        };

        let mut updated = source.clone();
        updated.mark_promoted(target_year, successor.id);
        let updated = self.store.update_class(updated).await?;

        info!(
            "Promoted {} -> {} (generation {})",
            updated.class_name, successor.class_name, successor.lineage.generation
        );
        Ok(PromotionOutcome::Created {
            source: updated,
            successor,
        })
    }

    /// Explicit `next_academic_level` wins over the level's own `next_level`
    async fn destination_level(&self, source: &Class) -> Result<AcademicLevel, PromotionError> {
        let next_id = match source.next_academic_level {
            Some(id) => Some(id),
            None => self
                .store
                .find_level(source.academic_level)
                .await?
                .ok_or(PromotionError::LevelNotFound(source.academic_level))?
                .next_level,
        };

        let next_id = next_id.ok_or_else(|| PromotionError::NoNextLevel {
            class_name: source.class_name.clone(),
        })?;

        self.store
            .find_level(next_id)
            .await?
            .ok_or(PromotionError::LevelNotFound(next_id))
    }

    async fn existing_successor(&self, source: &Class, target_year: i32) -> Result<Option<Class>, PromotionError> {
        let mut found = self
            .store
            .find_classes(&ClassFilter::successors_of(source.id, target_year), None)
            .await?;

        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            count => Err(PromotionError::DuplicateSuccessors {
                class_id: source.id,
                year: target_year,
                count,
            }),
        }
    }

    async fn adopt(&self, source: &Class, successor: Class, target_year: i32) -> Result<PromotionOutcome, PromotionError> {
        let mut updated = source.clone();
        updated.mark_promoted(target_year, successor.id);
        let updated = self.store.update_class(updated).await?;

        info!(
            "{} already promoted into {} as {}",
            updated.class_name, target_year, successor.class_name
        );
        Ok(PromotionOutcome::AlreadyPromoted {
            source: updated,
            successor,
        })
    }

    async fn build_successor(
        &self,
        source: &Class,
        destination: &AcademicLevel,
        target_year: i32,
    ) -> Result<Class, PromotionError> {
        let stream = match source.stream {
            Some(id) => self.store.find_stream(id).await?,
            None => None,
        };

        let now = Utc::now();
        Ok(Class {
            id: Uuid::new_v4(),
            tenant: source.tenant.clone(),
            class_code: source.successor_code(target_year),
            class_name: derive_class_name(destination, stream.as_ref(), target_year),
            academic_year: target_year,
            academic_level: destination.id,
            next_academic_level: None,
            stream: source.stream,
            capacity: source.capacity,
            academic_system: source.academic_system,
            student_count: 0,
            class_teacher: source.class_teacher,
            promotion_eligible: source.promotion_eligible,
            is_final_year: destination.is_final,
            auto_archive: source.auto_archive,
            promotion_status: PromotionStatus::Active,
            last_promoted_year: None,
            is_active: true,
            remarks: None,
            lineage: lineage::successor_lineage(source),
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::ClassStream;
    use crate::database::MemoryStore;
    use crate::types::AcademicSystem;

    struct Fixture {
        store: MemoryStore,
        form1: AcademicLevel,
        form4: AcademicLevel,
        stream: ClassStream,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();

        let mut form4 = AcademicLevel::new("Form 4", AcademicSystem::EightFourFour, 4);
        form4.is_final = true;
        let mut form2 = AcademicLevel::new("Form 2", AcademicSystem::EightFourFour, 2);
        form2.next_level = Some(form4.id);
        let mut form1 = AcademicLevel::new("Form 1", AcademicSystem::EightFourFour, 1);
        form1.next_level = Some(form2.id);

        for level in [&form1, &form2, &form4] {
            store.create_level(level.clone()).await.unwrap();
        }
        let stream = store
            .create_stream(ClassStream::new("school-a", "East", "East"))
            .await
            .unwrap();

        Fixture { store, form1, form4, stream }
    }

    async fn ready_class(f: &Fixture, level: &AcademicLevel, year: i32) -> Class {
        let mut class = Class::new("school-a", year, level.id);
        class.stream = Some(f.stream.id);
        class.class_code = format!("CLS-{}-SEED{}", year, level.level_order);
        class.class_name = derive_class_name(level, Some(&f.stream), year);
        class.promotion_status = PromotionStatus::Ready;
        f.store.create_class(class).await.unwrap()
    }

    #[tokio::test]
    async fn form_one_east_becomes_form_two_east() {
        let f = fixture().await;
        let source = ready_class(&f, &f.form1, 2024).await;

        let outcome = Promoter::new(&f.store).promote(&source, 2025).await.unwrap();
        assert!(outcome.is_created());

        let successor = outcome.successor();
        assert_eq!(successor.class_name, "Form2East/2025");
        assert_eq!(successor.lineage.generation, 2);
        assert_eq!(successor.lineage.previous_class, Some(source.id));
        assert_eq!(successor.lineage.original_class, Some(source.id));
        assert_eq!(successor.promotion_status, PromotionStatus::Active);
        assert_eq!(successor.student_count, 0);

        let stored = f.store.get_class(source.id).await.unwrap();
        assert_eq!(stored.promotion_status, PromotionStatus::Promoted);
        assert_eq!(stored.last_promoted_year, Some(2025));
        assert_eq!(stored.lineage.next_class, Some(successor.id));
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn second_promotion_adopts_existing_successor() {
        let f = fixture().await;
        let source = ready_class(&f, &f.form1, 2024).await;
        let promoter = Promoter::new(&f.store);

        let first = promoter.promote(&source, 2025).await.unwrap();
        let again = promoter.promote(&source, 2025).await.unwrap();

        assert!(!again.is_created());
        assert_eq!(again.successor().id, first.successor().id);
        let successors = f
            .store
            .find_classes(&ClassFilter::successors_of(source.id, 2025), None)
            .await
            .unwrap();
        assert_eq!(successors.len(), 1);
    }

    #[tokio::test]
    async fn missing_next_level_is_reported() {
        let f = fixture().await;
        let source = ready_class(&f, &f.form4, 2024).await;

        let err = Promoter::new(&f.store).promote(&source, 2025).await.unwrap_err();
        assert!(matches!(err, PromotionError::NoNextLevel { .. }));
    }

    #[tokio::test]
    async fn explicit_next_level_overrides_ladder_and_sets_final_year() {
        let f = fixture().await;
        let mut source = ready_class(&f, &f.form1, 2024).await;
        source.next_academic_level = Some(f.form4.id);
        let source = f.store.update_class(source).await.unwrap();

        let outcome = Promoter::new(&f.store).promote(&source, 2025).await.unwrap();
        assert_eq!(outcome.successor().academic_level, f.form4.id);
        assert!(outcome.successor().is_final_year);
        assert_eq!(outcome.successor().class_name, "Form4East/2025");
    }

    #[tokio::test]
    async fn successor_code_is_deterministic() {
        let f = fixture().await;
        let source = ready_class(&f, &f.form1, 2024).await;

        let outcome = Promoter::new(&f.store).promote(&source, 2025).await.unwrap();
        assert_eq!(outcome.successor().class_code, source.successor_code(2025));
    }
}
