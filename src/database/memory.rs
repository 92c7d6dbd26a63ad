use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{AcademicLevel, Class, ClassStream, Exam, ExamResult, PromotionBatch, Student};
use super::store::SchoolStore;
use crate::filter::ClassFilter;

#[derive(Default)]
struct Arena {
    classes: HashMap<Uuid, Class>,
    levels: HashMap<Uuid, AcademicLevel>,
    streams: HashMap<Uuid, ClassStream>,
    students: HashMap<Uuid, Student>,
    exams: HashMap<Uuid, Exam>,
    results: HashMap<Uuid, ExamResult>,
    batches: HashMap<Uuid, PromotionBatch>,
}

impl Arena {
    /// Unique checks for a class write; `class.id` itself is ignored so the
    /// same routine serves inserts and updates.
    fn check_class_constraints(&self, class: &Class) -> Result<(), DatabaseError> {
        for other in self.classes.values().filter(|c| c.id != class.id) {
            if other.class_code == class.class_code {
                return Err(DatabaseError::Conflict("classes_class_code_key".into()));
            }
            if other.tenant == class.tenant && other.class_name == class.class_name {
                return Err(DatabaseError::Conflict("classes_tenant_class_name_key".into()));
            }
            if class.lineage.previous_class.is_some()
                && other.lineage.previous_class == class.lineage.previous_class
                && other.academic_year == class.academic_year
            {
                return Err(DatabaseError::Conflict("classes_one_successor_per_year".into()));
            }
        }
        Ok(())
    }
}

/// In-process store. Every constraint check and the write that follows it run
/// under one write lock, so concurrent promotions of the same source cannot
/// both insert a successor.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Arena>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchoolStore for MemoryStore {
    async fn find_classes(&self, filter: &ClassFilter, limit: Option<usize>) -> Result<Vec<Class>, DatabaseError> {
        let arena = self.inner.read().await;
        let mut found: Vec<Class> = arena.classes.values().filter(|c| filter.matches(c)).cloned().collect();
        ClassFilter::sort(&mut found);
        if let Some(limit) = limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn count_classes(&self, filter: &ClassFilter) -> Result<usize, DatabaseError> {
        let arena = self.inner.read().await;
        Ok(arena.classes.values().filter(|c| filter.matches(c)).count())
    }

    async fn find_class(&self, id: Uuid) -> Result<Option<Class>, DatabaseError> {
        Ok(self.inner.read().await.classes.get(&id).cloned())
    }

    async fn create_class(&self, class: Class) -> Result<Class, DatabaseError> {
        let mut arena = self.inner.write().await;
        if arena.classes.contains_key(&class.id) {
            return Err(DatabaseError::Conflict("classes_pkey".into()));
        }
        arena.check_class_constraints(&class)?;
        arena.classes.insert(class.id, class.clone());
        Ok(class)
    }

    async fn update_class(&self, mut class: Class) -> Result<Class, DatabaseError> {
        let mut arena = self.inner.write().await;
        let existing = arena
            .classes
            .get(&class.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("class {}", class.id)))?;

        class.class_code = existing.class_code.clone();
        class.tenant = existing.tenant.clone();
        class.created_at = existing.created_at;
        class.updated_at = Utc::now();

        arena.check_class_constraints(&class)?;
        arena.classes.insert(class.id, class.clone());
        Ok(class)
    }

    async fn delete_class(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut arena = self.inner.write().await;
        arena
            .classes
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DatabaseError::NotFound(format!("class {}", id)))
    }

    async fn find_level(&self, id: Uuid) -> Result<Option<AcademicLevel>, DatabaseError> {
        Ok(self.inner.read().await.levels.get(&id).cloned())
    }

    async fn create_level(&self, level: AcademicLevel) -> Result<AcademicLevel, DatabaseError> {
        let mut arena = self.inner.write().await;
        if arena.levels.contains_key(&level.id) {
            return Err(DatabaseError::Conflict("academic_levels_pkey".into()));
        }
        arena.levels.insert(level.id, level.clone());
        Ok(level)
    }

    async fn find_stream(&self, id: Uuid) -> Result<Option<ClassStream>, DatabaseError> {
        Ok(self.inner.read().await.streams.get(&id).cloned())
    }

    async fn create_stream(&self, stream: ClassStream) -> Result<ClassStream, DatabaseError> {
        let mut arena = self.inner.write().await;
        if arena.streams.contains_key(&stream.id) {
            return Err(DatabaseError::Conflict("class_streams_pkey".into()));
        }
        arena.streams.insert(stream.id, stream.clone());
        Ok(stream)
    }

    async fn create_student(&self, student: Student) -> Result<Student, DatabaseError> {
        let mut arena = self.inner.write().await;
        if arena.students.contains_key(&student.id) {
            return Err(DatabaseError::Conflict("students_pkey".into()));
        }
        arena.students.insert(student.id, student.clone());
        Ok(student)
    }

    async fn count_enrolled(&self, class_id: Uuid) -> Result<i64, DatabaseError> {
        let arena = self.inner.read().await;
        Ok(arena
            .students
            .values()
            .filter(|s| s.is_active && s.class_id == Some(class_id))
            .count() as i64)
    }

    async fn find_exam(&self, id: Uuid) -> Result<Option<Exam>, DatabaseError> {
        Ok(self.inner.read().await.exams.get(&id).cloned())
    }

    async fn create_exam(&self, exam: Exam) -> Result<Exam, DatabaseError> {
        let mut arena = self.inner.write().await;
        if arena.exams.contains_key(&exam.id) {
            return Err(DatabaseError::Conflict("exams_pkey".into()));
        }
        if let Some(ref code) = exam.exam_code {
            if arena.exams.values().any(|e| e.exam_code.as_ref() == Some(code)) {
                return Err(DatabaseError::Conflict("exams_exam_code_key".into()));
            }
        }
        arena.exams.insert(exam.id, exam.clone());
        Ok(exam)
    }

    async fn find_exam_result(&self, id: Uuid) -> Result<Option<ExamResult>, DatabaseError> {
        Ok(self.inner.read().await.results.get(&id).cloned())
    }

    async fn save_exam_result(&self, mut result: ExamResult) -> Result<ExamResult, DatabaseError> {
        let mut arena = self.inner.write().await;
        if let Some(existing) = arena.results.get(&result.id) {
            result.created_at = existing.created_at;
        }
        result.updated_at = Utc::now();
        arena.results.insert(result.id, result.clone());
        Ok(result)
    }

    async fn find_promotion_batch(&self, id: Uuid) -> Result<Option<PromotionBatch>, DatabaseError> {
        Ok(self.inner.read().await.batches.get(&id).cloned())
    }

    async fn create_promotion_batch(&self, batch: PromotionBatch) -> Result<PromotionBatch, DatabaseError> {
        let mut arena = self.inner.write().await;
        if arena.batches.contains_key(&batch.id) {
            return Err(DatabaseError::Conflict("promotion_batches_pkey".into()));
        }
        arena.batches.insert(batch.id, batch.clone());
        Ok(batch)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::PromotionStatus;

    fn class(code: &str, name: &str, year: i32) -> Class {
        let mut c = Class::new("school-a", year, Uuid::new_v4());
        c.class_code = code.into();
        c.class_name = name.into();
        c
    }

    #[tokio::test]
    async fn rejects_duplicate_code_and_name() {
        let store = MemoryStore::new();
        store.create_class(class("CLS-1", "Form1/2024", 2024)).await.unwrap();

        let err = store.create_class(class("CLS-1", "Form1East/2024", 2024)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));

        let err = store.create_class(class("CLS-2", "Form1/2024", 2024)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(ref c) if c == "classes_tenant_class_name_key"));
    }

    #[tokio::test]
    async fn class_names_are_unique_per_tenant() {
        let store = MemoryStore::new();
        store.create_class(class("CLS-1", "Form1/2024", 2024)).await.unwrap();

        let mut elsewhere = class("CLS-2", "Form1/2024", 2024);
        elsewhere.tenant = "school-b".into();
        store.create_class(elsewhere).await.unwrap();

        let mut clash = class("CLS-3", "Form1/2024", 2024);
        clash.tenant = "school-b".into();
        assert!(store.create_class(clash).await.is_err());
    }

    #[tokio::test]
    async fn one_successor_per_source_and_year() {
        let store = MemoryStore::new();
        let source = Uuid::new_v4();

        let mut first = class("CLS-A", "Form2/2025", 2025);
        first.lineage.previous_class = Some(source);
        store.create_class(first).await.unwrap();

        let mut second = class("CLS-B", "Form2East/2025", 2025);
        second.lineage.previous_class = Some(source);
        let err = store.create_class(second).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(ref c) if c == "classes_one_successor_per_year"));
    }

    #[tokio::test]
    async fn update_keeps_the_stored_code() {
        let store = MemoryStore::new();
        let created = store.create_class(class("CLS-1", "Form1/2024", 2024)).await.unwrap();

        let mut changed = created.clone();
        changed.class_code = "CLS-HIJACK".into();
        changed.promotion_status = PromotionStatus::Ready;
        let saved = store.update_class(changed).await.unwrap();

        assert_eq!(saved.class_code, "CLS-1");
        assert_eq!(store.get_class(created.id).await.unwrap().promotion_status, PromotionStatus::Ready);
    }

    #[tokio::test]
    async fn find_classes_applies_filter_order_and_limit() {
        let store = MemoryStore::new();
        for (i, year) in [2023, 2021, 2022].iter().enumerate() {
            let mut c = class(&format!("CLS-{}", i), &format!("Form1/{}", year), *year);
            c.promotion_status = PromotionStatus::Ready;
            store.create_class(c).await.unwrap();
        }

        let filter = ClassFilter::promotion_candidates(2025);
        let all = store.find_classes(&filter, None).await.unwrap();
        assert_eq!(all.iter().map(|c| c.academic_year).collect::<Vec<_>>(), vec![2021, 2022, 2023]);

        let capped = store.find_classes(&filter, Some(2)).await.unwrap();
        assert_eq!(capped.len(), 2);
        assert_eq!(store.count_classes(&filter).await.unwrap(), 3);
    }
}
