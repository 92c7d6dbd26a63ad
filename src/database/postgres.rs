use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{postgres::PgArguments, types::Json, FromRow, PgPool, Row};
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{
    AcademicLevel, Class, ClassStream, Exam, ExamResult, Lineage, PaperScore, PromotionBatch, PromotionRules,
    PromotionStatus, Student, StudentPromotion, SubjectRef,
};
use super::store::SchoolStore;
use crate::filter::{ClassFilter, FilterValue};
use crate::grading::Grade;
use crate::types::AcademicSystem;

/// Postgres-backed store. Uniqueness is enforced by the schema constraints
/// and surfaces through `DatabaseError::Conflict`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn enum_to_text<T: Serialize>(value: &T) -> Result<String, DatabaseError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        _ => Err(DatabaseError::InvalidData("enum did not serialize to text".into())),
    }
}

fn enum_from_text<T: DeserializeOwned>(column: &str, text: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(text.to_string()))
        .map_err(|_| DatabaseError::InvalidData(format!("{}: unexpected value '{}'", column, text)))
}

fn system_from_text(text: &str) -> Result<AcademicSystem, DatabaseError> {
    AcademicSystem::parse(text)
        .ok_or_else(|| DatabaseError::InvalidData(format!("academic_system: unexpected value '{}'", text)))
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q FilterValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        FilterValue::Text(s) => q.bind(s),
        FilterValue::Int(i) => q.bind(*i),
        FilterValue::Bool(b) => q.bind(*b),
        FilterValue::Uuid(id) => q.bind(*id),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q FilterValue,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        FilterValue::Text(s) => q.bind(s),
        FilterValue::Int(i) => q.bind(*i),
        FilterValue::Bool(b) => q.bind(*b),
        FilterValue::Uuid(id) => q.bind(*id),
    }
}

#[derive(FromRow)]
struct ClassRow {
    id: Uuid,
    tenant: String,
    class_code: String,
    class_name: String,
    academic_year: i32,
    academic_level_id: Uuid,
    next_academic_level_id: Option<Uuid>,
    stream_id: Option<Uuid>,
    capacity: i32,
    academic_system: String,
    student_count: i32,
    class_teacher_id: Option<Uuid>,
    promotion_eligible: bool,
    is_final_year: bool,
    auto_archive: bool,
    promotion_status: String,
    last_promoted_year: Option<i32>,
    is_active: bool,
    remarks: Option<String>,
    original_class_id: Option<Uuid>,
    previous_class_id: Option<Uuid>,
    next_class_id: Option<Uuid>,
    generation: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ClassRow> for Class {
    type Error = DatabaseError;

    fn try_from(row: ClassRow) -> Result<Self, Self::Error> {
        let promotion_status = PromotionStatus::parse(&row.promotion_status).ok_or_else(|| {
            DatabaseError::InvalidData(format!("promotion_status: unexpected value '{}'", row.promotion_status))
        })?;

        Ok(Class {
            id: row.id,
            tenant: row.tenant,
            class_code: row.class_code,
            class_name: row.class_name,
            academic_year: row.academic_year,
            academic_level: row.academic_level_id,
            next_academic_level: row.next_academic_level_id,
            stream: row.stream_id,
            capacity: row.capacity,
            academic_system: system_from_text(&row.academic_system)?,
            student_count: row.student_count,
            class_teacher: row.class_teacher_id,
            promotion_eligible: row.promotion_eligible,
            is_final_year: row.is_final_year,
            auto_archive: row.auto_archive,
            promotion_status,
            last_promoted_year: row.last_promoted_year,
            is_active: row.is_active,
            remarks: row.remarks,
            lineage: Lineage {
                original_class: row.original_class_id,
                previous_class: row.previous_class_id,
                next_class: row.next_class_id,
                generation: row.generation,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct LevelRow {
    id: Uuid,
    level_code: Option<String>,
    display_name: String,
    academic_system: String,
    level_order: i32,
    next_level_id: Option<Uuid>,
    is_final: bool,
    description: Option<String>,
    subjects_required: Option<i32>,
    is_active: bool,
}

impl TryFrom<LevelRow> for AcademicLevel {
    type Error = DatabaseError;

    fn try_from(row: LevelRow) -> Result<Self, Self::Error> {
        Ok(AcademicLevel {
            id: row.id,
            level_code: row.level_code,
            display_name: row.display_name,
            academic_system: system_from_text(&row.academic_system)?,
            level_order: row.level_order,
            next_level: row.next_level_id,
            is_final: row.is_final,
            description: row.description,
            subjects_required: row.subjects_required,
            is_active: row.is_active,
        })
    }
}

#[derive(FromRow)]
struct ExamRow {
    id: Uuid,
    tenant: String,
    exam_name: String,
    exam_code: Option<String>,
    academic_year: i32,
    term: String,
    exam_type: String,
    subject_id: Uuid,
    subject_system: String,
    class_id: Uuid,
    max_score: f64,
}

impl TryFrom<ExamRow> for Exam {
    type Error = DatabaseError;

    fn try_from(row: ExamRow) -> Result<Self, Self::Error> {
        Ok(Exam {
            id: row.id,
            tenant: row.tenant,
            exam_name: row.exam_name,
            exam_code: row.exam_code,
            academic_year: row.academic_year,
            term: enum_from_text("term", &row.term)?,
            exam_type: enum_from_text("exam_type", &row.exam_type)?,
            subject: SubjectRef {
                id: row.subject_id,
                academic_system: system_from_text(&row.subject_system)?,
            },
            class_id: row.class_id,
            max_score: row.max_score,
        })
    }
}

#[derive(FromRow)]
struct ExamResultRow {
    id: Uuid,
    tenant: String,
    exam_id: Uuid,
    student_id: Uuid,
    subject_id: Option<Uuid>,
    subject_system: Option<String>,
    class_id: Option<Uuid>,
    teacher_id: Option<Uuid>,
    total_marks: Option<f64>,
    max_score: Option<f64>,
    percentage: Option<f64>,
    grade: Option<String>,
    grade_points: Option<i16>,
    paper_scores: Json<Vec<PaperScore>>,
    remarks: Option<String>,
    status: String,
    is_absent: bool,
    is_remarked: bool,
    remark_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ExamResultRow> for ExamResult {
    type Error = DatabaseError;

    fn try_from(row: ExamResultRow) -> Result<Self, Self::Error> {
        let subject = match (row.subject_id, row.subject_system) {
            (Some(id), Some(system)) => Some(SubjectRef { id, academic_system: system_from_text(&system)? }),
            _ => None,
        };
        let grade = match row.grade {
            Some(code) => Some(
                Grade::from_code(&code)
                    .ok_or_else(|| DatabaseError::InvalidData(format!("grade: unexpected value '{}'", code)))?,
            ),
            None => None,
        };
        let grade_points = match row.grade_points {
            Some(points) => Some(
                u8::try_from(points)
                    .map_err(|_| DatabaseError::InvalidData(format!("grade_points out of range: {}", points)))?,
            ),
            None => None,
        };

        Ok(ExamResult {
            id: row.id,
            tenant: row.tenant,
            exam: row.exam_id,
            student: row.student_id,
            subject,
            class_id: row.class_id,
            teacher: row.teacher_id,
            total_marks: row.total_marks,
            max_score: row.max_score,
            percentage: row.percentage,
            grade,
            grade_points,
            paper_scores: row.paper_scores.0,
            remarks: row.remarks,
            status: enum_from_text("status", &row.status)?,
            is_absent: row.is_absent,
            is_remarked: row.is_remarked,
            remark_date: row.remark_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct BatchRow {
    id: Uuid,
    tenant: String,
    name: String,
    from_academic_year: i32,
    to_academic_year: i32,
    from_level_id: Uuid,
    to_level_id: Uuid,
    promotion_date: NaiveDate,
    promoted_by: Uuid,
    total_students: i32,
    promoted_count: i32,
    retained_count: i32,
    status: String,
    completed_at: Option<DateTime<Utc>>,
    rules: Json<PromotionRules>,
    student_details: Json<Vec<StudentPromotion>>,
}

impl TryFrom<BatchRow> for PromotionBatch {
    type Error = DatabaseError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        Ok(PromotionBatch {
            id: row.id,
            tenant: row.tenant,
            name: row.name,
            from_academic_year: row.from_academic_year,
            to_academic_year: row.to_academic_year,
            from_level: row.from_level_id,
            to_level: row.to_level_id,
            promotion_date: row.promotion_date,
            promoted_by: row.promoted_by,
            total_students: row.total_students,
            promoted_count: row.promoted_count,
            retained_count: row.retained_count,
            status: enum_from_text("status", &row.status)?,
            completed_at: row.completed_at,
            rules: row.rules.0,
            student_details: row.student_details.0,
        })
    }
}

#[async_trait]
impl SchoolStore for PgStore {
    async fn find_classes(&self, filter: &ClassFilter, limit: Option<usize>) -> Result<Vec<Class>, DatabaseError> {
        let where_sql = filter.to_where_sql(0);
        let mut query = format!(
            "SELECT * FROM classes WHERE {} {}",
            where_sql.query,
            ClassFilter::order_sql()
        );
        if let Some(limit) = limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }

        let mut q = sqlx::query_as::<_, ClassRow>(&query);
        for p in where_sql.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(Class::try_from).collect()
    }

    async fn count_classes(&self, filter: &ClassFilter) -> Result<usize, DatabaseError> {
        let where_sql = filter.to_where_sql(0);
        let query = format!("SELECT COUNT(*) as count FROM classes WHERE {}", where_sql.query);

        let mut q = sqlx::query(&query);
        for p in where_sql.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as usize)
    }

    async fn find_class(&self, id: Uuid) -> Result<Option<Class>, DatabaseError> {
        let row = sqlx::query_as::<_, ClassRow>("SELECT * FROM classes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Class::try_from).transpose()
    }

    async fn create_class(&self, class: Class) -> Result<Class, DatabaseError> {
        let row = sqlx::query_as::<_, ClassRow>(
            "INSERT INTO classes (id, tenant, class_code, class_name, academic_year, academic_level_id, \
             next_academic_level_id, stream_id, capacity, academic_system, student_count, class_teacher_id, \
             promotion_eligible, is_final_year, auto_archive, promotion_status, last_promoted_year, is_active, \
             remarks, original_class_id, previous_class_id, next_class_id, generation, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, \
             $21, $22, $23, $24, $25) RETURNING *",
        )
        .bind(class.id)
        .bind(&class.tenant)
        .bind(&class.class_code)
        .bind(&class.class_name)
        .bind(class.academic_year)
        .bind(class.academic_level)
        .bind(class.next_academic_level)
        .bind(class.stream)
        .bind(class.capacity)
        .bind(class.academic_system.as_str())
        .bind(class.student_count)
        .bind(class.class_teacher)
        .bind(class.promotion_eligible)
        .bind(class.is_final_year)
        .bind(class.auto_archive)
        .bind(class.promotion_status.as_str())
        .bind(class.last_promoted_year)
        .bind(class.is_active)
        .bind(&class.remarks)
        .bind(class.lineage.original_class)
        .bind(class.lineage.previous_class)
        .bind(class.lineage.next_class)
        .bind(class.lineage.generation)
        .bind(class.created_at)
        .bind(class.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Class::try_from(row)
    }

    async fn update_class(&self, class: Class) -> Result<Class, DatabaseError> {
        // class_code and tenant are never rewritten
        let row = sqlx::query_as::<_, ClassRow>(
            "UPDATE classes SET class_name = $2, academic_year = $3, academic_level_id = $4, \
             next_academic_level_id = $5, stream_id = $6, capacity = $7, academic_system = $8, \
             student_count = $9, class_teacher_id = $10, promotion_eligible = $11, is_final_year = $12, \
             auto_archive = $13, promotion_status = $14, last_promoted_year = $15, is_active = $16, \
             remarks = $17, original_class_id = $18, previous_class_id = $19, next_class_id = $20, \
             generation = $21, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(class.id)
        .bind(&class.class_name)
        .bind(class.academic_year)
        .bind(class.academic_level)
        .bind(class.next_academic_level)
        .bind(class.stream)
        .bind(class.capacity)
        .bind(class.academic_system.as_str())
        .bind(class.student_count)
        .bind(class.class_teacher)
        .bind(class.promotion_eligible)
        .bind(class.is_final_year)
        .bind(class.auto_archive)
        .bind(class.promotion_status.as_str())
        .bind(class.last_promoted_year)
        .bind(class.is_active)
        .bind(&class.remarks)
        .bind(class.lineage.original_class)
        .bind(class.lineage.previous_class)
        .bind(class.lineage.next_class)
        .bind(class.lineage.generation)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("class {}", class.id)))?;
        Class::try_from(row)
    }

    async fn delete_class(&self, id: Uuid) -> Result<(), DatabaseError> {
        let done = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("class {}", id)));
        }
        Ok(())
    }

    async fn find_level(&self, id: Uuid) -> Result<Option<AcademicLevel>, DatabaseError> {
        let row = sqlx::query_as::<_, LevelRow>("SELECT * FROM academic_levels WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(AcademicLevel::try_from).transpose()
    }

    async fn create_level(&self, level: AcademicLevel) -> Result<AcademicLevel, DatabaseError> {
        let row = sqlx::query_as::<_, LevelRow>(
            "INSERT INTO academic_levels (id, level_code, display_name, academic_system, level_order, \
             next_level_id, is_final, description, subjects_required, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .bind(level.id)
        .bind(&level.level_code)
        .bind(&level.display_name)
        .bind(level.academic_system.as_str())
        .bind(level.level_order)
        .bind(level.next_level)
        .bind(level.is_final)
        .bind(&level.description)
        .bind(level.subjects_required)
        .bind(level.is_active)
        .fetch_one(&self.pool)
        .await?;
        AcademicLevel::try_from(row)
    }

    async fn find_stream(&self, id: Uuid) -> Result<Option<ClassStream>, DatabaseError> {
        let stream = sqlx::query_as::<_, ClassStream>("SELECT * FROM class_streams WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(stream)
    }

    async fn create_stream(&self, stream: ClassStream) -> Result<ClassStream, DatabaseError> {
        let stream = sqlx::query_as::<_, ClassStream>(
            "INSERT INTO class_streams (id, tenant, stream_name, stream_code) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(stream.id)
        .bind(&stream.tenant)
        .bind(&stream.stream_name)
        .bind(&stream.stream_code)
        .fetch_one(&self.pool)
        .await?;
        Ok(stream)
    }

    async fn create_student(&self, student: Student) -> Result<Student, DatabaseError> {
        let student = sqlx::query_as::<_, Student>(
            "INSERT INTO students (id, tenant, full_name, admission_number, class_id, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(student.id)
        .bind(&student.tenant)
        .bind(&student.full_name)
        .bind(&student.admission_number)
        .bind(student.class_id)
        .bind(student.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(student)
    }

    async fn count_enrolled(&self, class_id: Uuid) -> Result<i64, DatabaseError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM students WHERE class_id = $1 AND is_active")
            .bind(class_id)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    async fn find_exam(&self, id: Uuid) -> Result<Option<Exam>, DatabaseError> {
        let row = sqlx::query_as::<_, ExamRow>("SELECT * FROM exams WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Exam::try_from).transpose()
    }

    async fn create_exam(&self, exam: Exam) -> Result<Exam, DatabaseError> {
        let row = sqlx::query_as::<_, ExamRow>(
            "INSERT INTO exams (id, tenant, exam_name, exam_code, academic_year, term, exam_type, subject_id, \
             subject_system, class_id, max_score) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(exam.id)
        .bind(&exam.tenant)
        .bind(&exam.exam_name)
        .bind(&exam.exam_code)
        .bind(exam.academic_year)
        .bind(enum_to_text(&exam.term)?)
        .bind(enum_to_text(&exam.exam_type)?)
        .bind(exam.subject.id)
        .bind(exam.subject.academic_system.as_str())
        .bind(exam.class_id)
        .bind(exam.max_score)
        .fetch_one(&self.pool)
        .await?;
        Exam::try_from(row)
    }

    async fn find_exam_result(&self, id: Uuid) -> Result<Option<ExamResult>, DatabaseError> {
        let row = sqlx::query_as::<_, ExamResultRow>("SELECT * FROM exam_results WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ExamResult::try_from).transpose()
    }

    async fn save_exam_result(&self, result: ExamResult) -> Result<ExamResult, DatabaseError> {
        let grade = result.grade.map(|g| g.code());
        let row = sqlx::query_as::<_, ExamResultRow>(
            "INSERT INTO exam_results (id, tenant, exam_id, student_id, subject_id, subject_system, class_id, \
             teacher_id, total_marks, max_score, percentage, grade, grade_points, paper_scores, remarks, status, \
             is_absent, is_remarked, remark_date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21) \
             ON CONFLICT (id) DO UPDATE SET exam_id = EXCLUDED.exam_id, student_id = EXCLUDED.student_id, \
             subject_id = EXCLUDED.subject_id, subject_system = EXCLUDED.subject_system, \
             class_id = EXCLUDED.class_id, teacher_id = EXCLUDED.teacher_id, total_marks = EXCLUDED.total_marks, \
             max_score = EXCLUDED.max_score, percentage = EXCLUDED.percentage, grade = EXCLUDED.grade, \
             grade_points = EXCLUDED.grade_points, paper_scores = EXCLUDED.paper_scores, \
             remarks = EXCLUDED.remarks, status = EXCLUDED.status, is_absent = EXCLUDED.is_absent, \
             is_remarked = EXCLUDED.is_remarked, remark_date = EXCLUDED.remark_date, updated_at = now() \
             RETURNING *",
        )
        .bind(result.id)
        .bind(&result.tenant)
        .bind(result.exam)
        .bind(result.student)
        .bind(result.subject.map(|s| s.id))
        .bind(result.subject.map(|s| s.academic_system.as_str()))
        .bind(result.class_id)
        .bind(result.teacher)
        .bind(result.total_marks)
        .bind(result.max_score)
        .bind(result.percentage)
        .bind(grade)
        .bind(result.grade_points.map(i16::from))
        .bind(Json(&result.paper_scores))
        .bind(&result.remarks)
        .bind(enum_to_text(&result.status)?)
        .bind(result.is_absent)
        .bind(result.is_remarked)
        .bind(result.remark_date)
        .bind(result.created_at)
        .bind(result.updated_at)
        .fetch_one(&self.pool)
        .await?;
        ExamResult::try_from(row)
    }

    async fn find_promotion_batch(&self, id: Uuid) -> Result<Option<PromotionBatch>, DatabaseError> {
        let row = sqlx::query_as::<_, BatchRow>("SELECT * FROM promotion_batches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PromotionBatch::try_from).transpose()
    }

    async fn create_promotion_batch(&self, batch: PromotionBatch) -> Result<PromotionBatch, DatabaseError> {
        let row = sqlx::query_as::<_, BatchRow>(
            "INSERT INTO promotion_batches (id, tenant, name, from_academic_year, to_academic_year, from_level_id, \
             to_level_id, promotion_date, promoted_by, total_students, promoted_count, retained_count, status, \
             completed_at, rules, student_details) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) RETURNING *",
        )
        .bind(batch.id)
        .bind(&batch.tenant)
        .bind(&batch.name)
        .bind(batch.from_academic_year)
        .bind(batch.to_academic_year)
        .bind(batch.from_level)
        .bind(batch.to_level)
        .bind(batch.promotion_date)
        .bind(batch.promoted_by)
        .bind(batch.total_students)
        .bind(batch.promoted_count)
        .bind(batch.retained_count)
        .bind(enum_to_text(&batch.status)?)
        .bind(batch.completed_at)
        .bind(Json(&batch.rules))
        .bind(Json(&batch.student_details))
        .fetch_one(&self.pool)
        .await?;
        PromotionBatch::try_from(row)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
