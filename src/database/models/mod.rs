pub mod academic_level;
pub mod class;
pub mod exam;
pub mod exam_result;
pub mod promotion_batch;
pub mod stream;
pub mod student;

pub use academic_level::AcademicLevel;
pub use class::{Class, Lineage, PromotionStatus};
pub use exam::{Exam, ExamType, SubjectRef, Term};
pub use exam_result::{ExamResult, PaperScore, ResultStatus};
pub use promotion_batch::{
    BatchStatus, PromotionBatch, PromotionCriteria, PromotionRules, StudentOutcome, StudentPerformance,
    StudentPromotion, MAX_BATCH_YEAR, MIN_BATCH_YEAR,
};
pub use stream::ClassStream;
pub use student::Student;
