//! Annual class promotion: selection, per-class promotion with lineage
//! bookkeeping, and the batch orchestrator that ties them together.

pub mod error;
pub mod guard;
pub mod lineage;
pub mod orchestrator;
pub mod promoter;
pub mod selector;

pub use error::PromotionError;
pub use guard::{CalendarWindowGuard, Clock, FixedClock, PromotionGuard, SystemClock};
pub use lineage::LineageView;
pub use orchestrator::{PromotionOrchestrator, PromotionPreview, PromotionSummary, SinglePromotion};
pub use promoter::{PromotionOutcome, Promoter};
pub use selector::Selection;
