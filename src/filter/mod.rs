pub mod class_filter;
pub mod types;

pub use class_filter::ClassFilter;
pub use types::{FilterValue, SortDirection, SqlResult};
