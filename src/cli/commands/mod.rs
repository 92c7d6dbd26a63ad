pub mod grade;
pub mod promote;
pub mod token;
