pub mod extracts;
pub mod reporting;
pub mod synthetic;
pub mod tables;
