pub mod insights;
pub mod vendors;
