pub mod backfill;
pub mod product;
pub mod records;
pub mod validation;
