pub mod abc;
pub mod config;
pub mod diagnostics;
pub mod reconcile;
pub mod stages;
