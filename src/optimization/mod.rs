pub mod engine;
pub mod formulas;
