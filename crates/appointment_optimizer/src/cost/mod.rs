pub mod cost_breakdown;
pub mod cost_evaluator;
pub mod exponential_cache;
