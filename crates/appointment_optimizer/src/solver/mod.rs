pub mod bounded_minimizer;
pub mod optimal_schedule;
pub mod optimizer_params;
pub mod schedule_optimizer;
