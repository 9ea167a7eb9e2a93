use schemars::JsonSchema;
use serde::Serialize;

use crate::cost::cost_breakdown::CostBreakdown;

use super::bounded_minimizer::TerminationReason;

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct OptimalSchedule {
    /// Cumulative sums of `inter_arrival_times`, measured from now.
    ///
    /// When the system starts empty without a fixed prefix, index 0 is the
    /// arrival of client 0 at time zero and index 1 carries the slot of
    /// client 0 itself, which has no predecessor and is never optimized: it
    /// stays at `means[0]`. Client `i >= 1` is then at index `i + 1`. In every
    /// other case index `j` is the arrival of client `k + j`, `k` being the
    /// number of clients already in the system.
    pub arrival_times: Vec<f64>,

    /// Fixed prefix followed by the optimized interarrival times, left-padded
    /// with a zero when the system started empty without a fixed prefix.
    pub inter_arrival_times: Vec<f64>,

    /// The decision variables as returned by the minimizer.
    pub free_inter_arrival_times: Vec<f64>,

    pub cost: f64,

    /// `false` when the minimizer gave up early; the schedule is then the best
    /// point it reached.
    pub converged: bool,
    pub termination: TerminationReason,
    pub iterations: usize,
    pub evaluations: usize,

    pub breakdown: Option<CostBreakdown>,
}

impl OptimalSchedule {
    pub fn from_inter_arrival_times(
        inter_arrival_times: Vec<f64>,
        free_inter_arrival_times: Vec<f64>,
        cost: f64,
        termination: TerminationReason,
    ) -> Self {
        let arrival_times = inter_arrival_times
            .iter()
            .scan(0.0, |time, x| {
                *time += x;
                Some(*time)
            })
            .collect();

        OptimalSchedule {
            arrival_times,
            inter_arrival_times,
            free_inter_arrival_times,
            cost,
            converged: termination.is_converged(),
            termination,
            iterations: 0,
            evaluations: 0,
            breakdown: None,
        }
    }
}
