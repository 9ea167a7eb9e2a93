use jiff::SignedDuration;

/// Convergence tolerance for instances of up to [`LARGE_INSTANCE_CLIENTS`] clients.
pub const TIGHT_TOLERANCE: f64 = 1e-6;

/// Convergence tolerance for larger instances, trading accuracy for runtime.
pub const LOOSE_TOLERANCE: f64 = 1e-4;

pub const LARGE_INSTANCE_CLIENTS: usize = 30;

#[derive(Clone, Debug)]
pub struct OptimizerParams {
    pub terminations: Vec<Termination>,

    /// Overrides the tolerance that is otherwise picked from the instance size.
    pub tolerance: Option<f64>,

    /// Reuse matrix exponentials between objective evaluations.
    pub exponential_cache: bool,
}

#[derive(Clone, Debug)]
pub enum Termination {
    Duration(SignedDuration),
    Iterations(usize),
}

impl OptimizerParams {
    pub fn tolerance_for(&self, num_clients: usize) -> f64 {
        self.tolerance.unwrap_or(if num_clients > LARGE_INSTANCE_CLIENTS {
            LOOSE_TOLERANCE
        } else {
            TIGHT_TOLERANCE
        })
    }
}

impl Default for OptimizerParams {
    fn default() -> Self {
        Self {
            terminations: vec![Termination::Iterations(500)],
            tolerance: None,
            exponential_cache: true,
        }
    }
}
