use schemars::JsonSchema;
use serde::Serialize;

/// Per-client expectations of one candidate schedule, client 0 first.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct CostBreakdown {
    /// Expected server idle time right before each client's arrival.
    pub idle: Vec<f64>,

    /// Expected waiting time of each client, excluding its own service.
    pub waiting: Vec<f64>,

    /// Expected time in system of each client, measured from its arrival.
    pub sojourn: Vec<f64>,

    pub omega: f64,
    pub cost: f64,
}

impl CostBreakdown {
    pub fn new(idle: Vec<f64>, waiting: Vec<f64>, sojourn: Vec<f64>, omega: f64) -> Self {
        let mut breakdown = CostBreakdown {
            idle,
            waiting,
            sojourn,
            omega,
            cost: 0.0,
        };
        breakdown.cost = omega * breakdown.total_idle() + (1.0 - omega) * breakdown.total_waiting();
        breakdown
    }

    pub fn total_idle(&self) -> f64 {
        self.idle.iter().sum()
    }

    pub fn total_waiting(&self) -> f64 {
        self.waiting.iter().sum()
    }
}
