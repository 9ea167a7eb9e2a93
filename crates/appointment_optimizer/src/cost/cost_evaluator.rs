use ndarray::{Array1, s};
use tracing::debug;

use crate::{
    chain::joint_chain::{ChainPiece, JointChain},
    linalg::matrix_exponential::expm_scaled,
    phase_type::phase_type::PhaseType,
    problem::{error::ScheduleError, schedule_request::ScheduleRequest},
};

use super::{cost_breakdown::CostBreakdown, exponential_cache::ExponentialCache};

/// Expected idle and waiting times of a candidate schedule.
///
/// The candidate only holds the free interarrival times; the evaluator pads
/// them with one zero slot per client already in the system and the fixed
/// prefix, so that slot `i` is the time between the arrivals of clients
/// `i - 1` and `i`. Slot 0 has no predecessor and does not enter the cost.
pub struct CostEvaluator {
    chain: JointChain,
    means: Vec<f64>,
    omega: f64,
    clients_in_system: usize,
    fixed_inter_arrival_times: Vec<f64>,
    cache: Option<ExponentialCache>,
    evaluations: usize,
}

impl CostEvaluator {
    pub fn new(
        chain: JointChain,
        means: Vec<f64>,
        omega: f64,
        clients_in_system: usize,
        fixed_inter_arrival_times: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(chain.num_clients(), means.len());

        CostEvaluator {
            chain,
            means,
            omega,
            clients_in_system,
            fixed_inter_arrival_times,
            cache: Some(ExponentialCache::default()),
            evaluations: 0,
        }
    }

    /// Fits every client, assembles the joint chain and wraps it. Only the
    /// first client is aged by the elapsed service time.
    pub fn from_request(request: &ScheduleRequest) -> Result<Self, ScheduleError> {
        let pieces = request
            .service_times()
            .iter()
            .enumerate()
            .map(|(client, spec)| {
                let phase_type = PhaseType::fit(client, spec)?;
                let elapsed = if client == 0 {
                    request.elapsed_service_time()
                } else {
                    0.0
                };
                Ok(ChainPiece::from_phase_type(&phase_type, elapsed))
            })
            .collect::<Result<Vec<_>, ScheduleError>>()?;

        let chain = JointChain::assemble(pieces)?;

        Ok(CostEvaluator::new(
            chain,
            request.means().to_vec(),
            request.omega(),
            request.clients_in_system(),
            request.fixed_inter_arrival_times().to_vec(),
        ))
    }

    pub fn with_cache(mut self, cache: Option<ExponentialCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn chain(&self) -> &JointChain {
        &self.chain
    }

    pub fn cache(&self) -> Option<&ExponentialCache> {
        self.cache.as_ref()
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn num_clients(&self) -> usize {
        self.chain.num_clients()
    }

    pub fn num_free_variables(&self) -> usize {
        self.num_clients() - self.clients_in_system - self.fixed_inter_arrival_times.len()
    }

    /// Full interarrival vector, one slot per client.
    pub fn inter_arrival_times(&self, free: &[f64]) -> Vec<f64> {
        let mut times = Vec::with_capacity(self.num_clients());
        times.resize(self.clients_in_system, 0.0);
        times.extend_from_slice(&self.fixed_inter_arrival_times);
        times.extend_from_slice(free);
        times
    }

    pub fn cost(&mut self, free: &[f64]) -> f64 {
        self.evaluate(free).cost
    }

    pub fn evaluate(&mut self, free: &[f64]) -> CostBreakdown {
        self.evaluations += 1;

        let x = self.inter_arrival_times(free);
        let n = self.num_clients();
        debug_assert_eq!(x.len(), n);

        let mut occupancy = self.chain.entry(0).to_owned();
        let mut sojourn = Vec::with_capacity(n);
        sojourn.push(self.expected_sojourn(0, &occupancy));

        for client in 1..n {
            let remaining = self.propagate(client - 1, x[client], &occupancy);
            let absorbed = 1.0 - remaining.sum();
            let split = remaining.len();

            let mut next = Array1::<f64>::zeros(self.chain.block_end(client));
            next.slice_mut(s![..split]).assign(&remaining);
            next.slice_mut(s![split..])
                .assign(&(&self.chain.entry(client) * absorbed));

            occupancy = next;
            sojourn.push(self.expected_sojourn(client, &occupancy));
        }

        let mut idle = vec![0.0; n];
        let mut waiting = vec![0.0; n];
        for client in 1..n {
            waiting[client] = sojourn[client] - self.means[client];
            idle[client] = x[client] + waiting[client] - sojourn[client - 1];
        }

        CostBreakdown::new(idle, waiting, sojourn, self.omega)
    }

    /// Occupancy of the phases of clients `0..=client` after `elapsed` more time.
    fn propagate(&mut self, client: usize, elapsed: f64, occupancy: &Array1<f64>) -> Array1<f64> {
        let block = self.chain.leading_block(client);

        match self.cache.as_mut() {
            Some(cache) => {
                occupancy.dot(cache.get_or_compute(client, elapsed, || {
                    expm_scaled(&block, elapsed)
                }))
            }
            None => occupancy.dot(&expm_scaled(&block, elapsed)),
        }
    }

    /// Mean time to absorption of the leading block under `occupancy`.
    fn expected_sojourn(&self, client: usize, occupancy: &Array1<f64>) -> f64 {
        -occupancy.dot(&self.chain.leading_inverse(client)).sum()
    }

    pub fn log_cache_statistics(&self) {
        if let Some(cache) = &self.cache {
            debug!(
                evaluations = self.evaluations,
                hits = cache.hits(),
                misses = cache.misses(),
                "Exponential cache"
            );
        }
    }
}
