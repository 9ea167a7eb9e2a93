use tracing::{debug, info, instrument};

use crate::{
    cost::{cost_breakdown::CostBreakdown, cost_evaluator::CostEvaluator, exponential_cache::ExponentialCache},
    problem::{
        error::{ScheduleError, ValidationViolation},
        schedule_request::ScheduleRequest,
    },
};

use super::{
    bounded_minimizer::{BoundedMinimizer, TerminationReason},
    optimal_schedule::OptimalSchedule,
    optimizer_params::OptimizerParams,
};

/// Computes the appointment schedule minimizing
/// `omega * sum(E[I_i]) + (1 - omega) * sum(E[W_i])`.
///
/// Holds no state between calls: every call fits, assembles and optimizes from
/// scratch.
#[derive(Default)]
pub struct ScheduleOptimizer {
    params: OptimizerParams,
}

impl ScheduleOptimizer {
    pub fn new(params: OptimizerParams) -> Self {
        ScheduleOptimizer { params }
    }

    pub fn params(&self) -> &OptimizerParams {
        &self.params
    }

    #[instrument(skip_all, level = "debug")]
    pub fn optimize(&self, request: &ScheduleRequest) -> Result<OptimalSchedule, ScheduleError> {
        request.validate()?;
        validate_service_times(request)?;

        if request.is_single_idle_client() {
            let tau = request.tau();
            debug!(tau, "Single client behind an idle server, closed form");

            let mut schedule = OptimalSchedule::from_inter_arrival_times(
                vec![tau],
                vec![tau],
                request.omega() * tau,
                TerminationReason::ClosedForm,
            );
            schedule.breakdown = Some(single_client_breakdown(request, tau));
            return Ok(schedule);
        }

        let mut evaluator = self.create_evaluator(request)?;
        let (x0, lower_bounds) = initial_guess(request);
        let tolerance = self.params.tolerance_for(request.num_clients());

        debug!(
            clients = request.num_clients(),
            free_variables = x0.len(),
            tolerance,
            "Optimizing schedule"
        );

        let minimizer = BoundedMinimizer::new(tolerance, self.params.terminations.clone());
        let result = minimizer.minimize(|x| evaluator.cost(x), &x0, &lower_bounds);

        evaluator.log_cache_statistics();
        let breakdown = evaluator.evaluate(&result.x);

        let mut inter_arrival_times = request.fixed_inter_arrival_times().to_vec();
        inter_arrival_times.extend_from_slice(&result.x);
        if request.is_idle() && request.fixed_inter_arrival_times().is_empty() {
            inter_arrival_times.insert(0, 0.0);
        }

        info!(
            cost = result.value,
            iterations = result.iterations,
            converged = result.converged(),
            "Optimized schedule"
        );

        let mut schedule = OptimalSchedule::from_inter_arrival_times(
            inter_arrival_times,
            result.x,
            result.value,
            result.termination,
        );
        schedule.iterations = result.iterations;
        schedule.evaluations = result.evaluations;
        schedule.breakdown = Some(breakdown);

        Ok(schedule)
    }

    /// Cost of an arbitrary candidate, given as the free interarrival times
    /// of `request` (what [`OptimalSchedule::free_inter_arrival_times`] holds).
    pub fn evaluate(
        &self,
        request: &ScheduleRequest,
        free_inter_arrival_times: &[f64],
    ) -> Result<CostBreakdown, ScheduleError> {
        request.validate()?;
        validate_service_times(request)?;

        let expected = if request.is_single_idle_client() {
            1
        } else {
            request.num_free_variables()
        };
        if free_inter_arrival_times.len() != expected {
            return Err(ValidationViolation::CandidateLengthMismatch {
                expected,
                actual: free_inter_arrival_times.len(),
            }
            .into());
        }

        if request.is_single_idle_client() {
            return Ok(single_client_breakdown(request, free_inter_arrival_times[0]));
        }

        let mut evaluator = self.create_evaluator(request)?;
        Ok(evaluator.evaluate(free_inter_arrival_times))
    }

    fn create_evaluator(&self, request: &ScheduleRequest) -> Result<CostEvaluator, ScheduleError> {
        let cache = self.params.exponential_cache.then(ExponentialCache::default);
        Ok(CostEvaluator::from_request(request)?.with_cache(cache))
    }
}

pub fn optimal_schedule(request: &ScheduleRequest) -> Result<OptimalSchedule, ScheduleError> {
    ScheduleOptimizer::default().optimize(request)
}

fn validate_service_times(request: &ScheduleRequest) -> Result<(), ScheduleError> {
    for (client, spec) in request.service_times().iter().enumerate() {
        spec.validate(client)?;
    }
    Ok(())
}

/// The server idles for the whole interval before the only client arrives.
fn single_client_breakdown(request: &ScheduleRequest, inter_arrival_time: f64) -> CostBreakdown {
    CostBreakdown::new(
        vec![inter_arrival_time],
        vec![0.0],
        vec![request.means()[0]],
        request.omega(),
    )
}

/// Starting point and lower bounds of the free interarrival times.
///
/// The first free variable follows either the fixed prefix, in which case it
/// starts at and is bounded by `tau`, or the clients in the system, in which
/// case it starts at the first mean plus `k` and is bounded by `tau` whenever a
/// client is in service. Later variables start at their client's mean.
fn initial_guess(request: &ScheduleRequest) -> (Vec<f64>, Vec<f64>) {
    let n = request.num_clients();
    let k = request.clients_in_system();
    let fixed = request.fixed_inter_arrival_times().len();
    let means = request.means();
    let tau = request.tau();

    let (first, first_lower, rest_start) = if fixed > 0 {
        (tau, tau, k + 1 + fixed)
    } else {
        let lower = if k >= 1 { tau } else { 0.0 };
        (means[0] + k as f64, lower, k + 1)
    };

    let mut x0 = vec![first.max(first_lower)];
    x0.extend_from_slice(&means[rest_start..n]);

    let mut lower_bounds = vec![0.0; x0.len()];
    lower_bounds[0] = first_lower;

    (x0, lower_bounds)
}
