//! Projected quasi-Newton minimization under independent lower bounds.
//!
//! Variables sitting on their bound with a gradient pushing outwards are held
//! fixed for the iteration; the remaining ones move along a BFGS direction and
//! every trial point is projected back onto the feasible box. Gradients are
//! taken by finite differences, one-sided on the bound.

use jiff::Timestamp;
use ndarray::Array2;
use schemars::JsonSchema;
use serde::Serialize;
use tracing::{debug, trace, warn};

use super::optimizer_params::Termination;

const ARMIJO: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 60;
const BOUND_EPSILON: f64 = 1e-12;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, JsonSchema)]
pub enum TerminationReason {
    /// The projected gradient vanished within tolerance.
    Converged,
    /// The objective stopped changing within tolerance.
    Stalled,
    /// No search is needed, the optimum is known in closed form.
    ClosedForm,
    MaxIterations,
    Deadline,
    /// No descent step could be found even along the steepest descent direction.
    LineSearchFailed,
}

impl TerminationReason {
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            TerminationReason::Converged | TerminationReason::Stalled | TerminationReason::ClosedForm
        )
    }
}

#[derive(Clone, Debug)]
pub struct MinimizerResult {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: TerminationReason,
}

impl MinimizerResult {
    pub fn converged(&self) -> bool {
        self.termination.is_converged()
    }
}

pub struct BoundedMinimizer {
    tolerance: f64,
    terminations: Vec<Termination>,
}

struct CountingObjective<F> {
    objective: F,
    evaluations: usize,
}

impl<F> CountingObjective<F>
where
    F: FnMut(&[f64]) -> f64,
{
    fn call(&mut self, x: &[f64]) -> f64 {
        self.evaluations += 1;
        (self.objective)(x)
    }
}

impl BoundedMinimizer {
    pub fn new(tolerance: f64, terminations: Vec<Termination>) -> Self {
        BoundedMinimizer {
            tolerance,
            terminations,
        }
    }

    pub fn minimize<F>(&self, objective: F, x0: &[f64], lower_bounds: &[f64]) -> MinimizerResult
    where
        F: FnMut(&[f64]) -> f64,
    {
        assert_eq!(x0.len(), lower_bounds.len());

        let mut objective = CountingObjective {
            objective,
            evaluations: 0,
        };
        let n = x0.len();
        let start = Timestamp::now();
        let value_tolerance = self.tolerance * self.tolerance;

        let mut x = project(x0, lower_bounds);
        let mut value = objective.call(&x);
        let mut gradient = finite_difference_gradient(&mut objective, &x, value, lower_bounds);
        let mut inverse_hessian = Array2::<f64>::eye(n);
        let mut is_identity = true;

        let mut iteration = 0;
        let termination = loop {
            if let Some(reason) = self.check_terminations(iteration, start) {
                break reason;
            }

            let active = (0..n)
                .map(|i| x[i] <= lower_bounds[i] + BOUND_EPSILON && gradient[i] > 0.0)
                .collect::<Vec<_>>();
            let projected_gradient = (0..n)
                .map(|i| if active[i] { 0.0 } else { gradient[i] })
                .collect::<Vec<_>>();

            let gradient_norm = infinity_norm(&projected_gradient);
            trace!(iteration, value, gradient_norm, "Minimizer iteration");

            if gradient_norm <= self.tolerance {
                break TerminationReason::Converged;
            }

            let mut direction = quasi_newton_direction(&inverse_hessian, &gradient, &active);
            if dot(&direction, &gradient) >= 0.0 {
                inverse_hessian = Array2::eye(n);
                is_identity = true;
                direction = projected_gradient.iter().map(|g| -g).collect();
            }

            let Some((trial, trial_value)) =
                line_search(&mut objective, &x, value, &gradient, &direction, lower_bounds)
            else {
                if is_identity {
                    break TerminationReason::LineSearchFailed;
                }

                debug!(iteration, "Line search failed, resetting curvature");
                inverse_hessian = Array2::eye(n);
                is_identity = true;
                iteration += 1;
                continue;
            };

            let trial_gradient =
                finite_difference_gradient(&mut objective, &trial, trial_value, lower_bounds);

            let step = sub(&trial, &x);
            let change = sub(&trial_gradient, &gradient);
            let curvature = dot(&step, &change);

            if curvature > f64::EPSILON * norm(&step) * norm(&change) {
                if is_identity {
                    inverse_hessian *= curvature / dot(&change, &change);
                    is_identity = false;
                }
                bfgs_update(&mut inverse_hessian, &step, &change, curvature);
            }

            let decrease = value - trial_value;
            x = trial;
            value = trial_value;
            gradient = trial_gradient;
            iteration += 1;

            if decrease.abs() <= value_tolerance * (1.0 + value.abs()) {
                break TerminationReason::Stalled;
            }
        };

        if !termination.is_converged() {
            warn!(
                ?termination,
                iteration,
                value,
                "Minimizer stopped before convergence"
            );
        }

        MinimizerResult {
            x,
            value,
            iterations: iteration,
            evaluations: objective.evaluations,
            termination,
        }
    }

    fn check_terminations(&self, iteration: usize, start: Timestamp) -> Option<TerminationReason> {
        self.terminations
            .iter()
            .find_map(|termination| match *termination {
                Termination::Iterations(max_iterations) if iteration >= max_iterations => {
                    Some(TerminationReason::MaxIterations)
                }
                Termination::Duration(max_duration)
                    if Timestamp::now().duration_since(start) > max_duration =>
                {
                    Some(TerminationReason::Deadline)
                }
                _ => None,
            })
    }
}

fn quasi_newton_direction(
    inverse_hessian: &Array2<f64>,
    gradient: &[f64],
    active: &[bool],
) -> Vec<f64> {
    let n = gradient.len();
    (0..n)
        .map(|i| {
            if active[i] {
                return 0.0;
            }
            -(0..n)
                .filter(|&j| !active[j])
                .map(|j| inverse_hessian[[i, j]] * gradient[j])
                .sum::<f64>()
        })
        .collect()
}

/// Backtracking along the projected path `P(x + alpha * d)` with an Armijo
/// condition on the actual step taken.
fn line_search<F>(
    objective: &mut CountingObjective<F>,
    x: &[f64],
    value: f64,
    gradient: &[f64],
    direction: &[f64],
    lower_bounds: &[f64],
) -> Option<(Vec<f64>, f64)>
where
    F: FnMut(&[f64]) -> f64,
{
    let mut alpha = 1.0;

    for _ in 0..MAX_BACKTRACKS {
        let candidate = x
            .iter()
            .zip(direction)
            .map(|(xi, di)| xi + alpha * di)
            .collect::<Vec<_>>();
        let trial = project(&candidate, lower_bounds);
        let step = sub(&trial, x);

        if step.iter().all(|s| *s == 0.0) {
            return None;
        }

        let predicted = dot(gradient, &step);
        let trial_value = objective.call(&trial);

        if trial_value.is_finite() && trial_value <= value + ARMIJO * predicted {
            return Some((trial, trial_value));
        }

        alpha *= 0.5;
    }

    None
}

fn bfgs_update(inverse_hessian: &mut Array2<f64>, step: &[f64], change: &[f64], curvature: f64) {
    let n = step.len();
    let rho = 1.0 / curvature;
    let hy = (0..n)
        .map(|i| (0..n).map(|j| inverse_hessian[[i, j]] * change[j]).sum::<f64>())
        .collect::<Vec<_>>();
    let yhy = dot(change, &hy);
    let ss_factor = rho * rho * yhy + rho;

    for i in 0..n {
        for j in 0..n {
            inverse_hessian[[i, j]] +=
                -rho * (step[i] * hy[j] + hy[i] * step[j]) + ss_factor * step[i] * step[j];
        }
    }
}

fn finite_difference_gradient<F>(
    objective: &mut CountingObjective<F>,
    x: &[f64],
    value: f64,
    lower_bounds: &[f64],
) -> Vec<f64>
where
    F: FnMut(&[f64]) -> f64,
{
    let step_factor = f64::EPSILON.cbrt();
    let mut point = x.to_vec();

    (0..x.len())
        .map(|i| {
            let h = step_factor * x[i].abs().max(1.0);

            let derivative = if x[i] - h >= lower_bounds[i] {
                point[i] = x[i] + h;
                let forward = objective.call(&point);
                point[i] = x[i] - h;
                let backward = objective.call(&point);
                (forward - backward) / (2.0 * h)
            } else {
                // second order one-sided difference
                point[i] = x[i] + h;
                let one = objective.call(&point);
                point[i] = x[i] + 2.0 * h;
                let two = objective.call(&point);
                (-3.0 * value + 4.0 * one - two) / (2.0 * h)
            };

            point[i] = x[i];
            derivative
        })
        .collect()
}

fn project(x: &[f64], lower_bounds: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(lower_bounds)
        .map(|(xi, li)| xi.max(*li))
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

fn infinity_norm(a: &[f64]) -> f64 {
    a.iter().fold(0.0, |acc, v| acc.max(v.abs()))
}
