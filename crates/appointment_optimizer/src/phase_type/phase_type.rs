use ndarray::{Array1, Array2};
use schemars::JsonSchema;
use serde::Serialize;

use crate::problem::{error::NumericDomainViolation, service_time::ServiceTimeSpec};

use super::poisson;

/// Largest Erlang stage count a fit may use. Smaller SCVs are rejected.
pub const MAX_ERLANG_STAGES: usize = 500;

/// Two-moment phase-type fit of a service-time distribution.
///
/// Callers go through [`PhaseType::fit`], [`PhaseType::entry_distribution`] and
/// [`PhaseType::subgenerator`] and never branch on the SCV themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
#[serde(tag = "type")]
pub enum PhaseType {
    /// Used when SCV < 1. `stages` exponential phases with a common `rate`,
    /// after the last of which service ends with probability `p`, otherwise
    /// one extra phase follows. The chain therefore has `stages + 1` phases.
    WeightedErlang { stages: usize, p: f64, rate: f64 },

    /// Used when SCV >= 1. Phase one with probability `p`, phase two otherwise.
    Hyperexponential { p: f64, rate1: f64, rate2: f64 },
}

impl PhaseType {
    pub fn fit(client: usize, spec: &ServiceTimeSpec) -> Result<Self, NumericDomainViolation> {
        spec.validate(client)?;

        let mean = spec.mean();
        let scv = spec.scv();

        if scv < 1.0 {
            let stages = (1.0 / scv).floor();
            if stages > MAX_ERLANG_STAGES as f64 {
                return Err(NumericDomainViolation::TooManyStages {
                    client,
                    scv,
                    stages,
                    max_stages: MAX_ERLANG_STAGES,
                });
            }

            let stages = stages as usize;
            let k = stages as f64;
            // 1 - k * scv can dip below zero when 1 / scv rounds up to an integer
            let discriminant = ((k + 1.0) * (1.0 - k * scv)).max(0.0);
            let p = (((k + 1.0) * scv - discriminant.sqrt()) / (scv + 1.0)).clamp(0.0, 1.0);
            let rate = (k + 1.0 - p) / mean;

            Ok(PhaseType::WeightedErlang { stages, p, rate })
        } else {
            let p = (1.0 + ((scv - 1.0) / (scv + 1.0)).sqrt()) / 2.0;

            Ok(PhaseType::Hyperexponential {
                p,
                rate1: 2.0 * p / mean,
                rate2: 2.0 * (1.0 - p) / mean,
            })
        }
    }

    pub fn num_phases(&self) -> usize {
        match self {
            PhaseType::WeightedErlang { stages, .. } => stages + 1,
            PhaseType::Hyperexponential { .. } => 2,
        }
    }

    pub fn subgenerator(&self) -> Array2<f64> {
        match *self {
            PhaseType::WeightedErlang { stages, p, rate } => {
                let mut t = Array2::<f64>::zeros((stages + 1, stages + 1));
                for i in 0..=stages {
                    t[[i, i]] = -rate;
                }
                for i in 0..stages.saturating_sub(1) {
                    t[[i, i + 1]] = rate;
                }
                t[[stages - 1, stages]] = (1.0 - p) * rate;
                t
            }
            PhaseType::Hyperexponential { rate1, rate2, .. } => {
                let mut t = Array2::<f64>::zeros((2, 2));
                t[[0, 0]] = -rate1;
                t[[1, 1]] = -rate2;
                t
            }
        }
    }

    /// Absorption rates `-T * 1`, one per phase.
    pub fn exit_rates(&self) -> Array1<f64> {
        -self.subgenerator().sum_axis(ndarray::Axis(1))
    }

    pub fn initial_distribution(&self) -> Array1<f64> {
        match *self {
            PhaseType::WeightedErlang { stages, .. } => {
                let mut gamma = Array1::<f64>::zeros(stages + 1);
                gamma[0] = 1.0;
                gamma
            }
            PhaseType::Hyperexponential { p, .. } => Array1::from(vec![p, 1.0 - p]),
        }
    }

    /// Phase occupancy of a client that has been in service for `elapsed`,
    /// conditioned on that service not having finished yet.
    pub fn entry_distribution(&self, elapsed: f64) -> Array1<f64> {
        if elapsed <= 0.0 {
            return self.initial_distribution();
        }

        let ln_weights = match *self {
            PhaseType::WeightedErlang { stages, p, rate } => {
                let lambda = rate * elapsed;
                let mut ln_weights = (0..=stages)
                    .map(|z| poisson::ln_pmf(z, lambda))
                    .collect::<Vec<_>>();
                ln_weights[stages] += (1.0 - p).ln();
                ln_weights
            }
            PhaseType::Hyperexponential { p, rate1, rate2 } => vec![
                p.ln() - rate1 * elapsed,
                (1.0 - p).ln() - rate2 * elapsed,
            ],
        };

        Array1::from(poisson::normalize_ln_weights(&ln_weights))
    }

    /// `P(B > elapsed)` of the fitted distribution.
    pub fn survival(&self, elapsed: f64) -> f64 {
        match *self {
            PhaseType::WeightedErlang { stages, p, rate } => {
                let lambda = rate * elapsed.max(0.0);
                poisson::cdf(stages - 1, lambda) + (1.0 - p) * poisson::pmf(stages, lambda)
            }
            PhaseType::Hyperexponential { p, rate1, rate2 } => {
                let elapsed = elapsed.max(0.0);
                p * (-rate1 * elapsed).exp() + (1.0 - p) * (-rate2 * elapsed).exp()
            }
        }
    }

    pub fn mean(&self) -> f64 {
        match *self {
            PhaseType::WeightedErlang { stages, p, rate } => (stages as f64 + 1.0 - p) / rate,
            PhaseType::Hyperexponential { p, rate1, rate2 } => p / rate1 + (1.0 - p) / rate2,
        }
    }

    pub fn second_moment(&self) -> f64 {
        match *self {
            PhaseType::WeightedErlang { stages, p, rate } => {
                let k = stages as f64;
                (p * k * (k + 1.0) + (1.0 - p) * (k + 1.0) * (k + 2.0)) / (rate * rate)
            }
            PhaseType::Hyperexponential { p, rate1, rate2 } => {
                2.0 * p / (rate1 * rate1) + 2.0 * (1.0 - p) / (rate2 * rate2)
            }
        }
    }

    pub fn scv(&self) -> f64 {
        let mean = self.mean();
        self.second_moment() / (mean * mean) - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(mean: f64, scv: f64) -> PhaseType {
        PhaseType::fit(0, &ServiceTimeSpec::new(mean, scv)).unwrap()
    }

    #[test]
    fn test_branch_selection() {
        assert!(matches!(
            fit(1.0, 0.5),
            PhaseType::WeightedErlang { stages: 2, .. }
        ));
        assert!(matches!(
            fit(1.0, 0.3),
            PhaseType::WeightedErlang { stages: 3, .. }
        ));
        assert!(matches!(fit(1.0, 1.5), PhaseType::Hyperexponential { .. }));
    }

    #[test]
    fn test_tiny_scv_is_rejected() {
        assert!(matches!(
            fit(1.0, 0.0021),
            PhaseType::WeightedErlang { stages: 476, .. }
        ));
        assert!(matches!(
            PhaseType::fit(3, &ServiceTimeSpec::new(1.0, 1e-12)),
            Err(NumericDomainViolation::TooManyStages {
                client: 3,
                max_stages: MAX_ERLANG_STAGES,
                ..
            })
        ));
    }

    #[test]
    fn test_scv_one_is_hyperexponential_with_equal_rates() {
        let phase_type = fit(2.0, 1.0);

        assert_eq!(
            phase_type,
            PhaseType::Hyperexponential {
                p: 0.5,
                rate1: 0.5,
                rate2: 0.5
            }
        );
    }

    #[test]
    fn test_fit_matches_two_moments() {
        for &(mean, scv) in &[(1.0, 0.2), (0.7, 0.45), (3.0, 0.9), (1.0, 1.0), (2.5, 2.0)] {
            let phase_type = fit(mean, scv);

            assert!((phase_type.mean() - mean).abs() < 1e-9, "mean {mean} scv {scv}");
            assert!((phase_type.scv() - scv).abs() < 1e-9, "mean {mean} scv {scv}");
        }
    }

    #[test]
    fn test_entry_distribution_sums_to_one() {
        for &scv in &[0.2, 0.33, 0.5, 0.8, 0.99, 1.0, 1.4, 2.0] {
            for &elapsed in &[0.0, 0.1, 1.0, 5.0, 50.0] {
                let gamma = fit(1.3, scv).entry_distribution(elapsed);

                assert!(
                    (gamma.sum() - 1.0).abs() < 1e-9,
                    "scv {scv} elapsed {elapsed}"
                );
                assert!(gamma.iter().all(|&g| g >= 0.0));
            }
        }
    }

    #[test]
    fn test_entry_distribution_at_zero_is_unconditional() {
        for &scv in &[0.3, 0.5, 1.0, 1.8] {
            let phase_type = fit(1.0, scv);

            assert_eq!(
                phase_type.entry_distribution(0.0),
                phase_type.initial_distribution()
            );
        }
    }

    #[test]
    fn test_aged_hyperexponential_shifts_mass_to_slow_phase() {
        let phase_type = fit(1.0, 2.0);
        let fresh = phase_type.entry_distribution(0.0);
        let aged = phase_type.entry_distribution(2.0);

        // phase one is the fast phase
        assert!(aged[0] < fresh[0]);
        assert!(aged[1] > fresh[1]);
    }

    #[test]
    fn test_aged_erlang_matches_survival_conditioning() {
        let phase_type = fit(1.0, 0.4);
        let PhaseType::WeightedErlang { stages, p, rate } = phase_type else {
            panic!("expected weighted Erlang");
        };
        let elapsed = 0.6;
        let survival = phase_type.survival(elapsed);
        let gamma = phase_type.entry_distribution(elapsed);

        for z in 0..stages {
            let expected = poisson::pmf(z, rate * elapsed) / survival;
            assert!((gamma[z] - expected).abs() < 1e-12);
        }
        let expected_last = (1.0 - p) * poisson::pmf(stages, rate * elapsed) / survival;
        assert!((gamma[stages] - expected_last).abs() < 1e-12);
    }

    #[test]
    fn test_subgenerator_rows() {
        let phase_type = fit(1.0, 0.4);
        let t = phase_type.subgenerator();
        let exit = phase_type.exit_rates();

        for i in 0..t.nrows() {
            assert!(t[[i, i]] < 0.0);
            assert!(t.row(i).sum() <= 1e-12);
            assert!(exit[i] >= -1e-12);
        }
    }

    #[test]
    fn test_rejects_non_positive_moments() {
        assert!(PhaseType::fit(4, &ServiceTimeSpec::new(-1.0, 1.0)).is_err());
        assert_eq!(
            PhaseType::fit(4, &ServiceTimeSpec::new(1.0, 0.0)),
            Err(NumericDomainViolation::NonPositiveScv {
                client: 4,
                scv: 0.0
            })
        );
    }
}
