use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("Invalid input: {0}")]
    InputValidation(#[from] ValidationViolation),

    #[error("Numeric domain error: {0}")]
    NumericDomain(#[from] NumericDomainViolation),

    #[error("Joint chain matrix is singular")]
    SingularChain,
}

impl ScheduleError {
    pub fn is_input_validation(&self) -> bool {
        matches!(self, ScheduleError::InputValidation(_))
    }

    pub fn is_numeric_domain(&self) -> bool {
        matches!(self, ScheduleError::NumericDomain(_))
    }

    pub fn validation_violation(&self) -> Option<&ValidationViolation> {
        match self {
            ScheduleError::InputValidation(violation) => Some(violation),
            _ => None,
        }
    }
}

/// Structural constraints on a [`crate::problem::schedule_request::ScheduleRequest`].
/// Each variant names the constraint it guards.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationViolation {
    #[error("at least one client is required")]
    EmptyClients,

    #[error("`means` and `scvs` must have the same length (means = {means}, scvs = {scvs})")]
    LengthMismatch { means: usize, scvs: usize },

    #[error("constraint `k < n` violated (k = {k}, n = {n})")]
    ClientsInSystemNotLessThanTotal { k: usize, n: usize },

    #[error("constraint `u = 0 when k = 0` violated (u = {u})")]
    ElapsedTimeWithoutClientInService { u: f64 },

    #[error("constraint `u >= 0` violated (u = {u})")]
    NegativeElapsedTime { u: f64 },

    #[error(
        "constraint `fixed inter-arrival times strictly increasing` violated at index {index} ({previous} >= {current})"
    )]
    FixedPrefixNotIncreasing {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("constraint `fixed inter-arrival times >= 0` violated at index {index} ({value})")]
    NegativeFixedTime { index: usize, value: f64 },

    #[error("constraint `fixed inter-arrival times < n - k` violated (fixed = {fixed}, n - k = {remaining})")]
    FixedPrefixTooLong { fixed: usize, remaining: usize },

    #[error("constraint `tau >= last fixed inter-arrival time` violated (tau = {tau}, last = {last})")]
    TauBeforeLastFixedTime { tau: f64, last: f64 },

    #[error("constraint `tau >= 0` violated (tau = {tau})")]
    NegativeTau { tau: f64 },

    #[error("constraint `0 < omega < 1` violated (omega = {omega})")]
    WeightOutOfRange { omega: f64 },

    #[error("`{field}` must be finite")]
    NonFiniteInput { field: &'static str },

    #[error("expected {expected} free inter-arrival times, got {actual}")]
    CandidateLengthMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericDomainViolation {
    #[error("mean service time of client {client} must be positive and finite (mean = {mean})")]
    NonPositiveMean { client: usize, mean: f64 },

    #[error("SCV of client {client} must be positive and finite (scv = {scv})")]
    NonPositiveScv { client: usize, scv: f64 },

    #[error(
        "SCV of client {client} needs {stages} Erlang stages, at most {max_stages} are supported (scv = {scv})"
    )]
    TooManyStages {
        client: usize,
        scv: f64,
        stages: f64,
        max_stages: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let validation: ScheduleError =
            ValidationViolation::ClientsInSystemNotLessThanTotal { k: 3, n: 2 }.into();
        let numeric: ScheduleError =
            NumericDomainViolation::NonPositiveMean { client: 0, mean: 0.0 }.into();

        assert!(validation.is_input_validation());
        assert!(!validation.is_numeric_domain());
        assert!(numeric.is_numeric_domain());
        assert!(validation.to_string().contains("k < n"));
    }
}
