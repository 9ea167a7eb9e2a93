use serde::{Deserialize, Serialize};

use super::error::NumericDomainViolation;

/// First two moments of a client's service time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceTimeSpec {
    mean: f64,
    scv: f64,
}

impl ServiceTimeSpec {
    pub fn new(mean: f64, scv: f64) -> Self {
        ServiceTimeSpec { mean, scv }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Squared coefficient of variation, variance / mean^2.
    pub fn scv(&self) -> f64 {
        self.scv
    }

    pub fn validate(&self, client: usize) -> Result<(), NumericDomainViolation> {
        if !(self.mean.is_finite() && self.mean > 0.0) {
            return Err(NumericDomainViolation::NonPositiveMean {
                client,
                mean: self.mean,
            });
        }

        if !(self.scv.is_finite() && self.scv > 0.0) {
            return Err(NumericDomainViolation::NonPositiveScv {
                client,
                scv: self.scv,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(ServiceTimeSpec::new(1.0, 0.5).validate(0).is_ok());
        assert_eq!(
            ServiceTimeSpec::new(0.0, 0.5).validate(2),
            Err(NumericDomainViolation::NonPositiveMean {
                client: 2,
                mean: 0.0
            })
        );
        assert_eq!(
            ServiceTimeSpec::new(1.0, -1.0).validate(1),
            Err(NumericDomainViolation::NonPositiveScv {
                client: 1,
                scv: -1.0
            })
        );
        assert!(ServiceTimeSpec::new(f64::NAN, 1.0).validate(0).is_err());
    }
}
