use super::{error::ValidationViolation, service_time::ServiceTimeSpec};

/// Immutable input of one optimization run.
///
/// Clients are indexed in service order. The first `clients_in_system` of them
/// are already present at time zero, the very first one possibly in service for
/// `elapsed_service_time` already. `fixed_inter_arrival_times` are the
/// interarrival times that are already agreed upon for the clients following
/// them; the optimizer only decides the remaining ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    means: Vec<f64>,
    scvs: Vec<f64>,
    omega: f64,
    fixed_inter_arrival_times: Vec<f64>,
    tau: f64,
    clients_in_system: usize,
    elapsed_service_time: f64,
}

impl ScheduleRequest {
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scvs(&self) -> &[f64] {
        &self.scvs
    }

    /// Weight of the expected idle time, the waiting time is weighted by `1 - omega`.
    pub fn omega(&self) -> f64 {
        self.omega
    }

    pub fn fixed_inter_arrival_times(&self) -> &[f64] {
        &self.fixed_inter_arrival_times
    }

    /// Minimum time until the first arrival the optimizer is free to choose.
    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// `k`, the number of clients already in the system.
    pub fn clients_in_system(&self) -> usize {
        self.clients_in_system
    }

    /// `u`, how long the client in service has been served already.
    pub fn elapsed_service_time(&self) -> f64 {
        self.elapsed_service_time
    }

    /// `n`, the number of clients in the sequence.
    pub fn num_clients(&self) -> usize {
        self.means.len()
    }

    pub fn service_times(&self) -> Vec<ServiceTimeSpec> {
        self.means
            .iter()
            .zip(self.scvs.iter())
            .map(|(&mean, &scv)| ServiceTimeSpec::new(mean, scv))
            .collect()
    }

    /// Number of interarrival times left to the optimizer.
    pub fn num_free_variables(&self) -> usize {
        self.num_clients()
            .saturating_sub(self.clients_in_system)
            .saturating_sub(self.fixed_inter_arrival_times.len())
    }

    pub fn is_idle(&self) -> bool {
        self.clients_in_system == 0 && self.elapsed_service_time == 0.0
    }

    /// One client left to schedule behind a server that is about to become idle.
    /// The answer is known in closed form and the request is exempt from `k < n`.
    pub fn is_single_idle_client(&self) -> bool {
        self.num_clients() == 1
            && self.clients_in_system == 1
            && self.elapsed_service_time == 0.0
            && self.fixed_inter_arrival_times.is_empty()
    }

    pub fn validate(&self) -> Result<(), ValidationViolation> {
        self.validate_values()?;

        if self.is_single_idle_client() {
            return Ok(());
        }

        self.validate_state()
    }

    fn validate_values(&self) -> Result<(), ValidationViolation> {
        if self.means.is_empty() {
            return Err(ValidationViolation::EmptyClients);
        }

        if self.means.len() != self.scvs.len() {
            return Err(ValidationViolation::LengthMismatch {
                means: self.means.len(),
                scvs: self.scvs.len(),
            });
        }

        if !self.omega.is_finite() {
            return Err(ValidationViolation::NonFiniteInput { field: "omega" });
        }
        if !self.tau.is_finite() {
            return Err(ValidationViolation::NonFiniteInput { field: "tau" });
        }
        if !self.elapsed_service_time.is_finite() {
            return Err(ValidationViolation::NonFiniteInput {
                field: "elapsed_service_time",
            });
        }
        if self.fixed_inter_arrival_times.iter().any(|t| !t.is_finite()) {
            return Err(ValidationViolation::NonFiniteInput {
                field: "fixed_inter_arrival_times",
            });
        }

        if self.omega <= 0.0 || self.omega >= 1.0 {
            return Err(ValidationViolation::WeightOutOfRange { omega: self.omega });
        }

        if self.elapsed_service_time < 0.0 {
            return Err(ValidationViolation::NegativeElapsedTime {
                u: self.elapsed_service_time,
            });
        }

        if self.tau < 0.0 {
            return Err(ValidationViolation::NegativeTau { tau: self.tau });
        }

        for (index, &value) in self.fixed_inter_arrival_times.iter().enumerate() {
            if value < 0.0 {
                return Err(ValidationViolation::NegativeFixedTime { index, value });
            }
        }

        for (index, window) in self.fixed_inter_arrival_times.windows(2).enumerate() {
            if window[0] >= window[1] {
                return Err(ValidationViolation::FixedPrefixNotIncreasing {
                    index: index + 1,
                    previous: window[0],
                    current: window[1],
                });
            }
        }

        if let Some(&last) = self.fixed_inter_arrival_times.last() {
            if self.tau < last {
                return Err(ValidationViolation::TauBeforeLastFixedTime {
                    tau: self.tau,
                    last,
                });
            }
        }

        Ok(())
    }

    fn validate_state(&self) -> Result<(), ValidationViolation> {
        let n = self.num_clients();
        let k = self.clients_in_system;

        if k >= n {
            return Err(ValidationViolation::ClientsInSystemNotLessThanTotal { k, n });
        }

        if k == 0 && self.elapsed_service_time > 0.0 {
            return Err(ValidationViolation::ElapsedTimeWithoutClientInService {
                u: self.elapsed_service_time,
            });
        }

        if self.fixed_inter_arrival_times.len() >= n - k {
            return Err(ValidationViolation::FixedPrefixTooLong {
                fixed: self.fixed_inter_arrival_times.len(),
                remaining: n - k,
            });
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct ScheduleRequestBuilder {
    means: Option<Vec<f64>>,
    scvs: Option<Vec<f64>>,
    omega: Option<f64>,
    fixed_inter_arrival_times: Option<Vec<f64>>,
    tau: Option<f64>,
    clients_in_system: Option<usize>,
    elapsed_service_time: Option<f64>,
}

impl ScheduleRequestBuilder {
    pub fn set_means(&mut self, means: Vec<f64>) -> &mut ScheduleRequestBuilder {
        self.means = Some(means);
        self
    }

    pub fn set_scvs(&mut self, scvs: Vec<f64>) -> &mut ScheduleRequestBuilder {
        self.scvs = Some(scvs);
        self
    }

    pub fn add_client(&mut self, mean: f64, scv: f64) -> &mut ScheduleRequestBuilder {
        self.means.get_or_insert_with(Vec::new).push(mean);
        self.scvs.get_or_insert_with(Vec::new).push(scv);
        self
    }

    pub fn set_omega(&mut self, omega: f64) -> &mut ScheduleRequestBuilder {
        self.omega = Some(omega);
        self
    }

    pub fn set_fixed_inter_arrival_times(
        &mut self,
        fixed_inter_arrival_times: Vec<f64>,
    ) -> &mut ScheduleRequestBuilder {
        self.fixed_inter_arrival_times = Some(fixed_inter_arrival_times);
        self
    }

    pub fn set_tau(&mut self, tau: f64) -> &mut ScheduleRequestBuilder {
        self.tau = Some(tau);
        self
    }

    pub fn set_clients_in_system(&mut self, k: usize) -> &mut ScheduleRequestBuilder {
        self.clients_in_system = Some(k);
        self
    }

    pub fn set_elapsed_service_time(&mut self, u: f64) -> &mut ScheduleRequestBuilder {
        self.elapsed_service_time = Some(u);
        self
    }

    /// Missing optional fields default to an empty fixed prefix, `tau = 0`,
    /// `k = 0`, `u = 0` and `omega = 0.5`.
    pub fn build(&self) -> ScheduleRequest {
        ScheduleRequest {
            means: self.means.clone().unwrap_or_default(),
            scvs: self.scvs.clone().unwrap_or_default(),
            omega: self.omega.unwrap_or(0.5),
            fixed_inter_arrival_times: self.fixed_inter_arrival_times.clone().unwrap_or_default(),
            tau: self.tau.unwrap_or(0.0),
            clients_in_system: self.clients_in_system.unwrap_or(0),
            elapsed_service_time: self.elapsed_service_time.unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(n: usize, k: usize) -> ScheduleRequestBuilder {
        let mut builder = ScheduleRequestBuilder::default();
        builder
            .set_means(vec![1.0; n])
            .set_scvs(vec![1.0; n])
            .set_clients_in_system(k);
        builder
    }

    #[test]
    fn test_rejects_k_not_less_than_n() {
        let error = request(2, 3).build().validate().unwrap_err();

        assert_eq!(
            error,
            ValidationViolation::ClientsInSystemNotLessThanTotal { k: 3, n: 2 }
        );
        assert!(error.to_string().contains("k < n"));
    }

    #[test]
    fn test_single_idle_client_is_exempt_from_k_less_than_n() {
        let request = request(1, 1).set_tau(2.0).build();

        assert!(request.is_single_idle_client());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_rejects_elapsed_time_on_empty_system() {
        let error = request(3, 0)
            .set_elapsed_service_time(0.5)
            .build()
            .validate()
            .unwrap_err();

        assert!(matches!(
            error,
            ValidationViolation::ElapsedTimeWithoutClientInService { .. }
        ));
    }

    #[test]
    fn test_rejects_non_increasing_prefix() {
        let error = request(5, 1)
            .set_fixed_inter_arrival_times(vec![0.5, 0.5])
            .set_tau(1.0)
            .build()
            .validate()
            .unwrap_err();

        assert_eq!(
            error,
            ValidationViolation::FixedPrefixNotIncreasing {
                index: 1,
                previous: 0.5,
                current: 0.5
            }
        );
    }

    #[test]
    fn test_rejects_prefix_without_free_variable() {
        let error = request(3, 1)
            .set_fixed_inter_arrival_times(vec![0.5, 1.0])
            .set_tau(1.0)
            .build()
            .validate()
            .unwrap_err();

        assert_eq!(
            error,
            ValidationViolation::FixedPrefixTooLong {
                fixed: 2,
                remaining: 2
            }
        );
    }

    #[test]
    fn test_rejects_tau_before_last_fixed_time() {
        let error = request(4, 1)
            .set_fixed_inter_arrival_times(vec![0.5, 1.0])
            .set_tau(0.8)
            .build()
            .validate()
            .unwrap_err();

        assert!(matches!(
            error,
            ValidationViolation::TauBeforeLastFixedTime { .. }
        ));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let error = request(3, 0)
            .set_scvs(vec![1.0, 1.0])
            .build()
            .validate()
            .unwrap_err();

        assert_eq!(
            error,
            ValidationViolation::LengthMismatch { means: 3, scvs: 2 }
        );
    }

    #[test]
    fn test_rejects_omega_outside_unit_interval() {
        for omega in [0.0, 1.0, -0.2, 1.5] {
            let error = request(2, 0).set_omega(omega).build().validate();
            assert_eq!(
                error,
                Err(ValidationViolation::WeightOutOfRange { omega })
            );
        }
    }

    #[test]
    fn test_num_free_variables() {
        let request = request(6, 2)
            .set_fixed_inter_arrival_times(vec![0.5, 1.0])
            .set_tau(1.0)
            .build();

        assert!(request.validate().is_ok());
        assert_eq!(request.num_free_variables(), 2);
    }
}
