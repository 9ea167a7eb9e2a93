use appointment_optimizer::problem::schedule_request::{ScheduleRequest, ScheduleRequestBuilder};

pub struct TestState {
    pub clients_in_system: usize,
    pub elapsed_service_time: f64,
    pub fixed_inter_arrival_times: Vec<f64>,
    pub tau: f64,
}

impl Default for TestState {
    fn default() -> Self {
        TestState {
            clients_in_system: 0,
            elapsed_service_time: 0.0,
            fixed_inter_arrival_times: vec![],
            tau: 0.0,
        }
    }
}

pub fn create_request(clients: &[(f64, f64)], omega: f64, state: TestState) -> ScheduleRequest {
    let mut builder = ScheduleRequestBuilder::default();
    for &(mean, scv) in clients {
        builder.add_client(mean, scv);
    }
    builder
        .set_omega(omega)
        .set_clients_in_system(state.clients_in_system)
        .set_elapsed_service_time(state.elapsed_service_time)
        .set_fixed_inter_arrival_times(state.fixed_inter_arrival_times)
        .set_tau(state.tau);
    builder.build()
}

/// Alternating low and high variability clients.
pub fn create_mixed_clients(num_clients: usize) -> Vec<(f64, f64)> {
    (0..num_clients)
        .map(|client| {
            let scv = if client % 2 == 0 { 0.4 } else { 1.5 };
            (1.0 + 0.25 * client as f64, scv)
        })
        .collect()
}
