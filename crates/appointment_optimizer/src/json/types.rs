use schemars::JsonSchema;
use serde::Deserialize;

use crate::problem::schedule_request::{ScheduleRequest, ScheduleRequestBuilder};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "ScheduleRequest")]
pub struct JsonScheduleRequest {
    /// Mean service time of each client, in service order.
    pub means: Vec<f64>,

    /// Squared coefficient of variation of each client's service time.
    pub scvs: Vec<f64>,

    /// Weight of the idle time against the waiting time, defaults to 0.5.
    pub omega: Option<f64>,

    #[serde(default)]
    pub fixed_inter_arrival_times: Vec<f64>,

    pub tau: Option<f64>,

    /// Number of clients already in the system, `k`.
    pub clients_in_system: Option<usize>,

    /// Time the client in service has been served already, `u`.
    pub elapsed_service_time: Option<f64>,
}

impl From<JsonScheduleRequest> for ScheduleRequest {
    fn from(value: JsonScheduleRequest) -> Self {
        let mut builder = ScheduleRequestBuilder::default();
        builder
            .set_means(value.means)
            .set_scvs(value.scvs)
            .set_fixed_inter_arrival_times(value.fixed_inter_arrival_times);

        if let Some(omega) = value.omega {
            builder.set_omega(omega);
        }
        if let Some(tau) = value.tau {
            builder.set_tau(tau);
        }
        if let Some(k) = value.clients_in_system {
            builder.set_clients_in_system(k);
        }
        if let Some(u) = value.elapsed_service_time {
            builder.set_elapsed_service_time(u);
        }

        builder.build()
    }
}
