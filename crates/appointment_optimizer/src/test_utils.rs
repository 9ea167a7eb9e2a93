use ndarray::Array2;

use crate::problem::schedule_request::{ScheduleRequest, ScheduleRequestBuilder};

pub fn assert_matrix_close(actual: &Array2<f64>, expected: &Array2<f64>, tolerance: f64) {
    assert_eq!(actual.dim(), expected.dim());
    for ((index, a), e) in actual.indexed_iter().zip(expected.iter()) {
        assert!(
            (a - e).abs() <= tolerance,
            "mismatch at {:?}: {} != {}",
            index,
            a,
            e
        );
    }
}

pub fn create_request(means: Vec<f64>, scvs: Vec<f64>, omega: f64, k: usize) -> ScheduleRequest {
    let mut builder = ScheduleRequestBuilder::default();
    builder
        .set_means(means)
        .set_scvs(scvs)
        .set_omega(omega)
        .set_clients_in_system(k);
    builder.build()
}
