use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};
use tracing::debug;

use crate::{
    linalg::lu, phase_type::phase_type::PhaseType, problem::error::ScheduleError, timer_debug,
};

/// Entry distribution and subgenerator of one client in the sequence.
#[derive(Debug, Clone)]
pub struct ChainPiece {
    pub entry: Array1<f64>,
    pub subgenerator: Array2<f64>,
}

impl ChainPiece {
    pub fn new(entry: Array1<f64>, subgenerator: Array2<f64>) -> Self {
        debug_assert_eq!(entry.len(), subgenerator.nrows());
        ChainPiece {
            entry,
            subgenerator,
        }
    }

    /// `elapsed` is only non-zero for the client currently in service.
    pub fn from_phase_type(phase_type: &PhaseType, elapsed: f64) -> Self {
        ChainPiece::new(
            phase_type.entry_distribution(elapsed),
            phase_type.subgenerator(),
        )
    }

    pub fn num_phases(&self) -> usize {
        self.entry.len()
    }
}

/// The block matrix `Vn` chaining the service processes of all clients.
///
/// Diagonal block `i` is the subgenerator of client `i`; the block right of it
/// routes client `i`'s absorption into client `i + 1`'s entry distribution.
/// The leading principal block up to client `i` describes the work of clients
/// `0..=i`, and because `Vn` is block upper triangular the leading block of
/// `Vn^-1` is the inverse of that leading block.
pub struct JointChain {
    generator: Array2<f64>,
    inverse: Array2<f64>,
    block_ends: Vec<usize>,
    entries: Vec<Array1<f64>>,
}

impl JointChain {
    pub fn assemble(pieces: Vec<ChainPiece>) -> Result<Self, ScheduleError> {
        let mut block_ends = Vec::with_capacity(pieces.len());
        let mut dim = 0;
        for piece in pieces.iter() {
            dim += piece.num_phases();
            block_ends.push(dim);
        }

        let mut generator = Array2::<f64>::zeros((dim, dim));
        let mut start = 0;
        for (i, piece) in pieces.iter().enumerate() {
            let end = block_ends[i];
            generator
                .slice_mut(s![start..end, start..end])
                .assign(&piece.subgenerator);

            if let Some(next) = pieces.get(i + 1) {
                let exit_rates = -piece.subgenerator.sum_axis(Axis(1));
                let outer = exit_rates
                    .insert_axis(Axis(1))
                    .dot(&next.entry.view().insert_axis(Axis(0)));

                generator
                    .slice_mut(s![start..end, end..block_ends[i + 1]])
                    .assign(&outer);
            }

            start = end;
        }

        debug!(clients = pieces.len(), dimension = dim, "Assembled joint chain");

        let inverse = timer_debug!("Inverting joint chain", { dimension = dim, }, {
            lu::inverse(&generator)
        })
        .ok_or(ScheduleError::SingularChain)?;

        Ok(JointChain {
            generator,
            inverse,
            block_ends,
            entries: pieces.into_iter().map(|piece| piece.entry).collect(),
        })
    }

    pub fn num_clients(&self) -> usize {
        self.block_ends.len()
    }

    pub fn dim(&self) -> usize {
        self.generator.nrows()
    }

    /// Number of phases covering clients `0..=client`.
    pub fn block_end(&self, client: usize) -> usize {
        self.block_ends[client]
    }

    pub fn generator(&self) -> &Array2<f64> {
        &self.generator
    }

    pub fn inverse(&self) -> &Array2<f64> {
        &self.inverse
    }

    pub fn entry(&self, client: usize) -> ArrayView1<'_, f64> {
        self.entries[client].view()
    }

    pub fn leading_block(&self, client: usize) -> ArrayView2<'_, f64> {
        let end = self.block_ends[client];
        self.generator.slice(s![..end, ..end])
    }

    pub fn leading_inverse(&self, client: usize) -> ArrayView2<'_, f64> {
        let end = self.block_ends[client];
        self.inverse.slice(s![..end, ..end])
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{problem::service_time::ServiceTimeSpec, test_utils::assert_matrix_close};

    fn pieces(specs: &[(f64, f64)], elapsed: f64) -> Vec<ChainPiece> {
        specs
            .iter()
            .enumerate()
            .map(|(i, &(mean, scv))| {
                let phase_type = PhaseType::fit(i, &ServiceTimeSpec::new(mean, scv)).unwrap();
                ChainPiece::from_phase_type(&phase_type, if i == 0 { elapsed } else { 0.0 })
            })
            .collect()
    }

    #[test]
    fn test_exponential_chain() {
        let chain = JointChain::assemble(pieces(&[(1.0, 1.0), (2.0, 1.0)], 0.0)).unwrap();

        // two phases per client, both with rate 1 / mean
        let expected = array![
            [-1.0, 0.0, 0.5, 0.5],
            [0.0, -1.0, 0.5, 0.5],
            [0.0, 0.0, -0.5, 0.0],
            [0.0, 0.0, 0.0, -0.5],
        ];

        assert_eq!(chain.dim(), 4);
        assert_eq!(chain.block_end(0), 2);
        assert_eq!(chain.block_end(1), 4);
        assert_matrix_close(chain.generator(), &expected, 1e-15);
    }

    #[test]
    fn test_block_upper_triangular() {
        let chain =
            JointChain::assemble(pieces(&[(1.0, 0.4), (1.5, 1.6), (0.8, 0.7)], 0.3)).unwrap();
        let generator = chain.generator();

        for client in 1..chain.num_clients() {
            let start = chain.block_end(client - 1);
            let end = chain.block_end(client);
            for row in start..end {
                for column in 0..start {
                    assert_eq!(generator[[row, column]], 0.0);
                }
            }
        }
    }

    #[test]
    fn test_rows_conserve_probability_until_last_client() {
        let chain = JointChain::assemble(pieces(&[(1.0, 0.4), (1.5, 1.6), (0.8, 0.7)], 0.0))
            .unwrap();
        let generator = chain.generator();
        let last_start = chain.block_end(1);

        for row in 0..last_start {
            assert!(generator.row(row).sum().abs() < 1e-12);
        }
    }

    #[test]
    fn test_leading_inverse_inverts_leading_block() {
        let chain =
            JointChain::assemble(pieces(&[(1.0, 0.4), (1.5, 1.6), (0.8, 0.7)], 0.5)).unwrap();

        for client in 0..chain.num_clients() {
            let end = chain.block_end(client);
            let product = chain.leading_block(client).dot(&chain.leading_inverse(client));
            assert_matrix_close(&product, &Array2::eye(end), 1e-10);
        }
    }

    #[test]
    fn test_expected_total_work() {
        // -gamma * V^-1 * 1 is the expected time to absorb the whole chain
        let chain = JointChain::assemble(pieces(&[(1.0, 0.4), (1.5, 1.6), (0.8, 0.7)], 0.0))
            .unwrap();
        let mut gamma = Array1::<f64>::zeros(chain.dim());
        gamma
            .slice_mut(s![..chain.block_end(0)])
            .assign(&chain.entry(0));
        let total = -gamma.dot(chain.inverse()).sum();

        assert!((total - 3.3).abs() < 1e-10);
    }
}
