pub mod phase_type;
pub mod poisson;
