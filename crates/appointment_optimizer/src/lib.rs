pub mod chain;
pub mod cost;
pub mod json;
pub mod linalg;
pub mod phase_type;
pub mod problem;
pub mod solver;
mod utils;

#[cfg(test)]
pub(crate) mod test_utils;
