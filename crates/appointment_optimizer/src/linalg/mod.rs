pub mod lu;
pub mod matrix_exponential;
