//! Basic matrix operations and the naive reference.
//!
//! These provide the correctness baseline for the fused kernels and the
//! weight-layout preprocessing run once at layer initialization.

pub mod naive;
pub mod transpose;
