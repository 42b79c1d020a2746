//! Shared pieces of the mlchain benchmarks:
//!
//! - a seeded synthetic regression data set
//! - timing helpers for the stand-alone runner

pub mod data;
pub mod utils;

pub use data::{synthetic_regression, SyntheticData};
pub use utils::{benchmark_with_warmup, BenchmarkStats, Timer};
