//! Transform estimators: steps that compute a new column and are not
//! trainers.
//!
//! - [`Normalize`]: per-slot min-max or mean-variance scaling, learned on the
//!   training data
//! - [`Concatenate`]: joins float columns into one vector column

pub mod concatenate;
pub mod normalize;

pub use concatenate::Concatenate;
pub use normalize::{FittedNormalize, Normalize, NormalizeMode, NormalizeParams};
