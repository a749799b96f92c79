//!
//! globally-available parts
//!
pub use crate::compile::CompiledHmm;
pub use crate::distribution::{ContinuousKind, DiscreteDistribution, Distribution};
pub use crate::error::HmmError;
pub use crate::model::Model;
pub use crate::prob::{lp, p, Prob};
pub use crate::state::State;
pub use crate::train::{TrainAlgorithm, TrainConfig};
