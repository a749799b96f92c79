//!
//! Training configuration.
//!
//! One immutable value collects everything the convergence loop reads:
//! algorithm, pseudocount, stopping threshold and iteration bounds.
//!
use serde::{Deserialize, Serialize};

///
/// The two batch trainers.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainAlgorithm {
    Viterbi,
    BaumWelch,
}

impl std::fmt::Display for TrainAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TrainAlgorithm::Viterbi => write!(f, "viterbi"),
            TrainAlgorithm::BaumWelch => write!(f, "baum-welch"),
        }
    }
}

impl std::str::FromStr for TrainAlgorithm {
    type Err = String;
    fn from_str(s: &str) -> Result<TrainAlgorithm, String> {
        match s {
            "viterbi" => Ok(TrainAlgorithm::Viterbi),
            "baum-welch" => Ok(TrainAlgorithm::BaumWelch),
            other => Err(format!("unknown training algorithm: {}", other)),
        }
    }
}

///
/// Knobs of the convergence loop.
///
/// The loop stops once `iteration > min_iter` and the log-likelihood
/// gain drops to `threshold` or below, or unconditionally after
/// `max_iter` iterations. `pseudocount` is the additive smoothing
/// applied to free transition counts during re-estimation.
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub algorithm: TrainAlgorithm,
    pub pseudocount: f64,
    pub threshold: f64,
    pub min_iter: usize,
    pub max_iter: usize,
}

impl Default for TrainConfig {
    fn default() -> TrainConfig {
        TrainConfig {
            algorithm: TrainAlgorithm::BaumWelch,
            pseudocount: 0.0,
            threshold: 1e-9,
            min_iter: 2,
            max_iter: 1000,
        }
    }
}

impl TrainConfig {
    pub fn viterbi() -> TrainConfig {
        TrainConfig {
            algorithm: TrainAlgorithm::Viterbi,
            ..TrainConfig::default()
        }
    }
    pub fn baum_welch() -> TrainConfig {
        TrainConfig::default()
    }
    pub fn with_pseudocount(mut self, pseudocount: f64) -> TrainConfig {
        self.pseudocount = pseudocount;
        self
    }
}
