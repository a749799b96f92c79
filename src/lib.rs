//!
//! Discrete-emission hidden Markov models with silent states.
//!
//! A model is authored as a labeled directed graph of named states
//! (emitting or silent) with weighted transitions, then compiled into a
//! dense log-space snapshot on which the silent-aware forward, backward
//! and Viterbi recurrences run. Two batch trainers (Viterbi counts and
//! Baum-Welch expected counts) re-estimate the free parameters and
//! write them back into the graph.
//!
//! ```
//! use silhmm::prelude::*;
//!
//! let mut model = Model::new("coin");
//! model.add_state(State::new(
//!     "fair",
//!     DiscreteDistribution::from_pairs(&[("H", 0.5), ("T", 0.5)]),
//! )).unwrap();
//! model.begin_transition("fair", 1.0).unwrap();
//! model.add_transition("fair", "fair", 1.0).unwrap();
//! model.compile(true).unwrap();
//!
//! let sequence = vec!["H", "T", "H"];
//! let (path, score) = model.decode(&sequence).unwrap();
//! assert_eq!(path, vec!["fair"; 3]);
//! assert!(score.to_log_value() < 0.0);
//! ```
//!
pub mod backward;
pub mod compile;
pub mod distribution;
pub mod error;
pub mod forward;
pub mod graph;
pub mod io;
pub mod mocks;
pub mod model;
pub mod prelude;
pub mod prob;
pub mod state;
pub mod table;
pub mod train;
pub mod viterbi;
