//!
//! Hidden states.
//!
//! A state is identified by its name alone: equality and hashing ignore
//! the distribution and the free/fixed flags. This is load-bearing (the
//! trainers re-find graph vertices by name after re-estimation), so
//! mutating a state's name once it is inside a model is undefined
//! behavior.
//!
use crate::distribution::{DiscreteDistribution, Distribution};
use crate::error::HmmError;
use std::hash::{Hash, Hasher};

///
/// A named state, silent unless it carries a non-empty distribution.
///
#[derive(Clone, Debug)]
pub struct State {
    name: String,
    emission: Option<Distribution>,
    free_transition: bool,
    free_emission: bool,
}

impl State {
    ///
    /// Emitting state with a discrete distribution.
    ///
    pub fn new<S: Into<String>>(name: S, dist: DiscreteDistribution) -> State {
        State {
            name: name.into(),
            emission: Some(Distribution::Discrete(dist)),
            free_transition: true,
            free_emission: true,
        }
    }
    ///
    /// State without any distribution.
    ///
    pub fn silent<S: Into<String>>(name: S) -> State {
        State {
            name: name.into(),
            emission: None,
            free_transition: true,
            free_emission: true,
        }
    }
    ///
    /// Emitting state with an arbitrary distribution kind.
    ///
    pub fn with_distribution<S: Into<String>>(name: S, dist: Distribution) -> State {
        State {
            name: name.into(),
            emission: Some(dist),
            free_transition: true,
            free_emission: true,
        }
    }
    /// Exclude the outgoing transitions of this state from re-estimation.
    pub fn with_fixed_transition(mut self) -> State {
        self.free_transition = false;
        self
    }
    /// Exclude the emission probabilities of this state from re-estimation.
    pub fn with_fixed_emission(mut self) -> State {
        self.free_emission = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn emission(&self) -> Option<&Distribution> {
        self.emission.as_ref()
    }
    pub fn emission_mut(&mut self) -> Option<&mut Distribution> {
        self.emission.as_mut()
    }
    ///
    /// The distribution of an emitting state; accessing a silent state's
    /// distribution is an error.
    ///
    pub fn distribution(&self) -> Result<&Distribution, HmmError> {
        self.emission
            .as_ref()
            .ok_or_else(|| HmmError::StateHasNoDistribution(self.name.clone()))
    }
    ///
    /// Silent iff there is no distribution or its total mass is zero.
    ///
    pub fn is_silent(&self) -> bool {
        match &self.emission {
            None => true,
            Some(dist) => dist.is_empty(),
        }
    }
    pub fn is_free_transition(&self) -> bool {
        self.free_transition
    }
    pub fn is_free_emission(&self) -> bool {
        self.free_emission
    }
}

impl PartialEq for State {
    fn eq(&self, other: &State) -> bool {
        self.name == other.name
    }
}
impl Eq for State {}
impl Hash for State {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.name.hash(hasher);
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.emission {
            Some(dist) => write!(f, "{} ({})", self.name, dist),
            None => write!(f, "{} (silent)", self.name),
        }
    }
}
