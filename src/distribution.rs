//!
//! Emission distributions.
//!
//! `DiscreteDistribution` maps symbols to probabilities and can hold the
//! values either in linear or in log space (`log_flag`). `Distribution`
//! is the closed set of distribution kinds a state may carry; only the
//! discrete kind is functional.
//!
use crate::error::HmmError;
use crate::prob::{logsumexp, round_to};
use std::collections::BTreeMap;

/// Decimal digits kept when rounding emission probabilities.
pub const DEFAULT_PRECISION: u32 = 8;

///
/// Symbol -> probability mapping.
///
/// The map is ordered so that iteration, the derived alphabet and the
/// persisted form are deterministic.
///
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DiscreteDistribution {
    probs: BTreeMap<String, f64>,
    log_flag: bool,
}

impl DiscreteDistribution {
    pub fn new() -> DiscreteDistribution {
        DiscreteDistribution::default()
    }
    pub fn from_pairs<S: AsRef<str>>(pairs: &[(S, f64)]) -> DiscreteDistribution {
        let mut dist = DiscreteDistribution::new();
        for (symbol, value) in pairs {
            dist.set(symbol.as_ref(), *value);
        }
        dist
    }
    pub fn uses_log(&self) -> bool {
        self.log_flag
    }
    ///
    /// Stored probability of `symbol`. A missing symbol is materialized
    /// with probability 0 (linear mode) or -inf (log mode).
    ///
    pub fn get(&mut self, symbol: &str) -> f64 {
        let default = if self.log_flag {
            f64::NEG_INFINITY
        } else {
            0.0
        };
        *self.probs.entry(symbol.to_string()).or_insert(default)
    }
    ///
    /// Read-only probability lookup; missing symbols report 0 / -inf
    /// without being materialized.
    ///
    pub fn prob(&self, symbol: &str) -> f64 {
        match self.probs.get(symbol) {
            Some(&value) => value,
            None if self.log_flag => f64::NEG_INFINITY,
            None => 0.0,
        }
    }
    ///
    /// Strict lookup that refuses to materialize missing symbols.
    ///
    pub fn try_get(&self, symbol: &str) -> Result<f64, HmmError> {
        match self.probs.get(symbol) {
            Some(&value) => Ok(value),
            None => Err(HmmError::DistributionSymbolNotFound(symbol.to_string())),
        }
    }
    pub fn set(&mut self, symbol: &str, value: f64) {
        self.probs.insert(symbol.to_string(), value);
    }
    pub fn contains(&self, symbol: &str) -> bool {
        self.probs.contains_key(symbol)
    }
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.probs.keys().map(|s| s.as_str())
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.probs.iter().map(|(s, &v)| (s.as_str(), v))
    }
    pub fn len(&self) -> usize {
        self.probs.len()
    }
    ///
    /// No entries, or a total mass of zero in linear space.
    ///
    pub fn is_empty(&self) -> bool {
        if self.probs.is_empty() {
            return true;
        }
        if self.log_flag {
            self.prob_sum() == f64::NEG_INFINITY
        } else {
            self.prob_sum() == 0.0
        }
    }
    ///
    /// Total mass, in the current mode (a log value when `log_flag`).
    ///
    pub fn prob_sum(&self) -> f64 {
        if self.log_flag {
            self.probs
                .values()
                .fold(f64::NEG_INFINITY, |sum, &v| logsumexp(sum, v))
        } else {
            self.probs.values().sum()
        }
    }
    ///
    /// Switch stored values to log space. A no-op when already in log mode.
    ///
    pub fn to_log(&mut self) {
        if !self.log_flag {
            self.log_flag = true;
            for value in self.probs.values_mut() {
                *value = value.ln();
            }
        }
    }
    ///
    /// Switch stored values back to linear space. A no-op in linear mode.
    ///
    pub fn to_linear(&mut self) {
        if self.log_flag {
            self.log_flag = false;
            for value in self.probs.values_mut() {
                *value = value.exp();
            }
        }
    }
    ///
    /// Force log mode, then subtract `log(prob_sum)` from each entry.
    /// A no-op when the linear-space total is already exactly one.
    ///
    pub fn log_normalize(&mut self) {
        self.to_log();
        let log_sum = self.prob_sum();
        if log_sum.exp() != 1.0 {
            for value in self.probs.values_mut() {
                *value -= log_sum;
            }
        }
    }
    ///
    /// Round every entry to `precision` decimal digits.
    ///
    pub fn round(&mut self, precision: u32) {
        for value in self.probs.values_mut() {
            *value = round_to(*value, precision);
        }
    }
}

impl std::fmt::Display for DiscreteDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Discrete distribution: ")?;
        for (symbol, value) in self.probs.iter() {
            write!(f, "{}({}) ", symbol, value)?;
        }
        write!(f, "-> sum {}", self.prob_sum())
    }
}

///
/// Non-functional continuous placeholders.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContinuousKind {
    Normal,
    Uniform,
}

///
/// The closed set of distribution kinds a state may carry.
///
#[derive(Clone, Debug, PartialEq)]
pub enum Distribution {
    Discrete(DiscreteDistribution),
    Continuous(ContinuousKind),
}

impl Distribution {
    pub fn is_discrete(&self) -> bool {
        matches!(self, Distribution::Discrete(_))
    }
    pub fn is_continuous(&self) -> bool {
        matches!(self, Distribution::Continuous(_))
    }
    pub fn as_discrete(&self) -> Option<&DiscreteDistribution> {
        match self {
            Distribution::Discrete(dist) => Some(dist),
            Distribution::Continuous(_) => None,
        }
    }
    pub fn as_discrete_mut(&mut self) -> Option<&mut DiscreteDistribution> {
        match self {
            Distribution::Discrete(dist) => Some(dist),
            Distribution::Continuous(_) => None,
        }
    }
    ///
    /// Whether this distribution carries no mass. Continuous placeholders
    /// report non-empty; the compiler rejects them separately.
    ///
    pub fn is_empty(&self) -> bool {
        match self {
            Distribution::Discrete(dist) => dist.is_empty(),
            Distribution::Continuous(_) => false,
        }
    }
}

impl From<DiscreteDistribution> for Distribution {
    fn from(dist: DiscreteDistribution) -> Distribution {
        Distribution::Discrete(dist)
    }
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Distribution::Discrete(dist) => write!(f, "{}", dist),
            Distribution::Continuous(ContinuousKind::Normal) => write!(f, "Normal distribution"),
            Distribution::Continuous(ContinuousKind::Uniform) => write!(f, "Uniform distribution"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn get_materializes_missing_symbols() {
        let mut dist = DiscreteDistribution::from_pairs(&[("A", 0.2), ("G", 0.4)]);
        assert_eq!(dist.get("A"), 0.2);
        assert_eq!(dist.get("NotKey"), 0.0);
        assert!(dist.contains("NotKey"));
        // read-only lookups do not materialize
        assert_eq!(dist.prob("Other"), 0.0);
        assert!(!dist.contains("Other"));
        assert!(matches!(
            dist.try_get("Other"),
            Err(HmmError::DistributionSymbolNotFound(_))
        ));
        dist.to_log();
        assert_eq!(dist.get("Missing"), f64::NEG_INFINITY);
    }

    #[test]
    fn prob_sum_by_mode() {
        let mut dist = DiscreteDistribution::from_pairs(&[("H", 0.5), ("T", 0.25)]);
        assert_abs_diff_eq!(dist.prob_sum(), 0.75);
        dist.to_log();
        assert_abs_diff_eq!(dist.prob_sum().exp(), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn to_log_to_linear_roundtrip_is_exact() {
        let mut dist = DiscreteDistribution::from_pairs(&[("A", 0.3), ("C", 0.2), ("T", 0.5)]);
        let before = dist.clone();
        // double application is a no-op, so the second call must not
        // touch the values again
        dist.to_log();
        dist.to_log();
        dist.to_linear();
        dist.to_linear();
        for (symbol, value) in before.iter() {
            assert_abs_diff_eq!(dist.prob(symbol), value, epsilon = 1e-15);
        }
        assert!(!dist.uses_log());
    }

    #[test]
    fn log_normalize_normalizes_mass() {
        let mut dist = DiscreteDistribution::from_pairs(&[("A", 0.3), ("T", 0.2), ("G", 0.5)]);
        dist.log_normalize();
        assert!(dist.uses_log());
        assert_abs_diff_eq!(dist.prob_sum().exp(), 1.0, epsilon = 1e-12);
        // already normalized: values untouched
        let before = dist.clone();
        dist.log_normalize();
        assert_eq!(dist, before);
    }

    #[test]
    fn empty_means_no_mass() {
        let mut dist = DiscreteDistribution::new();
        assert!(dist.is_empty());
        dist.set("A", 0.0);
        dist.set("B", 0.0);
        assert!(dist.is_empty());
        dist.set("C", 0.4);
        assert!(!dist.is_empty());
    }

    #[test]
    fn equality_tracks_mode_and_entries() {
        let a = DiscreteDistribution::from_pairs(&[("A", 0.5), ("B", 0.5)]);
        let mut b = a.clone();
        assert_eq!(a, b);
        b.to_log();
        assert_ne!(a, b);
        let mut c = a.clone();
        c.get("NotKey");
        assert_ne!(a, c);
    }

    #[test]
    fn continuous_kinds_are_placeholders() {
        let normal = Distribution::Continuous(ContinuousKind::Normal);
        assert!(normal.is_continuous());
        assert!(!normal.is_discrete());
        assert!(normal.as_discrete().is_none());
        assert!(!normal.is_empty());
    }
}
