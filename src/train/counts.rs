//!
//! Count matrices shared by both trainers.
//!
//! Rows are "ending state" hypotheses: the Viterbi trainer keeps one row
//! per dense state (counts along the best path that currently ends
//! there) and promotes the winning row at termination; Baum-Welch works
//! with expected counts and needs a single collapsed row. Columns are
//! free-parameter ids from the compiled snapshot.
//!
use super::ParamIndex;

///
/// Begin / body / end transition counts, one row per ending state.
///
#[derive(Clone, Debug)]
pub struct TransitionCounts {
    pub begin: Vec<Vec<f64>>,
    pub trans: Vec<Vec<f64>>,
    pub end: Vec<Vec<f64>>,
}

impl TransitionCounts {
    pub(crate) fn new(rows: usize, index: &ParamIndex) -> TransitionCounts {
        TransitionCounts {
            begin: vec![vec![0.0; index.n_begin]; rows],
            trans: vec![vec![0.0; index.n_trans]; rows],
            end: vec![vec![0.0; index.n_end]; rows],
        }
    }
    /// Reset row `m` to all-zero counts.
    pub(crate) fn row_fresh(&mut self, m: usize) {
        self.begin[m].iter_mut().for_each(|c| *c = 0.0);
        self.trans[m].iter_mut().for_each(|c| *c = 0.0);
        self.end[m].iter_mut().for_each(|c| *c = 0.0);
    }
    /// Overwrite row `m` with row `src` of another generation.
    pub(crate) fn row_copy_from(&mut self, m: usize, other: &TransitionCounts, src: usize) {
        self.begin[m].clone_from(&other.begin[src]);
        self.trans[m].clone_from(&other.trans[src]);
        self.end[m].clone_from(&other.end[src]);
    }
    /// Overwrite row `m` with row `src` of this generation.
    pub(crate) fn row_copy_within(&mut self, m: usize, src: usize) {
        if m == src {
            return;
        }
        let begin = self.begin[src].clone();
        let trans = self.trans[src].clone();
        let end = self.end[src].clone();
        self.begin[m] = begin;
        self.trans[m] = trans;
        self.end[m] = end;
    }
    /// Fold row `m` into the collapsed row of `totals`.
    pub(crate) fn row_add_to(&self, m: usize, totals: &mut TransitionCounts) {
        for (total, &count) in totals.begin[0].iter_mut().zip(self.begin[m].iter()) {
            *total += count;
        }
        for (total, &count) in totals.trans[0].iter_mut().zip(self.trans[m].iter()) {
            *total += count;
        }
        for (total, &count) in totals.end[0].iter_mut().zip(self.end[m].iter()) {
            *total += count;
        }
    }
}

///
/// Emission counts, one row per ending state.
///
#[derive(Clone, Debug)]
pub struct EmissionCounts {
    pub emit: Vec<Vec<f64>>,
}

impl EmissionCounts {
    pub(crate) fn new(rows: usize, index: &ParamIndex) -> EmissionCounts {
        EmissionCounts {
            emit: vec![vec![0.0; index.n_emit]; rows],
        }
    }
    pub(crate) fn row_fresh(&mut self, m: usize) {
        self.emit[m].iter_mut().for_each(|c| *c = 0.0);
    }
    pub(crate) fn row_copy_from(&mut self, m: usize, other: &EmissionCounts, src: usize) {
        self.emit[m].clone_from(&other.emit[src]);
    }
    pub(crate) fn row_copy_within(&mut self, m: usize, src: usize) {
        if m == src {
            return;
        }
        let emit = self.emit[src].clone();
        self.emit[m] = emit;
    }
    pub(crate) fn row_add_to(&self, m: usize, totals: &mut EmissionCounts) {
        for (total, &count) in totals.emit[0].iter_mut().zip(self.emit[m].iter()) {
            *total += count;
        }
    }
}
