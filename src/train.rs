//!
//! Batch parameter estimation.
//!
//! Both trainers share the same outer loop: accumulate counts over the
//! whole batch, re-estimate the free parameters of the compiled snapshot
//! from the totals, repeat until the likelihood gain drops below the
//! threshold. The model writes the converged values back into its graph
//! after the loop commits.
//!
pub mod baum_welch;
pub mod config;
pub mod counts;
pub mod viterbi;

pub use config::{TrainAlgorithm, TrainConfig};
pub use counts::{EmissionCounts, TransitionCounts};

use crate::compile::CompiledHmm;
use crate::error::HmmError;
use crate::prob::Prob;
use fnv::FnvHashMap;
use itertools::Itertools;
use log::debug;

///
/// Dense index -> free-parameter id lookup tables, fixed for one
/// training run.
///
pub(crate) struct ParamIndex {
    begin_of: Vec<Option<usize>>,
    end_of: Vec<Option<usize>>,
    trans_of: FnvHashMap<(usize, usize), usize>,
    emit_of: Vec<FnvHashMap<String, usize>>,
    pub(crate) n_begin: usize,
    pub(crate) n_trans: usize,
    pub(crate) n_end: usize,
    pub(crate) n_emit: usize,
}

impl ParamIndex {
    pub(crate) fn new(hmm: &CompiledHmm) -> ParamIndex {
        let n = hmm.n_states();
        let mut begin_of = vec![None; n];
        for (id, &state) in hmm.free_begin.iter().enumerate() {
            begin_of[state] = Some(id);
        }
        let mut end_of = vec![None; n];
        for (id, &state) in hmm.free_end.iter().enumerate() {
            end_of[state] = Some(id);
        }
        let trans_of = hmm
            .free_trans
            .iter()
            .enumerate()
            .map(|(id, &pair)| (pair, id))
            .collect();
        let mut emit_of = vec![FnvHashMap::default(); n];
        for (id, (state, symbol)) in hmm.free_emit.iter().enumerate() {
            emit_of[*state].insert(symbol.clone(), id);
        }
        ParamIndex {
            begin_of,
            end_of,
            trans_of,
            emit_of,
            n_begin: hmm.free_begin.len(),
            n_trans: hmm.free_trans.len(),
            n_end: hmm.free_end.len(),
            n_emit: hmm.free_emit.len(),
        }
    }

    pub(crate) fn bump_begin(&self, counts: &mut TransitionCounts, m: usize, state: usize) {
        if let Some(id) = self.begin_of[state] {
            counts.begin[m][id] += 1.0;
        }
    }
    pub(crate) fn bump_trans(&self, counts: &mut TransitionCounts, m: usize, from: usize, to: usize) {
        if let Some(&id) = self.trans_of.get(&(from, to)) {
            counts.trans[m][id] += 1.0;
        }
    }
    pub(crate) fn bump_end(&self, counts: &mut TransitionCounts, m: usize, state: usize) {
        if let Some(id) = self.end_of[state] {
            counts.end[m][id] += 1.0;
        }
    }
    pub(crate) fn bump_emit(
        &self,
        counts: &mut EmissionCounts,
        m: usize,
        state: usize,
        symbol: &str,
    ) {
        if let Some(&id) = self.emit_of[state].get(symbol) {
            counts.emit[m][id] += 1.0;
        }
    }
}

///
/// Run the convergence loop on the compiled snapshot. Returns
/// `final_loglik - initial_loglik` over the batch.
///
pub(crate) fn train_compiled<S: AsRef<str>>(
    hmm: &mut CompiledHmm,
    sequences: &[Vec<S>],
    config: &TrainConfig,
) -> Result<f64, HmmError> {
    if sequences.iter().any(|sequence| sequence.is_empty()) {
        return Err(HmmError::EmptySequence);
    }
    let index = ParamIndex::new(hmm);
    let initial = batch_log_likelihood(hmm, sequences)?;
    let mut previous = initial;
    let mut iteration = 0;
    loop {
        iteration += 1;
        let mut trans_totals = TransitionCounts::new(1, &index);
        let mut emit_totals = EmissionCounts::new(1, &index);
        let mut used = 0;
        for sequence in sequences {
            let counted = match config.algorithm {
                TrainAlgorithm::Viterbi => viterbi::accumulate(
                    hmm,
                    sequence,
                    &index,
                    &mut trans_totals,
                    &mut emit_totals,
                ),
                TrainAlgorithm::BaumWelch => {
                    baum_welch::accumulate(hmm, sequence, &mut trans_totals, &mut emit_totals)
                }
            };
            if counted {
                used += 1;
            }
        }
        reestimate(hmm, &trans_totals, &emit_totals, config.pseudocount);
        let current = batch_log_likelihood(hmm, sequences)?;
        let delta = gain(previous, current);
        debug!(
            "{} iter={} sequences={}/{} loglik={} delta={}",
            config.algorithm,
            iteration,
            used,
            sequences.len(),
            current,
            delta
        );
        previous = current;
        if (iteration > config.min_iter && delta <= config.threshold)
            || iteration > config.max_iter
        {
            break;
        }
    }
    Ok(gain(initial, previous))
}

/// Log-likelihood difference; two impossible batches count as no gain.
fn gain(from: f64, to: f64) -> f64 {
    if from == f64::NEG_INFINITY && to == f64::NEG_INFINITY {
        0.0
    } else {
        to - from
    }
}

pub(crate) fn batch_log_likelihood<S: AsRef<str>>(
    hmm: &CompiledHmm,
    sequences: &[Vec<S>],
) -> Result<f64, HmmError> {
    let product: Prob = sequences
        .iter()
        .map(|sequence| hmm.log_likelihood_forward(sequence))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .product();
    Ok(product.to_log_value())
}

///
/// Re-estimate every free parameter from the collapsed count totals.
///
/// Each source state normalizes its own free mass: transitions and the
/// end probability share one denominator, smoothed by the pseudocount;
/// emissions are normalized unsmoothed. Sources whose totals are zero
/// are left untouched.
///
pub(crate) fn reestimate(
    hmm: &mut CompiledHmm,
    trans_totals: &TransitionCounts,
    emit_totals: &EmissionCounts,
    pseudocount: f64,
) {
    // begin transitions
    let begin_mass: f64 = trans_totals.begin[0]
        .iter()
        .map(|count| count + pseudocount)
        .sum();
    if begin_mass > 0.0 {
        for (id, &state) in hmm.free_begin.clone().iter().enumerate() {
            let count = trans_totals.begin[0][id] + pseudocount;
            hmm.pi_begin[state] = Prob::from_prob(count / begin_mass);
        }
    }

    // body and end transitions, one denominator per source state
    let free_trans = hmm.free_trans.clone();
    let free_end = hmm.free_end.clone();
    let sources: Vec<usize> = free_trans
        .iter()
        .map(|&(from, _)| from)
        .chain(free_end.iter().copied())
        .unique()
        .collect();
    for source in sources {
        let mut mass = 0.0;
        for (id, &(from, _)) in free_trans.iter().enumerate() {
            if from == source {
                mass += trans_totals.trans[0][id] + pseudocount;
            }
        }
        for (id, &state) in free_end.iter().enumerate() {
            if state == source {
                mass += trans_totals.end[0][id] + pseudocount;
            }
        }
        if mass <= 0.0 {
            continue;
        }
        for (id, &(from, to)) in free_trans.iter().enumerate() {
            if from == source {
                let count = trans_totals.trans[0][id] + pseudocount;
                hmm.a[from][to] = Prob::from_prob(count / mass);
            }
        }
        for (id, &state) in free_end.iter().enumerate() {
            if state == source {
                let count = trans_totals.end[0][id] + pseudocount;
                hmm.pi_end[state] = Prob::from_prob(count / mass);
            }
        }
    }

    // emissions
    let free_emit = hmm.free_emit.clone();
    let emitters: Vec<usize> = free_emit.iter().map(|(state, _)| *state).unique().collect();
    for emitter in emitters {
        let mass: f64 = free_emit
            .iter()
            .enumerate()
            .filter(|(_, (state, _))| *state == emitter)
            .map(|(id, _)| emit_totals.emit[0][id])
            .sum();
        if mass <= 0.0 {
            continue;
        }
        for (id, (state, symbol)) in free_emit.iter().enumerate() {
            if *state == emitter {
                let count = emit_totals.emit[0][id];
                let log_prob = if count > 0.0 {
                    (count / mass).ln()
                } else {
                    f64::NEG_INFINITY
                };
                hmm.b[emitter]
                    .as_mut()
                    .expect("free emission on a silent state")
                    .set(symbol, log_prob);
            }
        }
    }
}
