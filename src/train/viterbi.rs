//!
//! Viterbi (hard-assignment) count accumulation.
//!
//! Runs the max-product recurrence while carrying, for every possible
//! ending state, the transition and emission counts along the best path
//! that currently reaches it. Counts move between steps exactly like the
//! decoder's traceback columns: two generations, silent chains linking
//! within the current one. At termination the winning ending state's row
//! is folded into the batch totals.
//!
use super::counts::{EmissionCounts, TransitionCounts};
use super::ParamIndex;
use crate::compile::CompiledHmm;
use crate::prob::Prob;

struct CountColumn {
    trans: TransitionCounts,
    emit: EmissionCounts,
}

impl CountColumn {
    fn new(n_states: usize, index: &ParamIndex) -> CountColumn {
        CountColumn {
            trans: TransitionCounts::new(n_states, index),
            emit: EmissionCounts::new(n_states, index),
        }
    }
    fn fresh(&mut self, m: usize) {
        self.trans.row_fresh(m);
        self.emit.row_fresh(m);
    }
    fn copy_from(&mut self, m: usize, other: &CountColumn, src: usize) {
        self.trans.row_copy_from(m, &other.trans, src);
        self.emit.row_copy_from(m, &other.emit, src);
    }
    fn copy_within(&mut self, m: usize, src: usize) {
        self.trans.row_copy_within(m, src);
        self.emit.row_copy_within(m, src);
    }
}

///
/// Accumulate the best-path counts of one sequence into the totals.
/// Returns false when the sequence has no legal path (it then
/// contributes nothing).
///
pub(crate) fn accumulate<S: AsRef<str>>(
    hmm: &CompiledHmm,
    symbols: &[S],
    index: &ParamIndex,
    trans_totals: &mut TransitionCounts,
    emit_totals: &mut EmissionCounts,
) -> bool {
    let n = hmm.n_states();
    let k = hmm.n_emitting();
    let mut previous = CountColumn::new(n, index);
    let mut current = CountColumn::new(n, index);

    // step 0: silent chains out of begin
    let mut init = vec![Prob::zero(); n];
    for i in k..n {
        let mut best = hmm.pi_begin[i];
        let mut argmax = None;
        for j in k..i {
            let candidate = init[j] * hmm.a[j][i];
            if candidate > best {
                best = candidate;
                argmax = Some(j);
            }
        }
        init[i] = best;
        if best.is_zero() {
            continue;
        }
        match argmax {
            Some(j) => {
                current.copy_within(i, j);
                index.bump_trans(&mut current.trans, i, j, i);
            }
            None => {
                current.fresh(i);
                index.bump_begin(&mut current.trans, i, i);
            }
        }
    }
    std::mem::swap(&mut previous, &mut current);

    // step 1: first emission
    let mut delta = vec![Prob::zero(); n];
    let first_symbol = symbols[0].as_ref();
    for i in 0..k {
        let mut best = hmm.pi_begin[i];
        let mut argmax = None;
        for j in k..n {
            let candidate = init[j] * hmm.a[j][i];
            if candidate > best {
                best = candidate;
                argmax = Some(j);
            }
        }
        delta[i] = best * hmm.emit(i, first_symbol);
        if delta[i].is_zero() {
            continue;
        }
        match argmax {
            Some(j) => {
                current.copy_from(i, &previous, j);
                index.bump_trans(&mut current.trans, i, j, i);
            }
            None => {
                current.fresh(i);
                index.bump_begin(&mut current.trans, i, i);
            }
        }
        index.bump_emit(&mut current.emit, i, i, first_symbol);
    }
    silent_pass(hmm, index, &mut delta, &mut current);

    // steps t > 1
    for symbol in symbols[1..].iter() {
        let symbol = symbol.as_ref();
        std::mem::swap(&mut previous, &mut current);
        let mut next = vec![Prob::zero(); n];
        for i in 0..k {
            let mut best = Prob::zero();
            let mut argmax = None;
            for (j, &value) in delta.iter().enumerate() {
                let candidate = value * hmm.a[j][i];
                if candidate > best {
                    best = candidate;
                    argmax = Some(j);
                }
            }
            let j = match argmax {
                Some(j) => j,
                None => continue,
            };
            next[i] = best * hmm.emit(i, symbol);
            if next[i].is_zero() {
                continue;
            }
            current.copy_from(i, &previous, j);
            index.bump_trans(&mut current.trans, i, j, i);
            index.bump_emit(&mut current.emit, i, i, symbol);
        }
        silent_pass(hmm, index, &mut next, &mut current);
        delta = next;
    }

    // termination: promote the winning ending state's counts
    let ending = if hmm.is_finite {
        (0..n)
            .map(|i| (i, delta[i] * hmm.pi_end[i]))
            .filter(|(_, score)| !score.is_zero())
            .fold(None, |best: Option<(usize, Prob)>, (i, score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((i, score)),
            })
    } else {
        (0..k)
            .map(|i| (i, delta[i]))
            .filter(|(_, score)| !score.is_zero())
            .fold(None, |best: Option<(usize, Prob)>, (i, score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((i, score)),
            })
    };
    match ending {
        Some((m, _)) => {
            if hmm.is_finite {
                index.bump_end(&mut current.trans, m, m);
            }
            current.trans.row_add_to(m, trans_totals);
            current.emit.row_add_to(m, emit_totals);
            true
        }
        None => false,
    }
}

/// Max-product silent pass carrying counts within the current column.
fn silent_pass(hmm: &CompiledHmm, index: &ParamIndex, delta: &mut [Prob], column: &mut CountColumn) {
    let k = hmm.n_emitting();
    for i in k..hmm.n_states() {
        let mut best = Prob::zero();
        let mut argmax = None;
        for j in 0..i {
            let candidate = delta[j] * hmm.a[j][i];
            if candidate > best {
                best = candidate;
                argmax = Some(j);
            }
        }
        if let Some(j) = argmax {
            delta[i] = best;
            column.copy_within(i, j);
            index.bump_trans(&mut column.trans, i, j, i);
        }
    }
}
