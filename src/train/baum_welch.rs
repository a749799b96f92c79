//!
//! Baum-Welch (expected-count) accumulation.
//!
//! One forward and one backward run per sequence; every free parameter
//! receives its posterior expected usage. Per-parameter sums over time
//! stay in log space and turn linear only when folded into the batch
//! totals.
//!
use super::counts::{EmissionCounts, TransitionCounts};
use crate::compile::CompiledHmm;
use crate::prob::Prob;

///
/// Accumulate the expected counts of one sequence into the totals.
/// Returns false when the sequence has zero likelihood (it then
/// contributes nothing).
///
pub(crate) fn accumulate<S: AsRef<str>>(
    hmm: &CompiledHmm,
    symbols: &[S],
    trans_totals: &mut TransitionCounts,
    emit_totals: &mut EmissionCounts,
) -> bool {
    let forward = match hmm.forward_tables(symbols) {
        Ok(tables) => tables,
        Err(_) => return false,
    };
    let backward = match hmm.backward_tables(symbols) {
        Ok(tables) => tables,
        Err(_) => return false,
    };
    let likelihood = hmm.forward_terminate(forward.last_table());
    if likelihood.is_zero() {
        return false;
    }
    let t_total = symbols.len();
    let k = hmm.n_emitting();
    let alpha = |t: usize, i: usize| -> Prob { forward.table(t)[i] };
    let beta = |t: usize, i: usize| -> Prob { backward.table(t)[i] };
    let posterior = |joint: Prob| joint.to_log_value() - likelihood.to_log_value();

    // expected begin usage
    for (id, &j) in hmm.free_begin.iter().enumerate() {
        if hmm.pi_begin[j].is_zero() {
            continue;
        }
        let joint = if j < k {
            hmm.pi_begin[j] * hmm.emit(j, symbols[0].as_ref()) * beta(1, j)
        } else {
            hmm.pi_begin[j] * beta(0, j)
        };
        if !joint.is_zero() {
            trans_totals.begin[0][id] += posterior(joint).exp();
        }
    }

    // expected transition usage
    for (id, &(i, j)) in hmm.free_trans.iter().enumerate() {
        if hmm.a[i][j].is_zero() {
            continue;
        }
        let t_first = if i >= k { 0 } else { 1 };
        let mut joint = Prob::zero();
        if j < k {
            // j emits O_{t+1}
            for t in t_first..t_total {
                joint += alpha(t, i)
                    * hmm.a[i][j]
                    * hmm.emit(j, symbols[t].as_ref())
                    * beta(t + 1, j);
            }
        } else {
            // silent j, same-step transition
            for t in t_first..=t_total {
                joint += alpha(t, i) * hmm.a[i][j] * beta(t, j);
            }
        }
        if !joint.is_zero() {
            trans_totals.trans[0][id] += posterior(joint).exp();
        }
    }

    // expected end usage
    for (id, &i) in hmm.free_end.iter().enumerate() {
        if hmm.pi_end[i].is_zero() {
            continue;
        }
        let joint = alpha(t_total, i) * hmm.pi_end[i];
        if !joint.is_zero() {
            trans_totals.end[0][id] += posterior(joint).exp();
        }
    }

    // expected emission usage
    for (id, (i, symbol)) in hmm.free_emit.iter().enumerate() {
        let mut joint = Prob::zero();
        for (t, observed) in symbols.iter().enumerate() {
            if observed.as_ref() == symbol {
                joint += alpha(t + 1, *i) * beta(t + 1, *i);
            }
        }
        if !joint.is_zero() {
            emit_totals.emit[0][id] += posterior(joint).exp();
        }
    }

    true
}
