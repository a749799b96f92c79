//!
//! Compiling the authored state graph into the dense log-space snapshot
//! consumed by every inference and training routine.
//!
//! Dense indices `[0..k)` are the emitting states in graph order and
//! `[k..n)` the interior silent states in topological order of the silent
//! subgraph, so that a single in-order pass resolves silent chains within
//! one time step.
//!
use crate::distribution::DiscreteDistribution;
use crate::error::HmmError;
use crate::graph::{GraphError, LabeledDigraph};
use crate::prob::Prob;
use crate::state::State;
use fnv::FnvHashMap;
use log::debug;
use std::collections::BTreeSet;

///
/// Dense log-space snapshot of a model.
///
/// Owned by the model that compiled it; training mutates it in place and
/// writes converged parameters back into the authored graph afterwards.
///
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledHmm {
    /// Dense index -> state name; emitting states first.
    pub(crate) names: Vec<String>,
    /// State name -> dense index.
    pub(crate) idx: FnvHashMap<String, usize>,
    /// First silent dense index == number of emitting states.
    pub(crate) k: usize,
    /// Log transition matrix among non-begin/end states.
    pub(crate) a: Vec<Vec<Prob>>,
    /// Log-normalized emission distribution per emitting state.
    pub(crate) b: Vec<Option<DiscreteDistribution>>,
    /// Log P(begin -> i).
    pub(crate) pi_begin: Vec<Prob>,
    /// Log P(i -> end).
    pub(crate) pi_end: Vec<Prob>,
    /// At least one state can reach the end state.
    pub(crate) is_finite: bool,
    /// Union of emission symbols, sorted.
    pub(crate) alphabet: Vec<String>,
    /// Dense ids with a re-estimable begin transition.
    pub(crate) free_begin: Vec<usize>,
    /// Re-estimable body transitions (from, to).
    pub(crate) free_trans: Vec<(usize, usize)>,
    /// Dense ids with a re-estimable end transition.
    pub(crate) free_end: Vec<usize>,
    /// Re-estimable emission parameters (state, symbol).
    pub(crate) free_emit: Vec<(usize, String)>,
}

impl CompiledHmm {
    pub fn n_states(&self) -> usize {
        self.names.len()
    }
    pub fn n_emitting(&self) -> usize {
        self.k
    }
    pub fn is_silent(&self, i: usize) -> bool {
        i >= self.k
    }
    pub fn is_finite(&self) -> bool {
        self.is_finite
    }
    pub fn names(&self) -> &[String] {
        &self.names
    }
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.idx.get(name).copied()
    }
    pub fn trans(&self, from: usize, to: usize) -> Prob {
        self.a[from][to]
    }
    pub fn begin_prob(&self, i: usize) -> Prob {
        self.pi_begin[i]
    }
    pub fn end_prob(&self, i: usize) -> Prob {
        self.pi_end[i]
    }
    pub fn alphabet(&self) -> &[String] {
        &self.alphabet
    }
    pub fn emission(&self, i: usize) -> Option<&DiscreteDistribution> {
        self.b[i].as_ref()
    }
    pub fn free_begin(&self) -> &[usize] {
        &self.free_begin
    }
    pub fn free_trans(&self) -> &[(usize, usize)] {
        &self.free_trans
    }
    pub fn free_end(&self) -> &[usize] {
        &self.free_end
    }
    pub fn free_emit(&self) -> &[(usize, String)] {
        &self.free_emit
    }
    ///
    /// Log emission probability of `symbol` from emitting state `i`;
    /// `Prob::zero()` for symbols the state never emits and for silent
    /// states.
    ///
    pub(crate) fn emit(&self, i: usize, symbol: &str) -> Prob {
        match &self.b[i] {
            Some(dist) => Prob::from_log_prob(dist.prob(symbol)),
            None => Prob::zero(),
        }
    }
}

impl std::fmt::Display for CompiledHmm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let n = self.n_states();
        let cell = |p: Prob| format!("{:.6}", p.to_value());
        let width = (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .map(|(i, j)| cell(self.a[i][j]).len())
            .max()
            .unwrap_or(0)
            .max(self.names.iter().map(|name| name.len()).max().unwrap_or(0));
        writeln!(f, "states: {}", self.names.join(" "))?;
        for i in 0..n {
            write!(f, "{:>width$}", self.names[i], width = width)?;
            for j in 0..n {
                write!(f, " {:>width$}", cell(self.a[i][j]), width = width)?;
            }
            writeln!(f, " | end {}", cell(self.pi_end[i]))?;
        }
        write!(f, "begin:")?;
        for i in 0..n {
            write!(f, " {}", cell(self.pi_begin[i]))?;
        }
        writeln!(f)?;
        writeln!(f, "finite: {}", self.is_finite)
    }
}

///
/// Snapshot the authored graph (steps per the compile contract; builds
/// into locals and only then constructs the value, so a failed compile
/// leaves no partial state behind).
///
pub fn compile(
    graph: &LabeledDigraph<State>,
    begin: &State,
    end: &State,
    normalize: bool,
) -> Result<CompiledHmm, HmmError> {
    let begin = graph
        .get_vertex(begin)
        .ok_or_else(|| HmmError::StateNotFound(begin.name().to_string()))?;
    let end = graph
        .get_vertex(end)
        .ok_or_else(|| HmmError::StateNotFound(end.name().to_string()))?;
    if !begin.is_silent() {
        return Err(HmmError::CompileError(
            "begin state must be silent".to_string(),
        ));
    }
    if !end.is_silent() {
        return Err(HmmError::CompileError(
            "end state must be silent".to_string(),
        ));
    }
    if !graph.in_edges(begin).unwrap().is_empty() {
        return Err(HmmError::CompileError(
            "begin state cannot have predecessors".to_string(),
        ));
    }
    if !graph.out_edges(end).unwrap().is_empty() {
        return Err(HmmError::CompileError(
            "end state cannot have successors".to_string(),
        ));
    }

    // partition interior states, emitting first in graph order
    let mut emitting: Vec<&State> = Vec::new();
    let mut silent: Vec<State> = Vec::new();
    for state in graph.vertices() {
        if state == begin || state == end {
            continue;
        }
        if state.is_silent() {
            silent.push(state.clone());
        } else {
            match state.emission() {
                Some(dist) if dist.is_discrete() => emitting.push(state),
                _ => {
                    return Err(HmmError::CompileError(format!(
                        "state {} has a continuous distribution, which is not supported",
                        state.name()
                    )))
                }
            }
        }
    }

    // silent interior states must form a DAG; order them topologically
    let silent_order = graph
        .subgraph(&silent)
        .topological_sort()
        .map_err(|err| match err {
            GraphError::Cycle => {
                HmmError::CompileError("silent states form a cycle".to_string())
            }
            other => HmmError::CompileError(other.to_string()),
        })?;

    let k = emitting.len();
    let mut names: Vec<String> = emitting.iter().map(|s| s.name().to_string()).collect();
    names.extend(silent_order.iter().map(|s| s.name().to_string()));
    let n = names.len();
    let idx: FnvHashMap<String, usize> = names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect();

    // transition rows, normalized per source state
    let mut a = vec![vec![Prob::zero(); n]; n];
    let mut pi_begin = vec![Prob::zero(); n];
    let mut pi_end = vec![Prob::zero(); n];
    for (i, name) in names.iter().enumerate() {
        let probe = State::silent(name.clone());
        let outs = graph.out_edges(&probe).unwrap();
        let total: f64 = outs.iter().map(|&(_, w)| w).sum();
        if total == 0.0 {
            return Err(HmmError::CompileError(format!(
                "no transition from {}",
                name
            )));
        }
        for (target, weight) in outs {
            let weight = if normalize && total != 1.0 {
                weight / total
            } else {
                weight
            };
            if target == end {
                pi_end[i] = Prob::from_prob(weight);
            } else {
                a[i][idx[target.name()]] = Prob::from_prob(weight);
            }
        }
    }
    let begin_outs = graph.out_edges(begin).unwrap();
    let begin_total: f64 = begin_outs.iter().map(|&(_, w)| w).sum();
    if begin_total == 0.0 {
        return Err(HmmError::CompileError("no begin transition".to_string()));
    }
    for (target, weight) in &begin_outs {
        // the model layer refuses this edge at add_transition time, but a
        // graph built directly on the container can still carry one
        if *target == end {
            return Err(HmmError::CompileError(
                "a direct begin -> end transition is not supported".to_string(),
            ));
        }
        let weight = if normalize && begin_total != 1.0 {
            weight / begin_total
        } else {
            *weight
        };
        pi_begin[idx[target.name()]] = Prob::from_prob(weight);
    }

    let is_finite = pi_end.iter().any(|p| !p.is_zero());

    // emission distributions, cloned and log-normalized
    let mut b: Vec<Option<DiscreteDistribution>> = vec![None; n];
    let mut alphabet: BTreeSet<String> = BTreeSet::new();
    for state in &emitting {
        let dist = state.emission().unwrap().as_discrete().unwrap();
        alphabet.extend(dist.symbols().map(|s| s.to_string()));
        let mut dist = dist.clone();
        dist.log_normalize();
        b[idx[state.name()]] = Some(dist);
    }

    // free-parameter tables, derived from the states' flags
    let mut free_begin = Vec::new();
    if begin.is_free_transition() {
        for (target, _) in &begin_outs {
            free_begin.push(idx[target.name()]);
        }
    }
    let mut free_trans = Vec::new();
    let mut free_end = Vec::new();
    let mut free_emit = Vec::new();
    for (i, name) in names.iter().enumerate() {
        let probe = State::silent(name.clone());
        let state = graph.get_vertex(&probe).unwrap();
        if state.is_free_transition() {
            for (target, _) in graph.out_edges(state).unwrap() {
                if target == end {
                    free_end.push(i);
                } else {
                    free_trans.push((i, idx[target.name()]));
                }
            }
        }
        if i < k && state.is_free_emission() {
            let dist = state.emission().unwrap().as_discrete().unwrap();
            for symbol in dist.symbols() {
                free_emit.push((i, symbol.to_string()));
            }
        }
    }

    debug!(
        "compiled {} states ({} emitting, {} silent), finite={}",
        n,
        k,
        n - k,
        is_finite
    );

    Ok(CompiledHmm {
        names,
        idx,
        k,
        a,
        b,
        pi_begin,
        pi_end,
        is_finite,
        alphabet: alphabet.into_iter().collect(),
        free_begin,
        free_trans,
        free_end,
        free_emit,
    })
}
