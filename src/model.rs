//!
//! Model authoring and the public inference/training API.
//!
//! A model is a labeled digraph of states plus two designated silent
//! states, begin and end. `compile()` snapshots the graph into the dense
//! log-space form; every structural mutation invalidates that snapshot,
//! so compilation is the single consistency boundary between authoring
//! and inference.
//!
use crate::compile::{compile, CompiledHmm};
use crate::error::HmmError;
use crate::graph::{GraphError, LabeledDigraph};
use crate::prob::Prob;
use crate::state::State;
use crate::train::{self, TrainAlgorithm, TrainConfig};

/// Prefix of the auto-created begin state name.
pub const BEGIN_PREFIX: &str = "begin_";
/// Prefix of the auto-created end state name.
pub const END_PREFIX: &str = "end_";

///
/// A hidden Markov model under construction, with its compiled snapshot
/// once `compile()` has run.
///
#[derive(Clone, Debug)]
pub struct Model {
    name: String,
    graph: LabeledDigraph<State>,
    begin_name: String,
    end_name: String,
    algorithm: TrainAlgorithm,
    compiled: Option<CompiledHmm>,
}

impl Model {
    ///
    /// New model with auto-created silent begin/end states named
    /// `begin_<name>` / `end_<name>`.
    ///
    pub fn new<S: Into<String>>(name: S) -> Model {
        let name = name.into();
        let begin = State::silent(format!("{}{}", BEGIN_PREFIX, name));
        let end = State::silent(format!("{}{}", END_PREFIX, name));
        Model::with_states(name, begin, end)
    }

    ///
    /// New model with explicit begin/end states. They are added to the
    /// graph immediately; compile() later insists they are silent.
    ///
    pub fn with_states<S: Into<String>>(name: S, begin: State, end: State) -> Model {
        let mut graph = LabeledDigraph::new();
        let begin_name = begin.name().to_string();
        let end_name = end.name().to_string();
        graph.add_vertex(begin).unwrap();
        graph
            .add_vertex(end)
            .expect("begin and end states must have distinct names");
        Model {
            name: name.into(),
            graph,
            begin_name,
            end_name,
            algorithm: TrainAlgorithm::BaumWelch,
            compiled: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }
    pub fn algorithm(&self) -> TrainAlgorithm {
        self.algorithm
    }
    pub fn set_algorithm(&mut self, algorithm: TrainAlgorithm) {
        self.algorithm = algorithm;
    }
    pub fn num_states(&self) -> usize {
        self.graph.num_vertices()
    }
    pub fn num_transitions(&self) -> usize {
        self.graph.num_edges()
    }
    pub(crate) fn graph(&self) -> &LabeledDigraph<State> {
        &self.graph
    }

    pub fn begin(&self) -> Result<&State, HmmError> {
        self.get_state(&self.begin_name)
            .ok_or_else(|| HmmError::StateNotFound(self.begin_name.clone()))
    }
    pub fn end(&self) -> Result<&State, HmmError> {
        self.get_state(&self.end_name)
            .ok_or_else(|| HmmError::StateNotFound(self.end_name.clone()))
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.graph.has_vertex(&State::silent(name))
    }
    /// All states in insertion order, begin and end included.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.graph.vertices()
    }
    /// All transitions as `(from, to, weight)`, begin/end edges included.
    pub fn transitions(&self) -> Vec<(String, String, f64)> {
        let mut edges = Vec::with_capacity(self.num_transitions());
        for state in self.graph.vertices() {
            for (target, weight) in self.graph.out_edges(state).unwrap() {
                edges.push((state.name().to_string(), target.name().to_string(), weight));
            }
        }
        edges
    }
    pub fn get_state(&self, name: &str) -> Option<&State> {
        self.graph.get_vertex(&State::silent(name))
    }

    pub fn add_state(&mut self, state: State) -> Result<(), HmmError> {
        let name = state.name().to_string();
        self.graph
            .add_vertex(state)
            .map_err(|_| HmmError::StateExists(name))?;
        self.compiled = None;
        Ok(())
    }

    ///
    /// Remove a state and all its transitions. Removing begin or end is
    /// allowed; the model then refuses to compile until they exist again.
    ///
    pub fn remove_state(&mut self, name: &str) -> Result<(), HmmError> {
        self.graph
            .remove_vertex(&State::silent(name))
            .map_err(|_| HmmError::StateNotFound(name.to_string()))?;
        self.compiled = None;
        Ok(())
    }

    pub fn has_transition(&self, from: &str, to: &str) -> bool {
        self.graph.has_edge(&State::silent(from), &State::silent(to))
    }

    pub fn get_transition(&self, from: &str, to: &str) -> Result<f64, HmmError> {
        self.graph
            .get_weight(&State::silent(from), &State::silent(to))
            .map_err(|_| HmmError::TransitionNotFound {
                from: from.to_string(),
                to: to.to_string(),
            })
    }

    pub fn add_transition(&mut self, from: &str, to: &str, weight: f64) -> Result<(), HmmError> {
        self.check_transition_logic(from, to, weight)?;
        match self
            .graph
            .add_edge(&State::silent(from), &State::silent(to), weight)
        {
            Ok(()) => {
                self.compiled = None;
                Ok(())
            }
            Err(GraphError::EdgeExists) => Err(HmmError::TransitionExists {
                from: from.to_string(),
                to: to.to_string(),
            }),
            Err(_) => Err(HmmError::StateNotFound(
                if self.has_state(from) { to } else { from }.to_string(),
            )),
        }
    }

    pub fn set_transition(&mut self, from: &str, to: &str, weight: f64) -> Result<(), HmmError> {
        self.check_transition_logic(from, to, weight)?;
        self.graph
            .set_weight(&State::silent(from), &State::silent(to), weight)
            .map_err(|_| HmmError::TransitionNotFound {
                from: from.to_string(),
                to: to.to_string(),
            })?;
        self.compiled = None;
        Ok(())
    }

    pub fn remove_transition(&mut self, from: &str, to: &str) -> Result<(), HmmError> {
        self.graph
            .remove_edge(&State::silent(from), &State::silent(to))
            .map_err(|_| HmmError::TransitionNotFound {
                from: from.to_string(),
                to: to.to_string(),
            })?;
        self.compiled = None;
        Ok(())
    }

    /// Sugar for a transition out of the begin state.
    pub fn begin_transition(&mut self, to: &str, weight: f64) -> Result<(), HmmError> {
        let begin = self.begin()?.name().to_string();
        self.add_transition(&begin, to, weight)
    }

    /// Sugar for a transition into the end state.
    pub fn end_transition(&mut self, from: &str, weight: f64) -> Result<(), HmmError> {
        let end = self.end()?.name().to_string();
        self.add_transition(from, &end, weight)
    }

    fn check_transition_logic(&self, from: &str, to: &str, weight: f64) -> Result<(), HmmError> {
        let logic = |reason: &str| HmmError::TransitionLogic {
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.to_string(),
        };
        if from == self.end_name {
            return Err(logic("transitions cannot leave the end state"));
        }
        if to == self.begin_name {
            return Err(logic("transitions cannot enter the begin state"));
        }
        if from == self.begin_name && to == self.end_name {
            return Err(logic("begin cannot connect directly to end"));
        }
        if weight < 0.0 {
            return Err(logic("transition weights cannot be negative"));
        }
        Ok(())
    }

    ///
    /// Snapshot the graph into the dense form used by every inference
    /// and training call. With `normalize`, per-state outgoing weights
    /// are rescaled to sum to one.
    ///
    pub fn compile(&mut self, normalize: bool) -> Result<(), HmmError> {
        let begin = self.begin()?.clone();
        let end = self.end()?.clone();
        let compiled = compile(&self.graph, &begin, &end, normalize)?;
        self.compiled = Some(compiled);
        Ok(())
    }

    ///
    /// The current snapshot; `NotCompiled` when the graph changed since
    /// the last `compile()` (or it never ran).
    ///
    pub fn compiled(&self) -> Result<&CompiledHmm, HmmError> {
        self.compiled.as_ref().ok_or(HmmError::NotCompiled)
    }

    ///
    /// Forward column after consuming `t_max` symbols (whole sequence
    /// when `None`).
    ///
    pub fn forward<S: AsRef<str>>(
        &self,
        symbols: &[S],
        t_max: Option<usize>,
    ) -> Result<Vec<Prob>, HmmError> {
        self.compiled()?.forward(symbols, t_max)
    }

    ///
    /// Backward column at step `t_min` (default 1).
    ///
    pub fn backward<S: AsRef<str>>(
        &self,
        symbols: &[S],
        t_min: Option<usize>,
    ) -> Result<Vec<Prob>, HmmError> {
        self.compiled()?.backward(symbols, t_min)
    }

    ///
    /// `log P(sequence)`, by the forward terminator or, when
    /// `do_forward` is false, the backward one.
    ///
    pub fn log_likelihood<S: AsRef<str>>(
        &self,
        symbols: &[S],
        do_forward: bool,
    ) -> Result<Prob, HmmError> {
        let hmm = self.compiled()?;
        if do_forward {
            hmm.log_likelihood_forward(symbols)
        } else {
            hmm.log_likelihood_backward(symbols)
        }
    }

    ///
    /// Joint log-likelihood of a batch (the product of the per-sequence
    /// likelihoods).
    ///
    pub fn log_likelihood_batch<S: AsRef<str>>(
        &self,
        sequences: &[Vec<S>],
        do_forward: bool,
    ) -> Result<Prob, HmmError> {
        let product: Prob = sequences
            .iter()
            .map(|sequence| self.log_likelihood(sequence, do_forward))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .product();
        Ok(product)
    }

    /// Linear-space sequence likelihood.
    pub fn likelihood<S: AsRef<str>>(&self, symbols: &[S]) -> Result<f64, HmmError> {
        Ok(self.log_likelihood(symbols, true)?.to_value())
    }

    ///
    /// Viterbi decoding: the best state path (silent states included)
    /// and its log score.
    ///
    pub fn decode<S: AsRef<str>>(&self, symbols: &[S]) -> Result<(Vec<String>, Prob), HmmError> {
        self.compiled()?.viterbi(symbols)
    }

    ///
    /// Train the free parameters on a batch of sequences and write the
    /// converged values back into the graph. Returns the log-likelihood
    /// improvement over the batch. The graph is only touched after the
    /// convergence loop commits.
    ///
    pub fn train<S: AsRef<str>>(
        &mut self,
        sequences: &[Vec<S>],
        config: &TrainConfig,
    ) -> Result<f64, HmmError> {
        let mut hmm = self.compiled()?.clone();
        let improvement = train::train_compiled(&mut hmm, sequences, config)?;
        self.algorithm = config.algorithm;
        self.write_back(&hmm)?;
        self.compiled = Some(hmm);
        Ok(improvement)
    }

    ///
    /// Copy every free parameter of the trained snapshot into the graph
    /// as linear-space weights, so recompiling reproduces the trained
    /// model.
    ///
    fn write_back(&mut self, hmm: &CompiledHmm) -> Result<(), HmmError> {
        let begin_name = self.begin()?.name().to_string();
        let end_name = self.end()?.name().to_string();
        for &state in hmm.free_begin() {
            self.graph
                .set_weight(
                    &State::silent(&begin_name),
                    &State::silent(&hmm.names()[state]),
                    hmm.begin_prob(state).to_value(),
                )
                .map_err(|err| HmmError::CompileError(err.to_string()))?;
        }
        for &(from, to) in hmm.free_trans() {
            self.graph
                .set_weight(
                    &State::silent(&hmm.names()[from]),
                    &State::silent(&hmm.names()[to]),
                    hmm.trans(from, to).to_value(),
                )
                .map_err(|err| HmmError::CompileError(err.to_string()))?;
        }
        for &state in hmm.free_end() {
            self.graph
                .set_weight(
                    &State::silent(&hmm.names()[state]),
                    &State::silent(&end_name),
                    hmm.end_prob(state).to_value(),
                )
                .map_err(|err| HmmError::CompileError(err.to_string()))?;
        }
        for (state, symbol) in hmm.free_emit() {
            let name = hmm.names()[*state].clone();
            let value = hmm.emit(*state, symbol).to_value();
            let vertex = self
                .graph
                .get_vertex_mut(&State::silent(&name))
                .ok_or_else(|| HmmError::StateNotFound(name.clone()))?;
            let dist = vertex
                .emission_mut()
                .and_then(|emission| emission.as_discrete_mut())
                .ok_or_else(|| HmmError::StateHasNoDistribution(name.clone()))?;
            dist.to_linear();
            dist.set(symbol, value);
        }
        Ok(())
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(
            f,
            "{} ({} states, {} transitions)",
            self.name,
            self.num_states(),
            self.num_transitions()
        )?;
        for state in self.graph.vertices() {
            writeln!(f, "  {}", state)?;
            for (target, weight) in self.graph.out_edges(state).unwrap() {
                writeln!(f, "    -> {} ({})", target.name(), weight)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::DiscreteDistribution;

    fn dist(pairs: &[(&str, f64)]) -> DiscreteDistribution {
        DiscreteDistribution::from_pairs(pairs)
    }

    #[test]
    fn begin_and_end_are_states() {
        let model = Model::new("m");
        assert!(model.has_state("begin_m"));
        assert!(model.has_state("end_m"));
        assert_eq!(model.begin().unwrap().name(), "begin_m");
        assert_eq!(model.end().unwrap().name(), "end_m");
        assert_eq!(model.num_states(), 2);
    }

    #[test]
    fn explicit_begin_end_states() {
        let model = Model::with_states("m", State::silent("b"), State::silent("e"));
        assert_eq!(model.begin().unwrap().name(), "b");
        assert_eq!(model.end().unwrap().name(), "e");
    }

    #[test]
    fn add_remove_state() {
        let mut model = Model::new("m");
        assert!(!model.has_state("s"));
        model.add_state(State::silent("s")).unwrap();
        assert!(model.has_state("s"));
        assert!(matches!(
            model.add_state(State::silent("s")),
            Err(HmmError::StateExists(_))
        ));
        model.remove_state("s").unwrap();
        assert!(matches!(
            model.remove_state("s"),
            Err(HmmError::StateNotFound(_))
        ));
    }

    #[test]
    fn removed_begin_is_gone() {
        let mut model = Model::new("m");
        model.remove_state("begin_m").unwrap();
        assert!(model.begin().is_err());
        assert!(model.begin_transition("x", 0.5).is_err());
    }

    #[test]
    fn add_remove_transition() {
        let mut model = Model::new("m");
        model.add_state(State::silent("s1")).unwrap();
        assert!(matches!(
            model.add_transition("s1", "s2", 0.3),
            Err(HmmError::StateNotFound(_))
        ));
        model.add_state(State::silent("s2")).unwrap();
        model.add_transition("s1", "s2", 0.3).unwrap();
        assert!(model.has_transition("s1", "s2"));
        assert!(!model.has_transition("s2", "s1"));
        assert!(matches!(
            model.add_transition("s1", "s2", 0.3),
            Err(HmmError::TransitionExists { .. })
        ));
        assert_eq!(model.get_transition("s1", "s2").unwrap(), 0.3);
        model.set_transition("s1", "s2", 0.7).unwrap();
        assert_eq!(model.get_transition("s1", "s2").unwrap(), 0.7);
        model.remove_transition("s1", "s2").unwrap();
        assert!(matches!(
            model.remove_transition("s1", "s2"),
            Err(HmmError::TransitionNotFound { .. })
        ));
        // removing a state removes its transitions
        model.add_transition("s1", "s2", 0.3).unwrap();
        model.remove_state("s1").unwrap();
        assert!(!model.has_transition("s1", "s2"));
    }

    #[test]
    fn transition_logic_is_enforced() {
        let mut model = Model::new("m");
        model.add_state(State::silent("s")).unwrap();
        assert!(matches!(
            model.add_transition("end_m", "s", 0.5),
            Err(HmmError::TransitionLogic { .. })
        ));
        assert!(matches!(
            model.add_transition("s", "begin_m", 0.5),
            Err(HmmError::TransitionLogic { .. })
        ));
        assert!(matches!(
            model.add_transition("begin_m", "end_m", 0.5),
            Err(HmmError::TransitionLogic { .. })
        ));
        assert!(matches!(
            model.add_transition("begin_m", "s", -0.5),
            Err(HmmError::TransitionLogic { .. })
        ));
    }

    #[test]
    fn structural_changes_invalidate_the_snapshot() {
        let mut model = Model::new("m");
        model.add_state(State::new("s", dist(&[("A", 1.0)]))).unwrap();
        model.begin_transition("s", 1.0).unwrap();
        model.add_transition("s", "s", 1.0).unwrap();
        model.compile(true).unwrap();
        assert!(model.compiled().is_ok());
        model.set_transition("s", "s", 0.5).unwrap();
        assert!(matches!(model.compiled(), Err(HmmError::NotCompiled)));
        let seq = vec!["A".to_string()];
        assert!(matches!(
            model.forward(&seq, None),
            Err(HmmError::NotCompiled)
        ));
    }

    #[test]
    fn inference_before_compile_is_an_error() {
        let model = Model::new("m");
        let seq = vec!["A".to_string()];
        assert!(matches!(model.decode(&seq), Err(HmmError::NotCompiled)));
        assert!(matches!(
            model.log_likelihood(&seq, true),
            Err(HmmError::NotCompiled)
        ));
    }
}
