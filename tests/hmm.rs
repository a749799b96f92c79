//!
//! End-to-end scenarios over the mock models.
//!
#[macro_use]
extern crate approx;

use silhmm::mocks::{casino_training_set, mock_casino, mock_nucleobase, mock_profile};
use silhmm::prelude::*;

fn symbols(s: &str) -> Vec<String> {
    s.chars().map(|c| c.to_string()).collect()
}

fn compiled(model: &mut Model) -> &CompiledHmm {
    model.compile(true).unwrap();
    model.compiled().unwrap()
}

/// Forward and backward must agree on the sequence likelihood.
fn check_forward_backward_agreement(model: &Model, sequence: &[String]) {
    let fwd = model.log_likelihood(sequence, true).unwrap();
    let bwd = model.log_likelihood(sequence, false).unwrap();
    assert_abs_diff_eq!(fwd.to_log_value(), bwd.to_log_value(), epsilon = 1e-9);
}

/// Every state's outgoing mass (body + end) and the begin mass must be
/// stochastic after a normalizing compile.
fn check_row_stochasticity(hmm: &CompiledHmm) {
    let n = hmm.n_states();
    for i in 0..n {
        let total: f64 = (0..n).map(|j| hmm.trans(i, j).to_value()).sum::<f64>()
            + hmm.end_prob(i).to_value();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
    }
    let begin: f64 = (0..n).map(|i| hmm.begin_prob(i).to_value()).sum();
    assert_abs_diff_eq!(begin, 1.0, epsilon = 1e-12);
}

#[test]
fn s1_casino_forward_and_decode() {
    let mut model = mock_casino();
    model.compile(true).unwrap();
    let sequence = symbols("THHTTTHH");

    let alpha1 = model.forward(&sequence, Some(1)).unwrap();
    assert_abs_diff_eq!(alpha1[0].to_value(), 0.25, epsilon = 1e-12);
    assert_abs_diff_eq!(alpha1[1].to_value(), 0.125, epsilon = 1e-12);

    let alpha4 = model.forward(&sequence, Some(4)).unwrap();
    assert_abs_diff_eq!(alpha4[0].to_value(), 0.0303, epsilon = 1e-4);
    assert_abs_diff_eq!(alpha4[1].to_value(), 0.0191, epsilon = 1e-4);

    let loglik = model.log_likelihood(&sequence, true).unwrap();
    assert_abs_diff_eq!(loglik.to_log_value(), -5.89370729474874, epsilon = 1e-9);
    assert_abs_diff_eq!(model.likelihood(&sequence).unwrap(), 0.0028, epsilon = 1e-4);
    check_forward_backward_agreement(&model, &sequence);

    let (path, score) = model.decode(&sequence).unwrap();
    assert_eq!(path, vec!["fair"; 8]);
    assert_abs_diff_eq!(score.to_log_value(), -6.975848234644291, epsilon = 1e-9);
}

#[test]
fn s2_viterbi_training_on_casino() {
    let sequences = casino_training_set();

    // pseudocount 0
    let mut model = mock_casino();
    model.compile(true).unwrap();
    let improvement = model
        .train(&sequences, &TrainConfig::viterbi())
        .unwrap();
    assert_abs_diff_eq!(improvement, 1.7561, epsilon = 1e-4);
    let hmm = model.compiled().unwrap();
    assert_abs_diff_eq!(hmm.begin_prob(0).to_value(), 0.7778, epsilon = 1e-4);
    assert_abs_diff_eq!(hmm.begin_prob(1).to_value(), 0.2222, epsilon = 1e-4);
    assert_abs_diff_eq!(hmm.trans(0, 0).to_value(), 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(hmm.trans(0, 1).to_value(), 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(hmm.trans(1, 0).to_value(), 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(hmm.trans(1, 1).to_value(), 1.0, epsilon = 1e-9);
    let fair = hmm.emission(0).unwrap();
    assert_abs_diff_eq!(fair.prob("H").exp(), 0.3571, epsilon = 1e-4);
    assert_abs_diff_eq!(fair.prob("T").exp(), 0.6429, epsilon = 1e-4);
    let biased = hmm.emission(1).unwrap();
    assert_abs_diff_eq!(biased.prob("H").exp(), 0.75, epsilon = 1e-9);
    assert_abs_diff_eq!(biased.prob("T").exp(), 0.25, epsilon = 1e-9);

    // pseudocount 1
    let mut model = mock_casino();
    model.compile(true).unwrap();
    let improvement = model
        .train(&sequences, &TrainConfig::viterbi().with_pseudocount(1.0))
        .unwrap();
    assert_abs_diff_eq!(improvement, 1.6961, epsilon = 1e-4);
    let hmm = model.compiled().unwrap();
    assert_abs_diff_eq!(hmm.begin_prob(0).to_value(), 0.7273, epsilon = 1e-4);
    assert_abs_diff_eq!(hmm.begin_prob(1).to_value(), 0.2727, epsilon = 1e-4);
    assert_abs_diff_eq!(hmm.trans(0, 0).to_value(), 0.9565, epsilon = 1e-4);
    assert_abs_diff_eq!(hmm.trans(0, 1).to_value(), 0.0435, epsilon = 1e-4);
    assert_abs_diff_eq!(hmm.trans(1, 0).to_value(), 0.125, epsilon = 1e-9);
    assert_abs_diff_eq!(hmm.trans(1, 1).to_value(), 0.875, epsilon = 1e-9);
    // the pseudocount smooths transitions only
    let fair = hmm.emission(0).unwrap();
    assert_abs_diff_eq!(fair.prob("H").exp(), 0.3571, epsilon = 1e-4);
}

#[test]
fn s3_nucleobase_decode() {
    let mut model = mock_nucleobase();
    model.compile(true).unwrap();
    let sequence = symbols("ACGACTATTCGAT");
    let (path, score) = model.decode(&sequence).unwrap();
    let mut expected = vec!["s1".to_string(); 12];
    expected.push("s2".to_string());
    assert_eq!(path, expected);
    assert_abs_diff_eq!(score.to_log_value(), -23.8344, epsilon = 1e-4);
    check_forward_backward_agreement(&model, &sequence);
}

#[test]
fn s4_profile_hmm_with_silent_states() {
    let mut model = mock_profile();
    model.compile(true).unwrap();

    let (path, score) = model.decode(&symbols("GA")).unwrap();
    assert_eq!(path, vec!["D1", "D2", "I2", "I2", "D3"]);
    assert_abs_diff_eq!(score.to_log_value(), -10.0936, epsilon = 1e-4);

    let loglik = model.log_likelihood(&symbols("ACT"), true).unwrap();
    assert_abs_diff_eq!(loglik.to_log_value(), -1.0840, epsilon = 1e-4);
    let (path, score) = model.decode(&symbols("ACT")).unwrap();
    assert_eq!(path, vec!["M1", "M2", "M3"]);
    assert_abs_diff_eq!(score.to_log_value(), -1.1010, epsilon = 1e-4);

    for sequence in [symbols("GA"), symbols("ACT"), symbols("TTACT")] {
        check_forward_backward_agreement(&model, &sequence);
    }
}

#[test]
fn s5_baum_welch_on_nucleobase() {
    let mut model = mock_nucleobase();
    model.compile(true).unwrap();
    let sequence = symbols("ACGACTATTCGAT");
    let improvement = model
        .train(&[sequence.clone()], &TrainConfig::baum_welch())
        .unwrap();
    assert_abs_diff_eq!(improvement, 3.2383, epsilon = 1e-3);

    let hmm = model.compiled().unwrap();
    // pi_begin = [1, 0, 0]
    assert_abs_diff_eq!(hmm.begin_prob(0).to_value(), 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(hmm.begin_prob(1).to_value(), 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(hmm.begin_prob(2).to_value(), 0.0, epsilon = 1e-6);
    // pi_end = [0, 1, 0.1851]
    assert_abs_diff_eq!(hmm.end_prob(0).to_value(), 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(hmm.end_prob(1).to_value(), 1.0, epsilon = 1e-4);
    assert_abs_diff_eq!(hmm.end_prob(2).to_value(), 0.1851, epsilon = 1e-4);
    // A = [[0.9167, 0.0833, 0], [0, 0, 0], [0, 0, 0.8149]]
    assert_abs_diff_eq!(hmm.trans(0, 0).to_value(), 0.9167, epsilon = 1e-4);
    assert_abs_diff_eq!(hmm.trans(0, 1).to_value(), 0.0833, epsilon = 1e-4);
    assert_abs_diff_eq!(hmm.trans(0, 2).to_value(), 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(hmm.trans(1, 2).to_value(), 0.0, epsilon = 1e-4);
    assert_abs_diff_eq!(hmm.trans(2, 2).to_value(), 0.8149, epsilon = 1e-4);
    // distributions
    let s1 = hmm.emission(0).unwrap();
    assert_abs_diff_eq!(s1.prob("A").exp(), 0.3333, epsilon = 1e-4);
    assert_abs_diff_eq!(s1.prob("C").exp(), 0.25, epsilon = 1e-4);
    assert_abs_diff_eq!(s1.prob("G").exp(), 0.1667, epsilon = 1e-4);
    assert_abs_diff_eq!(s1.prob("T").exp(), 0.25, epsilon = 1e-4);
    let s2 = hmm.emission(1).unwrap();
    assert_abs_diff_eq!(s2.prob("T").exp(), 1.0, epsilon = 1e-6);
    let s3 = hmm.emission(2).unwrap();
    assert_abs_diff_eq!(s3.prob("A").exp(), 0.2482, epsilon = 1e-4);
    assert_abs_diff_eq!(s3.prob("C").exp(), 0.1851, epsilon = 1e-4);
    assert_abs_diff_eq!(s3.prob("G").exp(), 0.1851, epsilon = 1e-4);
    assert_abs_diff_eq!(s3.prob("T").exp(), 0.3816, epsilon = 1e-4);
}

#[test]
fn baum_welch_on_casino_batch() {
    let mut model = mock_casino();
    model.compile(true).unwrap();
    let improvement = model
        .train(&casino_training_set(), &TrainConfig::baum_welch())
        .unwrap();
    assert_abs_diff_eq!(improvement, 5.0507, epsilon = 1e-3);
    let hmm = model.compiled().unwrap();
    assert_abs_diff_eq!(hmm.begin_prob(0).to_value(), 0.7128, epsilon = 1e-3);
    assert_abs_diff_eq!(hmm.begin_prob(1).to_value(), 0.2872, epsilon = 1e-3);
    // training never breaks forward/backward agreement
    check_forward_backward_agreement(&model, &symbols("THTH"));
}

#[test]
fn viterbi_training_through_silent_states() {
    let mut model = mock_profile();
    model.compile(true).unwrap();
    let sequences = vec![symbols("ACT"), symbols("ACT"), symbols("ACC")];
    let improvement = model.train(&sequences, &TrainConfig::viterbi()).unwrap();
    assert_abs_diff_eq!(improvement, 5.679783267855, epsilon = 1e-6);
    let hmm = model.compiled().unwrap();
    // every training path starts in M1 and stops from M3
    let m1 = hmm.index_of("M1").unwrap();
    let m2 = hmm.index_of("M2").unwrap();
    let m3 = hmm.index_of("M3").unwrap();
    assert_abs_diff_eq!(hmm.begin_prob(m1).to_value(), 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(hmm.end_prob(m3).to_value(), 1.0, epsilon = 1e-9);
    // M2 only ever emitted C
    assert_abs_diff_eq!(hmm.emission(m2).unwrap().prob("C").exp(), 1.0, epsilon = 1e-9);
    // untouched states keep their compiled values
    let i3 = hmm.index_of("I3").unwrap();
    let d3 = hmm.index_of("D3").unwrap();
    assert_abs_diff_eq!(hmm.end_prob(i3).to_value(), 0.15, epsilon = 1e-9);
    assert_abs_diff_eq!(hmm.end_prob(d3).to_value(), 0.7, epsilon = 1e-9);
}

#[test]
fn s6_save_load_round_trip_with_mixed_states() {
    let mut model = Model::new("mixed");
    model
        .add_state(State::new(
            "emit_free",
            DiscreteDistribution::from_pairs(&[("x", 0.25), ("y", 0.75)]),
        ))
        .unwrap();
    model
        .add_state(
            State::new(
                "emit_fixed",
                DiscreteDistribution::from_pairs(&[("x", 0.6), ("y", 0.4)]),
            )
            .with_fixed_emission()
            .with_fixed_transition(),
        )
        .unwrap();
    model.add_state(State::silent("skip")).unwrap();
    model.set_algorithm(TrainAlgorithm::Viterbi);
    model.begin_transition("emit_free", 0.9).unwrap();
    model.begin_transition("skip", 0.1).unwrap();
    model.add_transition("skip", "emit_fixed", 1.0).unwrap();
    model.add_transition("emit_free", "emit_fixed", 0.5).unwrap();
    model.add_transition("emit_fixed", "emit_free", 0.25).unwrap();
    model.end_transition("emit_fixed", 0.75).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed");
    model.save(&path, "hmm").unwrap();
    let mut loaded = Model::load(&path, "hmm").unwrap();

    assert_eq!(loaded.name(), "mixed");
    assert_eq!(loaded.algorithm(), TrainAlgorithm::Viterbi);
    assert_eq!(loaded.num_states(), model.num_states());
    assert_eq!(loaded.num_transitions(), model.num_transitions());
    let fixed = loaded.get_state("emit_fixed").unwrap();
    assert!(!fixed.is_free_emission());
    assert!(!fixed.is_free_transition());
    assert!(loaded.get_state("skip").unwrap().is_silent());
    for (from, to, weight) in model.transitions() {
        assert_abs_diff_eq!(
            loaded.get_transition(&from, &to).unwrap(),
            weight,
            epsilon = 1e-8
        );
    }
    // both models compile to the same snapshot
    model.compile(true).unwrap();
    loaded.compile(true).unwrap();
    let sequence = symbols("xy");
    check_forward_backward_agreement(&loaded, &sequence);
    assert_abs_diff_eq!(
        model.log_likelihood(&sequence, true).unwrap().to_log_value(),
        loaded.log_likelihood(&sequence, true).unwrap().to_log_value(),
        epsilon = 1e-7
    );
}

#[test]
fn property_row_stochasticity_after_compile() {
    for mut model in [mock_casino(), mock_nucleobase(), mock_profile()] {
        check_row_stochasticity(compiled(&mut model));
    }
}

#[test]
fn property_silent_topology() {
    let mut model = mock_profile();
    let hmm = compiled(&mut model);
    let k = hmm.n_emitting();
    for j in k..hmm.n_states() {
        for i in k..hmm.n_states() {
            if !hmm.trans(j, i).is_zero() {
                assert!(j < i);
            }
        }
    }
}

#[test]
fn property_train_then_compile_round_trips() {
    let mut model = mock_nucleobase();
    model.compile(true).unwrap();
    let sequence = symbols("ACGACTATTCGAT");
    model
        .train(&[sequence], &TrainConfig::baum_welch())
        .unwrap();
    let trained = model.compiled().unwrap().clone();
    model.compile(true).unwrap();
    let rebuilt = model.compiled().unwrap();
    let n = trained.n_states();
    for i in 0..n {
        assert_abs_diff_eq!(
            trained.begin_prob(i).to_value(),
            rebuilt.begin_prob(i).to_value(),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            trained.end_prob(i).to_value(),
            rebuilt.end_prob(i).to_value(),
            epsilon = 1e-9
        );
        for j in 0..n {
            assert_abs_diff_eq!(
                trained.trans(i, j).to_value(),
                rebuilt.trans(i, j).to_value(),
                epsilon = 1e-9
            );
        }
        if let (Some(a), Some(b)) = (trained.emission(i), rebuilt.emission(i)) {
            for symbol in trained.alphabet() {
                assert_abs_diff_eq!(a.prob(symbol).exp(), b.prob(symbol).exp(), epsilon = 1e-9);
            }
        }
    }
}

#[test]
fn property_impossible_sequence() {
    let mut model = mock_casino();
    model.compile(true).unwrap();
    let sequence = symbols("THXTH");
    let (path, score) = model.decode(&sequence).unwrap();
    assert!(path.is_empty());
    assert!(score.is_zero());
    let column = model.forward(&sequence, None).unwrap();
    assert!(column.iter().all(|p| p.is_zero()));
    assert!(model.log_likelihood(&sequence, true).unwrap().is_zero());
}

#[test]
fn empty_sequences_are_rejected() {
    let mut model = mock_casino();
    model.compile(true).unwrap();
    let empty: Vec<String> = Vec::new();
    assert!(matches!(
        model.forward(&empty, None),
        Err(HmmError::EmptySequence)
    ));
    assert!(matches!(
        model.backward(&empty, None),
        Err(HmmError::EmptySequence)
    ));
    assert!(matches!(
        model.decode(&empty),
        Err(HmmError::EmptySequence)
    ));
}
