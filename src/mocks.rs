//!
//! Mock models for testing.
//!
use crate::distribution::DiscreteDistribution;
use crate::model::Model;
use crate::state::State;

fn dist(pairs: &[(&str, f64)]) -> DiscreteDistribution {
    DiscreteDistribution::from_pairs(pairs)
}

///
/// Two-state occasionally-dishonest-casino model. Not finite: no state
/// can reach end.
///
/// ```text
/// begin -0.5-> fair   (H 0.5, T 0.5),  fair -0.9-> fair, -0.1-> biased
/// begin -0.5-> biased (H 0.75, T 0.25), biased -0.9-> biased, -0.1-> fair
/// ```
///
pub fn mock_casino() -> Model {
    let mut model = Model::new("casino");
    model
        .add_state(State::new("fair", dist(&[("H", 0.5), ("T", 0.5)])))
        .unwrap();
    model
        .add_state(State::new("biased", dist(&[("H", 0.75), ("T", 0.25)])))
        .unwrap();
    model.begin_transition("fair", 0.5).unwrap();
    model.begin_transition("biased", 0.5).unwrap();
    model.add_transition("fair", "fair", 0.9).unwrap();
    model.add_transition("fair", "biased", 0.1).unwrap();
    model.add_transition("biased", "biased", 0.9).unwrap();
    model.add_transition("biased", "fair", 0.1).unwrap();
    model
}

///
/// Three-state nucleobase model, finite, no silent states. The authored
/// weights deliberately do not sum to one per state, so compiling with
/// `normalize = true` rescales them.
///
pub fn mock_nucleobase() -> Model {
    let mut model = Model::new("nucleobase");
    model
        .add_state(State::new(
            "s1",
            dist(&[("A", 0.4), ("C", 0.2), ("G", 0.1), ("T", 0.3)]),
        ))
        .unwrap();
    model
        .add_state(State::new("s2", dist(&[("T", 1.0)])))
        .unwrap();
    model
        .add_state(State::new(
            "s3",
            dist(&[("A", 0.1), ("C", 0.15), ("G", 0.15), ("T", 0.6)]),
        ))
        .unwrap();
    model.begin_transition("s1", 1.0).unwrap();
    model.add_transition("s1", "s1", 0.55).unwrap();
    model.add_transition("s1", "s2", 0.35).unwrap();
    model.end_transition("s2", 0.7).unwrap();
    model.add_transition("s2", "s3", 0.8).unwrap();
    model.add_transition("s3", "s3", 0.4).unwrap();
    model.end_transition("s3", 0.3).unwrap();
    model
}

///
/// Ten-state profile HMM over the consensus "ACT": match states M1..M3,
/// insert states I0..I3 and silent delete states D1..D3.
///
pub fn mock_profile() -> Model {
    let mut model = Model::new("profile");
    let insert = dist(&[("A", 0.25), ("C", 0.25), ("G", 0.25), ("T", 0.25)]);
    for name in ["I0", "I1", "I2", "I3"] {
        model.add_state(State::new(name, insert.clone())).unwrap();
    }
    model
        .add_state(State::new(
            "M1",
            dist(&[("A", 0.95), ("C", 0.01), ("G", 0.01), ("T", 0.03)]),
        ))
        .unwrap();
    model
        .add_state(State::new(
            "M2",
            dist(&[("A", 0.003), ("C", 0.99), ("G", 0.003), ("T", 0.004)]),
        ))
        .unwrap();
    model
        .add_state(State::new(
            "M3",
            dist(&[("A", 0.01), ("C", 0.01), ("G", 0.01), ("T", 0.97)]),
        ))
        .unwrap();
    for name in ["D1", "D2", "D3"] {
        model.add_state(State::silent(name)).unwrap();
    }

    model.begin_transition("M1", 0.5).unwrap();
    model.begin_transition("I0", 0.1).unwrap();
    model.begin_transition("D1", 0.4).unwrap();

    model.add_transition("M1", "M2", 0.9).unwrap();
    model.add_transition("M1", "I1", 0.05).unwrap();
    model.add_transition("M1", "D2", 0.05).unwrap();
    model.add_transition("M2", "M3", 0.9).unwrap();
    model.add_transition("M2", "I2", 0.05).unwrap();
    model.add_transition("M2", "D3", 0.05).unwrap();
    model.end_transition("M3", 0.9).unwrap();
    model.add_transition("M3", "I3", 0.1).unwrap();

    model.add_transition("I0", "I0", 0.7).unwrap();
    model.add_transition("I0", "D1", 0.15).unwrap();
    model.add_transition("I0", "M1", 0.15).unwrap();
    model.add_transition("I1", "I1", 0.7).unwrap();
    model.add_transition("I1", "D2", 0.15).unwrap();
    model.add_transition("I1", "M2", 0.15).unwrap();
    model.add_transition("I2", "I2", 0.7).unwrap();
    model.add_transition("I2", "D3", 0.15).unwrap();
    model.add_transition("I2", "M3", 0.15).unwrap();
    model.add_transition("I3", "I3", 0.85).unwrap();
    model.end_transition("I3", 0.15).unwrap();

    model.add_transition("D1", "D2", 0.15).unwrap();
    model.add_transition("D1", "I1", 0.15).unwrap();
    model.add_transition("D1", "M2", 0.7).unwrap();
    model.add_transition("D2", "D3", 0.15).unwrap();
    model.add_transition("D2", "I2", 0.15).unwrap();
    model.add_transition("D2", "M3", 0.7).unwrap();
    model.add_transition("D3", "I3", 0.3).unwrap();
    model.end_transition("D3", 0.7).unwrap();
    model
}

///
/// The nine four-symbol coin sequences used by the casino training
/// scenarios.
///
pub fn casino_training_set() -> Vec<Vec<String>> {
    ["HTHH", "HTHH", "THHT", "THHT", "THHT", "THTH", "THTH", "TTTT", "TTTT"]
        .iter()
        .map(|sequence| sequence.chars().map(|symbol| symbol.to_string()).collect())
        .collect()
}
