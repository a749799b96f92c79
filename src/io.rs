//!
//! Line-oriented model persistence.
//!
//! The format round-trips everything the authoring layer knows: state
//! names, silent/free flags, discrete distributions, every transition
//! including the begin/end ones, and the selected training algorithm.
//! Probabilities are written in linear space with eight decimal digits.
//!
//! ```text
//! <model name>
//! <training algorithm>
//! <begin name>|<end name>
//! <state count>
//!   <name>
//!   <silent>|<free_transition>|<free_emission>
//!   [<symbol count>
//!    <symbol>|<probability> ...]
//! <edge count>
//! <from>|<to>|<weight> ...
//! ```
//!
use crate::distribution::{DiscreteDistribution, Distribution, DEFAULT_PRECISION};
use crate::error::HmmError;
use crate::model::Model;
use crate::prob::round_to;
use crate::state::State;
use crate::train::TrainAlgorithm;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Field separator of the persisted format.
pub const SEPARATOR: char = '|';

impl Model {
    ///
    /// Write the model to `<path>.<ext>`.
    ///
    pub fn save<P: AsRef<Path>>(&self, path: P, ext: &str) -> Result<(), HmmError> {
        let mut out = String::new();
        out.push_str(self.name());
        out.push('\n');
        out.push_str(&self.algorithm().to_string());
        out.push('\n');
        let begin = self.begin()?.name().to_string();
        let end = self.end()?.name().to_string();
        out.push_str(&format!("{}{}{}\n", begin, SEPARATOR, end));

        let states: Vec<&State> = self.states().collect();
        out.push_str(&format!("{}\n", states.len()));
        for state in &states {
            out.push_str(state.name());
            out.push('\n');
            let silent = state.emission().is_none();
            out.push_str(&format!(
                "{}{}{}{}{}\n",
                flag(silent),
                SEPARATOR,
                flag(state.is_free_transition()),
                SEPARATOR,
                flag(state.is_free_emission())
            ));
            if let Some(emission) = state.emission() {
                let dist = emission.as_discrete().ok_or_else(|| {
                    HmmError::Unsupported(format!(
                        "state {} has a continuous distribution, which cannot be persisted",
                        state.name()
                    ))
                })?;
                let mut dist = dist.clone();
                dist.to_linear();
                out.push_str(&format!("{}\n", dist.len()));
                for (symbol, value) in dist.iter() {
                    if symbol.contains(SEPARATOR) || symbol.contains('\n') {
                        return Err(HmmError::Unsupported(format!(
                            "symbol {:?} cannot be persisted",
                            symbol
                        )));
                    }
                    out.push_str(&format!(
                        "{}{}{}\n",
                        symbol,
                        SEPARATOR,
                        round_to(value, DEFAULT_PRECISION)
                    ));
                }
            }
        }

        let edges = self.transitions();
        out.push_str(&format!("{}\n", edges.len()));
        for (from, to, weight) in edges {
            out.push_str(&format!(
                "{}{}{}{}{}\n",
                from,
                SEPARATOR,
                to,
                SEPARATOR,
                round_to(weight, DEFAULT_PRECISION)
            ));
        }

        let mut file = File::create(full_path(path, ext))?;
        file.write_all(out.as_bytes())?;
        Ok(())
    }

    ///
    /// Read a model back from `<path>.<ext>`. Exact inverse of `save`
    /// modulo the floating-point rounding applied there.
    ///
    pub fn load<P: AsRef<Path>>(path: P, ext: &str) -> Result<Model, HmmError> {
        let file = File::open(full_path(path, ext))?;
        let mut lines = Lines::new(BufReader::new(file));

        let name = lines.next()?;
        let algorithm: TrainAlgorithm = lines.next()?.parse().map_err(HmmError::Parse)?;
        let (begin_name, end_name) = lines.split2()?;
        if begin_name == end_name {
            return Err(HmmError::Parse(
                "begin and end states must be distinct".to_string(),
            ));
        }

        let mut states = Vec::new();
        let state_count = lines.count()?;
        for _ in 0..state_count {
            let state_name = lines.next()?;
            let (silent, free_transition, free_emission) = lines.split3_flags()?;
            let emission = if silent {
                None
            } else {
                let mut dist = DiscreteDistribution::new();
                let symbol_count = lines.count()?;
                for _ in 0..symbol_count {
                    let (symbol, value) = lines.split2()?;
                    let value: f64 = value
                        .parse()
                        .map_err(|_| HmmError::Parse(format!("bad probability for {}", symbol)))?;
                    dist.set(&symbol, value);
                }
                Some(Distribution::Discrete(dist))
            };
            let mut state = match emission {
                Some(Distribution::Discrete(dist)) => State::new(state_name, dist),
                _ => State::silent(state_name),
            };
            if !free_transition {
                state = state.with_fixed_transition();
            }
            if !free_emission {
                state = state.with_fixed_emission();
            }
            states.push(state);
        }

        let begin_at = states
            .iter()
            .position(|state| state.name() == begin_name)
            .ok_or_else(|| HmmError::Parse("begin state missing from state list".to_string()))?;
        let begin = states.remove(begin_at);
        let end_at = states
            .iter()
            .position(|state| state.name() == end_name)
            .ok_or_else(|| HmmError::Parse("end state missing from state list".to_string()))?;
        let end = states.remove(end_at);

        let mut model = Model::with_states(name, begin, end);
        model.set_algorithm(algorithm);
        for state in states {
            model.add_state(state)?;
        }

        let edge_count = lines.count()?;
        for _ in 0..edge_count {
            let (from, to, weight) = lines.split3()?;
            let weight: f64 = weight
                .parse()
                .map_err(|_| HmmError::Parse(format!("bad weight on {} -> {}", from, to)))?;
            model.add_transition(&from, &to, weight)?;
        }
        Ok(model)
    }
}

fn flag(value: bool) -> char {
    if value {
        '1'
    } else {
        '0'
    }
}

fn full_path<P: AsRef<Path>>(path: P, ext: &str) -> std::path::PathBuf {
    let mut path = path.as_ref().to_path_buf();
    if !ext.is_empty() {
        let name = format!(
            "{}.{}",
            path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            ext.trim_start_matches('.')
        );
        path.set_file_name(name);
    }
    path
}

/// Line cursor with the small parsers the format needs.
struct Lines<R: BufRead> {
    reader: R,
    line_no: usize,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Lines<R> {
        Lines { reader, line_no: 0 }
    }
    fn next(&mut self) -> Result<String, HmmError> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            return Err(HmmError::Parse(format!(
                "unexpected end of file at line {}",
                self.line_no + 1
            )));
        }
        self.line_no += 1;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
    fn count(&mut self) -> Result<usize, HmmError> {
        let line = self.next()?;
        line.parse()
            .map_err(|_| HmmError::Parse(format!("expected a count, got {:?}", line)))
    }
    fn split2(&mut self) -> Result<(String, String), HmmError> {
        let line = self.next()?;
        let mut parts = line.splitn(2, SEPARATOR);
        match (parts.next(), parts.next()) {
            (Some(a), Some(b)) => Ok((a.to_string(), b.to_string())),
            _ => Err(HmmError::Parse(format!("expected two fields: {:?}", line))),
        }
    }
    fn split3(&mut self) -> Result<(String, String, String), HmmError> {
        let line = self.next()?;
        let mut parts = line.splitn(3, SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), Some(c)) => Ok((a.to_string(), b.to_string(), c.to_string())),
            _ => Err(HmmError::Parse(format!(
                "expected three fields: {:?}",
                line
            ))),
        }
    }
    fn split3_flags(&mut self) -> Result<(bool, bool, bool), HmmError> {
        let (a, b, c) = self.split3()?;
        Ok((parse_flag(&a)?, parse_flag(&b)?, parse_flag(&c)?))
    }
}

fn parse_flag(field: &str) -> Result<bool, HmmError> {
    match field {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(HmmError::Parse(format!("expected a 0/1 flag, got {:?}", other))),
    }
}
