//!
//! Viterbi decoding.
//!
//! Same recurrence shape as forward with `max` in place of log-sum-exp,
//! plus predecessor tracking. The decoded path lists every state the
//! best path visits, silent states included, so it can be longer than
//! the sequence.
//!
use crate::compile::CompiledHmm;
use crate::error::HmmError;
use crate::prob::Prob;
use std::rc::Rc;

struct Node {
    value: usize,
    previous: Option<Rc<Node>>,
}

///
/// Predecessor links of the Viterbi recurrence.
///
/// Only two columns are alive at any time: links within the current
/// column chain silent states of one step, links into the previous
/// column cross an emission. Reconstructing the path walks the tail
/// chain once, O(T + silent states visited).
///
struct Traceback {
    previous: Vec<Option<Rc<Node>>>,
    current: Vec<Option<Rc<Node>>>,
}

impl Traceback {
    fn new(n_states: usize) -> Traceback {
        Traceback {
            previous: vec![None; n_states],
            current: vec![None; n_states],
        }
    }
    /// Path starts here (entered straight from the begin state).
    fn root(&mut self, state: usize) {
        self.current[state] = Some(Rc::new(Node {
            value: state,
            previous: None,
        }));
    }
    /// Transition crossing an emission: predecessor in the previous column.
    fn link_previous(&mut self, predecessor: usize, state: usize) {
        self.current[state] = Some(Rc::new(Node {
            value: state,
            previous: self.previous[predecessor].clone(),
        }));
    }
    /// Silent transition within the same step: predecessor in this column.
    fn link_current(&mut self, predecessor: usize, state: usize) {
        self.current[state] = Some(Rc::new(Node {
            value: state,
            previous: self.current[predecessor].clone(),
        }));
    }
    /// The final act of consuming a symbol.
    fn next_column(&mut self) {
        let n_states = self.current.len();
        self.previous = std::mem::replace(&mut self.current, vec![None; n_states]);
    }
    fn trace_back(&self, ending: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut node = self.previous[ending].clone();
        while let Some(current) = node {
            path.push(current.value);
            node = current.previous.clone();
        }
        path.reverse();
        path
    }
}

impl CompiledHmm {
    ///
    /// Best state path for the sequence and its log score. An impossible
    /// sequence decodes to an empty path with score `-inf` rather than
    /// an error. Ties resolve to the lowest dense index.
    ///
    pub fn viterbi<S: AsRef<str>>(
        &self,
        symbols: &[S],
    ) -> Result<(Vec<String>, Prob), HmmError> {
        if symbols.is_empty() {
            return Err(HmmError::EmptySequence);
        }
        let n = self.n_states();
        let mut psi = Traceback::new(n);

        // step 0: silent chains out of begin
        let mut init = vec![Prob::zero(); n];
        for i in self.k..n {
            let mut best = self.pi_begin[i];
            let mut argmax = None;
            for j in self.k..i {
                let candidate = init[j] * self.a[j][i];
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
                Some(j) => psi.link_current(j, i),
                None => psi.root(i),
            }
        }
        psi.next_column();

        // step 1: first emission out of begin or the step-0 silent chain
        let mut delta = vec![Prob::zero(); n];
        let first_symbol = symbols[0].as_ref();
        for i in 0..self.k {
            let mut best = self.pi_begin[i];
            let mut argmax = None;
            for j in self.k..n {
                let candidate = init[j] * self.a[j][i];
                if candidate > best {
                    best = candidate;
                    argmax = Some(j);
                }
            }
            delta[i] = best * self.emit(i, first_symbol);
            if delta[i].is_zero() {
                continue;
            }
            match argmax {
                Some(j) => psi.link_previous(j, i),
                None => psi.root(i),
            }
        }
        self.v_silent_pass(&mut delta, &mut psi);
        psi.next_column();

        // steps t > 1
        for symbol in symbols[1..].iter() {
            let symbol = symbol.as_ref();
            let mut next = vec![Prob::zero(); n];
            for i in 0..self.k {
                let mut best = Prob::zero();
                let mut argmax = None;
                for (j, &previous) in delta.iter().enumerate() {
                    let candidate = previous * self.a[j][i];
                    if candidate > best {
                        best = candidate;
                        argmax = Some(j);
                    }
                }
                if let Some(j) = argmax {
                    next[i] = best * self.emit(i, symbol);
                    if !next[i].is_zero() {
                        psi.link_previous(j, i);
                    }
                }
            }
            self.v_silent_pass(&mut next, &mut psi);
            delta = next;
            psi.next_column();
        }

        // termination
        let ending = if self.is_finite {
            (0..n)
                .map(|i| (i, delta[i] * self.pi_end[i]))
                .filter(|(_, score)| !score.is_zero())
                .fold(None, |best: Option<(usize, Prob)>, (i, score)| match best {
                    Some((_, top)) if top >= score => best,
                    _ => Some((i, score)),
                })
        } else {
            (0..self.k)
                .map(|i| (i, delta[i]))
                .filter(|(_, score)| !score.is_zero())
                .fold(None, |best: Option<(usize, Prob)>, (i, score)| match best {
                    Some((_, top)) if top >= score => best,
                    _ => Some((i, score)),
                })
        };
        match ending {
            Some((i, score)) => {
                let path = psi
                    .trace_back(i)
                    .into_iter()
                    .map(|state| self.names[state].clone())
                    .collect();
                Ok((path, score))
            }
            None => Ok((Vec::new(), Prob::zero())),
        }
    }

    /// Max-product silent pass over the current column.
    fn v_silent_pass(&self, delta: &mut [Prob], psi: &mut Traceback) {
        for i in self.k..self.n_states() {
            let mut best = Prob::zero();
            let mut argmax = None;
            for j in 0..i {
                let candidate = delta[j] * self.a[j][i];
                if candidate > best {
                    best = candidate;
                    argmax = Some(j);
                }
            }
            if let Some(j) = argmax {
                delta[i] = best;
                psi.link_current(j, i);
            }
        }
    }
}
