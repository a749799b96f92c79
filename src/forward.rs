//!
//! Forward algorithm.
//!
//! `alpha_t[i] = log P(O_1..O_t, state i at step t)` with the silent
//! extension: transitions may chain through silent states between two
//! emissions, so every step runs an extra pass over the silent tail in
//! topological order.
//!
use crate::compile::CompiledHmm;
use crate::error::HmmError;
use crate::prob::Prob;
use crate::table::TableSeq;

impl CompiledHmm {
    ///
    /// Run the forward algorithm over the whole sequence and keep every
    /// column (the trainers need them all).
    ///
    pub fn forward_tables<S: AsRef<str>>(&self, symbols: &[S]) -> Result<TableSeq, HmmError> {
        if symbols.is_empty() {
            return Err(HmmError::EmptySequence);
        }
        let init_table = self.f_init_silent();
        let mut tables = Vec::with_capacity(symbols.len());
        tables.push(self.f_first(&init_table, symbols[0].as_ref()));
        for symbol in &symbols[1..] {
            let table = self.f_step(tables.last().unwrap(), symbol.as_ref());
            tables.push(table);
        }
        Ok(TableSeq {
            init_table,
            tables,
            is_forward: true,
        })
    }

    ///
    /// The forward column after consuming `t_max` symbols (the whole
    /// sequence when `None`).
    ///
    pub fn forward<S: AsRef<str>>(
        &self,
        symbols: &[S],
        t_max: Option<usize>,
    ) -> Result<Vec<Prob>, HmmError> {
        if symbols.is_empty() {
            return Err(HmmError::EmptySequence);
        }
        let t_max = t_max.unwrap_or(symbols.len()).clamp(1, symbols.len());
        let init = self.f_init_silent();
        let mut table = self.f_first(&init, symbols[0].as_ref());
        for symbol in symbols[1..t_max].iter() {
            table = self.f_step(&table, symbol.as_ref());
        }
        Ok(table)
    }

    ///
    /// `log P(O_1..O_T)` via the forward terminator.
    ///
    pub fn log_likelihood_forward<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Prob, HmmError> {
        let table = self.forward(symbols, None)?;
        Ok(self.forward_terminate(&table))
    }

    ///
    /// Sum the last column into the sequence likelihood. Non-finite
    /// models cannot end in a silent state, so only emitting entries
    /// participate there.
    ///
    pub(crate) fn forward_terminate(&self, last: &[Prob]) -> Prob {
        if self.is_finite {
            (0..self.n_states())
                .map(|i| last[i] * self.pi_end[i])
                .sum()
        } else {
            last[..self.k].iter().sum()
        }
    }

    ///
    /// Step-0 column: silent states reachable from begin through silent
    /// chains, in topological order.
    ///
    /// ```text
    /// a0[i] = pi_begin[i] + sum_{j silent, j<i} a0[j] t_ji
    /// ```
    ///
    pub(crate) fn f_init_silent(&self) -> Vec<Prob> {
        let n = self.n_states();
        let mut table = vec![Prob::zero(); n];
        for i in self.k..n {
            let mut value = self.pi_begin[i];
            for j in self.k..i {
                value += table[j] * self.a[j][i];
            }
            table[i] = value;
        }
        table
    }

    ///
    /// First emission: emitting states enter either straight from begin
    /// or through the step-0 silent chain, then the silent tail of the
    /// new column is filled.
    ///
    /// ```text
    /// a1[i] = (pi_begin[i] + sum_{j silent} a0[j] t_ji) e_i(O_1)   i emitting
    /// a1[i] = sum_{j < i} a1[j] t_ji                               i silent
    /// ```
    ///
    pub(crate) fn f_first(&self, init: &[Prob], symbol: &str) -> Vec<Prob> {
        let n = self.n_states();
        let mut table = vec![Prob::zero(); n];
        for i in 0..self.k {
            let mut value = self.pi_begin[i];
            for j in self.k..n {
                value += init[j] * self.a[j][i];
            }
            table[i] = value * self.emit(i, symbol);
        }
        self.f_silent_pass(&mut table);
        table
    }

    ///
    /// One step of the recurrence.
    ///
    /// ```text
    /// at[i] = (sum_j at-1[j] t_ji) e_i(O_t)   i emitting
    /// at[i] = sum_{j < i} at[j] t_ji          i silent, topological order
    /// ```
    ///
    pub(crate) fn f_step(&self, prev: &[Prob], symbol: &str) -> Vec<Prob> {
        let n = self.n_states();
        let mut table = vec![Prob::zero(); n];
        for i in 0..self.k {
            let value: Prob = (0..n).map(|j| prev[j] * self.a[j][i]).sum();
            table[i] = value * self.emit(i, symbol);
        }
        self.f_silent_pass(&mut table);
        table
    }

    /// Fill the silent tail of a column from the entries before it.
    fn f_silent_pass(&self, table: &mut [Prob]) {
        for i in self.k..self.n_states() {
            table[i] = (0..i).map(|j| table[j] * self.a[j][i]).sum();
        }
    }
}
