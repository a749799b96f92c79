//!
//! Backward algorithm.
//!
//! `beta_t[i] = log P(O_{t+1}..O_T | state i at step t)`. Two subtleties
//! relative to forward: the initialization at T must chase silent chains
//! toward the end state in reverse topological order, and every step has
//! three passes (silent states looking at the next column's emitting
//! states, silent states looking at later silent states of the current
//! column, then the emitting states combining both).
//!
use crate::compile::CompiledHmm;
use crate::error::HmmError;
use crate::prob::Prob;
use crate::table::TableSeq;

impl CompiledHmm {
    ///
    /// Run the backward algorithm over the whole sequence and keep every
    /// column. `init_table` is the step-0 silent column (states passed
    /// through before the first emission).
    ///
    pub fn backward_tables<S: AsRef<str>>(&self, symbols: &[S]) -> Result<TableSeq, HmmError> {
        if symbols.is_empty() {
            return Err(HmmError::EmptySequence);
        }
        let t_total = symbols.len();
        let mut tables = vec![Vec::new(); t_total];
        tables[t_total - 1] = self.b_init();
        for t in (0..t_total - 1).rev() {
            tables[t] = self.b_step(&tables[t + 1], symbols[t + 1].as_ref());
        }
        let init_table = self.b_silent_head(&tables[0], symbols[0].as_ref());
        Ok(TableSeq {
            init_table,
            tables,
            is_forward: false,
        })
    }

    ///
    /// The backward column at step `t_min` (default 1, the column that
    /// still has every emission ahead of it except the first).
    ///
    pub fn backward<S: AsRef<str>>(
        &self,
        symbols: &[S],
        t_min: Option<usize>,
    ) -> Result<Vec<Prob>, HmmError> {
        if symbols.is_empty() {
            return Err(HmmError::EmptySequence);
        }
        let t_min = t_min.unwrap_or(1).clamp(1, symbols.len());
        let mut table = self.b_init();
        for t in (t_min - 1..symbols.len() - 1).rev() {
            table = self.b_step(&table, symbols[t + 1].as_ref());
        }
        Ok(table)
    }

    ///
    /// `log P(O_1..O_T)` via the backward terminator: one more
    /// pseudo-step that folds in `pi_begin` and the first emission.
    ///
    pub fn log_likelihood_backward<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Prob, HmmError> {
        let tables = self.backward_tables(symbols)?;
        let first_symbol = symbols[0].as_ref();
        let beta1 = &tables.tables[0];
        let beta0 = &tables.init_table;
        let emitting: Prob = (0..self.k)
            .map(|i| self.pi_begin[i] * self.emit(i, first_symbol) * beta1[i])
            .sum();
        let silent: Prob = (self.k..self.n_states())
            .map(|i| self.pi_begin[i] * beta0[i])
            .sum();
        Ok(emitting + silent)
    }

    ///
    /// Column at T. Finite models fold `pi_end` backward through silent
    /// chains (reverse topological order); in non-finite models every
    /// emitting state is a valid stopping point and silent tails are
    /// unreachable endings.
    ///
    /// ```text
    /// bT[i] = pi_end[i] + sum_{j silent, j>i} t_ij bT[j]   (finite)
    /// bT[i] = 0 for emitting i, -inf for silent i          (otherwise)
    /// ```
    ///
    pub(crate) fn b_init(&self) -> Vec<Prob> {
        let n = self.n_states();
        let mut table = vec![Prob::zero(); n];
        if self.is_finite {
            for i in (self.k..n).rev() {
                let mut value = self.pi_end[i];
                for j in i + 1..n {
                    value += self.a[i][j] * table[j];
                }
                table[i] = value;
            }
            for i in 0..self.k {
                let mut value = self.pi_end[i];
                for j in self.k..n {
                    value += self.a[i][j] * table[j];
                }
                table[i] = value;
            }
        } else {
            for value in table[..self.k].iter_mut() {
                *value = Prob::one();
            }
        }
        table
    }

    ///
    /// One step backward given the column for step t+1 and the symbol it
    /// emits.
    ///
    /// ```text
    /// bt[i] = sum_{j emitting} t_ij e_j(O_t+1) bt+1[j]
    ///       + sum_{j silent}   t_ij bt[j]
    /// ```
    ///
    /// Silent rows are filled first (reverse topological order, so the
    /// inner silent sum only reads already-final entries), emitting rows
    /// after.
    ///
    pub(crate) fn b_step(&self, next: &[Prob], symbol: &str) -> Vec<Prob> {
        let n = self.n_states();
        let mut table = vec![Prob::zero(); n];
        for i in (self.k..n).rev() {
            table[i] = self.b_row(i, &table, next, symbol, true);
        }
        for i in 0..self.k {
            table[i] = self.b_row(i, &table, next, symbol, false);
        }
        table
    }

    ///
    /// Step-0 silent column: silent states that hand over to the first
    /// emission (or to later step-0 silent states).
    ///
    pub(crate) fn b_silent_head(&self, beta1: &[Prob], first_symbol: &str) -> Vec<Prob> {
        let n = self.n_states();
        let mut table = vec![Prob::zero(); n];
        for i in (self.k..n).rev() {
            table[i] = self.b_row(i, &table, beta1, first_symbol, true);
        }
        table
    }

    fn b_row(
        &self,
        i: usize,
        current: &[Prob],
        next: &[Prob],
        symbol: &str,
        silent_after_only: bool,
    ) -> Prob {
        let n = self.n_states();
        let mut value: Prob = (0..self.k)
            .map(|j| self.a[i][j] * self.emit(j, symbol) * next[j])
            .sum();
        let silent_from = if silent_after_only { i + 1 } else { self.k };
        for j in silent_from..n {
            value += self.a[i][j] * current[j];
        }
        value
    }
}
