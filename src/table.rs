//!
//! Table definitions shared by the forward and backward engines.
//!
//! A `TableSeq` stores one probability column per consumed symbol plus
//! the step-0 column that only silent states can occupy (states reached
//! before the first emission, or after the last one when read backward).
//!
use crate::prob::Prob;

///
/// Result of a full forward or backward run.
///
/// `tables[t - 1]` is the column after consuming `t` symbols (forward)
/// or before emitting symbol `t` (backward); `init_table` is the step-0
/// silent column.
///
#[derive(Clone, Debug, PartialEq)]
pub struct TableSeq {
    pub init_table: Vec<Prob>,
    pub tables: Vec<Vec<Prob>>,
    pub is_forward: bool,
}

impl TableSeq {
    pub fn n_symbols(&self) -> usize {
        self.tables.len()
    }
    ///
    /// Column after/before step `t` (1-based); `t = 0` is the silent
    /// init column.
    ///
    pub fn table(&self, t: usize) -> &[Prob] {
        if t == 0 {
            &self.init_table
        } else {
            &self.tables[t - 1]
        }
    }
    pub fn last_table(&self) -> &[Prob] {
        self.tables.last().unwrap_or(&self.init_table)
    }
}
