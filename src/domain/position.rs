//! End-of-day position snapshots.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use super::error::TearsheetError;

/// Reserved instrument identifier for the cash balance.
pub const CASH: &str = "cash";

/// Net position values for one trading day, keyed by instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSnapshot {
    pub date: NaiveDate,
    pub values: BTreeMap<String, f64>,
}

impl PositionSnapshot {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, symbol: &str, value: f64) -> Self {
        self.values.insert(symbol.to_string(), value);
        self
    }

    /// Value for `symbol`, zero when absent.
    pub fn get(&self, symbol: &str) -> f64 {
        self.values.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn cash(&self) -> f64 {
        self.get(CASH)
    }

    /// Sum over every entry, cash included. NaN entries are skipped.
    pub fn total(&self) -> f64 {
        self.values.values().filter(|v| !v.is_nan()).sum()
    }

    /// Number of non-cash instruments with a non-zero position.
    pub fn held_count(&self) -> usize {
        self.values
            .iter()
            .filter(|(symbol, value)| symbol.as_str() != CASH && **value != 0.0 && !value.is_nan())
            .count()
    }

    pub fn add(&mut self, symbol: &str, delta: f64) {
        *self.values.entry(symbol.to_string()).or_insert(0.0) += delta;
    }
}

/// Chronologically ordered position snapshots, one per trading day.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PositionTable {
    rows: Vec<PositionSnapshot>,
}

impl PositionTable {
    pub fn new(rows: Vec<PositionSnapshot>) -> Result<Self, TearsheetError> {
        for pair in rows.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(TearsheetError::invalid(format!(
                    "position dates must be strictly increasing ({} follows {})",
                    pair[1].date, pair[0].date
                )));
            }
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[PositionSnapshot] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&PositionSnapshot> {
        self.rows.first()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.iter().map(|r| r.date)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&PositionSnapshot> {
        self.rows
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Union of instrument identifiers across all rows.
    pub fn columns(&self) -> BTreeSet<String> {
        self.rows
            .iter()
            .flat_map(|r| r.values.keys().cloned())
            .collect()
    }

    /// Columns in display order: instruments alphabetically, cash last.
    pub fn display_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .columns()
            .into_iter()
            .filter(|c| c != CASH)
            .collect();
        if self.rows.iter().any(|r| r.values.contains_key(CASH)) {
            columns.push(CASH.to_string());
        }
        columns
    }

    /// Values of one column, zero where a row lacks it.
    pub fn column(&self, symbol: &str) -> Vec<f64> {
        self.rows.iter().map(|r| r.get(symbol)).collect()
    }

    /// Apply a per-column function to every column.
    pub fn apply_columns<R>(&self, mut f: impl FnMut(&[f64]) -> R) -> BTreeMap<String, R> {
        self.columns()
            .into_iter()
            .map(|c| {
                let values = self.column(&c);
                let out = f(&values);
                (c, out)
            })
            .collect()
    }

    /// Each day's starting position: the previous day's end-of-day snapshot
    /// re-dated to the current day, with NaN read as zero. The first day has
    /// no predecessor, so every column is zero except cash, which is set to
    /// `starting_cash`.
    pub fn shift_forward(&self, starting_cash: f64) -> PositionTable {
        let columns = self.columns();
        let mut rows = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            let mut shifted = PositionSnapshot::new(row.date);
            for c in &columns {
                let value = match i {
                    0 => 0.0,
                    _ => self.rows[i - 1].get(c),
                };
                let value = if value.is_nan() { 0.0 } else { value };
                shifted.values.insert(c.clone(), value);
            }
            if i == 0 {
                shifted.values.insert(CASH.to_string(), starting_cash);
            }
            rows.push(shifted);
        }
        PositionTable { rows }
    }
}
