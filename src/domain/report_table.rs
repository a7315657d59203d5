//! Display tables for tear-sheet reports.

use super::error::TearsheetError;
use super::format;
use super::position::{CASH, PositionTable};
use super::returns::{Period, ReturnsSeries};
use super::stats::{mean, std_dev};

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRow {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub label: String,
    pub cells: Vec<String>,
}

/// A named table of pre-formatted cells with a labelled index column.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub name: String,
    pub index_label: String,
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
    /// Extra rows shown above the column header, each spanning all columns.
    pub header_rows: Vec<HeaderRow>,
}

impl ReportTable {
    pub fn new(name: &str, index_label: &str, columns: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            index_label: index_label.to_string(),
            columns,
            rows: Vec::new(),
            header_rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, label: &str, cells: Vec<String>) -> Result<(), TearsheetError> {
        if cells.len() != self.columns.len() {
            return Err(TearsheetError::invalid(format!(
                "table '{}': row '{}' has {} cells, expected {}",
                self.name,
                label,
                cells.len(),
                self.columns.len()
            )));
        }
        self.rows.push(ReportRow {
            label: label.to_string(),
            cells,
        });
        Ok(())
    }

    pub fn with_header_row(mut self, name: &str, value: &str) -> Self {
        self.header_rows.push(HeaderRow {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn from_positions(name: &str, positions: &PositionTable, decimals: usize) -> Self {
        let columns = positions.display_columns();
        let rows = positions
            .rows()
            .iter()
            .map(|snap| ReportRow {
                label: snap.date.to_string(),
                cells: columns
                    .iter()
                    .map(|c| format::fixed(snap.get(c), decimals))
                    .collect(),
            })
            .collect();
        Self {
            rows,
            ..Self::new(name, "date", columns)
        }
    }

    /// Returns rendered as percentages with `decimals` places.
    pub fn from_returns(name: &str, returns: &ReturnsSeries, decimals: usize) -> Self {
        let rows = returns
            .points()
            .iter()
            .map(|p| ReportRow {
                label: p.date.to_string(),
                cells: vec![format!("{}%", format::fixed(p.value * 100.0, decimals))],
            })
            .collect();
        Self {
            rows,
            ..Self::new(name, "date", vec!["return".to_string()])
        }
    }

    /// Headline figures: annualized return and volatility, Sharpe ratio,
    /// average held positions and peak gross exposure.
    pub fn from_summary(
        name: &str,
        returns: &ReturnsSeries,
        positions: &PositionTable,
        period: Period,
    ) -> Self {
        let values = returns.values();
        let factor = f64::from(period.annualization_factor());
        let (m, s) = (mean(&values), std_dev(&values));

        let held: Vec<f64> = positions
            .rows()
            .iter()
            .map(|r| r.held_count() as f64)
            .collect();
        let peak_exposure = positions
            .rows()
            .iter()
            .map(|r| {
                r.values
                    .iter()
                    .filter(|(symbol, v)| symbol.as_str() != CASH && !v.is_nan())
                    .map(|(_, v)| v.abs())
                    .sum::<f64>()
            })
            .fold(0.0, f64::max);

        let rows = [
            ("Annual return", format::percentage(m * factor * 100.0)),
            ("Annual volatility", format::percentage(s * factor.sqrt() * 100.0)),
            ("Sharpe ratio", format::two_dec_places(m / s * factor.sqrt())),
            ("Avg held positions", format::one_dec_places(mean(&held))),
            ("Peak gross exposure", format::millions(peak_exposure)),
        ]
        .into_iter()
        .map(|(label, cell)| ReportRow {
            label: label.to_string(),
            cells: vec![cell],
        })
        .collect();

        Self {
            rows,
            ..Self::new(name, "metric", vec!["value".to_string()])
        }
    }
}

/// A full report page: a title and its tables in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPage {
    pub title: String,
    pub tables: Vec<ReportTable>,
}
