//! Difference reports between two position tables or two returns series.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;

use super::position::PositionTable;
use super::returns::ReturnsSeries;

#[derive(Debug, Clone, PartialEq)]
pub struct CellDiff {
    pub date: NaiveDate,
    pub column: String,
    pub left: Option<f64>,
    pub right: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDiff {
    pub left_only_dates: Vec<NaiveDate>,
    pub right_only_dates: Vec<NaiveDate>,
    pub left_only_columns: Vec<String>,
    pub right_only_columns: Vec<String>,
    pub value_diffs: Vec<CellDiff>,
}

impl TableDiff {
    pub fn index_equal(&self) -> bool {
        self.left_only_dates.is_empty() && self.right_only_dates.is_empty()
    }

    pub fn columns_equal(&self) -> bool {
        self.left_only_columns.is_empty() && self.right_only_columns.is_empty()
    }

    pub fn is_identical(&self) -> bool {
        self.index_equal() && self.columns_equal() && self.value_diffs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointDiff {
    pub date: NaiveDate,
    pub left: Option<f64>,
    pub right: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesDiff {
    pub left_only_dates: Vec<NaiveDate>,
    pub right_only_dates: Vec<NaiveDate>,
    pub value_diffs: Vec<PointDiff>,
}

impl SeriesDiff {
    pub fn index_equal(&self) -> bool {
        self.left_only_dates.is_empty() && self.right_only_dates.is_empty()
    }

    pub fn is_identical(&self) -> bool {
        self.index_equal() && self.value_diffs.is_empty()
    }
}

// NaN on both sides counts as equal, matching how tables compare for equality.
fn same(left: Option<f64>, right: Option<f64>) -> bool {
    match (left, right) {
        (Some(l), Some(r)) => l == r || (l.is_nan() && r.is_nan()),
        (None, None) => true,
        _ => false,
    }
}

fn one_sided<T: Ord + Clone>(left: &BTreeSet<T>, right: &BTreeSet<T>) -> (Vec<T>, Vec<T>) {
    (
        left.difference(right).cloned().collect(),
        right.difference(left).cloned().collect(),
    )
}

pub fn diff_tables(left: &PositionTable, right: &PositionTable) -> TableDiff {
    let left_dates: BTreeSet<NaiveDate> = left.dates().collect();
    let right_dates: BTreeSet<NaiveDate> = right.dates().collect();
    let (left_only_dates, right_only_dates) = one_sided(&left_dates, &right_dates);

    let left_cols = left.columns();
    let right_cols = right.columns();
    let (left_only_columns, right_only_columns) = one_sided(&left_cols, &right_cols);

    let all_dates: BTreeSet<NaiveDate> = left_dates.union(&right_dates).copied().collect();
    let all_cols: BTreeSet<&String> = left_cols.iter().chain(right_cols.iter()).collect();

    let mut value_diffs = Vec::new();
    for date in all_dates {
        let l_row = left.get(date);
        let r_row = right.get(date);
        for col in &all_cols {
            let l = l_row.and_then(|r| r.values.get(*col).copied());
            let r = r_row.and_then(|r| r.values.get(*col).copied());
            if !same(l, r) {
                value_diffs.push(CellDiff {
                    date,
                    column: (*col).clone(),
                    left: l,
                    right: r,
                });
            }
        }
    }

    TableDiff {
        left_only_dates,
        right_only_dates,
        left_only_columns,
        right_only_columns,
        value_diffs,
    }
}

pub fn diff_series(left: &ReturnsSeries, right: &ReturnsSeries) -> SeriesDiff {
    let left_dates: BTreeSet<NaiveDate> = left.dates().collect();
    let right_dates: BTreeSet<NaiveDate> = right.dates().collect();
    let (left_only_dates, right_only_dates) = one_sided(&left_dates, &right_dates);

    let value_diffs = left_dates
        .union(&right_dates)
        .filter_map(|&date| {
            let l = left.get(date);
            let r = right.get(date);
            (!same(l, r)).then_some(PointDiff {
                date,
                left: l,
                right: r,
            })
        })
        .collect();

    SeriesDiff {
        left_only_dates,
        right_only_dates,
        value_diffs,
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) => x.to_string(),
        None => "-".to_string(),
    }
}

fn fmt_dates(dates: &[NaiveDate]) -> String {
    dates
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for TableDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identical() {
            return writeln!(f, "The tables are identical.");
        }
        writeln!(f, "The tables are not identical.")?;

        writeln!(f, "\nIndex:")?;
        if self.index_equal() {
            writeln!(f, "  identical")?;
        } else {
            writeln!(f, "  left only:  {}", fmt_dates(&self.left_only_dates))?;
            writeln!(f, "  right only: {}", fmt_dates(&self.right_only_dates))?;
        }

        writeln!(f, "\nColumns:")?;
        if self.columns_equal() {
            writeln!(f, "  identical")?;
        } else {
            writeln!(f, "  left only:  {}", self.left_only_columns.join(", "))?;
            writeln!(f, "  right only: {}", self.right_only_columns.join(", "))?;
        }

        writeln!(f, "\nValues:")?;
        if self.value_diffs.is_empty() {
            writeln!(f, "  identical")?;
        } else {
            writeln!(f, "  {:<12} {:<12} {:>16} {:>16}", "date", "column", "left", "right")?;
            for d in &self.value_diffs {
                writeln!(
                    f,
                    "  {:<12} {:<12} {:>16} {:>16}",
                    d.date.to_string(),
                    d.column,
                    fmt_opt(d.left),
                    fmt_opt(d.right)
                )?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for SeriesDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identical() {
            return writeln!(f, "The series are identical.");
        }
        writeln!(f, "The series are not identical.")?;

        writeln!(f, "\nIndex:")?;
        if self.index_equal() {
            writeln!(f, "  identical")?;
        } else {
            writeln!(f, "  left only:  {}", fmt_dates(&self.left_only_dates))?;
            writeln!(f, "  right only: {}", fmt_dates(&self.right_only_dates))?;
        }

        writeln!(f, "\nValues:")?;
        if self.value_diffs.is_empty() {
            writeln!(f, "  identical")?;
        } else {
            writeln!(f, "  {:<12} {:>16} {:>16}", "date", "left", "right")?;
            for d in &self.value_diffs {
                writeln!(
                    f,
                    "  {:<12} {:>16} {:>16}",
                    d.date.to_string(),
                    fmt_opt(d.left),
                    fmt_opt(d.right)
                )?;
            }
        }
        Ok(())
    }
}
