//! CSV file adapter: tear-sheet inputs, estimated positions and report tables.
//!
//! Formats (header row required):
//! - returns: `date,return`
//! - positions: `date,<instrument>...,cash`, empty cells read as zero
//! - transactions: `timestamp,symbol,amount,price`; offset timestamps become UTC
//! - report tables: index label column followed by headed columns

use crate::domain::error::TearsheetError;
use crate::domain::position::{PositionSnapshot, PositionTable};
use crate::domain::report_table::ReportTable;
use crate::domain::returns::{ReturnPoint, ReturnsSeries};
use crate::domain::transaction::Transaction;
use crate::ports::returns_port::ReturnsPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const OFFSET_TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
];

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

fn csv_err(path: &Path, reason: impl ToString) -> TearsheetError {
    TearsheetError::Csv {
        file: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn parse_date(path: &Path, s: &str) -> Result<NaiveDate, TearsheetError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| csv_err(path, format!("invalid date '{}': {}", s, e)))
}

fn parse_timestamp(path: &Path, s: &str) -> Result<NaiveDateTime, TearsheetError> {
    let s = s.trim();
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    // Offset timestamps are normalised to UTC.
    for fmt in OFFSET_TIMESTAMP_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(s, fmt) {
            return Ok(ts.naive_utc());
        }
    }
    // A bare date means midnight.
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| csv_err(path, format!("invalid timestamp '{}'", s)))
}

fn open_reader(path: &Path) -> Result<csv::Reader<fs::File>, TearsheetError> {
    let file = fs::File::open(path).map_err(|e| csv_err(path, format!("failed to open: {}", e)))?;
    Ok(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file))
}

pub fn read_returns(path: &Path) -> Result<ReturnsSeries, TearsheetError> {
    let mut rdr = open_reader(path)?;
    let mut points = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| csv_err(path, e))?;
        let date_str = record
            .get(0)
            .ok_or_else(|| csv_err(path, "missing date column"))?;
        let date = parse_date(path, date_str)?;
        let value: f64 = record
            .get(1)
            .ok_or_else(|| csv_err(path, "missing return column"))?
            .parse()
            .map_err(|e| csv_err(path, format!("invalid return value on {}: {}", date, e)))?;
        points.push(ReturnPoint { date, value });
    }

    points.sort_by_key(|p| p.date);
    ReturnsSeries::new(points)
}

pub fn read_positions(path: &Path) -> Result<PositionTable, TearsheetError> {
    let mut rdr = open_reader(path)?;
    let headers = rdr.headers().map_err(|e| csv_err(path, e))?.clone();
    if headers.len() < 2 {
        return Err(csv_err(path, "positions need a date column and at least one instrument"));
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| csv_err(path, e))?;
        let date = parse_date(
            path,
            record.get(0).ok_or_else(|| csv_err(path, "missing date column"))?,
        )?;
        let mut snap = PositionSnapshot::new(date);
        for (symbol, cell) in headers.iter().zip(record.iter()).skip(1) {
            let value = if cell.is_empty() {
                0.0
            } else {
                cell.parse::<f64>().map_err(|e| {
                    csv_err(path, format!("invalid value for {} on {}: {}", symbol, date, e))
                })?
            };
            snap.values.insert(symbol.to_string(), value);
        }
        rows.push(snap);
    }

    rows.sort_by_key(|r| r.date);
    PositionTable::new(rows)
}

#[derive(Debug, Deserialize)]
struct TransactionRecord {
    timestamp: String,
    symbol: String,
    amount: f64,
    price: f64,
}

pub fn read_transactions(path: &Path) -> Result<Vec<Transaction>, TearsheetError> {
    let mut rdr = open_reader(path)?;
    let mut txns = Vec::new();

    for result in rdr.deserialize::<TransactionRecord>() {
        let rec = result.map_err(|e| csv_err(path, e))?;
        txns.push(Transaction {
            timestamp: parse_timestamp(path, &rec.timestamp)?,
            symbol: rec.symbol,
            amount: rec.amount,
            price: rec.price,
        });
    }

    // Stable: same-instant rows keep file order.
    txns.sort_by_key(|t| t.timestamp);
    Ok(txns)
}

pub fn write_positions(path: &Path, positions: &PositionTable) -> Result<(), TearsheetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path).map_err(|e| csv_err(path, format!("failed to create: {}", e)))?;
    write_positions_to(file, positions).map_err(|e| csv_err(path, e))
}

/// Write positions as `date,<instrument>...,cash` to any writer.
pub fn write_positions_to<W: io::Write>(
    writer: W,
    positions: &PositionTable,
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    let columns = positions.display_columns();

    let mut header = vec!["date".to_string()];
    header.extend(columns.iter().cloned());
    wtr.write_record(&header)?;

    for snap in positions.rows() {
        let mut record = vec![snap.date.to_string()];
        record.extend(columns.iter().map(|c| snap.get(c).to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Load a pre-computed report table.
///
/// A missing file is `Ok(None)`; a file that exists but cannot be parsed is
/// an error. An empty index header takes the table name as its label.
pub fn load_report_table(path: &Path, name: &str) -> Result<Option<ReportTable>, TearsheetError> {
    if !path.exists() {
        return Ok(None);
    }
    let mut rdr = open_reader(path)?;
    let headers = rdr.headers().map_err(|e| csv_err(path, e))?.clone();
    let index_label = match headers.get(0) {
        Some(h) if !h.is_empty() => h.to_string(),
        _ => name.to_string(),
    };
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut table = ReportTable::new(name, &index_label, columns);
    for result in rdr.records() {
        let record = result.map_err(|e| csv_err(path, e))?;
        let label = record.get(0).unwrap_or_default();
        let cells = record.iter().skip(1).map(str::to_string).collect();
        table.push_row(label, cells)?;
    }
    Ok(Some(table))
}

/// Directory of `<SYMBOL>.csv` returns files.
pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

impl ReturnsPort for CsvAdapter {
    fn fetch_returns(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<ReturnsSeries, TearsheetError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Err(TearsheetError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let series = read_returns(&path)?.between(start, end);
        if series.is_empty() {
            return Err(TearsheetError::NoData {
                symbol: symbol.to_string(),
            });
        }
        Ok(series)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TearsheetError> {
        let entries = fs::read_dir(&self.base_path)?;
        let mut symbols = Vec::new();

        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
