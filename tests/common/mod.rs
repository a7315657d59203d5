#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::io::Write;
use tearsheet::domain::error::TearsheetError;
use tearsheet::domain::position::{CASH, PositionSnapshot, PositionTable};
pub use tearsheet::domain::returns::ReturnsSeries;
pub use tearsheet::domain::transaction::Transaction;
use tearsheet::ports::returns_port::ReturnsPort;

pub struct MockReturnsPort {
    pub data: HashMap<String, ReturnsSeries>,
}

impl MockReturnsPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with_returns(mut self, symbol: &str, returns: ReturnsSeries) -> Self {
        self.data.insert(symbol.to_string(), returns);
        self
    }
}

impl ReturnsPort for MockReturnsPort {
    fn fetch_returns(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<ReturnsSeries, TearsheetError> {
        self.data
            .get(symbol)
            .map(|r| r.between(start, end))
            .filter(|r| !r.is_empty())
            .ok_or_else(|| TearsheetError::NoData {
                symbol: symbol.to_string(),
            })
    }

    fn list_symbols(&self) -> Result<Vec<String>, TearsheetError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

pub fn txn(at: &str, symbol: &str, amount: f64, price: f64) -> Transaction {
    Transaction::new(ts(at), symbol, amount, price)
}

/// Daily returns starting on 2024-01-02, one per consecutive day.
pub fn daily_returns(values: &[f64]) -> ReturnsSeries {
    ReturnsSeries::from_pairs(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (date(2024, 1, 2 + i as u32), *v)),
    )
    .unwrap()
}

/// Rows of `(day of January 2024, cash, [(symbol, value)])`.
pub fn positions(rows: &[(u32, f64, &[(&str, f64)])]) -> PositionTable {
    PositionTable::new(
        rows.iter()
            .map(|(day, cash, held)| {
                held.iter().fold(
                    PositionSnapshot::new(date(2024, 1, *day)).with(CASH, *cash),
                    |snap, (symbol, value)| snap.with(symbol, *value),
                )
            })
            .collect(),
    )
    .unwrap()
}

/// Two days: flat with 1000 cash, then 100 of AAPL and 900 cash.
pub fn two_day_aapl() -> PositionTable {
    positions(&[(2, 1000.0, &[]), (3, 900.0, &[("AAPL", 100.0)])])
}

/// A book that trades every day but ends flat.
pub fn flat_intraday_book() -> (ReturnsSeries, PositionTable, Vec<Transaction>) {
    let returns = daily_returns(&[0.0, 0.01, -0.005]);
    let positions = positions(&[
        (2, 10_000.0, &[("AAPL", 0.0), ("MSFT", 0.0)]),
        (3, 10_100.0, &[("AAPL", 0.0), ("MSFT", 0.0)]),
        (4, 10_049.5, &[("AAPL", 0.0), ("MSFT", 0.0)]),
    ]);
    let transactions = vec![
        txn("2024-01-02 09:30:00", "AAPL", 20.0, 100.0),
        txn("2024-01-02 10:00:00", "MSFT", 10.0, 300.0),
        txn("2024-01-02 15:55:00", "AAPL", -20.0, 100.0),
        txn("2024-01-02 15:56:00", "MSFT", -10.0, 300.0),
        txn("2024-01-03 09:31:00", "MSFT", -15.0, 310.0),
        txn("2024-01-03 15:50:00", "MSFT", 15.0, 303.0),
        txn("2024-01-04 11:00:00", "AAPL", 50.0, 99.0),
        txn("2024-01-04 14:00:00", "AAPL", -50.0, 98.0),
    ];
    (returns, positions, transactions)
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
