//! Intraday position estimation.
//!
//! Strategies that close most positions before the end of the day look
//! nearly flat in end-of-day snapshots. The estimator replaces each day's
//! snapshot with the positions held at the point of peak gross exposure,
//! reconstructed from the transaction log on top of the previous day's
//! closing positions.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use super::error::TearsheetError;
use super::position::{CASH, PositionSnapshot, PositionTable};
use super::returns::ReturnsSeries;
use super::transaction::Transaction;

pub const DEFAULT_EOD_HOUR: u32 = 23;
pub const DEFAULT_INTRADAY_THRESHOLD: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateOptions {
    /// Last hour (0..=23) of a trading session. Trades stamped after it
    /// belong to the next session.
    pub eod_hour: u32,
    /// `None` selects peaks by exact float equality with the session
    /// maximum. `Some(eps)` also keeps timestamps within `eps` of it.
    pub peak_tolerance: Option<f64>,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            eod_hour: DEFAULT_EOD_HOUR,
            peak_tolerance: None,
        }
    }
}

/// How the caller wants intraday estimation applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EstimateMode {
    /// Estimate only when the positions look like an intraday strategy.
    #[default]
    Infer,
    Always,
    Never,
}

impl FromStr for EstimateMode {
    type Err = TearsheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "infer" => Ok(EstimateMode::Infer),
            "true" | "yes" | "1" | "always" => Ok(EstimateMode::Always),
            "false" | "no" | "0" | "never" => Ok(EstimateMode::Never),
            other => Err(TearsheetError::invalid(format!(
                "unknown estimate mode '{other}' (expected infer, true or false)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntradaySettings {
    pub mode: EstimateMode,
    pub threshold: f64,
    pub estimate: EstimateOptions,
}

impl Default for IntradaySettings {
    fn default() -> Self {
        Self {
            mode: EstimateMode::Infer,
            threshold: DEFAULT_INTRADAY_THRESHOLD,
            estimate: EstimateOptions::default(),
        }
    }
}

/// Cumulative session trading at one peak-exposure timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakDelta {
    pub timestamp: NaiveDateTime,
    pub session: NaiveDate,
    pub exposure: f64,
    /// Cumulative notional traded per instrument since the session opened.
    pub deltas: BTreeMap<String, f64>,
    /// Mirror of the instrument deltas, so that `deltas + cash` nets to zero.
    pub cash: f64,
}

impl PeakDelta {
    pub fn net(&self) -> f64 {
        self.deltas.values().sum::<f64>() + self.cash
    }
}

/// Session a timestamp belongs to. With `eod_hour == 23` this is the
/// calendar date.
pub fn session_date(timestamp: NaiveDateTime, eod_hour: u32) -> NaiveDate {
    (timestamp + Duration::hours(23 - i64::from(eod_hour))).date()
}

fn check_options(options: &EstimateOptions) -> Result<(), TearsheetError> {
    if options.eod_hour > 23 {
        return Err(TearsheetError::invalid(format!(
            "eod_hour must be between 0 and 23, got {}",
            options.eod_hour
        )));
    }
    if let Some(tol) = options.peak_tolerance {
        if !(tol >= 0.0 && tol.is_finite()) {
            return Err(TearsheetError::invalid(format!(
                "peak tolerance must be a non-negative number, got {tol}"
            )));
        }
    }
    Ok(())
}

/// Timestamps of peak gross exposure per session, with the cumulative
/// trading up to that instant.
///
/// Every timestamp whose exposure equals the session maximum is kept, so a
/// session may contribute more than one entry. Results are in timestamp order.
///
/// Fills for one instrument at the same timestamp are summed, not averaged.
pub fn peak_exposure_deltas(
    transactions: &[Transaction],
    options: &EstimateOptions,
) -> Result<Vec<PeakDelta>, TearsheetError> {
    check_options(options)?;
    if let Some(bad) = transactions.iter().find(|t| !t.is_finite()) {
        return Err(TearsheetError::invalid(format!(
            "non-finite transaction for {} at {}",
            bad.symbol, bad.timestamp
        )));
    }

    // Pivot: notional per (timestamp, instrument). Same-instant fills add up.
    let mut pivot: BTreeMap<NaiveDateTime, BTreeMap<&str, f64>> = BTreeMap::new();
    for txn in transactions {
        *pivot
            .entry(txn.timestamp)
            .or_default()
            .entry(txn.symbol.as_str())
            .or_insert(0.0) += txn.notional();
    }

    let mut sessions: BTreeMap<NaiveDate, Vec<PeakDelta>> = BTreeMap::new();
    let mut cumulative: BTreeMap<String, f64> = BTreeMap::new();
    let mut current_session: Option<NaiveDate> = None;

    for (timestamp, row) in pivot {
        let session = session_date(timestamp, options.eod_hour);
        if current_session != Some(session) {
            cumulative.clear();
            current_session = Some(session);
        }
        for (symbol, notional) in row {
            *cumulative.entry(symbol.to_string()).or_insert(0.0) += notional;
        }
        let exposure: f64 = cumulative.values().map(|v| v.abs()).sum();
        let cash = -cumulative.values().sum::<f64>();
        sessions.entry(session).or_default().push(PeakDelta {
            timestamp,
            session,
            exposure,
            deltas: cumulative.clone(),
            cash,
        });
    }

    let mut peaks = Vec::new();
    for (_, candidates) in sessions {
        let max = candidates
            .iter()
            .map(|c| c.exposure)
            .fold(f64::NEG_INFINITY, f64::max);
        peaks.extend(candidates.into_iter().filter(|c| match options.peak_tolerance {
            None => c.exposure == max,
            Some(tol) => max - c.exposure <= tol,
        }));
    }
    Ok(peaks)
}

/// Estimate intraday positions with the default peak policy.
pub fn estimate_intraday(
    returns: &ReturnsSeries,
    positions: &PositionTable,
    transactions: &[Transaction],
    eod_hour: u32,
) -> Result<PositionTable, TearsheetError> {
    let options = EstimateOptions {
        eod_hour,
        ..EstimateOptions::default()
    };
    estimate_intraday_with(returns, positions, transactions, &options)
}

/// Resample end-of-day positions at each day's point of peak exposure.
///
/// The output has exactly one row per input row. Every row carries cash and
/// the union of instruments from `positions` and `transactions`.
pub fn estimate_intraday_with(
    returns: &ReturnsSeries,
    positions: &PositionTable,
    transactions: &[Transaction],
    options: &EstimateOptions,
) -> Result<PositionTable, TearsheetError> {
    let first_position = positions.first().ok_or(TearsheetError::EmptyPositions)?;
    let first_return = returns.first().ok_or(TearsheetError::EmptyReturns)?;

    if first_return.date != first_position.date {
        tracing::warn!(
            returns_start = %first_return.date,
            positions_start = %first_position.date,
            "returns and positions start on different dates; estimate may be meaningless"
        );
    }

    let peaks = peak_exposure_deltas(transactions, options)?;

    // Ties keep every peak above; the snapshot takes the earliest one.
    let mut per_session: BTreeMap<NaiveDate, &PeakDelta> = BTreeMap::new();
    for peak in &peaks {
        per_session.entry(peak.session).or_insert(peak);
    }

    let starting_capital = first_position.total() / (1.0 + first_return.value);
    let shifted = positions.shift_forward(starting_capital);

    let mut columns: BTreeSet<String> = positions.columns();
    columns.extend(transactions.iter().map(|t| t.symbol.clone()));
    columns.insert(CASH.to_string());

    let mut rows = Vec::with_capacity(shifted.len());
    for start in shifted.rows() {
        let mut row = PositionSnapshot::new(start.date);
        for c in &columns {
            row.values.insert(c.clone(), start.get(c));
        }
        if let Some(peak) = per_session.remove(&start.date) {
            for (symbol, delta) in &peak.deltas {
                row.add(symbol, *delta);
            }
            row.add(CASH, peak.cash);
        }
        rows.push(row);
    }

    for (session, peak) in per_session {
        tracing::warn!(
            %session,
            timestamp = %peak.timestamp,
            "dropping intraday peak outside the positions date range"
        );
    }

    PositionTable::new(rows)
}

/// Heuristic intraday detector: end-of-day held positions summed over days,
/// divided by distinct instruments traded summed over days, below `threshold`.
pub fn detect_intraday(
    positions: &PositionTable,
    transactions: &[Transaction],
    threshold: f64,
) -> bool {
    let mut traded: BTreeMap<NaiveDate, BTreeSet<&str>> = BTreeMap::new();
    for txn in transactions {
        traded
            .entry(txn.timestamp.date())
            .or_default()
            .insert(txn.symbol.as_str());
    }
    let txn_count: usize = traded.values().map(|s| s.len()).sum();
    if txn_count == 0 {
        return false;
    }

    let held: usize = positions.rows().iter().map(|r| r.held_count()).sum();
    let ratio = held as f64 / txn_count as f64;
    tracing::debug!(held, txn_count, ratio, threshold, "intraday detection");
    ratio < threshold
}

/// Apply intraday estimation according to `mode` with default settings.
pub fn decide_estimation<'a>(
    mode: EstimateMode,
    returns: &ReturnsSeries,
    positions: Option<&'a PositionTable>,
    transactions: Option<&[Transaction]>,
) -> Result<Option<Cow<'a, PositionTable>>, TearsheetError> {
    let settings = IntradaySettings {
        mode,
        ..IntradaySettings::default()
    };
    decide_estimation_with(&settings, returns, positions, transactions)
}

/// Returns `None` only when no positions were given. Unchanged positions
/// come back borrowed.
pub fn decide_estimation_with<'a>(
    settings: &IntradaySettings,
    returns: &ReturnsSeries,
    positions: Option<&'a PositionTable>,
    transactions: Option<&[Transaction]>,
) -> Result<Option<Cow<'a, PositionTable>>, TearsheetError> {
    match settings.mode {
        EstimateMode::Infer => match (positions, transactions) {
            (Some(pos), Some(txns)) if detect_intraday(pos, txns, settings.threshold) => {
                tracing::warn!(
                    "detected intraday strategy; inferring positions from transactions \
                     (set mode = false to disable)"
                );
                let estimated = estimate_intraday_with(returns, pos, txns, &settings.estimate)?;
                Ok(Some(Cow::Owned(estimated)))
            }
            _ => Ok(positions.map(Cow::Borrowed)),
        },
        EstimateMode::Always => match (positions, transactions) {
            (Some(pos), Some(txns)) => {
                let estimated = estimate_intraday_with(returns, pos, txns, &settings.estimate)?;
                Ok(Some(Cow::Owned(estimated)))
            }
            _ => Err(TearsheetError::usage(
                "positions and transactions are needed to estimate intraday",
            )),
        },
        EstimateMode::Never => Ok(positions.map(Cow::Borrowed)),
    }
}
