//! Per-symbol returns source.
//!
//! Callers that need returns for arbitrary symbols (benchmarks, factor
//! series) take a `&dyn ReturnsPort` instead of consulting global state.

use crate::domain::error::TearsheetError;
use crate::domain::returns::ReturnsSeries;
use chrono::NaiveDate;

pub trait ReturnsPort {
    /// Returns for `symbol` within `[start, end]`; `None` bounds are open.
    fn fetch_returns(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<ReturnsSeries, TearsheetError>;

    fn list_symbols(&self) -> Result<Vec<String>, TearsheetError>;
}
