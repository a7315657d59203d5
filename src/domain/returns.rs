//! Daily returns series and benchmark alignment.

use chrono::NaiveDate;
use std::str::FromStr;

use super::error::TearsheetError;

pub const APPROX_BDAYS_PER_MONTH: u32 = 21;
pub const APPROX_BDAYS_PER_YEAR: u32 = 252;
pub const MONTHS_PER_YEAR: u32 = 12;
pub const WEEKS_PER_YEAR: u32 = 52;

/// Sampling period of a returns series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    pub fn annualization_factor(self) -> u32 {
        match self {
            Period::Daily => APPROX_BDAYS_PER_YEAR,
            Period::Weekly => WEEKS_PER_YEAR,
            Period::Monthly => MONTHS_PER_YEAR,
        }
    }
}

impl FromStr for Period {
    type Err = TearsheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            other => Err(TearsheetError::invalid(format!(
                "unknown period '{other}' (expected daily, weekly or monthly)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Noncumulative returns, one entry per trading day.
///
/// Dates are strictly increasing; [`ReturnsSeries::new`] rejects anything else.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReturnsSeries {
    points: Vec<ReturnPoint>,
}

impl ReturnsSeries {
    pub fn new(points: Vec<ReturnPoint>) -> Result<Self, TearsheetError> {
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(TearsheetError::invalid(format!(
                    "returns dates must be strictly increasing ({} follows {})",
                    pair[1].date, pair[0].date
                )));
            }
        }
        Ok(Self { points })
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, TearsheetError>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(date, value)| ReturnPoint { date, value })
                .collect(),
        )
    }

    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&ReturnPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&ReturnPoint> {
        self.points.last()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].value)
    }

    /// Keep only entries within `[start, end]`; open bounds are unbounded.
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let points = self
            .points
            .iter()
            .filter(|p| start.is_none_or(|s| p.date >= s) && end.is_none_or(|e| p.date <= e))
            .copied()
            .collect();
        Self { points }
    }

    /// Apply a whole-series function to the values.
    pub fn apply<R>(&self, f: impl FnOnce(&[f64]) -> R) -> R {
        f(&self.values())
    }
}

/// Restrict `returns` to the benchmark's dates when it starts earlier or
/// ends later than the benchmark. Otherwise the series is returned as is.
pub fn clip_returns_to_benchmark(
    returns: &ReturnsSeries,
    benchmark: &ReturnsSeries,
) -> ReturnsSeries {
    let (Some(r_first), Some(r_last), Some(b_first), Some(b_last)) = (
        returns.first(),
        returns.last(),
        benchmark.first(),
        benchmark.last(),
    ) else {
        return returns.clone();
    };

    if r_first.date < b_first.date || r_last.date > b_last.date {
        let points = benchmark
            .dates()
            .filter_map(|date| returns.get(date).map(|value| ReturnPoint { date, value }))
            .collect();
        ReturnsSeries { points }
    } else {
        returns.clone()
    }
}
