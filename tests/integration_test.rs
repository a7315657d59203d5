//! Integration tests for intraday estimation and the surrounding pipeline.
//!
//! Tests cover:
//! - Estimator properties (shift identity, row count, cash, self-financing)
//! - Mode decisions (infer, always, never)
//! - CSV files in, estimated positions out
//! - Diff reports between input and estimated positions

mod common;

use approx::assert_relative_eq;
use common::*;
use std::borrow::Cow;
use tearsheet::domain::error::TearsheetError;
use tearsheet::domain::intraday::{
    EstimateMode, EstimateOptions, decide_estimation, detect_intraday, estimate_intraday,
    estimate_intraday_with, peak_exposure_deltas,
};
use tearsheet::domain::position::CASH;

mod estimator_properties {
    use super::*;

    #[test]
    fn empty_log_equals_shifted_positions() {
        let positions = two_day_aapl();
        let returns = daily_returns(&[0.01, 0.02]);
        let out = estimate_intraday(&returns, &positions, &[], 23).unwrap();

        let shifted = positions.shift_forward(1000.0 / (1.0 + 0.01));
        assert_eq!(out, shifted);
    }

    #[test]
    fn output_has_one_row_per_input_row() {
        let (returns, positions, txns) = flat_intraday_book();
        let out = estimate_intraday(&returns, &positions, &txns, 23).unwrap();
        assert_eq!(out.len(), positions.len());
        assert_eq!(out.dates().collect::<Vec<_>>(), positions.dates().collect::<Vec<_>>());
    }

    #[test]
    fn every_row_has_cash_and_all_instruments() {
        let (returns, positions, mut txns) = flat_intraday_book();
        txns.push(txn("2024-01-03 12:00:00", "NVDA", 1.0, 500.0));
        let out = estimate_intraday(&returns, &positions, &txns, 23).unwrap();

        for row in out.rows() {
            assert!(row.values.contains_key(CASH));
            for symbol in ["AAPL", "MSFT", "NVDA"] {
                assert!(row.values.contains_key(symbol), "{symbol} missing on {}", row.date);
            }
        }
    }

    #[test]
    fn retained_peaks_are_self_financing() {
        let (_, _, txns) = flat_intraday_book();
        let peaks = peak_exposure_deltas(&txns, &EstimateOptions::default()).unwrap();
        assert!(!peaks.is_empty());
        for peak in &peaks {
            assert_relative_eq!(peak.net(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn two_day_aapl_scenario() {
        let txns = vec![txn("2024-01-03 10:00:00", "AAPL", 1.0, 100.0)];
        let out =
            estimate_intraday(&daily_returns(&[0.01, 0.02]), &two_day_aapl(), &txns, 23).unwrap();

        let day1 = &out.rows()[0];
        assert_relative_eq!(day1.cash(), 990.099, epsilon = 1e-3);
        assert_eq!(day1.get("AAPL"), 0.0);

        let day2 = &out.rows()[1];
        assert_relative_eq!(day2.get("AAPL"), 100.0);
        assert_relative_eq!(day2.cash(), 900.0);
    }

    #[test]
    fn flat_book_reports_peak_exposure() {
        let (returns, positions, txns) = flat_intraday_book();
        let out = estimate_intraday(&returns, &positions, &txns, 23).unwrap();

        let day2 = &out.rows()[0];
        assert_relative_eq!(day2.get("AAPL"), 2000.0);
        assert_relative_eq!(day2.get("MSFT"), 3000.0);
        assert_relative_eq!(day2.cash(), 5000.0);

        let day3 = &out.rows()[1];
        assert_relative_eq!(day3.get("MSFT"), -4650.0);
        assert_relative_eq!(day3.cash(), 14_650.0);

        let day4 = &out.rows()[2];
        assert_relative_eq!(day4.get("AAPL"), 4950.0);
        assert_relative_eq!(day4.cash(), 5150.0);
    }

    #[test]
    fn trades_after_eod_hour_count_toward_next_day() {
        let positions = two_day_aapl();
        let returns = daily_returns(&[0.0, 0.0]);
        let txns = vec![txn("2024-01-02 17:30:00", "AAPL", 2.0, 50.0)];

        let calendar = estimate_intraday(&returns, &positions, &txns, 23).unwrap();
        assert_relative_eq!(calendar.rows()[0].get("AAPL"), 100.0);
        assert_relative_eq!(calendar.rows()[1].get("AAPL"), 0.0);

        let session = estimate_intraday(&returns, &positions, &txns, 16).unwrap();
        assert_relative_eq!(session.rows()[0].get("AAPL"), 0.0);
        assert_relative_eq!(session.rows()[1].get("AAPL"), 100.0);
    }

    #[test]
    fn tolerance_admits_near_peaks() {
        let txns = vec![
            txn("2024-01-03 10:00:00", "AAPL", 1.0, 100.0),
            txn("2024-01-03 11:00:00", "AAPL", 1e-12, 100.0),
        ];
        let exact = peak_exposure_deltas(&txns, &EstimateOptions::default()).unwrap();
        assert_eq!(exact.len(), 1);

        let loose = EstimateOptions {
            peak_tolerance: Some(1e-6),
            ..EstimateOptions::default()
        };
        assert_eq!(peak_exposure_deltas(&txns, &loose).unwrap().len(), 2);

        let out = estimate_intraday_with(
            &daily_returns(&[0.0, 0.0]),
            &two_day_aapl(),
            &txns,
            &loose,
        )
        .unwrap();
        assert_relative_eq!(out.rows()[1].get("AAPL"), 100.0);
    }
}

mod mode_decisions {
    use super::*;

    #[test]
    fn infer_leaves_swing_book_unchanged() {
        // One held position per day against one traded instrument per day.
        let positions = positions(&[
            (2, 900.0, &[("AAPL", 100.0)]),
            (3, 800.0, &[("AAPL", 200.0)]),
        ]);
        let txns = vec![
            txn("2024-01-02 10:00:00", "AAPL", 1.0, 100.0),
            txn("2024-01-03 10:00:00", "AAPL", 1.0, 100.0),
        ];
        assert!(!detect_intraday(&positions, &txns, 0.25));

        let out = decide_estimation(
            EstimateMode::Infer,
            &daily_returns(&[0.0, 0.0]),
            Some(&positions),
            Some(txns.as_slice()),
        )
        .unwrap()
        .unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(&*out, &positions);
    }

    #[test]
    fn infer_estimates_flat_book() {
        let (returns, positions, txns) = flat_intraday_book();
        let out = decide_estimation(
            EstimateMode::Infer,
            &returns,
            Some(&positions),
            Some(txns.as_slice()),
        )
        .unwrap()
        .unwrap();
        assert!(matches!(out, Cow::Owned(_)));
        assert_eq!(out.into_owned(), estimate_intraday(&returns, &positions, &txns, 23).unwrap());
    }

    #[test]
    fn always_without_transactions_is_usage_error() {
        let positions = two_day_aapl();
        let result = decide_estimation(
            EstimateMode::Always,
            &daily_returns(&[0.01, 0.02]),
            Some(&positions),
            None,
        );
        assert!(matches!(result, Err(TearsheetError::Usage { .. })));
    }

    #[test]
    fn always_without_positions_is_usage_error() {
        let txns = vec![txn("2024-01-03 10:00:00", "AAPL", 1.0, 100.0)];
        let result = decide_estimation(
            EstimateMode::Always,
            &daily_returns(&[0.01]),
            None,
            Some(txns.as_slice()),
        );
        assert!(matches!(result, Err(TearsheetError::Usage { .. })));
    }

    #[test]
    fn never_passes_positions_through() {
        let (returns, positions, txns) = flat_intraday_book();
        let out = decide_estimation(
            EstimateMode::Never,
            &returns,
            Some(&positions),
            Some(txns.as_slice()),
        )
        .unwrap()
        .unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }
}

mod file_pipeline {
    use super::*;
    use tearsheet::adapters::csv_adapter::{
        read_positions, read_returns, read_transactions, write_positions,
    };
    use tearsheet::domain::diff::diff_tables;
    use tempfile::TempDir;

    #[test]
    fn estimate_from_csv_files_and_write_back() {
        let returns_file = write_temp_file("date,return\n2024-01-02,0.01\n2024-01-03,0.02\n");
        let positions_file =
            write_temp_file("date,AAPL,cash\n2024-01-02,0,1000\n2024-01-03,100,900\n");
        let txns_file =
            write_temp_file("timestamp,symbol,amount,price\n2024-01-03 10:00:00,AAPL,1,100\n");

        let returns = read_returns(returns_file.path()).unwrap();
        let positions = read_positions(positions_file.path()).unwrap();
        let txns = read_transactions(txns_file.path()).unwrap();
        let out = estimate_intraday(&returns, &positions, &txns, 23).unwrap();

        let dir = TempDir::new().unwrap();
        let out_path = dir.path().join("estimated.csv");
        write_positions(&out_path, &out).unwrap();
        assert_eq!(read_positions(&out_path).unwrap(), out);
    }

    #[test]
    fn nan_position_cell_does_not_reach_estimate() {
        let returns_file = write_temp_file("date,return\n2024-01-02,0.01\n2024-01-03,0.02\n");
        let positions_file =
            write_temp_file("date,AAPL,cash\n2024-01-02,NaN,1000\n2024-01-03,100,900\n");

        let returns = read_returns(returns_file.path()).unwrap();
        let positions = read_positions(positions_file.path()).unwrap();
        let out = estimate_intraday(&returns, &positions, &[], 23).unwrap();

        assert_relative_eq!(out.rows()[0].cash(), 990.099, epsilon = 1e-3);
        assert_eq!(out.rows()[0].get("AAPL"), 0.0);
        assert_eq!(out.rows()[1].get("AAPL"), 0.0);
        assert_relative_eq!(out.rows()[1].cash(), 1000.0);
    }

    #[test]
    fn tz_aware_transaction_timestamps_are_read_as_utc() {
        let txns_file = write_temp_file(
            "timestamp,symbol,amount,price\n\
             2024-01-03 10:00:00+00:00,AAPL,1,100\n\
             2024-01-03 12:30:00+02:00,MSFT,1,100\n",
        );
        let txns = read_transactions(txns_file.path()).unwrap();
        assert_eq!(txns[0].timestamp, ts("2024-01-03 10:00:00"));
        assert_eq!(txns[1].timestamp, ts("2024-01-03 10:30:00"));
    }

    #[test]
    fn diff_shows_what_estimation_changed() {
        let (returns, positions, txns) = flat_intraday_book();
        let out = estimate_intraday(&returns, &positions, &txns, 23).unwrap();

        let diff = diff_tables(&positions, &out);
        assert!(diff.index_equal());
        assert!(diff.columns_equal());
        assert!(!diff.is_identical());
        assert!(
            diff.value_diffs
                .iter()
                .any(|c| c.column == "MSFT" && c.date == date(2024, 1, 3))
        );

        let same = diff_tables(&positions, &positions);
        assert!(same.is_identical());
        assert_eq!(same.to_string(), "The tables are identical.\n");
    }
}
