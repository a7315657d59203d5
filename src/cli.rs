//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use crate::adapters::csv_adapter::{
    self, CsvAdapter, load_report_table, read_positions, read_returns, read_transactions,
};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::html_report_adapter::HtmlReportAdapter;
use crate::domain::diff::{diff_series, diff_tables};
use crate::domain::error::TearsheetError;
use crate::domain::intraday::{
    DEFAULT_EOD_HOUR, DEFAULT_INTRADAY_THRESHOLD, EstimateMode, EstimateOptions,
    IntradaySettings, decide_estimation_with, detect_intraday,
};
use crate::domain::report_table::{ReportPage, ReportTable};
use crate::domain::returns::{Period, ReturnsSeries, clip_returns_to_benchmark};
use crate::domain::stats::standardize;
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;
use crate::ports::returns_port::ReturnsPort;

const DEFAULT_TITLE: &str = "Tear sheet";
const DEFAULT_DECIMALS: usize = 2;
const DEFAULT_REPORT_PATH: &str = "tear_sheet.html";

#[derive(Parser, Debug)]
#[command(
    name = "tearsheet",
    about = "Tear-sheet inputs, intraday position estimation and report tables"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Re-estimate daily positions at each day's peak intraday exposure
    Estimate {
        #[arg(short, long)]
        returns: PathBuf,
        #[arg(short, long)]
        positions: PathBuf,
        #[arg(short, long)]
        transactions: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// infer, true or false
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        eod_hour: Option<u32>,
        /// CSV output; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Report whether positions and transactions look like an intraday strategy
    Detect {
        #[arg(short, long)]
        positions: PathBuf,
        #[arg(short, long)]
        transactions: PathBuf,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Compare two position tables, or two returns series with --series
    Diff {
        left: PathBuf,
        right: PathBuf,
        #[arg(long)]
        series: bool,
    },
    /// Render pre-computed report tables into one HTML page
    Render {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print returns for a symbol from the configured returns directory
    SymbolReturns {
        #[arg(long)]
        symbol: String,
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Clip to this symbol's date range
        #[arg(long)]
        benchmark: Option<String>,
        #[arg(long)]
        standardize: bool,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Estimate {
            returns,
            positions,
            transactions,
            config,
            mode,
            eod_hour,
            output,
            html,
        } => run_estimate(&EstimateArgs {
            returns,
            positions,
            transactions,
            config,
            mode,
            eod_hour,
            output,
            html,
        }),
        Command::Detect {
            positions,
            transactions,
            threshold,
            config,
        } => run_detect(&positions, &transactions, threshold, config.as_deref()),
        Command::Diff {
            left,
            right,
            series,
        } => run_diff(&left, &right, series),
        Command::Render { config, output } => run_render(&config, output.as_deref()),
        Command::SymbolReturns {
            symbol,
            config,
            start,
            end,
            benchmark,
            standardize,
        } => run_symbol_returns(
            &symbol,
            &config,
            start.as_deref(),
            end.as_deref(),
            benchmark.as_deref(),
            standardize,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, TearsheetError> {
    match path {
        Some(p) => {
            tracing::info!(path = %p.display(), "loading config");
            FileConfigAdapter::from_file(p)
        }
        None => Ok(FileConfigAdapter::empty()),
    }
}

fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> TearsheetError {
    TearsheetError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: reason.into(),
    }
}

/// Parse an optional config value, rejecting anything that does not parse.
fn parse_setting<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, TearsheetError> {
    config
        .get_string(section, key)
        .map(|raw| {
            let raw = raw.trim();
            raw.parse::<T>()
                .map_err(|_| config_invalid(section, key, format!("cannot parse '{raw}'")))
        })
        .transpose()
}

pub fn build_intraday_settings(config: &dyn ConfigPort) -> Result<IntradaySettings, TearsheetError> {
    let mode = match config.get_string("intraday", "mode") {
        Some(s) => s
            .parse::<EstimateMode>()
            .map_err(|e| config_invalid("intraday", "mode", e.to_string()))?,
        None => EstimateMode::default(),
    };

    let eod_hour = parse_setting::<u32>(config, "intraday", "eod_hour")?.unwrap_or(DEFAULT_EOD_HOUR);
    if eod_hour > 23 {
        return Err(config_invalid("intraday", "eod_hour", "must be between 0 and 23"));
    }

    let threshold = parse_setting::<f64>(config, "intraday", "threshold")?
        .unwrap_or(DEFAULT_INTRADAY_THRESHOLD);
    if !(threshold > 0.0) {
        return Err(config_invalid("intraday", "threshold", "must be positive"));
    }

    let peak_tolerance = parse_setting::<f64>(config, "intraday", "peak_tolerance")?;
    if peak_tolerance.is_some_and(|tol| !(tol >= 0.0 && tol.is_finite())) {
        return Err(config_invalid(
            "intraday",
            "peak_tolerance",
            "must be a non-negative number",
        ));
    }

    Ok(IntradaySettings {
        mode,
        threshold,
        estimate: EstimateOptions {
            eod_hour,
            peak_tolerance,
        },
    })
}

fn report_decimals(config: &dyn ConfigPort) -> Result<usize, TearsheetError> {
    Ok(parse_setting::<usize>(config, "report", "decimals")?.unwrap_or(DEFAULT_DECIMALS))
}

fn report_period(config: &dyn ConfigPort) -> Result<Period, TearsheetError> {
    match config.get_string("report", "period") {
        Some(s) => s
            .parse::<Period>()
            .map_err(|e| config_invalid("report", "period", e.to_string())),
        None => Ok(Period::Daily),
    }
}

pub struct EstimateArgs {
    pub returns: PathBuf,
    pub positions: PathBuf,
    pub transactions: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub mode: Option<String>,
    pub eod_hour: Option<u32>,
    pub output: Option<PathBuf>,
    pub html: Option<PathBuf>,
}

pub fn run_estimate(args: &EstimateArgs) -> Result<(), TearsheetError> {
    let config = load_config(args.config.as_deref())?;
    let mut settings = build_intraday_settings(&config)?;
    if let Some(mode) = &args.mode {
        settings.mode = mode.parse()?;
    }
    if let Some(hour) = args.eod_hour {
        settings.estimate.eod_hour = hour;
    }

    let returns = read_returns(&args.returns)?;
    let positions = read_positions(&args.positions)?;
    let transactions = args
        .transactions
        .as_deref()
        .map(read_transactions)
        .transpose()?;
    tracing::info!(
        days = positions.len(),
        returns = returns.len(),
        transactions = transactions.as_ref().map_or(0, Vec::len),
        mode = ?settings.mode,
        "inputs loaded"
    );

    let estimated = decide_estimation_with(
        &settings,
        &returns,
        Some(&positions),
        transactions.as_deref(),
    )?
    .unwrap_or(Cow::Borrowed(&positions));

    match &estimated {
        Cow::Owned(_) => tracing::info!("positions re-estimated from intraday peaks"),
        Cow::Borrowed(_) => tracing::info!("positions left unchanged"),
    }

    match &args.output {
        Some(path) => {
            csv_adapter::write_positions(path, &estimated)?;
            tracing::info!(path = %path.display(), "positions written");
        }
        None => csv_adapter::write_positions_to(io::stdout().lock(), &estimated).map_err(|e| {
            TearsheetError::Csv {
                file: "<stdout>".into(),
                reason: e.to_string(),
            }
        })?,
    }

    if let Some(html_path) = &args.html {
        let decimals = report_decimals(&config)?;
        let start = returns.first().map_or(String::new(), |p| p.date.to_string());
        let end = returns.last().map_or(String::new(), |p| p.date.to_string());
        let summary =
            ReportTable::from_summary("Summary", &returns, &estimated, report_period(&config)?)
                .with_header_row("Start date", &start)
                .with_header_row("End date", &end);
        let table = ReportTable::from_positions("Positions", &estimated, decimals)
            .with_header_row("Estimation mode", &format!("{:?}", settings.mode))
            .with_header_row("End-of-day hour", &settings.estimate.eod_hour.to_string());
        let page = ReportPage {
            title: config
                .get_string("report", "title")
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            tables: vec![
                summary,
                table,
                ReportTable::from_returns("Daily returns", &returns, decimals),
            ],
        };
        HtmlReportAdapter::new().write(&page, &html_path.to_string_lossy())?;
    }

    Ok(())
}

pub fn run_detect(
    positions_path: &Path,
    transactions_path: &Path,
    threshold: Option<f64>,
    config_path: Option<&Path>,
) -> Result<(), TearsheetError> {
    let config = load_config(config_path)?;
    let settings = build_intraday_settings(&config)?;
    let threshold = threshold.unwrap_or(settings.threshold);

    let positions = read_positions(positions_path)?;
    let transactions = read_transactions(transactions_path)?;

    if detect_intraday(&positions, &transactions, threshold) {
        println!("intraday");
    } else {
        println!("not intraday");
    }
    Ok(())
}

pub fn run_diff(left: &Path, right: &Path, series: bool) -> Result<(), TearsheetError> {
    if series {
        let diff = diff_series(&read_returns(left)?, &read_returns(right)?);
        print!("{diff}");
    } else {
        let diff = diff_tables(&read_positions(left)?, &read_positions(right)?);
        print!("{diff}");
    }
    Ok(())
}

/// Load every table named in `[report] tables` from `[report] tables_dir`.
/// Missing files are skipped with a warning; unreadable files are errors.
pub fn load_report_page(config: &dyn ConfigPort) -> Result<ReportPage, TearsheetError> {
    let dir = config
        .get_string("report", "tables_dir")
        .map(PathBuf::from)
        .ok_or_else(|| config_invalid("report", "tables_dir", "missing"))?;
    let names = config.get_list("report", "tables");
    if names.is_empty() {
        return Err(config_invalid("report", "tables", "no tables listed"));
    }

    let mut tables = Vec::with_capacity(names.len());
    for name in &names {
        let path = dir.join(format!("{name}.csv"));
        match load_report_table(&path, name)? {
            Some(table) => tables.push(table),
            None => tracing::warn!(table = %name, path = %path.display(), "report table not found, skipping"),
        }
    }

    Ok(ReportPage {
        title: config
            .get_string("report", "title")
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        tables,
    })
}

pub fn run_render(config_path: &Path, output: Option<&Path>) -> Result<(), TearsheetError> {
    let config = load_config(Some(config_path))?;
    let page = load_report_page(&config)?;
    if page.tables.is_empty() {
        tracing::warn!("no report tables found; rendering an empty page");
    }

    let output = output.unwrap_or(Path::new(DEFAULT_REPORT_PATH));
    HtmlReportAdapter::new().write(&page, &output.to_string_lossy())
}

fn parse_cli_date(value: Option<&str>, name: &str) -> Result<Option<NaiveDate>, TearsheetError> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
                TearsheetError::invalid(format!("--{name}: invalid date '{s}' (expected YYYY-MM-DD)"))
            })
        })
        .transpose()
}

/// Fetch `symbol` through `port`, clipped to `benchmark` when given.
pub fn symbol_returns(
    port: &dyn ReturnsPort,
    symbol: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    benchmark: Option<&str>,
) -> Result<ReturnsSeries, TearsheetError> {
    let returns = port.fetch_returns(symbol, start, end)?;
    match benchmark {
        Some(b) => {
            let bench = port.fetch_returns(b, start, end)?;
            Ok(clip_returns_to_benchmark(&returns, &bench))
        }
        None => Ok(returns),
    }
}

pub fn run_symbol_returns(
    symbol: &str,
    config_path: &Path,
    start: Option<&str>,
    end: Option<&str>,
    benchmark: Option<&str>,
    standardized: bool,
) -> Result<(), TearsheetError> {
    let config = load_config(Some(config_path))?;
    let dir = config
        .get_string("data", "returns_dir")
        .ok_or_else(|| config_invalid("data", "returns_dir", "missing"))?;
    let port = CsvAdapter::new(PathBuf::from(dir));

    let start = parse_cli_date(start, "start")?;
    let end = parse_cli_date(end, "end")?;
    let returns = match symbol_returns(&port, symbol, start, end, benchmark) {
        Err(e @ TearsheetError::NoData { .. }) => {
            if let Ok(available) = port.list_symbols() {
                tracing::warn!(?available, "symbols with returns data");
            }
            return Err(e);
        }
        other => other?,
    };

    let values = if standardized {
        returns.apply(standardize)
    } else {
        returns.values()
    };
    println!("date,{}", if standardized { "zscore" } else { "return" });
    for (date, value) in returns.dates().zip(values) {
        println!("{date},{value}");
    }
    tracing::info!(symbol, days = returns.len(), "returns printed");
    Ok(())
}
