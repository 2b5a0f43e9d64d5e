//! CLI definition and dispatch.

use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::svg_report::SvgReportAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult, Model};
use crate::domain::config_validation::{
    model_names, parse_date, reference_asset, risk_asset, strategy_spec, validate_backtest_config,
    validate_models_config,
};
use crate::domain::error::CoinsimError;
use crate::domain::market::{market_reference, DEFAULT_DAILY_GROWTH};
use crate::domain::metrics::{Comparison, Metrics};
use crate::domain::portfolio::{EquityPoint, Portfolio};
use crate::domain::price::PriceHistory;
use crate::domain::strategy::parse_strategy;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "coinsim", about = "Single-asset crypto strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every configured model over the backtest window
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Price CSV, overriding [backtest] data_path
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Chart directory, overriding [report] output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration and check data coverage
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the date range of a price CSV
    Info {
        #[arg(long)]
        data: PathBuf,
        /// Label for the output; the CSV holds a single asset's prices
        #[arg(long, default_value = "BTC")]
        asset: String,
    },
}

/// Install the stderr `tracing` subscriber; `RUST_LOG` overrides the `warn` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging disabled: {e}");
    }
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            start,
            end,
            output,
        } => run_backtest(&config, data.as_ref(), start, end, output.as_ref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { data, asset } => run_info(&data, &asset),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = CoinsimError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Print `err`, with a caret under the offending strategy spec when there is one.
fn fail(err: &CoinsimError, config: &dyn ConfigPort) -> ExitCode {
    match err {
        CoinsimError::StrategyParse { model, source } => {
            let spec = strategy_spec(config, model).unwrap_or_default();
            eprintln!(
                "error: failed to parse strategy for {}:\n{}",
                model,
                source.display_with_context(&spec)
            );
        }
        other => eprintln!("error: {other}"),
    }
    err.into()
}

pub fn build_backtest_config(
    adapter: &dyn ConfigPort,
    start_override: Option<NaiveDate>,
    end_override: Option<NaiveDate>,
) -> Result<BacktestConfig, CoinsimError> {
    let start_date = match start_override {
        Some(d) => d,
        None => parse_date(
            adapter.get_string("backtest", "start_date").as_deref(),
            "start_date",
        )?,
    };
    let end_date = match end_override {
        Some(d) => d,
        None => parse_date(
            adapter.get_string("backtest", "end_date").as_deref(),
            "end_date",
        )?,
    };
    if start_date >= end_date {
        return Err(CoinsimError::ConfigInvalid {
            section: "backtest".into(),
            key: "start_date".into(),
            reason: "start_date must be before end_date".into(),
        });
    }

    Ok(BacktestConfig {
        start_date,
        end_date,
        reference_asset: reference_asset(adapter),
        risk_asset: risk_asset(adapter),
    })
}

/// Seed holdings shared by every model.
pub fn initial_portfolio(adapter: &dyn ConfigPort, bt_config: &BacktestConfig) -> Portfolio {
    let mut assets = BTreeMap::new();
    assets.insert(
        bt_config.reference_asset.clone(),
        adapter.get_double("backtest", "initial_cash", 1.0),
    );
    assets.insert(
        bt_config.risk_asset.clone(),
        adapter.get_double("backtest", "initial_risk", 0.0),
    );
    Portfolio::new(&assets)
}

/// One model per `[backtest] models` entry, each on its own copy of the
/// initial holdings.
pub fn build_models(
    adapter: &dyn ConfigPort,
    bt_config: &BacktestConfig,
) -> Result<Vec<Model>, CoinsimError> {
    let seed = initial_portfolio(adapter, bt_config);
    model_names(adapter)
        .into_iter()
        .map(|name| {
            let spec = strategy_spec(adapter, &name)?;
            let strategy = parse_strategy(&spec, &bt_config.risk_asset).map_err(|source| {
                CoinsimError::StrategyParse {
                    model: name.clone(),
                    source,
                }
            })?;
            Ok(Model::new(&name, strategy, seed.clone()))
        })
        .collect()
}

/// Configured baseline, or the first model.
pub fn resolve_baseline(adapter: &dyn ConfigPort, models: &[Model]) -> Option<String> {
    adapter
        .get_string("backtest", "baseline")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| models.first().map(|m| m.name.clone()))
}

/// Fail with the first missing calendar date in `[from, to]` after printing the gaps.
pub fn check_coverage(
    history: &PriceHistory,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(), CoinsimError> {
    let missing = history.missing_dates(from, to);
    match missing.first() {
        None => Ok(()),
        Some(&first) => {
            eprintln!(
                "Price data has {} missing date(s) between {} and {}:",
                missing.len(),
                from,
                to
            );
            for date in missing.iter().take(10) {
                eprintln!("  {}", date);
            }
            if missing.len() > 10 {
                eprintln!("  ...");
            }
            Err(CoinsimError::MissingDate { date: first })
        }
    }
}

/// Dates the price data must cover: the largest warmup before the start
/// through the last simulated day.
pub fn data_window(
    models: &[Model],
    bt_config: &BacktestConfig,
) -> Result<(NaiveDate, NaiveDate), CoinsimError> {
    let warmup = models
        .iter()
        .map(|m| m.strategy.warmup_days())
        .max()
        .unwrap_or(0);
    let out_of_range = || CoinsimError::ConfigInvalid {
        section: "backtest".into(),
        key: "start_date".into(),
        reason: format!("{warmup} warmup day(s) before the start date is out of range"),
    };
    let from = Duration::try_days(warmup)
        .and_then(|d| bt_config.start_date.checked_sub_signed(d))
        .ok_or_else(out_of_range)?;
    let to = bt_config.end_date.pred_opt().ok_or_else(out_of_range)?;
    Ok((from, to))
}

pub struct BacktestRun {
    pub result: BacktestResult,
    pub market: Vec<EquityPoint>,
    pub comparison: Comparison,
    pub metrics: Vec<(String, Metrics)>,
}

/// Load data, run every model and compute everything the report needs.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    adapter: &dyn ConfigPort,
    bt_config: &BacktestConfig,
) -> Result<BacktestRun, CoinsimError> {
    let models = build_models(adapter, bt_config)?;
    let baseline =
        resolve_baseline(adapter, &models).ok_or_else(|| CoinsimError::ConfigMissing {
            section: "backtest".into(),
            key: "models".into(),
        })?;

    let (data_start, last_day) = data_window(&models, bt_config)?;

    let history = data_port.fetch_history(&bt_config.risk_asset, data_start, last_day)?;
    check_coverage(&history, data_start, last_day)?;

    eprintln!(
        "Running backtest: {} models, {} to {}",
        models.len(),
        bt_config.start_date,
        bt_config.end_date,
    );
    let result = backtest_engine::run_backtest(&history, models, bt_config)?;

    let market = market_reference(
        bt_config.start_date,
        result.days.len(),
        adapter.get_double("market", "initial_value", 1.0),
        adapter.get_double("market", "daily_growth", DEFAULT_DAILY_GROWTH),
    );

    let comparison = Comparison::build(&result, &market, &baseline).ok_or_else(|| {
        CoinsimError::ConfigInvalid {
            section: "backtest".into(),
            key: "baseline".into(),
            reason: format!("baseline '{baseline}' is not a listed model"),
        }
    })?;

    let risk_free_rate = adapter.get_double("backtest", "risk_free_rate", 0.0);
    let metrics = comparison
        .absolute
        .iter()
        .map(|s| (s.name.clone(), Metrics::compute(&s.points, risk_free_rate)))
        .collect();

    Ok(BacktestRun {
        result,
        market,
        comparison,
        metrics,
    })
}

pub fn print_summary(run: &BacktestRun) {
    eprintln!("\n=== Results ({} days) ===", run.result.days.len());
    eprintln!(
        "{:<16} {:>12} {:>10} {:>10} {:>8} {:>8} {:>9}",
        "Model", "Final", "Return", "Annual", "Sharpe", "Sortino", "Max DD"
    );
    for (name, m) in &run.metrics {
        eprintln!(
            "{:<16} {:>12.4} {:>9.2}% {:>9.2}% {:>8.2} {:>8.2} {:>8.1}%",
            name,
            m.final_value,
            m.total_return * 100.0,
            m.annualized_return * 100.0,
            m.sharpe_ratio,
            m.sortino_ratio,
            -m.max_drawdown * 100.0,
        );
    }

    if !run.result.diagnostics.is_empty() {
        eprintln!("\n=== Diagnostics ===");
        for name in &run.result.model_names {
            let count = run.result.diagnostics_for(name).count();
            if count > 0 {
                eprintln!("  {}: {} order(s) adjusted or dropped", name, count);
            }
        }
    }
}

fn validate_config(adapter: &dyn ConfigPort) -> Result<(), CoinsimError> {
    validate_backtest_config(adapter)?;
    validate_models_config(adapter)
}

fn data_path(
    adapter: &dyn ConfigPort,
    data_override: Option<&PathBuf>,
) -> Result<PathBuf, CoinsimError> {
    match data_override {
        Some(p) => Ok(p.clone()),
        None => adapter
            .get_string("backtest", "data_path")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| CoinsimError::ConfigMissing {
                section: "backtest".into(),
                key: "data_path".into(),
            }),
    }
}

fn run_backtest(
    config_path: &Path,
    data_override: Option<&PathBuf>,
    start_override: Option<NaiveDate>,
    end_override: Option<NaiveDate>,
    output_override: Option<&PathBuf>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate config and strategy specs
    if let Err(e) = validate_config(&adapter) {
        return fail(&e, &adapter);
    }

    // Stage 3: Apply overrides
    let bt_config = match build_backtest_config(&adapter, start_override, end_override) {
        Ok(c) => c,
        Err(e) => return fail(&e, &adapter),
    };
    let data = match data_path(&adapter, data_override) {
        Ok(p) => p,
        Err(e) => return fail(&e, &adapter),
    };

    // Stage 4: Simulate
    eprintln!("Loading prices from {}", data.display());
    let data_port = CsvAdapter::new(data);
    let run = match run_backtest_pipeline(&data_port, &adapter, &bt_config) {
        Ok(r) => r,
        Err(e) => return fail(&e, &adapter),
    };

    // Stage 5: Summary and charts
    print_summary(&run);

    let output_dir = output_override.cloned().unwrap_or_else(|| {
        PathBuf::from(
            adapter
                .get_string("report", "output_dir")
                .unwrap_or_else(|| ".".to_string()),
        )
    });
    match SvgReportAdapter.write(&run.comparison, &output_dir) {
        Ok(files) => {
            for file in files {
                eprintln!("Chart written to: {}", file.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to write report: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter) {
        return fail(&e, &adapter);
    }

    let bt_config = match build_backtest_config(&adapter, None, None) {
        Ok(c) => c,
        Err(e) => return fail(&e, &adapter),
    };
    let models = match build_models(&adapter, &bt_config) {
        Ok(m) => m,
        Err(e) => return fail(&e, &adapter),
    };

    eprintln!(
        "\nBacktest: {} to {} ({} days), {} against {}",
        bt_config.start_date,
        bt_config.end_date,
        bt_config.total_days(),
        bt_config.risk_asset,
        bt_config.reference_asset,
    );
    eprintln!("\nModels:");
    for model in &models {
        eprintln!(
            "  {:<16} {} (needs {} day(s) of prior data)",
            model.name,
            model.strategy.describe(),
            model.strategy.warmup_days()
        );
    }

    if let Ok(path) = data_path(&adapter, None) {
        if path.exists() {
            let (from, to) = match data_window(&models, &bt_config) {
                Ok(w) => w,
                Err(e) => return fail(&e, &adapter),
            };
            let coverage = CsvAdapter::new(path)
                .fetch_history(&bt_config.risk_asset, from, to)
                .and_then(|history| check_coverage(&history, from, to));
            if let Err(e) = coverage {
                return fail(&e, &adapter);
            }
            eprintln!("\nPrice data covers {} to {}", from, to);
        }
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(data: &Path, asset: &str) -> ExitCode {
    let adapter = CsvAdapter::new(data.to_path_buf());
    match adapter.get_data_range(asset) {
        Ok(Some((first, last, count))) => {
            println!("{}: {} bars, {} to {}", asset, count, first, last);
            let expected = (last - first).num_days() + 1;
            if expected > count as i64 {
                eprintln!("{} calendar date(s) missing", expected - count as i64);
            }
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("{}: no data found", asset);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
