//! CLI integration tests for the backtest command orchestration.
//!
//! Tests cover:
//! - Config parsing (build_backtest_config, build_models)
//! - Baseline resolution, data window and coverage checks
//! - Full pipeline with MockDataPort
//! - End-to-end with a CSV and INI on disk

mod common;

use approx::assert_relative_eq;
use common::*;
use coinsim::adapters::csv_adapter::CsvAdapter;
use coinsim::adapters::file_config_adapter::FileConfigAdapter;
use coinsim::adapters::svg_report::{SvgReportAdapter, EXCESS_RETURN_CHART, RETURN_CHART};
use coinsim::cli;
use coinsim::domain::error::CoinsimError;
use coinsim::ports::report_port::ReportPort;
use std::io::Write;
use std::path::PathBuf;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[backtest]
start_date = 2024-02-01
end_date = 2024-03-01
reference_asset = USD
risk_asset = BTC
initial_cash = 1.0
initial_risk = 0.0
risk_free_rate = 0.0
models = HODL, DCA, TSMOM, TSMOM_D
baseline = HODL

[models]
HODL = hodl
DCA = dca
TSMOM = tsmom(14, 7)
TSMOM_D = tsmom_d(7:1, 14:1, 28:7)

[market]
initial_value = 1.0
daily_growth = 1.0001854
"#;

fn config(content: &str) -> FileConfigAdapter {
    FileConfigAdapter::from_string(content).unwrap()
}

mod config_loading {
    use super::*;

    #[test]
    fn backtest_config_from_ini() {
        let bt = cli::build_backtest_config(&config(VALID_INI), None, None).unwrap();
        assert_eq!(bt.start_date, date(2024, 2, 1));
        assert_eq!(bt.end_date, date(2024, 3, 1));
        assert_eq!(bt.reference_asset, "USD");
        assert_eq!(bt.risk_asset, "BTC");
        assert_eq!(bt.total_days(), 29);
    }

    #[test]
    fn command_line_dates_override_ini() {
        let bt = cli::build_backtest_config(
            &config(VALID_INI),
            Some(date(2024, 2, 10)),
            Some(date(2024, 2, 20)),
        )
        .unwrap();
        assert_eq!(bt.start_date, date(2024, 2, 10));
        assert_eq!(bt.end_date, date(2024, 2, 20));
    }

    #[test]
    fn asset_defaults() {
        let bt = cli::build_backtest_config(
            &config("[backtest]\nstart_date = 2024-01-01\nend_date = 2024-01-02\n"),
            None,
            None,
        )
        .unwrap();
        assert_eq!(bt.reference_asset, "USD");
        assert_eq!(bt.risk_asset, "BTC");
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let err = cli::build_backtest_config(
            &config(VALID_INI),
            Some(date(2024, 3, 1)),
            Some(date(2024, 3, 1)),
        )
        .unwrap_err();
        assert!(matches!(err, CoinsimError::ConfigInvalid { .. }));
    }

    #[test]
    fn missing_start_date_is_reported() {
        let err = cli::build_backtest_config(&config("[backtest]\nend_date = 2024-01-02\n"), None, None)
            .unwrap_err();
        assert!(matches!(err, CoinsimError::ConfigMissing { key, .. } if key == "start_date"));
    }

    #[test]
    fn ini_file_on_disk() {
        let file = write_temp_ini(VALID_INI);
        let adapter = cli::load_config(file.path()).unwrap();
        let bt = cli::build_backtest_config(&adapter, None, None).unwrap();
        assert_eq!(bt.start_date, date(2024, 2, 1));
    }
}

mod model_building {
    use super::*;

    #[test]
    fn models_in_listed_order() {
        let adapter = config(VALID_INI);
        let bt = cli::build_backtest_config(&adapter, None, None).unwrap();
        let models = cli::build_models(&adapter, &bt).unwrap();

        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["HODL", "DCA", "TSMOM", "TSMOM_D"]);
        assert_eq!(models[2].strategy.describe(), "tsmom(14, 7)");
        assert_eq!(models[3].strategy.warmup_days(), 28);
        for m in &models {
            assert_eq!(m.portfolio.get_asset("USD").unwrap(), 1.0);
            assert_eq!(m.portfolio.get_asset("BTC").unwrap(), 0.0);
        }
    }

    #[test]
    fn initial_holdings_come_from_backtest_section() {
        let adapter = config(
            "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-01-10\n\
             initial_cash = 500\ninitial_risk = 2.5\nmodels = H\n[models]\nH = hodl\n",
        );
        let bt = cli::build_backtest_config(&adapter, None, None).unwrap();
        let p = cli::initial_portfolio(&adapter, &bt);
        assert_eq!(p.get_asset("USD").unwrap(), 500.0);
        assert_eq!(p.get_asset("BTC").unwrap(), 2.5);
    }

    #[test]
    fn bad_strategy_names_the_model() {
        let adapter = config(
            "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-01-10\nmodels = M\n\
             [models]\nM = tsmom(14\n",
        );
        let bt = cli::build_backtest_config(&adapter, None, None).unwrap();
        let err = cli::build_models(&adapter, &bt).err().unwrap();
        assert!(matches!(err, CoinsimError::StrategyParse { ref model, .. } if model == "M"));
    }

    #[test]
    fn missing_models_entry() {
        let adapter = config(
            "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-01-10\nmodels = M\n",
        );
        let bt = cli::build_backtest_config(&adapter, None, None).unwrap();
        let err = cli::build_models(&adapter, &bt).err().unwrap();
        assert!(matches!(err, CoinsimError::ConfigMissing { section, .. } if section == "models"));
    }

    #[test]
    fn baseline_defaults_to_first_model() {
        let with_baseline = config(VALID_INI);
        let bt = cli::build_backtest_config(&with_baseline, None, None).unwrap();
        let models = cli::build_models(&with_baseline, &bt).unwrap();
        assert_eq!(cli::resolve_baseline(&with_baseline, &models).as_deref(), Some("HODL"));

        let without = config(&VALID_INI.replace("baseline = HODL\n", ""));
        let models = cli::build_models(&without, &bt).unwrap();
        assert_eq!(cli::resolve_baseline(&without, &models[1..]).as_deref(), Some("DCA"));
        assert_eq!(cli::resolve_baseline(&without, &[]), None);
    }
}

mod coverage {
    use super::*;

    #[test]
    fn complete_range_passes() {
        let history = PriceHistory::new(generate_bars("2024-01-01", 31, 100.0, 1.0)).unwrap();
        assert!(cli::check_coverage(&history, date(2024, 1, 1), date(2024, 1, 31)).is_ok());
    }

    #[test]
    fn first_gap_is_reported() {
        let mut bars = generate_bars("2024-01-01", 31, 100.0, 1.0);
        bars.retain(|b| b.date != date(2024, 1, 12) && b.date != date(2024, 1, 20));
        let history = PriceHistory::new(bars).unwrap();
        let err = cli::check_coverage(&history, date(2024, 1, 1), date(2024, 1, 31)).unwrap_err();
        assert!(matches!(err, CoinsimError::MissingDate { date: d } if d == date(2024, 1, 12)));
        assert!(err.is_precondition());
    }

    #[test]
    fn range_beyond_data_is_missing() {
        let history = PriceHistory::new(generate_bars("2024-01-05", 10, 100.0, 1.0)).unwrap();
        let err = cli::check_coverage(&history, date(2024, 1, 1), date(2024, 1, 10)).unwrap_err();
        assert!(matches!(err, CoinsimError::MissingDate { date: d } if d == date(2024, 1, 1)));
    }
}

mod pipeline {
    use super::*;

    fn port() -> MockDataPort {
        // Covers the 28-day warmup before 2024-02-01.
        MockDataPort::new().with_bars("BTC", generate_bars("2023-12-01", 100, 100.0, 0.5))
    }

    #[test]
    fn full_pipeline_with_mock_port() {
        let adapter = config(VALID_INI);
        let bt = cli::build_backtest_config(&adapter, None, None).unwrap();
        let run = cli::run_backtest_pipeline(&port(), &adapter, &bt).unwrap();

        assert_eq!(run.result.days.len(), 29);
        assert_eq!(run.market.len(), 29);
        assert_relative_eq!(run.market[0].equity, 1.0);
        assert_eq!(run.comparison.baseline, "HODL");

        let names: Vec<&str> = run.metrics.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["HODL", "DCA", "TSMOM", "TSMOM_D", "Market"]);
        for (name, m) in &run.metrics {
            assert_relative_eq!(m.initial_value, 1.0, epsilon = 1e-12);
            assert!(m.final_value.is_finite(), "{name}");
        }
        // Steady uptrend: holding beats averaging in.
        let hodl = &run.metrics[0].1;
        let dca = &run.metrics[1].1;
        assert!(hodl.total_return > dca.total_return);
        assert!(run.result.diagnostics.is_empty());
    }

    #[test]
    fn insufficient_warmup_is_a_missing_date() {
        let adapter = config(VALID_INI);
        let bt = cli::build_backtest_config(&adapter, None, None).unwrap();
        let short = MockDataPort::new().with_bars("BTC", generate_bars("2024-01-20", 60, 100.0, 0.5));
        let err = cli::run_backtest_pipeline(&short, &adapter, &bt).err().unwrap();
        assert!(matches!(err, CoinsimError::MissingDate { date: d } if d == date(2024, 1, 4)));
    }

    #[test]
    fn oversized_lookback_is_a_parse_error() {
        let adapter = config(&VALID_INI.replace("tsmom(14, 7)", "tsmom(999999999, 7)"));
        let bt = cli::build_backtest_config(&adapter, None, None).unwrap();
        let err = cli::run_backtest_pipeline(&port(), &adapter, &bt).err().unwrap();
        assert!(matches!(err, CoinsimError::StrategyParse { ref model, .. } if model == "TSMOM"));
        assert!(coinsim::domain::config_validation::validate_models_config(&adapter).is_err());
    }

    #[test]
    fn warmup_before_earliest_date_is_invalid() {
        let adapter = config(VALID_INI);
        let mut bt = cli::build_backtest_config(&adapter, None, None).unwrap();
        let models = cli::build_models(&adapter, &bt).unwrap();

        let (from, to) = cli::data_window(&models, &bt).unwrap();
        assert_eq!(from, date(2024, 1, 4));
        assert_eq!(to, date(2024, 2, 29));

        bt.start_date = chrono::NaiveDate::MIN + chrono::Duration::days(10);
        let err = cli::data_window(&models, &bt).unwrap_err();
        assert!(matches!(err, CoinsimError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn data_error_surfaces() {
        let adapter = config(VALID_INI);
        let bt = cli::build_backtest_config(&adapter, None, None).unwrap();
        let failing = MockDataPort::new().with_error("BTC", "disk on fire");
        let err = cli::run_backtest_pipeline(&failing, &adapter, &bt).err().unwrap();
        assert!(matches!(err, CoinsimError::Data { .. }));
    }

    #[test]
    fn unknown_baseline_is_rejected() {
        let adapter = config(&VALID_INI.replace("baseline = HODL", "baseline = NOPE"));
        let bt = cli::build_backtest_config(&adapter, None, None).unwrap();
        let err = cli::run_backtest_pipeline(&port(), &adapter, &bt).err().unwrap();
        assert!(matches!(err, CoinsimError::ConfigInvalid { key, .. } if key == "baseline"));
    }

    #[test]
    fn charts_written_to_output_dir() {
        let adapter = config(VALID_INI);
        let bt = cli::build_backtest_config(&adapter, None, None).unwrap();
        let run = cli::run_backtest_pipeline(&port(), &adapter, &bt).unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("charts");
        let written = SvgReportAdapter.write(&run.comparison, &out).unwrap();
        assert_eq!(written, vec![out.join(RETURN_CHART), out.join(EXCESS_RETURN_CHART)]);
        let svg = std::fs::read_to_string(&written[0]).unwrap();
        for name in ["HODL", "DCA", "TSMOM", "TSMOM_D", "Market"] {
            assert!(svg.contains(&format!(">{name}</text>")), "{name} missing from legend");
        }
    }
}

mod end_to_end {
    use super::*;

    fn write_csv(dir: &std::path::Path) -> PathBuf {
        let mut content = String::from("Date,Price,Open,High,Low\n");
        for bar in generate_bars("2024-01-01", 40, 40000.0, 150.0).iter().rev() {
            content.push_str(&format!(
                "{},{},{},{},{}\n",
                bar.date.format("%b %d, %Y"),
                bar.price,
                bar.open,
                bar.high,
                bar.low
            ));
        }
        let path = dir.join("btc.csv");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn csv_and_ini_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let csv = write_csv(dir.path());
        let ini = write_temp_ini(&format!(
            "[backtest]\nstart_date = 2024-01-15\nend_date = 2024-02-05\n\
             data_path = {}\ninitial_cash = 1000\nmodels = HODL, TSMOM\n\
             [models]\nHODL = hodl\nTSMOM = tsmom(7, 1)\n",
            csv.display()
        ));

        let adapter = cli::load_config(ini.path()).unwrap();
        let bt = cli::build_backtest_config(&adapter, None, None).unwrap();
        let port = CsvAdapter::new(csv);
        let run = cli::run_backtest_pipeline(&port, &adapter, &bt).unwrap();

        assert_eq!(run.result.days.len(), 21);
        let hodl = run.result.value_series("HODL").unwrap();
        let tsmom = run.result.value_series("TSMOM").unwrap();
        assert_relative_eq!(hodl[0].equity, 1000.0);
        // Always trending up, so momentum is fully invested from day 0 like HODL.
        for (h, t) in hodl.iter().zip(&tsmom) {
            assert_relative_eq!(h.equity, t.equity, epsilon = 1e-6);
        }
        assert!(hodl.last().unwrap().equity > 1000.0);
    }

    #[test]
    fn load_config_missing_file() {
        let result = cli::load_config(std::path::Path::new("/nonexistent/coinsim.ini"));
        assert!(result.is_err());
    }
}
