//! SVG comparison charts implementing ReportPort.
//!
//! Writes `backtest_return.svg` with every model and the market reference,
//! and `backtest_excess_return.svg` with each series minus the baseline.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::CoinsimError;
use crate::domain::metrics::{Comparison, NamedSeries, MARKET_SERIES};
use crate::ports::report_port::ReportPort;

pub const RETURN_CHART: &str = "backtest_return.svg";
pub const EXCESS_RETURN_CHART: &str = "backtest_excess_return.svg";

const CHART_WIDTH: f64 = 900.0;
const CHART_HEIGHT: f64 = 450.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 160.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 40.0;

const PALETTE: [&str; 8] = [
    "#2563eb", "#dc2626", "#16a34a", "#9333ea", "#ea580c", "#0891b2", "#ca8a04", "#db2777",
];
const MARKET_COLOR: &str = "#6b7280";

pub struct SvgReportAdapter;

impl ReportPort for SvgReportAdapter {
    fn write(
        &self,
        comparison: &Comparison,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, CoinsimError> {
        fs::create_dir_all(output_dir)?;

        let charts = [
            (RETURN_CHART, render_chart("Value", &comparison.absolute, false)),
            (
                EXCESS_RETURN_CHART,
                render_chart(
                    &format!("Value relative to {}", comparison.baseline),
                    &comparison.relative,
                    true,
                ),
            ),
        ];

        let mut written = Vec::with_capacity(charts.len());
        for (file, svg) in charts {
            let path = output_dir.join(file);
            fs::write(&path, svg)?;
            tracing::info!(path = %path.display(), "wrote chart");
            written.push(path);
        }
        Ok(written)
    }
}

fn fmt_value(value: f64) -> String {
    if value.abs() >= 1000.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.3}", value)
    }
}

fn color_for(index: usize, name: &str) -> &'static str {
    if name == MARKET_SERIES {
        MARKET_COLOR
    } else {
        PALETTE[index % PALETTE.len()]
    }
}

/// Multi-line chart sharing one y axis. Series are aligned by position, so
/// the first series' dates label the x axis.
pub fn render_chart(title: &str, series: &[NamedSeries], zero_line: bool) -> String {
    let longest = series.iter().map(|s| s.points.len()).max().unwrap_or(0);
    if longest == 0 {
        return String::new();
    }

    let values = series.iter().flat_map(|s| s.points.iter().map(|p| p.equity));
    let (mut min_value, mut max_value) = values
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if zero_line {
        min_value = min_value.min(0.0);
        max_value = max_value.max(0.0);
    }
    let range = if max_value > min_value {
        max_value - min_value
    } else {
        1.0
    };

    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let x_scale =
        |i: usize| -> f64 { MARGIN_LEFT + (i as f64 / (longest - 1).max(1) as f64) * plot_width };
    let y_scale =
        |v: f64| -> f64 { MARGIN_TOP + plot_height - ((v - min_value) / range) * plot_height };

    let axis = series
        .iter()
        .find(|s| s.points.len() == longest)
        .map(|s| s.points.as_slice())
        .unwrap_or_default();
    let start_date = axis[0].date;
    let mid_date = axis[axis.len() / 2].date;
    let end_date = axis[axis.len() - 1].date;

    let mut svg = String::new();
    svg.push_str(&format!(
        r##"<svg width="{}" height="{}" viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg">"##,
        CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
    ));
    svg.push_str("\n  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"18\" font-size=\"13\" fill=\"#333\">{}</text>\n",
        MARGIN_LEFT, title
    ));
    svg.push_str(&format!(
        "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        MARGIN_TOP,
        MARGIN_LEFT,
        CHART_HEIGHT - MARGIN_BOTTOM
    ));
    svg.push_str(&format!(
        "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        CHART_HEIGHT - MARGIN_BOTTOM,
        CHART_WIDTH - MARGIN_RIGHT,
        CHART_HEIGHT - MARGIN_BOTTOM
    ));
    if zero_line {
        let y0 = y_scale(0.0);
        svg.push_str(&format!(
            "  <line x1=\"{}\" y1=\"{:.1}\" x2=\"{}\" y2=\"{:.1}\" stroke=\"#999\" stroke-dasharray=\"4 3\"/>\n",
            MARGIN_LEFT,
            y0,
            CHART_WIDTH - MARGIN_RIGHT,
            y0
        ));
    }

    for (y, value) in [
        (MARGIN_TOP + 5.0, max_value),
        (MARGIN_TOP + plot_height / 2.0, (max_value + min_value) / 2.0),
        (CHART_HEIGHT - MARGIN_BOTTOM - 5.0, min_value),
    ] {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"end\" font-size=\"10\" fill=\"#666\">{}</text>\n",
            MARGIN_LEFT - 5.0,
            y,
            fmt_value(value)
        ));
    }
    for (x, date) in [
        (MARGIN_LEFT, start_date),
        (MARGIN_LEFT + plot_width / 2.0, mid_date),
        (CHART_WIDTH - MARGIN_RIGHT, end_date),
    ] {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"10\" fill=\"#666\">{}</text>\n",
            x, CHART_HEIGHT - 10.0, date
        ));
    }

    for (idx, s) in series.iter().enumerate() {
        if s.points.is_empty() {
            continue;
        }
        let color = color_for(idx, &s.name);
        let mut path_data = String::new();
        for (i, point) in s.points.iter().enumerate() {
            let cmd = if i == 0 { "M" } else { " L" };
            path_data.push_str(&format!("{} {:.1} {:.1}", cmd, x_scale(i), y_scale(point.equity)));
        }
        svg.push_str(&format!(
            "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\"/>\n",
            path_data, color
        ));

        let legend_y = MARGIN_TOP + 10.0 + idx as f64 * 16.0;
        let legend_x = CHART_WIDTH - MARGIN_RIGHT + 15.0;
        svg.push_str(&format!(
            "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"3\"/>\n",
            legend_x,
            legend_y,
            legend_x + 18.0,
            legend_y,
            color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"11\" fill=\"#333\">{}</text>\n",
            legend_x + 24.0,
            legend_y + 4.0,
            s.name
        ));
    }

    svg.push_str("</svg>");
    svg
}
