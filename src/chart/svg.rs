//! SVG line-chart backend.

use chrono::Duration;
use std::fmt::Write;

use crate::chart::{ChartBackend, ChartImage, ChartRequest, ChartSeries};
use crate::model::DashboardError;
use crate::render::escape_html;

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 40.0;
const Y_TICKS: u32 = 5;
const X_TICKS: u32 = 6;

const PALETTE: &[&str] = &[
    "#1f77b4", "#d62728", "#2ca02c", "#ff7f0e", "#9467bd", "#8c564b", "#e377c2", "#17becf",
];

#[derive(Debug, Clone, Default)]
pub struct SvgChart;

impl SvgChart {
    pub fn new() -> Self {
        Self
    }
}

/// Value range over all points, padded so a flat line sits mid-canvas.
fn value_bounds(series: &[ChartSeries]) -> Option<(f64, f64)> {
    let mut values = series.iter().flat_map(|s| s.points.iter().map(|p| p.value));
    let first = values.next()?;
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if (max - min).abs() < f64::EPSILON {
        Some((min - 1.0, max + 1.0))
    } else {
        Some((min, max))
    }
}

impl ChartBackend for SvgChart {
    fn render(&self, request: &ChartRequest, series: &[ChartSeries]) -> Result<ChartImage, DashboardError> {
        let width = f64::from(request.width);
        let height = f64::from(request.height);
        let plot_w = (width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0);
        let plot_h = (height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0);

        let start = request.window.start();
        let span_secs = Duration::days(i64::from(request.window.range_days())).num_seconds() as f64;
        let x_of = |time: chrono::NaiveDateTime| {
            MARGIN_LEFT + (time - start).num_seconds() as f64 / span_secs * plot_w
        };

        let mut svg = String::new();
        let fmt_err = |e: std::fmt::Error| DashboardError::Chart(e.to_string());

        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="11">"#,
            w = request.width,
            h = request.height
        )
        .map_err(fmt_err)?;
        writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#).map_err(fmt_err)?;
        writeln!(
            svg,
            r##"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="#999"/>"##,
            MARGIN_LEFT, MARGIN_TOP, plot_w, plot_h
        )
        .map_err(fmt_err)?;

        // x axis labels
        let label_format = if request.window.range_days() <= 1 { "%H:%M" } else { "%d.%m." };
        for i in 0..=X_TICKS {
            let offset = Duration::seconds((span_secs * f64::from(i) / f64::from(X_TICKS)) as i64);
            let time = start + offset;
            let x = x_of(time);
            writeln!(
                svg,
                r##"<line x1="{x:.1}" y1="{top}" x2="{x:.1}" y2="{bottom}" stroke="#eee"/><text x="{x:.1}" y="{label}" text-anchor="middle">{text}</text>"##,
                top = MARGIN_TOP,
                bottom = MARGIN_TOP + plot_h,
                label = MARGIN_TOP + plot_h + 16.0,
                text = time.format(label_format)
            )
            .map_err(fmt_err)?;
        }

        let Some((min, max)) = value_bounds(series) else {
            writeln!(
                svg,
                r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" fill="#999" font-size="16">no data</text>"##,
                MARGIN_LEFT + plot_w / 2.0,
                MARGIN_TOP + plot_h / 2.0
            )
            .map_err(fmt_err)?;
            svg.push_str("</svg>\n");
            return Ok(ChartImage { content_type: SVG_CONTENT_TYPE, body: svg.into_bytes() });
        };

        let y_of = |value: f64| MARGIN_TOP + plot_h - (value - min) / (max - min) * plot_h;

        // y axis labels
        for i in 0..=Y_TICKS {
            let value = min + (max - min) * f64::from(i) / f64::from(Y_TICKS);
            let y = y_of(value);
            writeln!(
                svg,
                r##"<line x1="{left}" y1="{y:.1}" x2="{right}" y2="{y:.1}" stroke="#eee"/><text x="{tx}" y="{ty:.1}" text-anchor="end">{value:.1}</text>"##,
                left = MARGIN_LEFT,
                right = MARGIN_LEFT + plot_w,
                tx = MARGIN_LEFT - 6.0,
                ty = y + 4.0
            )
            .map_err(fmt_err)?;
        }

        let mut legend_x = MARGIN_LEFT;
        for (index, s) in series.iter().enumerate() {
            let color = PALETTE[index % PALETTE.len()];

            if !s.points.is_empty() {
                let points: Vec<String> = s
                    .points
                    .iter()
                    .map(|p| format!("{:.1},{:.1}", x_of(p.time), y_of(p.value)))
                    .collect();
                writeln!(
                    svg,
                    r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
                    color,
                    points.join(" ")
                )
                .map_err(fmt_err)?;
            }

            let label = if s.unit.is_empty() {
                escape_html(&s.label)
            } else {
                format!("{} [{}]", escape_html(&s.label), escape_html(&s.unit))
            };
            writeln!(
                svg,
                r#"<rect x="{x:.1}" y="14" width="10" height="10" fill="{color}"/><text x="{tx:.1}" y="23">{label}</text>"#,
                x = legend_x,
                tx = legend_x + 14.0,
            )
            .map_err(fmt_err)?;
            legend_x += 24.0 + 7.0 * label.chars().count() as f64;
        }

        svg.push_str("</svg>\n");
        Ok(ChartImage { content_type: SVG_CONTENT_TYPE, body: svg.into_bytes() })
    }
}
