//! Chart series shaping and the chart backend seam.
//!
//! The dashboard never draws pixels itself. The store groups samples per
//! sensor into time buckets (5 minutes for a one-day window, 60 minutes for
//! anything longer, each bucket carrying the mean and the maximum), this
//! module shapes them into series, then a `ChartBackend` turns the series
//! plus the canvas request into an image.
//!
//! Submodules:
//! - `svg`: the default backend, emitting a standalone SVG line chart.

pub mod svg;

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{DashboardError, SensorKey};
use crate::store::{ChartData, SampleFilter};
use crate::window::ReportWindow;

pub use self::svg::SvgChart;

/// Bucket width for windows of one day.
pub const FINE_BUCKET_MINUTES: u32 = 5;

/// Bucket width for anything longer than a day.
pub const COARSE_BUCKET_MINUTES: u32 = 60;

pub const MIN_CANVAS_PX: u32 = 50;
pub const MAX_CANVAS_PX: u32 = 4000;

// ---------------------------------------------------------------------------
// Series types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Start of the bucket.
    pub time: NaiveDateTime,
    /// Mean of the samples in the bucket.
    pub value: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub key: SensorKey,
    pub label: String,
    pub unit: String,
    pub points: Vec<ChartPoint>,
}

/// Everything a backend needs besides the data.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub width: u32,
    pub height: u32,
    pub window: ReportWindow,
    pub filter: SampleFilter,
}

impl ChartRequest {
    /// Builds a request from raw `width`/`height` parameters, using the
    /// defaults for missing values.
    pub fn from_params(
        width: Option<&str>,
        height: Option<&str>,
        defaults: (u32, u32),
        window: ReportWindow,
        filter: SampleFilter,
    ) -> Result<Self, DashboardError> {
        Ok(Self {
            width: parse_dimension("width", width, defaults.0)?,
            height: parse_dimension("height", height, defaults.1)?,
            window,
            filter,
        })
    }
}

/// Parses a canvas dimension, falling back to `default` when absent.
pub fn parse_dimension(name: &'static str, raw: Option<&str>, default: u32) -> Result<u32, DashboardError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };
    match raw.parse::<u32>() {
        Ok(px) if (MIN_CANVAS_PX..=MAX_CANVAS_PX).contains(&px) => Ok(px),
        _ => Err(DashboardError::InvalidParameter { name, value: raw.to_string() }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Draws series onto a canvas. Must accept an empty `series` slice and
/// still return a valid image.
pub trait ChartBackend: Send + Sync {
    fn render(&self, request: &ChartRequest, series: &[ChartSeries]) -> Result<ChartImage, DashboardError>;
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

pub fn bucket_minutes(range_days: u32) -> u32 {
    if range_days <= 1 {
        FINE_BUCKET_MINUTES
    } else {
        COARSE_BUCKET_MINUTES
    }
}

/// Turns bucketed chart data into one series per sensor.
///
/// Every active fact yields a series even without samples; buckets whose
/// sensor has no active fact are labelled with their key. Series are ordered
/// by address then type, points by time.
pub fn build_series(data: &ChartData, window: &ReportWindow) -> Vec<ChartSeries> {
    let mut grouped: BTreeMap<SensorKey, Vec<ChartPoint>> = BTreeMap::new();

    for fact in &data.facts {
        grouped.entry(fact.key()).or_default();
    }

    for bucket in data.buckets.iter().filter(|b| window.contains(b.start)) {
        grouped.entry(bucket.key()).or_default().push(ChartPoint {
            time: bucket.start,
            value: bucket.avg,
            max: bucket.max,
        });
    }

    grouped
        .into_iter()
        .map(|(key, mut points)| {
            points.sort_by(|a, b| a.time.cmp(&b.time));
            let fact = data.facts.iter().find(|f| f.key() == key);
            ChartSeries {
                label: fact.map(|f| f.title.clone()).unwrap_or_else(|| key.to_string()),
                unit: fact.map(|f| f.unit.clone()).unwrap_or_default(),
                points,
                key,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
