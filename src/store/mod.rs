//! Sample query service.
//!
//! `SampleStore` is the read-only view of the `samples` and `valuefacts`
//! tables that every page works against. A store handle is acquired from a
//! `StoreConnector` once per request and dropped when the request finishes,
//! so no connection outlives the page that opened it.
//!
//! Filters are structured (`SampleFilter`) and always bound as query
//! parameters by the backends.
//!
//! Submodules:
//! - `pg`: the production backend on the `postgres` crate.
//! - `memory`: an in-process backend for tests.

pub mod memory;
pub mod pg;

use chrono::{NaiveDateTime, Timelike};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{DashboardError, Sample, SampleBucket, SensorKey, SnapshotRow, ValueFact};
use crate::window::ReportWindow;

pub use self::memory::{MemoryConnector, MemoryStore};
pub use self::pg::{PgConnector, PgStore};

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Which samples a chart or series query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleFilter {
    /// Every measurement type reported by any of these addresses.
    Addresses(BTreeSet<i32>),
    /// Exactly one address/type pairing.
    Sensor(SensorKey),
}

impl SampleFilter {
    pub fn addresses<I: IntoIterator<Item = i32>>(addresses: I) -> Self {
        SampleFilter::Addresses(addresses.into_iter().collect())
    }

    pub fn sensor(address: i32, kind: &str) -> Self {
        SampleFilter::Sensor(SensorKey::new(address, kind))
    }

    pub fn matches(&self, address: i32, kind: &str) -> bool {
        match self {
            SampleFilter::Addresses(set) => set.contains(&address),
            SampleFilter::Sensor(key) => key.address == address && key.kind == kind,
        }
    }

    /// Query-string fragment that selects this filter on `/detail`.
    pub fn query_fragment(&self) -> String {
        match self {
            SampleFilter::Addresses(set) => {
                let list: Vec<String> = set.iter().map(i32::to_string).collect();
                format!("addresses={}", list.join(","))
            }
            SampleFilter::Sensor(key) => format!("address={}&type={}", key.address, key.kind),
        }
    }

    /// Builds a filter from the raw `address`, `type` and `addresses` parameters.
    ///
    /// `address` requires `type`; otherwise `addresses` is used. Returns
    /// `Ok(None)` when none of them are present.
    pub fn from_params(
        address: Option<&str>,
        kind: Option<&str>,
        addresses: Option<&str>,
    ) -> Result<Option<Self>, DashboardError> {
        fn present(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|s| !s.is_empty())
        }

        if let Some(raw) = present(address) {
            let address = parse_address("address", raw)?;
            let kind = present(kind).ok_or(DashboardError::InvalidParameter {
                name: "type",
                value: String::new(),
            })?;
            if !kind.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(DashboardError::InvalidParameter { name: "type", value: kind.to_string() });
            }
            return Ok(Some(SampleFilter::sensor(address, kind)));
        }

        if let Some(raw) = present(addresses) {
            let set = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_address("addresses", s))
                .collect::<Result<BTreeSet<i32>, _>>()?;
            return Ok(Some(SampleFilter::Addresses(set)));
        }

        Ok(None)
    }
}

fn parse_address(name: &'static str, raw: &str) -> Result<i32, DashboardError> {
    raw.parse().map_err(|_| DashboardError::InvalidParameter { name, value: raw.to_string() })
}

impl std::fmt::Display for SampleFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleFilter::Addresses(set) => write!(f, "addresses {:?}", set),
            SampleFilter::Sensor(key) => write!(f, "{}", key),
        }
    }
}

// ---------------------------------------------------------------------------
// Store traits
// ---------------------------------------------------------------------------

/// Read-only queries against the sample store.
///
/// Empty results are never errors. Any backend failure surfaces as
/// `DashboardError::StoreUnavailable` with the cause attached.
pub trait SampleStore {
    /// `max(time)` over all samples, `None` for an empty table.
    fn latest_sample_time(&mut self) -> Result<Option<NaiveDateTime>, DashboardError>;

    /// Samples at exactly `time` joined with active valuefacts,
    /// ordered by address then type.
    fn snapshot_at(&mut self, time: NaiveDateTime) -> Result<Vec<SnapshotRow>, DashboardError>;

    fn sample_at(
        &mut self,
        time: NaiveDateTime,
        key: &SensorKey,
    ) -> Result<Option<Sample>, DashboardError>;

    /// Samples with `window.start() <= time < window.end()` matching `filter`,
    /// ordered by time, then address, then type.
    fn samples_in_window(
        &mut self,
        window: &ReportWindow,
        filter: &SampleFilter,
    ) -> Result<Vec<Sample>, DashboardError>;

    /// Per-sensor buckets of `bucket_minutes` over the window, ordered by
    /// bucket start, then address, then type. `bucket_minutes` must divide
    /// an hour.
    ///
    /// The default aggregates `samples_in_window`; backends that can group
    /// server-side override it.
    fn bucketed_samples(
        &mut self,
        window: &ReportWindow,
        filter: &SampleFilter,
        bucket_minutes: u32,
    ) -> Result<Vec<SampleBucket>, DashboardError> {
        let samples = self.samples_in_window(window, filter)?;
        Ok(aggregate_buckets(&samples, bucket_minutes))
    }

    /// Active valuefacts matching `filter`, ordered by address then type.
    fn active_facts(&mut self, filter: &SampleFilter) -> Result<Vec<ValueFact>, DashboardError>;
}

// ---------------------------------------------------------------------------
// Bucketing
// ---------------------------------------------------------------------------

/// Floors `time` to the start of its `minutes`-wide bucket within the day.
pub fn bucket_start(time: NaiveDateTime, minutes: u32) -> NaiveDateTime {
    let minute_of_day = time.hour() * 60 + time.minute();
    let bucket = minute_of_day / minutes.max(1) * minutes.max(1);
    time.date()
        .and_hms_opt(bucket / 60, bucket % 60, 0)
        .unwrap_or(time)
}

/// Groups raw samples into mean/max buckets per sensor.
pub fn aggregate_buckets(samples: &[Sample], minutes: u32) -> Vec<SampleBucket> {
    let mut grouped: BTreeMap<(NaiveDateTime, i32, &str), SampleBucket> = BTreeMap::new();

    for sample in samples {
        let start = bucket_start(sample.time, minutes);
        let bucket = grouped
            .entry((start, sample.address, sample.kind.as_str()))
            .or_insert_with(|| SampleBucket {
                start,
                address: sample.address,
                kind: sample.kind.clone(),
                avg: 0.0,
                max: f64::MIN,
                count: 0,
            });
        // running sum until the final pass below
        bucket.avg += sample.value;
        bucket.max = bucket.max.max(sample.value);
        bucket.count += 1;
    }

    grouped
        .into_values()
        .map(|mut bucket| {
            bucket.avg /= bucket.count as f64;
            bucket
        })
        .collect()
}

/// Hands out one store handle per request.
pub trait StoreConnector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn SampleStore>, DashboardError>;
}

// ---------------------------------------------------------------------------
// Page-level queries
// ---------------------------------------------------------------------------

/// Everything the table view needs from the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSnapshot {
    pub latest: Option<NaiveDateTime>,
    pub rows: Vec<SnapshotRow>,
    pub status_text: Option<String>,
}

/// Loads the latest snapshot and the status sensor's text.
///
/// With no samples at all the snapshot is empty and no further queries run.
pub fn load_table_snapshot(
    store: &mut dyn SampleStore,
    status_sensor: &SensorKey,
) -> Result<TableSnapshot, DashboardError> {
    let Some(latest) = store.latest_sample_time()? else {
        return Ok(TableSnapshot::default());
    };

    let status_text = store
        .sample_at(latest, status_sensor)?
        .and_then(|s| s.text)
        .filter(|t| !t.trim().is_empty());

    let rows = store.snapshot_at(latest)?;

    Ok(TableSnapshot { latest: Some(latest), rows, status_text })
}

/// Bucketed samples for a chart plus the labels of the sensors they belong to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartData {
    pub buckets: Vec<SampleBucket>,
    pub facts: Vec<ValueFact>,
}

pub fn load_chart_data(
    store: &mut dyn SampleStore,
    window: &ReportWindow,
    filter: &SampleFilter,
    bucket_minutes: u32,
) -> Result<ChartData, DashboardError> {
    let buckets = store.bucketed_samples(window, filter, bucket_minutes)?;
    let facts = store.active_facts(filter)?;
    Ok(ChartData { buckets, facts })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
