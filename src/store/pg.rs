//! PostgreSQL sample store.
//!
//! Each `PgConnector::connect` opens a fresh `postgres::Client`; the client
//! is closed when the returned store is dropped at the end of the request.
//! Every query binds its inputs as parameters.

use chrono::NaiveDateTime;
use postgres::{Client, NoTls, Row};

use crate::logging::{self, Component};
use crate::model::{DashboardError, Sample, SampleBucket, SensorKey, SnapshotRow, ValueFact, ValueState, STATE_ACTIVE};
use crate::store::{SampleFilter, SampleStore, StoreConnector};
use crate::window::ReportWindow;

const SELECT_LATEST_TIME: &str = "SELECT max(time) FROM samples";

const SELECT_SNAPSHOT: &str = "
    SELECT s.address, s.type, s.time, s.value, f.title, f.unit
    FROM samples s
    JOIN valuefacts f ON f.address = s.address AND f.type = s.type
    WHERE f.state = $1
      AND s.time = $2
    ORDER BY s.address, s.type
";

const SELECT_SAMPLE_AT: &str = "
    SELECT time, address, type, value, text
    FROM samples
    WHERE time = $1 AND address = $2 AND type = $3
    LIMIT 1
";

const SELECT_WINDOW_BY_ADDRESSES: &str = "
    SELECT time, address, type, value, text
    FROM samples
    WHERE time >= $1
      AND time < $2
      AND address = ANY($3)
    ORDER BY time, address, type
";

const SELECT_WINDOW_BY_SENSOR: &str = "
    SELECT time, address, type, value, text
    FROM samples
    WHERE time >= $1
      AND time < $2
      AND address = $3
      AND type = $4
    ORDER BY time
";

// $3 is the bucket width in minutes and must divide an hour.
const BUCKET_COLUMNS: &str = "
    SELECT date_trunc('hour', time)
             + make_interval(mins => (floor(date_part('minute', time) / $3::int) * $3::int)::int) AS bucket,
           address, type, avg(value), max(value), count(*)
    FROM samples
    WHERE time >= $1
      AND time < $2
";

const BUCKETS_BY_ADDRESSES: &str = "AND address = ANY($4)
    GROUP BY bucket, address, type
    ORDER BY bucket, address, type
";

const BUCKETS_BY_SENSOR: &str = "AND address = $4 AND type = $5
    GROUP BY bucket, address, type
    ORDER BY bucket
";

const SELECT_FACTS_BY_ADDRESSES: &str = "
    SELECT address, type, title, unit, state
    FROM valuefacts
    WHERE state = $1 AND address = ANY($2)
    ORDER BY address, type
";

const SELECT_FACTS_BY_SENSOR: &str = "
    SELECT address, type, title, unit, state
    FROM valuefacts
    WHERE state = $1 AND address = $2 AND type = $3
";

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

pub struct PgConnector {
    url: String,
}

impl PgConnector {
    pub fn new(url: &str) -> Self {
        Self { url: url.to_string() }
    }
}

impl StoreConnector for PgConnector {
    fn connect(&self) -> Result<Box<dyn SampleStore>, DashboardError> {
        let client = Client::connect(&self.url, NoTls).map_err(|e| {
            logging::error(Component::Database, None, &format!("connect failed: {}", e));
            DashboardError::store("connect", e)
        })?;
        Ok(Box::new(PgStore { client }))
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct PgStore {
    client: Client,
}

impl PgStore {
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn sample_from_row(row: &Row) -> Sample {
    Sample {
        time: row.get(0),
        address: row.get(1),
        kind: row.get(2),
        value: row.get(3),
        text: row.get(4),
    }
}

fn fact_from_row(row: &Row) -> ValueFact {
    let state: String = row.get(4);
    ValueFact {
        address: row.get(0),
        kind: row.get(1),
        title: row.get::<_, Option<String>>(2).unwrap_or_default(),
        unit: row.get::<_, Option<String>>(3).unwrap_or_default(),
        state: ValueState::from_code(&state),
    }
}

fn bucket_from_row(row: &Row) -> SampleBucket {
    SampleBucket {
        start: row.get(0),
        address: row.get(1),
        kind: row.get(2),
        avg: row.get(3),
        max: row.get(4),
        count: row.get(5),
    }
}

fn address_list(filter: &SampleFilter) -> Vec<i32> {
    match filter {
        SampleFilter::Addresses(set) => set.iter().copied().collect(),
        SampleFilter::Sensor(key) => vec![key.address],
    }
}

impl SampleStore for PgStore {
    fn latest_sample_time(&mut self) -> Result<Option<NaiveDateTime>, DashboardError> {
        let row = self
            .client
            .query_one(SELECT_LATEST_TIME, &[])
            .map_err(|e| DashboardError::store("latest sample time", e))?;
        Ok(row.get(0))
    }

    fn snapshot_at(&mut self, time: NaiveDateTime) -> Result<Vec<SnapshotRow>, DashboardError> {
        let rows = self
            .client
            .query(SELECT_SNAPSHOT, &[&STATE_ACTIVE, &time])
            .map_err(|e| DashboardError::store("snapshot", e))?;

        Ok(rows
            .iter()
            .map(|row| SnapshotRow {
                address: row.get(0),
                kind: row.get(1),
                time: row.get(2),
                value: row.get(3),
                title: row.get::<_, Option<String>>(4).unwrap_or_default(),
                unit: row.get::<_, Option<String>>(5).unwrap_or_default(),
            })
            .collect())
    }

    fn sample_at(
        &mut self,
        time: NaiveDateTime,
        key: &SensorKey,
    ) -> Result<Option<Sample>, DashboardError> {
        let row = self
            .client
            .query_opt(SELECT_SAMPLE_AT, &[&time, &key.address, &key.kind])
            .map_err(|e| DashboardError::store("status sample", e))?;
        Ok(row.as_ref().map(sample_from_row))
    }

    fn samples_in_window(
        &mut self,
        window: &ReportWindow,
        filter: &SampleFilter,
    ) -> Result<Vec<Sample>, DashboardError> {
        let start = window.start();
        let end = window.end();

        let rows = match filter {
            SampleFilter::Addresses(_) => {
                let addresses = address_list(filter);
                self.client
                    .query(SELECT_WINDOW_BY_ADDRESSES, &[&start, &end, &addresses])
            }
            SampleFilter::Sensor(key) => self
                .client
                .query(SELECT_WINDOW_BY_SENSOR, &[&start, &end, &key.address, &key.kind]),
        }
        .map_err(|e| DashboardError::store("window samples", e))?;

        logging::debug(
            Component::Database,
            Some(&filter.to_string()),
            &format!("{} samples in [{}, {})", rows.len(), start, end),
        );

        Ok(rows.iter().map(sample_from_row).collect())
    }

    fn bucketed_samples(
        &mut self,
        window: &ReportWindow,
        filter: &SampleFilter,
        bucket_minutes: u32,
    ) -> Result<Vec<SampleBucket>, DashboardError> {
        let start = window.start();
        let end = window.end();
        let minutes = i32::try_from(bucket_minutes).unwrap_or(60);

        let rows = match filter {
            SampleFilter::Addresses(_) => {
                let addresses = address_list(filter);
                let sql = format!("{}{}", BUCKET_COLUMNS, BUCKETS_BY_ADDRESSES);
                self.client.query(sql.as_str(), &[&start, &end, &minutes, &addresses])
            }
            SampleFilter::Sensor(key) => {
                let sql = format!("{}{}", BUCKET_COLUMNS, BUCKETS_BY_SENSOR);
                self.client
                    .query(sql.as_str(), &[&start, &end, &minutes, &key.address, &key.kind])
            }
        }
        .map_err(|e| DashboardError::store("bucketed samples", e))?;

        logging::debug(
            Component::Database,
            Some(&filter.to_string()),
            &format!("{} buckets of {} min in [{}, {})", rows.len(), bucket_minutes, start, end),
        );

        Ok(rows.iter().map(bucket_from_row).collect())
    }

    fn active_facts(&mut self, filter: &SampleFilter) -> Result<Vec<ValueFact>, DashboardError> {
        let rows = match filter {
            SampleFilter::Addresses(_) => {
                let addresses = address_list(filter);
                self.client
                    .query(SELECT_FACTS_BY_ADDRESSES, &[&STATE_ACTIVE, &addresses])
            }
            SampleFilter::Sensor(key) => self
                .client
                .query(SELECT_FACTS_BY_SENSOR, &[&STATE_ACTIVE, &key.address, &key.kind]),
        }
        .map_err(|e| DashboardError::store("value facts", e))?;

        Ok(rows.iter().map(fact_from_row).collect())
    }
}
