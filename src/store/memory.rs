//! In-process sample store.
//!
//! Holds samples and valuefacts in vectors and answers the same queries as
//! the PostgreSQL backend with the same ordering guarantees. Used by the
//! test suites in place of a database.

use chrono::NaiveDateTime;
use std::sync::Arc;

use crate::model::{DashboardError, Sample, SensorKey, SnapshotRow, ValueFact};
use crate::store::{SampleFilter, SampleStore, StoreConnector};
use crate::window::ReportWindow;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    samples: Vec<Sample>,
    facts: Vec<ValueFact>,
}

impl MemoryStore {
    pub fn new(samples: Vec<Sample>, facts: Vec<ValueFact>) -> Self {
        Self { samples, facts }
    }

    fn active_fact(&self, address: i32, kind: &str) -> Option<&ValueFact> {
        self.facts
            .iter()
            .find(|f| f.is_active() && f.address == address && f.kind == kind)
    }
}

impl SampleStore for MemoryStore {
    fn latest_sample_time(&mut self) -> Result<Option<NaiveDateTime>, DashboardError> {
        Ok(self.samples.iter().map(|s| s.time).max())
    }

    fn snapshot_at(&mut self, time: NaiveDateTime) -> Result<Vec<SnapshotRow>, DashboardError> {
        let mut rows: Vec<SnapshotRow> = self
            .samples
            .iter()
            .filter(|s| s.time == time)
            .filter_map(|s| {
                self.active_fact(s.address, &s.kind).map(|f| SnapshotRow {
                    address: s.address,
                    kind: s.kind.clone(),
                    time: s.time,
                    value: s.value,
                    title: f.title.clone(),
                    unit: f.unit.clone(),
                })
            })
            .collect();

        rows.sort_by(|a, b| (a.address, &a.kind).cmp(&(b.address, &b.kind)));
        Ok(rows)
    }

    fn sample_at(
        &mut self,
        time: NaiveDateTime,
        key: &SensorKey,
    ) -> Result<Option<Sample>, DashboardError> {
        Ok(self
            .samples
            .iter()
            .find(|s| s.time == time && s.address == key.address && s.kind == key.kind)
            .cloned())
    }

    fn samples_in_window(
        &mut self,
        window: &ReportWindow,
        filter: &SampleFilter,
    ) -> Result<Vec<Sample>, DashboardError> {
        let mut samples: Vec<Sample> = self
            .samples
            .iter()
            .filter(|s| window.contains(s.time) && filter.matches(s.address, &s.kind))
            .cloned()
            .collect();

        samples.sort_by(|a, b| (a.time, a.address, &a.kind).cmp(&(b.time, b.address, &b.kind)));
        Ok(samples)
    }

    fn active_facts(&mut self, filter: &SampleFilter) -> Result<Vec<ValueFact>, DashboardError> {
        let mut facts: Vec<ValueFact> = self
            .facts
            .iter()
            .filter(|f| f.is_active() && filter.matches(f.address, &f.kind))
            .cloned()
            .collect();

        facts.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(facts)
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Hands each request its own copy of a shared fixture set.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    data: Option<Arc<MemoryStore>>,
}

impl MemoryConnector {
    pub fn new(store: MemoryStore) -> Self {
        Self { data: Some(Arc::new(store)) }
    }

    /// A connector whose every `connect` fails, as if the database were down.
    pub fn unavailable() -> Self {
        Self { data: None }
    }
}

impl StoreConnector for MemoryConnector {
    fn connect(&self) -> Result<Box<dyn SampleStore>, DashboardError> {
        match &self.data {
            Some(data) => Ok(Box::new(MemoryStore::clone(data))),
            None => Err(DashboardError::store(
                "connect",
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "memory store offline"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
