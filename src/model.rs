/// Core data types for the sensor dashboard.
///
/// This module defines the shared domain model imported by all other modules:
/// stored samples, the metadata that labels them, the joined snapshot rows
/// shown in the status table, and the error type every stage returns.

use chrono::NaiveDateTime;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Stored state codes
// ---------------------------------------------------------------------------

/// `valuefacts.state` code for a sensor that should be displayed.
pub const STATE_ACTIVE: &str = "A";

/// `valuefacts.state` code written by the ingestion daemon for retired sensors.
pub const STATE_INACTIVE: &str = "D";

// ---------------------------------------------------------------------------
// Sample types
// ---------------------------------------------------------------------------

/// One stored measurement from the `samples` table.
///
/// Written by the ingestion daemon; this service only reads it. `kind` maps
/// to the `type` column (a short code such as `"UD"` or `"VA"`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub time: NaiveDateTime,
    pub address: i32,
    pub kind: String,
    pub value: f64,
    pub text: Option<String>,
}

impl Sample {
    pub fn key(&self) -> SensorKey {
        SensorKey::new(self.address, &self.kind)
    }
}

/// Mean and maximum of one sensor's samples within one time bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBucket {
    /// Start of the bucket.
    pub start: NaiveDateTime,
    pub address: i32,
    pub kind: String,
    pub avg: f64,
    pub max: f64,
    pub count: i64,
}

impl SampleBucket {
    pub fn key(&self) -> SensorKey {
        SensorKey::new(self.address, &self.kind)
    }
}

/// Identifies one sensor/measurement-type pairing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SensorKey {
    pub address: i32,
    pub kind: String,
}

impl SensorKey {
    pub fn new(address: i32, kind: &str) -> Self {
        Self { address, kind: kind.to_string() }
    }
}

impl std::fmt::Display for SensorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "addr={}/{}", self.address, self.kind)
    }
}

// ---------------------------------------------------------------------------
// Metadata types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueState {
    Active,
    Inactive,
}

impl ValueState {
    /// Anything other than the active code counts as inactive.
    pub fn from_code(code: &str) -> Self {
        if code.trim() == STATE_ACTIVE {
            ValueState::Active
        } else {
            ValueState::Inactive
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ValueState::Active => STATE_ACTIVE,
            ValueState::Inactive => STATE_INACTIVE,
        }
    }
}

/// Display metadata for a sensor from the `valuefacts` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueFact {
    pub address: i32,
    pub kind: String,
    pub title: String,
    pub unit: String,
    pub state: ValueState,
}

impl ValueFact {
    pub fn key(&self) -> SensorKey {
        SensorKey::new(self.address, &self.kind)
    }

    pub fn is_active(&self) -> bool {
        self.state == ValueState::Active
    }
}

/// A sample at the latest timestamp joined with its active `ValueFact`.
///
/// Produced by `SampleStore::snapshot_at`, one row per (address, type).
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub address: i32,
    pub kind: String,
    pub time: NaiveDateTime,
    pub value: f64,
    pub title: String,
    pub unit: String,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while resolving, querying, or rendering a page.
#[derive(Debug)]
pub enum DashboardError {
    /// `sday`/`smonth`/`syear` are non-numeric or do not form a calendar date.
    InvalidDate { day: String, month: String, year: String },
    /// `range` parsed but is outside the accepted number of days.
    InvalidRange(i64),
    /// A query parameter could not be parsed.
    InvalidParameter { name: &'static str, value: String },
    /// The store could not be reached or a query failed.
    StoreUnavailable {
        operation: &'static str,
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The chart backend failed to produce an image.
    Chart(String),
    /// A request worker died before producing a result.
    Internal(String),
}

impl DashboardError {
    pub fn store(
        operation: &'static str,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        DashboardError::StoreUnavailable { operation, cause: cause.into() }
    }

    /// True for errors caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DashboardError::InvalidDate { .. }
                | DashboardError::InvalidRange(_)
                | DashboardError::InvalidParameter { .. }
        )
    }
}

impl std::fmt::Display for DashboardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DashboardError::InvalidDate { day, month, year } => {
                write!(f, "Invalid date: day={} month={} year={}", day, month, year)
            }
            DashboardError::InvalidRange(days) => {
                write!(f, "Invalid range: {} days (expected 1 to {})", days, crate::window::MAX_RANGE_DAYS)
            }
            DashboardError::InvalidParameter { name, value } => {
                write!(f, "Invalid parameter {}: '{}'", name, value)
            }
            DashboardError::StoreUnavailable { operation, cause } => {
                write!(f, "Store unavailable during {}: {}", operation, cause)
            }
            DashboardError::Chart(msg) => write!(f, "Chart error: {}", msg),
            DashboardError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DashboardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DashboardError::StoreUnavailable { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_value_state_codes() {
        assert_eq!(ValueState::from_code("A"), ValueState::Active);
        assert_eq!(ValueState::from_code("A "), ValueState::Active);
        assert_eq!(ValueState::from_code("D"), ValueState::Inactive);
        assert_eq!(ValueState::from_code(""), ValueState::Inactive);
        assert_eq!(ValueState::Active.code(), STATE_ACTIVE);
    }

    #[test]
    fn test_sensor_keys_order_by_address_then_type() {
        let mut keys = vec![
            SensorKey::new(4, "VA"),
            SensorKey::new(1, "UD"),
            SensorKey::new(4, "DO"),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![SensorKey::new(1, "UD"), SensorKey::new(4, "DO"), SensorKey::new(4, "VA")]
        );
    }

    #[test]
    fn test_store_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = DashboardError::store("connect", io);
        assert!(err.to_string().contains("connect"));
        assert!(err.to_string().contains("refused"));
        assert!(err.source().is_some());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_parameter_errors_are_client_errors() {
        assert!(DashboardError::InvalidRange(0).is_client_error());
        assert!(DashboardError::InvalidParameter { name: "range", value: "x".into() }.is_client_error());
        assert!(!DashboardError::Chart("boom".into()).is_client_error());
        assert!(!DashboardError::Internal("worker panicked".into()).is_client_error());
    }
}
