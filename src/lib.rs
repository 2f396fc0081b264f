//! Sensor sample dashboard.
//!
//! Serves a status table of the latest sensor readings and line charts over
//! a chosen date range, reading from the `samples` and `valuefacts` tables
//! written by the ingestion daemon.
//!
//! Request flow: `window` resolves the reporting window from query
//! parameters, `store` runs the queries, `render` and `chart` turn the rows
//! into HTML or images, `web` wires it to HTTP.

pub mod chart;
pub mod config;
pub mod logging;
pub mod model;
pub mod render;
pub mod store;
pub mod web;
pub mod window;
