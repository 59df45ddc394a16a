//! Placement statistics for an academic department: yearly outcome records,
//! off-campus placements, and the aggregations dashboards render from them.

pub mod aggregate;
pub mod coerce;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod placements;
pub mod records;
pub mod report;
pub mod service;
pub mod store;
pub mod telemetry;
