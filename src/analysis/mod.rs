//! Network structure, unit conversion and project statistics.
pub mod telemetry;
pub mod topology;
pub mod units;

pub use telemetry::TelemetryReport;
pub use topology::{Adjacency, TopologyError};
pub use units::{ConversionTable, UnitCategory};
