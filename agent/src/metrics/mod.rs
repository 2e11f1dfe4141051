//! Metrics export
//!
//! Turns a registry snapshot into an Elasticsearch bulk payload and ships
//! it to the metrics store or the metrics log:
//! - [`snapshot`] and [`name`] describe what a registry hands over
//! - [`writer`] and [`bulk`] serialize entries line by line
//! - [`reporter`] runs one reporting cycle, [`scheduler`] runs it periodically
//! - [`settings`] and [`health`] gate what a cycle does

pub mod bulk;
mod error;
pub mod health;
pub mod name;
pub mod reporter;
pub mod scheduler;
pub mod settings;
pub mod snapshot;
pub mod writer;

pub use bulk::{BulkWriter, bulk_action_line, index_name};
pub use error::ReportError;
pub use health::{AvailabilityGate, StoreHealth};
pub use name::MetricName;
pub use reporter::{
    CycleOutcome, ElasticsearchReporter, ElasticsearchReporterBuilder, MetricsLog,
    TracingMetricsLog,
};
pub use scheduler::spawn_reporter;
pub use settings::{CoreOptions, ReporterSettings};
pub use snapshot::{
    CounterReading, GaugeValue, HistogramReading, MeterReading, MetricRegistry, MetricSnapshot,
    Reading, TimerReading,
};
pub use writer::{BulkValueWriter, ReportingUnits};
