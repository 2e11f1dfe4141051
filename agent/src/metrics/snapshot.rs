//! Instrument readings and the point-in-time snapshot a registry hands out
//!
//! Readings are pre-computed by the registry; this crate only serializes
//! them.

use std::collections::BTreeMap;
use std::time::Duration;

use super::name::MetricName;

/// Current value of a gauge
#[derive(Debug, Clone, PartialEq)]
pub enum GaugeValue {
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl From<f64> for GaugeValue {
    fn from(value: f64) -> Self {
        GaugeValue::Number(value)
    }
}

impl From<i64> for GaugeValue {
    fn from(value: i64) -> Self {
        GaugeValue::Number(value as f64)
    }
}

impl From<bool> for GaugeValue {
    fn from(value: bool) -> Self {
        GaugeValue::Boolean(value)
    }
}

impl From<&str> for GaugeValue {
    fn from(value: &str) -> Self {
        GaugeValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CounterReading {
    pub count: i64,
}

/// Distribution statistics of a histogram
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistogramReading {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub p98: f64,
    pub p99: f64,
    pub p999: f64,
}

/// Event count and rates, in events per second
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeterReading {
    pub count: u64,
    pub mean_rate: f64,
    pub m1_rate: f64,
    pub m5_rate: f64,
    pub m15_rate: f64,
}

/// Timer: duration distribution in nanoseconds plus call rates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimerReading {
    pub durations: HistogramReading,
    pub rates: MeterReading,
}

/// Point-in-time view of every instrument, keyed by metric identity
#[derive(Debug, Clone, Default)]
pub struct MetricSnapshot {
    pub gauges: BTreeMap<MetricName, GaugeValue>,
    pub counters: BTreeMap<MetricName, CounterReading>,
    pub histograms: BTreeMap<MetricName, HistogramReading>,
    pub meters: BTreeMap<MetricName, MeterReading>,
    pub timers: BTreeMap<MetricName, TimerReading>,
}

impl MetricSnapshot {
    /// Number of entries across all five collections
    pub fn len(&self) -> usize {
        self.gauges.len()
            + self.counters.len()
            + self.histograms.len()
            + self.meters.len()
            + self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries in export order: gauges, counters, histograms, meters, timers
    pub fn entries(&self) -> impl Iterator<Item = (&MetricName, Reading<'_>)> {
        let gauges = self.gauges.iter().map(|(n, v)| (n, Reading::Gauge(v)));
        let counters = self.counters.iter().map(|(n, v)| (n, Reading::Counter(v)));
        let histograms = self.histograms.iter().map(|(n, v)| (n, Reading::Histogram(v)));
        let meters = self.meters.iter().map(|(n, v)| (n, Reading::Meter(v)));
        let timers = self.timers.iter().map(|(n, v)| (n, Reading::Timer(v)));
        gauges.chain(counters).chain(histograms).chain(meters).chain(timers)
    }
}

/// Borrowed reading of any kind
#[derive(Debug, Clone, Copy)]
pub enum Reading<'a> {
    Gauge(&'a GaugeValue),
    Counter(&'a CounterReading),
    Histogram(&'a HistogramReading),
    Meter(&'a MeterReading),
    Timer(&'a TimerReading),
}

/// Producer of snapshots; also receives the reporter's own timing
pub trait MetricRegistry: Send + Sync {
    /// Capture all current readings. The returned snapshot is owned by the
    /// caller and is not mutated afterwards.
    fn snapshot(&self) -> MetricSnapshot;

    /// Record one duration sample for the timer `name`
    fn record_timing(&self, name: &MetricName, elapsed: Duration);
}
