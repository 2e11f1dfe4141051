//! Kind-specific value fields of a bulk document

use std::time::Duration;

use serde::ser::SerializeMap;

use super::snapshot::{
    CounterReading, GaugeValue, HistogramReading, MeterReading, Reading, TimerReading,
};

/// Units rates and durations are exported in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingUnits {
    rate_unit: Duration,
    duration_unit: Duration,
}

impl Default for ReportingUnits {
    /// Rates per second, durations in milliseconds
    fn default() -> Self {
        Self {
            rate_unit: Duration::from_secs(1),
            duration_unit: Duration::from_millis(1),
        }
    }
}

impl ReportingUnits {
    pub fn new(rate_unit: Duration, duration_unit: Duration) -> Self {
        Self {
            rate_unit,
            duration_unit: duration_unit.max(Duration::from_nanos(1)),
        }
    }

    /// Multiplier from events per second to events per rate unit
    fn rate_factor(&self) -> f64 {
        self.rate_unit.as_secs_f64()
    }

    /// Nanoseconds per duration unit
    fn duration_divisor(&self) -> f64 {
        self.duration_unit.as_nanos() as f64
    }
}

/// Writes the numeric fields of one reading into an open document object
pub trait BulkValueWriter {
    fn write_values<M: SerializeMap>(
        &self,
        map: &mut M,
        units: &ReportingUnits,
    ) -> Result<(), M::Error>;
}

impl BulkValueWriter for GaugeValue {
    fn write_values<M: SerializeMap>(
        &self,
        map: &mut M,
        _units: &ReportingUnits,
    ) -> Result<(), M::Error> {
        match self {
            GaugeValue::Number(value) => map.serialize_entry("value", value),
            GaugeValue::Boolean(value) => map.serialize_entry("value_boolean", value),
            GaugeValue::Text(value) => map.serialize_entry("value_string", value),
        }
    }
}

impl BulkValueWriter for CounterReading {
    fn write_values<M: SerializeMap>(
        &self,
        map: &mut M,
        _units: &ReportingUnits,
    ) -> Result<(), M::Error> {
        map.serialize_entry("count", &self.count)
    }
}

impl BulkValueWriter for HistogramReading {
    fn write_values<M: SerializeMap>(
        &self,
        map: &mut M,
        _units: &ReportingUnits,
    ) -> Result<(), M::Error> {
        write_distribution(map, self, 1.0)
    }
}

impl BulkValueWriter for MeterReading {
    fn write_values<M: SerializeMap>(
        &self,
        map: &mut M,
        units: &ReportingUnits,
    ) -> Result<(), M::Error> {
        map.serialize_entry("count", &self.count)?;
        write_rates(map, self, units.rate_factor())
    }
}

impl BulkValueWriter for TimerReading {
    fn write_values<M: SerializeMap>(
        &self,
        map: &mut M,
        units: &ReportingUnits,
    ) -> Result<(), M::Error> {
        write_distribution(map, &self.durations, units.duration_divisor())?;
        write_rates(map, &self.rates, units.rate_factor())
    }
}

impl BulkValueWriter for Reading<'_> {
    fn write_values<M: SerializeMap>(
        &self,
        map: &mut M,
        units: &ReportingUnits,
    ) -> Result<(), M::Error> {
        match self {
            Reading::Gauge(r) => r.write_values(map, units),
            Reading::Counter(r) => r.write_values(map, units),
            Reading::Histogram(r) => r.write_values(map, units),
            Reading::Meter(r) => r.write_values(map, units),
            Reading::Timer(r) => r.write_values(map, units),
        }
    }
}

fn write_distribution<M: SerializeMap>(
    map: &mut M,
    h: &HistogramReading,
    divisor: f64,
) -> Result<(), M::Error> {
    map.serialize_entry("count", &h.count)?;
    map.serialize_entry("min", &(h.min / divisor))?;
    map.serialize_entry("max", &(h.max / divisor))?;
    map.serialize_entry("mean", &(h.mean / divisor))?;
    map.serialize_entry("p50", &(h.p50 / divisor))?;
    map.serialize_entry("p75", &(h.p75 / divisor))?;
    map.serialize_entry("p95", &(h.p95 / divisor))?;
    map.serialize_entry("p98", &(h.p98 / divisor))?;
    map.serialize_entry("p99", &(h.p99 / divisor))?;
    map.serialize_entry("p999", &(h.p999 / divisor))?;
    map.serialize_entry("std", &(h.std_dev / divisor))
}

fn write_rates<M: SerializeMap>(map: &mut M, m: &MeterReading, factor: f64) -> Result<(), M::Error> {
    map.serialize_entry("m1_rate", &(m.m1_rate * factor))?;
    map.serialize_entry("m5_rate", &(m.m5_rate * factor))?;
    map.serialize_entry("m15_rate", &(m.m15_rate * factor))?;
    map.serialize_entry("mean_rate", &(m.mean_rate * factor))
}
