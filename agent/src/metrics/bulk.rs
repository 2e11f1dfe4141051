//! Streaming bulk payload serialization
//!
//! A payload is a sequence of line pairs, one pair per metric entry:
//!
//! ```text
//! {"index":{"_index":"stagemonitor-metrics-2024.01.15","_type":"metrics"}}
//! {"@timestamp":1705276800000,"name":"jvm.mem","instance":"a","env":"prod","value":1.0}
//! ```
//!
//! Entries are written and flushed one at a time, so memory stays bounded
//! by a single entry regardless of the snapshot size.

use std::collections::BTreeMap;
use std::io::{self, Write};

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::json;

use super::name::MetricName;
use super::snapshot::MetricSnapshot;
use super::writer::{BulkValueWriter, ReportingUnits};
use crate::core::constants::{METRICS_INDEX_PREFIX, METRICS_TYPE};
use crate::utils::time::logstash_date;

/// Daily metrics index for the UTC date of `now`
pub fn index_name(now: DateTime<Utc>) -> String {
    format!("{}{}", METRICS_INDEX_PREFIX, logstash_date(now))
}

/// Newline-terminated bulk action line routing documents to `index`
pub fn bulk_action_line(index: &str) -> Vec<u8> {
    let mut line = json!({ "index": { "_index": index, "_type": METRICS_TYPE } })
        .to_string()
        .into_bytes();
    line.push(b'\n');
    line
}

/// One document line. Metric tags are written before global tags, so a
/// global tag shadows a metric tag of the same name for last-key-wins
/// parsers.
struct BulkDocument<'a, R> {
    timestamp: i64,
    name: &'a MetricName,
    global_tags: &'a BTreeMap<String, String>,
    reading: &'a R,
    units: &'a ReportingUnits,
}

impl<R: BulkValueWriter> Serialize for BulkDocument<'_, R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("@timestamp", &self.timestamp)?;
        map.serialize_entry("name", self.name.name())?;
        for (key, value) in self.name.tags() {
            map.serialize_entry(key, value)?;
        }
        for (key, value) in self.global_tags {
            map.serialize_entry(key, value)?;
        }
        self.reading.write_values(&mut map, self.units)?;
        map.end()
    }
}

/// Writes action/document line pairs to `W`
pub struct BulkWriter<'a, W> {
    out: W,
    action_line: Vec<u8>,
    timestamp: i64,
    global_tags: &'a BTreeMap<String, String>,
    units: ReportingUnits,
    documents: usize,
}

impl<'a, W: Write> BulkWriter<'a, W> {
    /// The action line for `index` is built here once and reused for every entry
    pub fn new(
        out: W,
        index: &str,
        timestamp: i64,
        global_tags: &'a BTreeMap<String, String>,
        units: ReportingUnits,
    ) -> Self {
        Self {
            out,
            action_line: bulk_action_line(index),
            timestamp,
            global_tags,
            units,
            documents: 0,
        }
    }

    /// Write and flush one entry
    pub fn write_entry<R: BulkValueWriter>(
        &mut self,
        name: &MetricName,
        reading: &R,
    ) -> io::Result<()> {
        self.out.write_all(&self.action_line)?;
        let document = BulkDocument {
            timestamp: self.timestamp,
            name,
            global_tags: self.global_tags,
            reading,
            units: &self.units,
        };
        serde_json::to_writer(&mut self.out, &document)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.documents += 1;
        Ok(())
    }

    /// Write every entry of `snapshot`, stopping at the first failure
    pub fn write_snapshot(&mut self, snapshot: &MetricSnapshot) -> io::Result<()> {
        for (name, reading) in snapshot.entries() {
            self.write_entry(name, &reading)?;
        }
        Ok(())
    }

    /// Documents written so far
    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl BulkWriter<'_, Vec<u8>> {
    /// Hand out what has been written since the last call
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::snapshot::{CounterReading, GaugeValue, TimerReading};
    use crate::utils::time::millis_to_datetime;
    use serde_json::Value;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn write(snapshot: &MetricSnapshot, global_tags: &BTreeMap<String, String>) -> String {
        let mut writer = BulkWriter::new(
            Vec::new(),
            "stagemonitor-metrics-2024.01.15",
            1000,
            global_tags,
            ReportingUnits::default(),
        );
        writer.write_snapshot(snapshot).unwrap();
        assert_eq!(writer.documents(), snapshot.len());
        String::from_utf8(writer.into_inner()).unwrap()
    }

    /// Writer that fails after accepting `remaining` bytes
    struct FailingWriter {
        remaining: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
            }
            let n = buf.len().min(self.remaining);
            self.remaining -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_index_name_uses_utc_date() {
        // 2024-01-15 00:30:00 UTC
        let now = millis_to_datetime(1_705_278_600_000);
        assert_eq!(index_name(now), "stagemonitor-metrics-2024.01.15");
    }

    #[test]
    fn test_action_line() {
        let line = bulk_action_line("stagemonitor-metrics-2024.01.15");
        assert_eq!(
            String::from_utf8(line).unwrap(),
            "{\"index\":{\"_index\":\"stagemonitor-metrics-2024.01.15\",\"_type\":\"metrics\"}}\n"
        );
    }

    #[test]
    fn test_one_line_pair_per_entry() {
        let mut snapshot = MetricSnapshot::default();
        snapshot.gauges.insert(MetricName::new("g1"), 1.0.into());
        snapshot.gauges.insert(MetricName::new("g2"), 2.0.into());
        snapshot
            .counters
            .insert(MetricName::new("c1"), CounterReading { count: 7 });

        let payload = write(&snapshot, &BTreeMap::new());
        let lines: Vec<&str> = payload.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(payload.ends_with('\n'));

        for pair in lines.chunks(2) {
            let action: Value = serde_json::from_str(pair[0]).unwrap();
            assert_eq!(action["index"]["_type"], "metrics");
            let document: Value = serde_json::from_str(pair[1]).unwrap();
            assert_eq!(document["@timestamp"], 1000);
        }
    }

    #[test]
    fn test_document_shape() {
        let mut snapshot = MetricSnapshot::default();
        snapshot.gauges.insert(
            MetricName::new("jvm.mem").tag("instance", "a"),
            GaugeValue::Number(512.0),
        );

        let payload = write(&snapshot, &tags(&[("env", "prod")]));
        let document: Value = serde_json::from_str(payload.lines().nth(1).unwrap()).unwrap();

        assert_eq!(document["@timestamp"], 1000);
        assert_eq!(document["name"], "jvm.mem");
        assert_eq!(document["instance"], "a");
        assert_eq!(document["env"], "prod");
        assert_eq!(document["value"], 512.0);
    }

    #[test]
    fn test_field_order_metric_tags_then_global_tags_then_values() {
        let mut snapshot = MetricSnapshot::default();
        snapshot
            .counters
            .insert(MetricName::new("requests").tag("path", "/"), CounterReading { count: 1 });

        let payload = write(&snapshot, &tags(&[("env", "prod")]));
        let document = payload.lines().nth(1).unwrap();
        assert_eq!(
            document,
            r#"{"@timestamp":1000,"name":"requests","path":"/","env":"prod","count":1}"#
        );
    }

    #[test]
    fn test_global_tag_shadows_metric_tag() {
        let mut snapshot = MetricSnapshot::default();
        snapshot.gauges.insert(
            MetricName::new("jvm.mem").tag("instance", "from-metric"),
            1.0.into(),
        );

        let payload = write(&snapshot, &tags(&[("instance", "from-global")]));
        let raw = payload.lines().nth(1).unwrap();

        // Both keys are on the wire, the global one last
        assert_eq!(raw.matches("\"instance\"").count(), 2);
        let document: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(document["instance"], "from-global");
    }

    #[test]
    fn test_timer_document_has_converted_fields() {
        let mut snapshot = MetricSnapshot::default();
        let mut timer = TimerReading::default();
        timer.durations.count = 3;
        timer.durations.max = 5_000_000.0;
        snapshot.timers.insert(MetricName::new("t"), timer);

        let payload = write(&snapshot, &BTreeMap::new());
        let document: Value = serde_json::from_str(payload.lines().nth(1).unwrap()).unwrap();
        assert_eq!(document["count"], 3);
        assert_eq!(document["max"], 5.0);
    }

    #[test]
    fn test_empty_snapshot_writes_nothing() {
        assert_eq!(write(&MetricSnapshot::default(), &BTreeMap::new()), "");
    }

    #[test]
    fn test_write_failure_stops_at_entry() {
        let mut snapshot = MetricSnapshot::default();
        snapshot.gauges.insert(MetricName::new("g1"), 1.0.into());
        snapshot.gauges.insert(MetricName::new("g2"), 2.0.into());

        let global_tags = BTreeMap::new();
        let mut writer = BulkWriter::new(
            FailingWriter { remaining: 10 },
            "idx",
            0,
            &global_tags,
            ReportingUnits::default(),
        );
        let err = writer.write_snapshot(&snapshot).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(writer.documents(), 0);
    }

    #[test]
    fn test_take_output_drains_buffer() {
        let global_tags = BTreeMap::new();
        let mut writer =
            BulkWriter::new(Vec::new(), "idx", 0, &global_tags, ReportingUnits::default());
        writer
            .write_entry(&MetricName::new("g"), &GaugeValue::Boolean(true))
            .unwrap();
        let first = writer.take_output();
        assert_eq!(first.iter().filter(|b| **b == b'\n').count(), 2);
        assert!(writer.take_output().is_empty());
    }
}
