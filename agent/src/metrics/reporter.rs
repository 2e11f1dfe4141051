//! Elasticsearch metrics reporter
//!
//! One call to [`ElasticsearchReporter::run_cycle`] exports one snapshot:
//!
//! 1. skip everything when monitoring is inactive
//! 2. capture the timestamp once and take a snapshot
//! 3. stream the bulk payload to `{url}/{index}/metrics/_bulk`, or into the
//!    metrics log when log-only mode is on
//! 4. record the cycle's own duration as `reporting_time{reporter=elasticsearch}`
//!
//! The network body is produced lazily: entries are serialized as the HTTP
//! client pulls chunks, so the payload is never held in memory as a whole.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::Stream;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;

use super::bulk::{BulkWriter, index_name};
use super::error::ReportError;
use super::health::AvailabilityGate;
use super::name::MetricName;
use super::settings::ReporterSettings;
use super::snapshot::{MetricRegistry, MetricSnapshot};
use super::writer::ReportingUnits;
use crate::core::constants::{
    METRICS_LOG_TARGET, METRICS_TYPE, REPORTER_NAME, REPORTING_TIME_METRIC,
};
use crate::utils::time::{Clock, SystemClock};

/// Destination of log-only payloads
pub trait MetricsLog: Send + Sync {
    fn log_report(&self, payload: &str);
}

/// Emits payloads on the `ElasticsearchMetrics` tracing target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetricsLog;

impl MetricsLog for TracingMetricsLog {
    fn log_report(&self, payload: &str) {
        tracing::info!(target: METRICS_LOG_TARGET, "{}", payload);
    }
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Monitoring is switched off
    Inactive,
    /// The store was not reachable; the snapshot was dropped
    StoreUnavailable,
    /// The snapshot had no entries, so no bulk request was sent
    NothingToReport,
    /// The payload was posted; `status` is the store's answer
    Sent { status: StatusCode },
    /// Log-only mode wrote `documents` documents to the metrics log
    Logged { documents: usize },
    /// Log-only mode could not render the payload
    LogFailed,
}

pub struct ElasticsearchReporter {
    registry: Arc<dyn MetricRegistry>,
    settings: Arc<dyn ReporterSettings>,
    gate: Arc<dyn AvailabilityGate>,
    client: reqwest::Client,
    clock: Arc<dyn Clock>,
    metrics_log: Arc<dyn MetricsLog>,
    units: ReportingUnits,
    timer_name: MetricName,
}

impl std::fmt::Debug for ElasticsearchReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchReporter")
            .field("units", &self.units)
            .field("timer_name", &self.timer_name)
            .finish_non_exhaustive()
    }
}

impl ElasticsearchReporter {
    pub fn builder(
        registry: Arc<dyn MetricRegistry>,
        settings: Arc<dyn ReporterSettings>,
        gate: Arc<dyn AvailabilityGate>,
    ) -> ElasticsearchReporterBuilder {
        ElasticsearchReporterBuilder {
            registry,
            settings,
            gate,
            client: None,
            clock: Arc::new(SystemClock),
            metrics_log: Arc::new(TracingMetricsLog),
            units: ReportingUnits::default(),
        }
    }

    /// Run one reporting cycle.
    ///
    /// Errors are only returned for the network path; log-only failures are
    /// logged and reported as [`CycleOutcome::LogFailed`].
    pub async fn run_cycle(&self) -> Result<CycleOutcome, ReportError> {
        if !self.settings.is_active() {
            return Ok(CycleOutcome::Inactive);
        }

        let timestamp = self.clock.now().timestamp_millis();
        let snapshot = self.registry.snapshot();
        let started = Instant::now();

        let outcome = if self.settings.only_log_reports() {
            self.log_snapshot(&snapshot, timestamp)
        } else if !self.gate.is_available() {
            tracing::debug!(
                entries = snapshot.len(),
                "Metrics store unavailable, skipping report"
            );
            return Ok(CycleOutcome::StoreUnavailable);
        } else if snapshot.is_empty() {
            // The bulk endpoint rejects an empty body
            CycleOutcome::NothingToReport
        } else {
            self.send_snapshot(snapshot, timestamp).await?
        };

        self.registry
            .record_timing(&self.timer_name, started.elapsed());
        Ok(outcome)
    }

    async fn send_snapshot(
        &self,
        snapshot: MetricSnapshot,
        timestamp: i64,
    ) -> Result<CycleOutcome, ReportError> {
        let index = index_name(self.clock.now());
        let url = format!(
            "{}/{}/{}/_bulk",
            self.settings.store_url(),
            index,
            METRICS_TYPE
        );
        let body = bulk_body(
            Arc::new(snapshot),
            index,
            timestamp,
            self.settings.global_tags(),
            self.units,
        );

        let resp = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .map_err(ReportError::from_send)?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = %status, url = %url, "Metrics store rejected bulk request");
        }
        Ok(CycleOutcome::Sent { status })
    }

    fn log_snapshot(&self, snapshot: &MetricSnapshot, timestamp: i64) -> CycleOutcome {
        let index = index_name(self.clock.now());
        let global_tags = self.settings.global_tags();
        let mut writer = BulkWriter::new(Vec::new(), &index, timestamp, &global_tags, self.units);

        if let Err(e) = writer.write_snapshot(snapshot) {
            tracing::warn!(
                error = %e,
                written = writer.documents(),
                "Failed to render metric report for logging"
            );
            return CycleOutcome::LogFailed;
        }

        let documents = writer.documents();
        let payload = writer.into_inner();
        self.metrics_log
            .log_report(&String::from_utf8_lossy(&payload));
        CycleOutcome::Logged { documents }
    }
}

/// Lazily serialized bulk payload, one chunk per entry
fn bulk_body(
    snapshot: Arc<MetricSnapshot>,
    index: String,
    timestamp: i64,
    global_tags: BTreeMap<String, String>,
    units: ReportingUnits,
) -> impl Stream<Item = io::Result<Vec<u8>>> + Send + 'static {
    async_stream::try_stream! {
        let mut writer = BulkWriter::new(Vec::new(), &index, timestamp, &global_tags, units);
        for (name, reading) in snapshot.entries() {
            writer.write_entry(name, &reading)?;
            yield writer.take_output();
        }
    }
}

pub struct ElasticsearchReporterBuilder {
    registry: Arc<dyn MetricRegistry>,
    settings: Arc<dyn ReporterSettings>,
    gate: Arc<dyn AvailabilityGate>,
    client: Option<reqwest::Client>,
    clock: Arc<dyn Clock>,
    metrics_log: Arc<dyn MetricsLog>,
    units: ReportingUnits,
}

impl ElasticsearchReporterBuilder {
    /// Share an existing HTTP client; its timeouts apply to bulk requests
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics_log(mut self, metrics_log: Arc<dyn MetricsLog>) -> Self {
        self.metrics_log = metrics_log;
        self
    }

    pub fn units(mut self, units: ReportingUnits) -> Self {
        self.units = units;
        self
    }

    pub fn build(self) -> Result<ElasticsearchReporter, ReportError> {
        let client = match self.client {
            Some(client) => client,
            None => reqwest::Client::builder().build()?,
        };
        Ok(ElasticsearchReporter {
            registry: self.registry,
            settings: self.settings,
            gate: self.gate,
            client,
            clock: self.clock,
            metrics_log: self.metrics_log,
            units: self.units,
            timer_name: MetricName::new(REPORTING_TIME_METRIC).tag("reporter", REPORTER_NAME),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::health::StoreHealth;
    use crate::metrics::snapshot::{CounterReading, GaugeValue, TimerReading};
    use crate::utils::time::millis_to_datetime;
    use chrono::{DateTime, Utc};
    use futures::TryStreamExt;
    use httpmock::prelude::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // 2024-01-15 00:30:00 UTC
    const NOW_MILLIS: i64 = 1_705_278_600_000;
    const BULK_PATH: &str = "/stagemonitor-metrics-2024.01.15/metrics/_bulk";

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct FakeRegistry {
        snapshot: MetricSnapshot,
        snapshots_taken: AtomicUsize,
        timings: Mutex<Vec<(MetricName, Duration)>>,
    }

    impl MetricRegistry for FakeRegistry {
        fn snapshot(&self) -> MetricSnapshot {
            self.snapshots_taken.fetch_add(1, Ordering::SeqCst);
            self.snapshot.clone()
        }

        fn record_timing(&self, name: &MetricName, elapsed: Duration) {
            self.timings.lock().push((name.clone(), elapsed));
        }
    }

    struct StaticSettings {
        active: bool,
        only_log: bool,
        url: String,
    }

    impl ReporterSettings for StaticSettings {
        fn is_active(&self) -> bool {
            self.active
        }

        fn only_log_reports(&self) -> bool {
            self.only_log
        }

        fn store_url(&self) -> String {
            self.url.clone()
        }

        fn global_tags(&self) -> BTreeMap<String, String> {
            BTreeMap::from([("application".to_string(), "shop".to_string())])
        }
    }

    #[derive(Default)]
    struct RecordingLog {
        payloads: Mutex<Vec<String>>,
    }

    impl MetricsLog for RecordingLog {
        fn log_report(&self, payload: &str) {
            self.payloads.lock().push(payload.to_string());
        }
    }

    fn sample_snapshot() -> MetricSnapshot {
        let mut snapshot = MetricSnapshot::default();
        snapshot.gauges.insert(
            MetricName::new("jvm.mem").tag("instance", "a"),
            GaugeValue::Number(512.0),
        );
        snapshot
            .counters
            .insert(MetricName::new("requests"), CounterReading { count: 3 });
        snapshot
            .timers
            .insert(MetricName::new("response_time"), TimerReading::default());
        snapshot
    }

    struct Fixture {
        registry: Arc<FakeRegistry>,
        health: Arc<StoreHealth>,
        log: Arc<RecordingLog>,
        reporter: ElasticsearchReporter,
    }

    fn fixture(active: bool, only_log: bool, url: &str, available: bool) -> Fixture {
        let registry = Arc::new(FakeRegistry {
            snapshot: sample_snapshot(),
            ..Default::default()
        });
        let health = Arc::new(StoreHealth::new());
        health.set_available(available);
        let log = Arc::new(RecordingLog::default());
        let settings = Arc::new(StaticSettings {
            active,
            only_log,
            url: url.to_string(),
        });

        let reporter = ElasticsearchReporter::builder(registry.clone(), settings, health.clone())
            .clock(Arc::new(FixedClock(millis_to_datetime(NOW_MILLIS))))
            .metrics_log(log.clone())
            .build()
            .unwrap();

        Fixture {
            registry,
            health,
            log,
            reporter,
        }
    }

    fn line_count(payload: &str) -> usize {
        payload.lines().count()
    }

    #[tokio::test]
    async fn test_inactive_takes_no_snapshot() {
        let f = fixture(false, false, "http://127.0.0.1:9", true);

        let outcome = f.reporter.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Inactive);
        assert_eq!(f.registry.snapshots_taken.load(Ordering::SeqCst), 0);
        assert!(f.registry.timings.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_is_not_contacted() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path(BULK_PATH);
                then.status(200);
            })
            .await;
        let f = fixture(true, false, &server.url(""), false);

        let outcome = f.reporter.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::StoreUnavailable);
        assert!(f.registry.timings.lock().is_empty());
        assert!(f.log.payloads.lock().is_empty());

        // Once the store is back, exactly one request reaches it: the
        // unavailable cycle sent nothing
        f.health.set_available(true);
        let outcome = f.reporter.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Sent {
                status: StatusCode::OK
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_snapshot_sends_no_request() {
        // No mock is registered: a request would come back as 404
        let server = MockServer::start_async().await;
        let registry = Arc::new(FakeRegistry::default());
        let settings = Arc::new(StaticSettings {
            active: true,
            only_log: false,
            url: server.url(""),
        });
        let health = Arc::new(StoreHealth::new());
        health.set_available(true);
        let reporter = ElasticsearchReporter::builder(registry.clone(), settings, health)
            .build()
            .unwrap();

        let outcome = reporter.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::NothingToReport);
        assert_eq!(registry.timings.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_network_cycle_posts_bulk_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(BULK_PATH)
                    .header("content-type", "application/json");
                then.status(200).body(r#"{"errors":false}"#);
            })
            .await;

        let url = server.url("");
        let f = fixture(true, false, &url, true);

        let outcome = f.reporter.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Sent {
                status: StatusCode::OK
            }
        );
        mock.assert_async().await;

        let timings = f.registry.timings.lock();
        assert_eq!(timings.len(), 1);
        assert_eq!(timings[0].0.to_string(), "reporting_time{reporter=elasticsearch}");
    }

    #[tokio::test]
    async fn test_error_status_is_not_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(BULK_PATH);
                then.status(503);
            })
            .await;

        let f = fixture(true, false, &server.url(""), true);

        let outcome = f.reporter.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Sent {
                status: StatusCode::SERVICE_UNAVAILABLE
            }
        );
        assert_eq!(f.registry.timings.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let f = fixture(true, false, "http://127.0.0.1:9", true);

        let err = f.reporter.run_cycle().await.unwrap_err();
        assert!(matches!(err, ReportError::Transport(_)));
        assert!(f.registry.timings.lock().is_empty());
    }

    #[tokio::test]
    async fn test_log_only_writes_one_log_line() {
        let f = fixture(true, true, "", false);

        let outcome = f.reporter.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Logged { documents: 3 });

        let payloads = f.log.payloads.lock();
        assert_eq!(payloads.len(), 1);
        assert_eq!(line_count(&payloads[0]), 6);
        assert!(payloads[0].contains("\"@timestamp\":1705278600000"));
        assert!(payloads[0].contains("stagemonitor-metrics-2024.01.15"));
        assert!(payloads[0].contains("\"application\":\"shop\""));
        assert_eq!(f.registry.timings.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_log_only_matches_network_payload() {
        let f = fixture(true, true, "", false);
        f.reporter.run_cycle().await.unwrap();
        let logged = f.log.payloads.lock()[0].clone();

        let streamed: Vec<u8> = bulk_body(
            Arc::new(sample_snapshot()),
            "stagemonitor-metrics-2024.01.15".to_string(),
            NOW_MILLIS,
            StaticSettings {
                active: true,
                only_log: false,
                url: String::new(),
            }
            .global_tags(),
            ReportingUnits::default(),
        )
        .try_concat()
        .await
        .unwrap();

        let streamed = String::from_utf8(streamed).unwrap();
        assert_eq!(line_count(&streamed), line_count(&logged));
        assert_eq!(streamed, logged);
    }

    #[tokio::test]
    async fn test_body_yields_one_chunk_per_entry() {
        let chunks: Vec<Vec<u8>> = bulk_body(
            Arc::new(sample_snapshot()),
            "idx".to_string(),
            0,
            BTreeMap::new(),
            ReportingUnits::default(),
        )
        .try_collect()
        .await
        .unwrap();

        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert_eq!(chunk.iter().filter(|b| **b == b'\n').count(), 2);
        }
    }

    #[tokio::test]
    async fn test_empty_snapshot_logs_empty_payload() {
        let registry = Arc::new(FakeRegistry::default());
        let log = Arc::new(RecordingLog::default());
        let settings = Arc::new(StaticSettings {
            active: true,
            only_log: true,
            url: String::new(),
        });
        let reporter =
            ElasticsearchReporter::builder(registry, settings, Arc::new(StoreHealth::new()))
                .metrics_log(log.clone())
                .build()
                .unwrap();

        let outcome = reporter.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Logged { documents: 0 });
        assert_eq!(log.payloads.lock()[0], "");
    }
}
