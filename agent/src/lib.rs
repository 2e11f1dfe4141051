//! Core of an embedded monitoring agent.
//!
//! Two halves:
//! - [`configuration`]: typed options resolved from an ordered list of
//!   sources, with atomic reloads of dynamic options
//! - [`metrics`]: periodic export of metric snapshots to an Elasticsearch
//!   bulk endpoint, or to a log in log-only mode
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use monitor_core::configuration::{Configuration, ConfigurationSource, EnvironmentSource};
//! use monitor_core::core::constants::{
//!     DEFAULT_HEALTH_CHECK_INTERVAL_SECS, DEFAULT_RELOAD_INTERVAL_SECS,
//! };
//! use monitor_core::metrics::{CoreOptions, ElasticsearchReporter, MetricRegistry, StoreHealth};
//!
//! # async fn run(registry: Arc<dyn MetricRegistry>) -> Result<(), Box<dyn std::error::Error>> {
//! monitor_core::init_logging();
//!
//! let sources: Vec<Arc<dyn ConfigurationSource>> = vec![Arc::new(EnvironmentSource::new())];
//! let config = Arc::new(Configuration::new(sources));
//! let options = Arc::new(CoreOptions::register(&config)?);
//! let interval = options.reporting_interval();
//!
//! let client = reqwest::Client::new();
//! let health = Arc::new(StoreHealth::new());
//! let reporter = ElasticsearchReporter::builder(registry, options.clone(), health.clone())
//!     .client(client.clone())
//!     .build()?;
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let reload = Arc::clone(&config).start_reload_task(
//!     Duration::from_secs(DEFAULT_RELOAD_INTERVAL_SECS),
//!     shutdown_rx.clone(),
//! );
//! // Checks the store right away; until it answers, network reports are dropped
//! let health_check = health.start_check_task(
//!     client,
//!     options,
//!     Duration::from_secs(DEFAULT_HEALTH_CHECK_INTERVAL_SECS),
//!     shutdown_rx.clone(),
//! );
//! let reports = monitor_core::metrics::spawn_reporter(Arc::new(reporter), interval, shutdown_rx);
//!
//! shutdown_tx.send(true)?;
//! reload.await?;
//! health_check.await?;
//! reports.await?;
//! # Ok(())
//! # }
//! ```

pub mod configuration;
pub mod core;
pub mod metrics;
pub mod utils;

pub use crate::core::init_logging;
