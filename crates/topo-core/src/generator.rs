//! One generation cycle: load, query, extract, build
//!
//! A [`ReportGenerator`] is shared between the web server and the polling
//! loop. Its guard keeps at most one cycle in flight, so two writers never
//! interleave on the same output file.

use crate::config::RawConfig;
use crate::report::TopologyReport;
use crate::settings::SettingsExtractor;
use crate::topology::Topology;
use crate::traits::DeviceTelemetry;
use crate::types::{DegeneratePolicy, DeviceDescriptor};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Default bound on a single telemetry query
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Generator options
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Training configuration file
    pub config_path: PathBuf,

    /// Size of the device fleet to partition
    pub total_devices: u32,

    /// Degenerate-case policy
    pub policy: DegeneratePolicy,

    /// Bound on a single telemetry query
    pub query_timeout: Duration,
}

impl GeneratorConfig {
    pub fn new(config_path: impl Into<PathBuf>, total_devices: u32) -> Self {
        Self {
            config_path: config_path.into(),
            total_devices,
            policy: DegeneratePolicy::default(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}

/// Runs generation cycles against a telemetry source
pub struct ReportGenerator {
    config: GeneratorConfig,
    telemetry: Arc<dyn DeviceTelemetry>,
    cycle_guard: Mutex<()>,
}

impl ReportGenerator {
    pub fn new(config: GeneratorConfig, telemetry: Arc<dyn DeviceTelemetry>) -> Self {
        Self {
            config,
            telemetry,
            cycle_guard: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Run one full cycle
    pub async fn generate(&self) -> Result<TopologyReport> {
        let _guard = self.cycle_guard.lock().await;
        self.run_cycle().await
    }

    /// Run one full cycle and write its JSON document to `path`
    pub async fn generate_to_file(&self, path: impl AsRef<Path>) -> Result<TopologyReport> {
        let _guard = self.cycle_guard.lock().await;
        let report = self.run_cycle().await?;
        report.write_json_atomic(path)?;
        Ok(report)
    }

    async fn run_cycle(&self) -> Result<TopologyReport> {
        let raw = RawConfig::load(&self.config.config_path)?;
        let devices = self.query_devices().await?;

        let settings = SettingsExtractor::new(self.config.policy).extract(&raw, self.config.total_devices)?;
        let topology = Topology::build(&settings, &devices);

        info!(
            "Generated topology dp={} pp={} mp={} ({} cells, {} placeholders)",
            settings.data_parallel_size(),
            settings.pipe_parallel_size(),
            settings.model_parallel_size(),
            topology.cell_count(),
            topology.placeholder_count()
        );
        Ok(TopologyReport::new(settings, topology, raw))
    }

    async fn query_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let backend = self.telemetry.backend_name().to_string();
        let devices = tokio::time::timeout(self.config.query_timeout, self.telemetry.query_devices())
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "{} device query exceeded {:?}",
                    backend, self.config.query_timeout
                ))
            })??;

        debug!("{} backend reported {} devices", backend, devices.len());
        Ok(devices)
    }
}

impl std::fmt::Debug for ReportGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportGenerator")
            .field("config", &self.config)
            .field("backend", &self.telemetry.backend_name())
            .finish()
    }
}
