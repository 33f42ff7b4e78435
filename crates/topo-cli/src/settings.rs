//! Tool settings for the topo CLI
//!
//! Settings are layered with the `config` crate, lowest precedence first:
//! 1. Built-in defaults
//! 2. The YAML file passed with `--settings`
//! 3. `TOPO_` environment variables, `__` between nested keys
//!    (`TOPO_SERVER__PORT=8080`, `TOPO_TELEMETRY__VISIBLE_DEVICES=0,1`)
//!
//! Command-line flags are applied on top by the caller.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use topo_adapter_gpu::{GpuBackend, TelemetryConfig};
use topo_core::{DegeneratePolicy, GeneratorConfig};
use topo_web::ServerConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TOPO";

/// Effective settings of one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Size of the device fleet to partition
    pub total_gpus: u32,

    /// Reject configurations whose pipe * model product exceeds the fleet
    pub strict: bool,

    /// JSON document written by `write` and `watch`
    pub output_file: PathBuf,

    /// Interval between `watch` cycles
    pub poll_interval_secs: u64,

    /// Default log level
    pub log_level: String,

    pub telemetry: TelemetrySettings,

    pub server: ServerSettings,
}

/// Telemetry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub backend: GpuBackend,

    /// Fleet size of the mock backend
    pub mock_device_count: u32,

    /// Allow-list of device indices; unset defers to `CUDA_VISIBLE_DEVICES`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_devices: Option<Vec<u32>>,

    /// Bound on one telemetry query
    pub query_timeout_secs: u64,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,

    /// Page auto-refresh in seconds, 0 disables it
    pub refresh_secs: u32,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            total_gpus: 96,
            strict: false,
            output_file: PathBuf::from("gpu_topology.json"),
            poll_interval_secs: 5,
            log_level: "info".to_string(),
            telemetry: TelemetrySettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            backend: GpuBackend::Nvml,
            mock_device_count: 8,
            visible_devices: None,
            query_timeout_secs: 10,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            refresh_secs: 5,
        }
    }
}

impl ToolSettings {
    /// Load settings from defaults, an optional file and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Self::environment())
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("telemetry.visible_devices")
            .try_parsing(true)
    }

    fn load_with_env(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default()).context("Failed to encode default settings")?);

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        let settings: Self = builder
            .add_source(env)
            .build()
            .and_then(|c| c.try_deserialize())
            .with_context(|| match path {
                Some(path) => format!("Failed to load settings from {}", path.display()),
                None => "Failed to load settings".to_string(),
            })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings no command can run with
    pub fn validate(&self) -> Result<()> {
        if self.total_gpus == 0 {
            bail!("total_gpus must be greater than zero");
        }
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be greater than zero");
        }
        if self.telemetry.query_timeout_secs == 0 {
            bail!("telemetry.query_timeout_secs must be greater than zero");
        }
        self.telemetry_config()
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid telemetry settings: {}", e))?;
        if self.server.host.trim().is_empty() {
            bail!("server.host must not be empty");
        }
        Ok(())
    }

    pub fn policy(&self) -> DegeneratePolicy {
        DegeneratePolicy::from_strict(self.strict)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.telemetry.query_timeout_secs)
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        let config = TelemetryConfig::new(self.telemetry.backend)
            .with_mock_device_count(self.telemetry.mock_device_count);
        match &self.telemetry.visible_devices {
            Some(indices) => config.with_visible_devices(indices.clone()),
            None => config,
        }
    }

    pub fn generator_config(&self, config_path: impl Into<PathBuf>) -> GeneratorConfig {
        GeneratorConfig::new(config_path, self.total_gpus)
            .with_policy(self.policy())
            .with_query_timeout(self.query_timeout())
    }

    /// Host names are resolved when the server binds
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.server.host.trim(), self.server.port).with_refresh(self.server.refresh_secs)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
