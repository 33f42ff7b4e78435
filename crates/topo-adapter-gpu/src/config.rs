//! Telemetry source configuration

use serde::{Deserialize, Serialize};

/// GPU telemetry backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuBackend {
    /// NVIDIA Management Library
    Nvml,
    /// Synthetic fleet for testing and demos
    Mock,
}

/// Telemetry source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Backend to query
    pub backend: GpuBackend,

    /// Explicit allow-list of device indices; falls back to `CUDA_VISIBLE_DEVICES`
    pub visible_devices: Option<Vec<u32>>,

    /// Fleet size reported by the mock backend
    pub mock_device_count: u32,
}

impl TelemetryConfig {
    pub fn new(backend: GpuBackend) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Restrict the query to these device indices
    pub fn with_visible_devices(mut self, indices: Vec<u32>) -> Self {
        self.visible_devices = Some(indices);
        self
    }

    /// Set the mock fleet size
    pub fn with_mock_device_count(mut self, count: u32) -> Self {
        self.mock_device_count = count;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.backend == GpuBackend::Mock && self.mock_device_count == 0 {
            return Err("Mock device count must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            backend: GpuBackend::Nvml,
            visible_devices: None,
            mock_device_count: 8,
        }
    }
}

impl std::fmt::Display for GpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuBackend::Nvml => write!(f, "nvml"),
            GpuBackend::Mock => write!(f, "mock"),
        }
    }
}

impl std::str::FromStr for GpuBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nvml" => Ok(GpuBackend::Nvml),
            "mock" => Ok(GpuBackend::Mock),
            _ => Err(format!("Unknown GPU backend: {}", s)),
        }
    }
}
