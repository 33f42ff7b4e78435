//! # topo-adapter-gpu
//!
//! GPU telemetry sources feeding topology reports.
//!
//! This crate provides:
//! - An NVML backend reading name, memory, utilization and temperature
//! - A mock backend with a deterministic synthetic fleet
//! - `CUDA_VISIBLE_DEVICES` style device visibility filtering
//!
//! ## Example
//!
//! ```rust,no_run
//! use topo_adapter_gpu::{create_source, GpuBackend, TelemetryConfig};
//! use topo_core::DeviceTelemetry;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TelemetryConfig::new(GpuBackend::Nvml).with_visible_devices(vec![0, 1]);
//! let source = create_source(&config)?;
//! let devices = source.query_devices().await?;
//! println!("Found {} GPUs", devices.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use thiserror::Error;
use topo_core::DeviceTelemetry;
use tracing::info;

pub mod config;
pub mod visibility;

#[cfg(feature = "nvml")]
pub mod nvml;

// Mock implementation for testing
#[cfg(any(feature = "mock", test))]
pub mod mock;

pub use config::{GpuBackend, TelemetryConfig};
pub use visibility::{parse_visible_devices, resolve_visible_devices, CUDA_VISIBLE_DEVICES};

#[cfg(feature = "nvml")]
pub use nvml::NvmlSource;

#[cfg(any(feature = "mock", test))]
pub use mock::MockGpuSource;

/// Result type for GPU operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors that can occur while querying GPUs
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("GPU backend not supported: {0}")]
    UnsupportedBackend(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("GPU not found: {0}")]
    GpuNotFound(String),

    #[error("GPU initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Driver error: {0}")]
    DriverError(String),

    #[error("NVML error: {0}")]
    NvmlError(String),

    #[error("Telemetry task failed: {0}")]
    TaskFailed(String),
}

impl TelemetryError {
    /// Check if this error indicates a driver issue
    pub fn is_driver_issue(&self) -> bool {
        matches!(
            self,
            TelemetryError::DriverError(_)
                | TelemetryError::NvmlError(_)
                | TelemetryError::InitializationFailed(_)
        )
    }
}

impl From<TelemetryError> for topo_core::Error {
    fn from(err: TelemetryError) -> Self {
        topo_core::Error::telemetry(err.to_string())
    }
}

/// Build the telemetry source selected by `config`
pub fn create_source(config: &TelemetryConfig) -> Result<Arc<dyn DeviceTelemetry>> {
    config.validate().map_err(TelemetryError::Configuration)?;
    let visible = resolve_visible_devices(config.visible_devices.clone());
    info!("Creating {} telemetry source (visible devices: {:?})", config.backend, visible);

    match config.backend {
        GpuBackend::Nvml => {
            #[cfg(feature = "nvml")]
            {
                Ok(Arc::new(NvmlSource::new(visible)))
            }
            #[cfg(not(feature = "nvml"))]
            {
                Err(TelemetryError::UnsupportedBackend(
                    "nvml (built without the `nvml` feature)".to_string(),
                ))
            }
        }
        GpuBackend::Mock => {
            #[cfg(any(feature = "mock", test))]
            {
                Ok(Arc::new(
                    MockGpuSource::new(config.mock_device_count).with_visible_devices(visible),
                ))
            }
            #[cfg(not(any(feature = "mock", test)))]
            {
                Err(TelemetryError::UnsupportedBackend(
                    "mock (built without the `mock` feature)".to_string(),
                ))
            }
        }
    }
}
