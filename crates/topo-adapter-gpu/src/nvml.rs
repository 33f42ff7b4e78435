//! NVML (NVIDIA Management Library) backend

use crate::{Result, TelemetryError};

use async_trait::async_trait;
use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::error::NvmlError;
use nvml_wrapper::Nvml;
use topo_core::{DeviceDescriptor, DeviceTelemetry};
use tracing::{debug, info};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Reads live device state through NVML
///
/// NVML is initialized for each query and shut down when the handle drops,
/// so a driver reload between cycles is picked up.
#[derive(Debug, Clone, Default)]
pub struct NvmlSource {
    visible_devices: Option<Vec<u32>>,
}

impl NvmlSource {
    /// Create a source; `None` queries every device NVML reports
    pub fn new(visible_devices: Option<Vec<u32>>) -> Self {
        info!("Creating NVML telemetry source");
        Self { visible_devices }
    }

    pub fn visible_devices(&self) -> Option<&[u32]> {
        self.visible_devices.as_deref()
    }

    fn query_blocking(visible: Option<Vec<u32>>) -> Result<Vec<DeviceDescriptor>> {
        let nvml = Nvml::init()?;

        let indices = match visible {
            Some(indices) => indices,
            None => (0..nvml.device_count()?).collect(),
        };

        let mut devices = Vec::with_capacity(indices.len());
        for index in indices {
            let device = nvml.device_by_index(index).map_err(|e| match e {
                NvmlError::InvalidArg | NvmlError::NotFound => {
                    TelemetryError::GpuNotFound(format!("GPU {}", index))
                }
                other => other.into(),
            })?;

            let memory = device.memory_info()?;
            let utilization = device.utilization_rates()?;
            let temperature = device.temperature(TemperatureSensor::Gpu)?;

            devices.push(
                DeviceDescriptor::new(index, device.name()?)
                    .with_memory(memory.used / BYTES_PER_MB, memory.total / BYTES_PER_MB)
                    .with_utilization(utilization.gpu)
                    .with_temperature(i32::try_from(temperature).unwrap_or(i32::MAX)),
            );
        }

        debug!("NVML reported {} devices", devices.len());
        Ok(devices)
    }
}

#[async_trait]
impl DeviceTelemetry for NvmlSource {
    async fn query_devices(&self) -> topo_core::Result<Vec<DeviceDescriptor>> {
        let visible = self.visible_devices.clone();
        let devices = tokio::task::spawn_blocking(move || Self::query_blocking(visible))
            .await
            .map_err(|e| TelemetryError::TaskFailed(e.to_string()))??;
        Ok(devices)
    }

    fn backend_name(&self) -> &str {
        "nvml"
    }
}

impl From<NvmlError> for TelemetryError {
    fn from(err: NvmlError) -> Self {
        match err {
            NvmlError::DriverNotLoaded => TelemetryError::DriverError(err.to_string()),
            NvmlError::LibraryNotFound | NvmlError::LibloadingError(_) => {
                TelemetryError::InitializationFailed(err.to_string())
            }
            other => TelemetryError::NvmlError(other.to_string()),
        }
    }
}
