//! Mock GPU source for testing

use crate::{Result, TelemetryError};

use async_trait::async_trait;
use std::time::Duration;
use topo_core::{DeviceDescriptor, DeviceTelemetry};
use tracing::{debug, info};

/// Deterministic synthetic fleet
#[derive(Debug, Clone)]
pub struct MockGpuSource {
    devices: Vec<DeviceDescriptor>,
    visible_devices: Option<Vec<u32>>,
    failure: Option<String>,
    latency: Option<Duration>,
}

impl MockGpuSource {
    /// Create a fleet of `count` devices
    pub fn new(count: u32) -> Self {
        info!("Creating mock GPU source with {} devices", count);
        Self {
            devices: (0..count).map(create_mock_device).collect(),
            visible_devices: None,
            failure: None,
            latency: None,
        }
    }

    pub fn with_visible_devices(mut self, visible: Option<Vec<u32>>) -> Self {
        self.visible_devices = visible;
        self
    }

    /// Make every query fail with `message`
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Delay every query by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn select(&self) -> Result<Vec<DeviceDescriptor>> {
        let Some(visible) = &self.visible_devices else {
            return Ok(self.devices.clone());
        };

        visible
            .iter()
            .map(|&index| {
                self.devices
                    .get(index as usize)
                    .cloned()
                    .ok_or_else(|| TelemetryError::GpuNotFound(format!("GPU {}", index)))
            })
            .collect()
    }
}

#[async_trait]
impl DeviceTelemetry for MockGpuSource {
    async fn query_devices(&self) -> topo_core::Result<Vec<DeviceDescriptor>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = &self.failure {
            return Err(TelemetryError::DriverError(message.clone()).into());
        }

        let devices = self.select()?;
        debug!("Mock source returned {} devices", devices.len());
        Ok(devices)
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

fn create_mock_device(index: u32) -> DeviceDescriptor {
    let (name, total_mb) = match index % 3 {
        0 => ("NVIDIA A100-SXM4-40GB", 40960),
        1 => ("NVIDIA A100-SXM4-80GB", 81920),
        _ => ("NVIDIA H100 80GB HBM3", 81559),
    };

    DeviceDescriptor::new(index, name)
        .with_memory(2048 + u64::from(index) * 512, total_mb)
        .with_utilization(45 + (index * 10) % 55)
        .with_temperature(55 + (index % 6) as i32 * 3)
}
