//! Capability traits implemented by telemetry adapters

use crate::types::DeviceDescriptor;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Source of live device telemetry
#[async_trait]
pub trait DeviceTelemetry: Send + Sync {
    /// Query the visible devices, in enumeration order
    async fn query_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Short name for logs
    fn backend_name(&self) -> &str;
}

#[async_trait]
impl<T: DeviceTelemetry + ?Sized> DeviceTelemetry for Arc<T> {
    async fn query_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        (**self).query_devices().await
    }

    fn backend_name(&self) -> &str {
        (**self).backend_name()
    }
}

/// Telemetry that always returns the same device list
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceTelemetry {
    devices: Vec<DeviceDescriptor>,
    failure: Option<String>,
}

impl StaticDeviceTelemetry {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            devices,
            failure: None,
        }
    }

    /// Telemetry whose every query fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            devices: Vec::new(),
            failure: Some(message.into()),
        }
    }
}

#[async_trait]
impl DeviceTelemetry for StaticDeviceTelemetry {
    async fn query_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        match &self.failure {
            Some(message) => Err(Error::telemetry(message.clone())),
            None => Ok(self.devices.clone()),
        }
    }

    fn backend_name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_telemetry() {
        let telemetry = StaticDeviceTelemetry::new(vec![DeviceDescriptor::new(0, "A100")]);
        let devices = telemetry.query_devices().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "A100");
    }

    #[tokio::test]
    async fn test_failing_telemetry() {
        let telemetry = StaticDeviceTelemetry::failing("driver not loaded");
        let err = telemetry.query_devices().await.unwrap_err();
        assert!(matches!(err, Error::Telemetry(_)));
    }

    #[tokio::test]
    async fn test_arc_dyn_forwarding() {
        let telemetry: Arc<dyn DeviceTelemetry> = Arc::new(StaticDeviceTelemetry::default());
        assert!(telemetry.query_devices().await.unwrap().is_empty());
        assert_eq!(telemetry.backend_name(), "static");
    }
}
