//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Live telemetry for one physical device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Driver-level device index
    pub index: u32,

    /// Device model name
    pub name: String,

    /// Memory in use, MiB
    #[serde(rename = "memory_used_MB")]
    pub memory_used_mb: u64,

    /// Total memory, MiB
    #[serde(rename = "memory_total_MB")]
    pub memory_total_mb: u64,

    /// Compute utilization, percent
    pub utilization_pct: u32,

    /// Core temperature, degrees Celsius
    #[serde(rename = "temperature_C")]
    pub temperature_c: i32,
}

impl DeviceDescriptor {
    /// Create a descriptor with no telemetry readings
    pub fn new(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            memory_used_mb: 0,
            memory_total_mb: 0,
            utilization_pct: 0,
            temperature_c: 0,
        }
    }

    /// Set memory readings
    pub fn with_memory(mut self, used_mb: u64, total_mb: u64) -> Self {
        self.memory_used_mb = used_mb;
        self.memory_total_mb = total_mb;
        self
    }

    /// Set utilization reading
    pub fn with_utilization(mut self, pct: u32) -> Self {
        self.utilization_pct = pct;
        self
    }

    /// Set temperature reading
    pub fn with_temperature(mut self, celsius: i32) -> Self {
        self.temperature_c = celsius;
        self
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GPU {} ({}) | Mem: {}MB/{}MB | Util: {}% | Temp: {}°C",
            self.index,
            self.name,
            self.memory_used_mb,
            self.memory_total_mb,
            self.utilization_pct,
            self.temperature_c
        )
    }
}

/// What to do when the device product exceeds the device count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Produce settings with a data-parallel size of 0 and an empty topology
    #[default]
    Allow,
    /// Fail with [`crate::Error::DegenerateTopology`]
    Reject,
}

impl DegeneratePolicy {
    /// Policy for a `strict` flag
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            DegeneratePolicy::Reject
        } else {
            DegeneratePolicy::Allow
        }
    }
}

impl std::str::FromStr for DegeneratePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "allow" => Ok(DegeneratePolicy::Allow),
            "reject" => Ok(DegeneratePolicy::Reject),
            _ => Err(format!("Unknown degenerate policy: {}", s)),
        }
    }
}

impl fmt::Display for DegeneratePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegeneratePolicy::Allow => write!(f, "allow"),
            DegeneratePolicy::Reject => write!(f, "reject"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_label() {
        let device = DeviceDescriptor::new(3, "NVIDIA A100-SXM4-80GB")
            .with_memory(1024, 81920)
            .with_utilization(87)
            .with_temperature(64);

        assert_eq!(
            device.to_string(),
            "GPU 3 (NVIDIA A100-SXM4-80GB) | Mem: 1024MB/81920MB | Util: 87% | Temp: 64°C"
        );
    }

    #[test]
    fn test_descriptor_field_names() {
        let device = DeviceDescriptor::new(0, "gpu").with_memory(1, 2);
        let json = serde_json::to_value(&device).unwrap();

        assert_eq!(json["index"], 0);
        assert_eq!(json["memory_used_MB"], 1);
        assert_eq!(json["memory_total_MB"], 2);
        assert_eq!(json["utilization_pct"], 0);
        assert_eq!(json["temperature_C"], 0);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("allow".parse::<DegeneratePolicy>().unwrap(), DegeneratePolicy::Allow);
        assert_eq!("REJECT".parse::<DegeneratePolicy>().unwrap(), DegeneratePolicy::Reject);
        assert!("ignore".parse::<DegeneratePolicy>().is_err());

        assert_eq!(DegeneratePolicy::from_strict(true), DegeneratePolicy::Reject);
        assert_eq!(DegeneratePolicy::default(), DegeneratePolicy::Allow);
    }
}
