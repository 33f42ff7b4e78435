//! Parallel settings extraction
//!
//! The data-parallel degree is never read from the configuration. It is
//! whatever is left of the device count after the pipeline and model
//! degrees have taken their share, rounded down.

use crate::config::{RawConfig, MODEL_PARALLEL_KEY, PIPE_PARALLEL_KEY};
use crate::types::DegeneratePolicy;
use crate::{Error, Result};
use serde::Serialize;
use tracing::{debug, warn};

/// The three parallelism degrees of a training run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParallelSettings {
    pipe_parallel_size: u32,
    model_parallel_size: u32,
    data_parallel_size: u32,
}

impl ParallelSettings {
    /// Derive settings from explicit pipeline/model degrees and a device count
    pub fn derive(pipe_parallel_size: u32, model_parallel_size: u32, total_devices: u32) -> Self {
        let group = u64::from(pipe_parallel_size) * u64::from(model_parallel_size);
        let data_parallel_size = if group == 0 {
            0
        } else {
            // group >= 1, so the quotient never exceeds total_devices
            (u64::from(total_devices) / group) as u32
        };

        Self {
            pipe_parallel_size,
            model_parallel_size,
            data_parallel_size,
        }
    }

    /// Pipeline-parallel degree
    pub fn pipe_parallel_size(&self) -> u32 {
        self.pipe_parallel_size
    }

    /// Model-parallel degree
    pub fn model_parallel_size(&self) -> u32 {
        self.model_parallel_size
    }

    /// Data-parallel degree
    pub fn data_parallel_size(&self) -> u32 {
        self.data_parallel_size
    }

    /// Devices used by one data-parallel replica
    pub fn devices_per_replica(&self) -> u64 {
        u64::from(self.pipe_parallel_size) * u64::from(self.model_parallel_size)
    }

    /// Devices covered by the whole topology
    pub fn device_count(&self) -> u64 {
        self.devices_per_replica() * u64::from(self.data_parallel_size)
    }

    /// Whether the topology collapses to nothing
    pub fn is_degenerate(&self) -> bool {
        self.device_count() == 0
    }
}

/// Reads parallelism degrees out of a raw configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsExtractor {
    policy: DegeneratePolicy,
}

impl SettingsExtractor {
    /// Create an extractor with the given degenerate-case policy
    pub fn new(policy: DegeneratePolicy) -> Self {
        Self { policy }
    }

    /// Policy in effect
    pub fn policy(&self) -> DegeneratePolicy {
        self.policy
    }

    /// Extract the parallel settings for `total_devices` devices
    pub fn extract(&self, config: &RawConfig, total_devices: u32) -> Result<ParallelSettings> {
        if total_devices == 0 {
            return Err(Error::invalid_setting("total device count must be positive"));
        }

        let pipe = config.parallel_degree(PIPE_PARALLEL_KEY)?;
        let model = config.parallel_degree(MODEL_PARALLEL_KEY)?;
        let settings = ParallelSettings::derive(pipe, model, total_devices);

        if settings.data_parallel_size() == 0 {
            if self.policy == DegeneratePolicy::Reject {
                return Err(Error::DegenerateTopology {
                    pipe,
                    model,
                    total: total_devices,
                });
            }
            warn!(
                "pipe_parallel_size * model_parallel_size = {} exceeds {} devices, topology is empty",
                settings.devices_per_replica(),
                total_devices
            );
        } else {
            let idle = u64::from(total_devices) - settings.device_count();
            if idle > 0 {
                warn!(
                    "{} of {} devices do not fit a full replica of {} and stay unassigned",
                    idle,
                    total_devices,
                    settings.devices_per_replica()
                );
            }
        }

        debug!(
            pipe = settings.pipe_parallel_size(),
            model = settings.model_parallel_size(),
            data = settings.data_parallel_size(),
            "Extracted parallel settings"
        );
        Ok(settings)
    }
}

/// Extract settings with the default (allowing) policy
pub fn extract_parallel_settings(config: &RawConfig, total_devices: u32) -> Result<ParallelSettings> {
    SettingsExtractor::default().extract(config, total_devices)
}
