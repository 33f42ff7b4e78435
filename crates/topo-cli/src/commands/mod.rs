//! Command implementations for the topo CLI

pub mod serve;
pub mod settings;
pub mod show;
pub mod watch;
pub mod write;

use crate::settings::ToolSettings;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use topo_core::ReportGenerator;
use tracing::debug;

/// Wire the configured telemetry source into a report generator
pub fn build_generator(settings: &ToolSettings, config_path: &Path) -> Result<Arc<ReportGenerator>> {
    let telemetry = topo_adapter_gpu::create_source(&settings.telemetry_config())
        .context("Failed to create telemetry source")?;
    let generator = ReportGenerator::new(settings.generator_config(config_path), telemetry);
    debug!("Built {:?}", generator);
    Ok(Arc::new(generator))
}
