//! Print one report to stdout

use crate::output::{OutputFormat, OutputFormatter};
use anyhow::{Context, Result};
use topo_core::ReportGenerator;

pub async fn show_topology(generator: &ReportGenerator, output_format: OutputFormat) -> Result<()> {
    let report = generator.generate().await.with_context(|| {
        format!(
            "Failed to generate topology for {}",
            generator.config().config_path.display()
        )
    })?;
    OutputFormatter::new(output_format).print_report(&report)
}
