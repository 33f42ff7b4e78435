//! Write one JSON document to disk

use crate::output::{OutputFormat, OutputFormatter};
use anyhow::{Context, Result};
use std::path::Path;
use topo_core::ReportGenerator;

pub async fn write_topology(generator: &ReportGenerator, output_file: &Path) -> Result<()> {
    let report = generator
        .generate_to_file(output_file)
        .await
        .with_context(|| format!("Failed to write topology to {}", output_file.display()))?;

    OutputFormatter::new(OutputFormat::Text).print_success(&format!(
        "Wrote {} device slots ({} placeholders) to {}",
        report.topology.cell_count(),
        report.topology.placeholder_count(),
        output_file.display()
    ));
    Ok(())
}
