//! Output formatting for the topo CLI

use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use topo_core::TopologyReport;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One row per device slot
    #[default]
    Table,
    /// The JSON document
    Json,
    /// The JSON document as YAML
    Yaml,
    /// Indented group listing
    Text,
}

/// Output formatter
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a report in the selected format
    pub fn render_report(&self, report: &TopologyReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(report.to_json_pretty()?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(report)?),
            OutputFormat::Text => Ok(report.render_text()?),
            OutputFormat::Table => Ok(self.render_table(report)),
        }
    }

    pub fn print_report(&self, report: &TopologyReport) -> Result<()> {
        println!("{}", self.render_report(report)?);
        Ok(())
    }

    fn render_table(&self, report: &TopologyReport) -> String {
        let settings = &report.parallel_settings;
        let mut out = format!(
            "{} data={} pipe={} model={} (ZeRO stage {})\n",
            "Parallel settings:".bold().cyan(),
            settings.data_parallel_size(),
            settings.pipe_parallel_size(),
            settings.model_parallel_size(),
            report.zero_stage()
        );

        if report.topology.is_empty() {
            out.push_str(&format!(
                "{}",
                "No devices assigned: pipe_parallel_size * model_parallel_size exceeds the device count"
                    .yellow()
            ));
            return out;
        }

        let mut table = Table::new();
        // Device labels are never wrapped
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Disabled);

        table.set_header(
            ["DP", "PP", "MP", "Flat Index", "Device"]
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );

        for (coord, flat, cell) in report.topology.cells() {
            let device = if cell.is_placeholder() {
                Cell::new(cell).fg(Color::DarkGrey)
            } else {
                Cell::new(cell)
            };
            table.add_row(vec![
                Cell::new(coord.data),
                Cell::new(coord.pipe),
                Cell::new(coord.model),
                Cell::new(flat),
                device,
            ]);
        }

        out.push_str(&table.to_string());
        out
    }

    /// Print a success message
    pub fn print_success(&self, message: &str) {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::json!({ "status": "success", "message": message })),
            OutputFormat::Yaml => println!("status: success\nmessage: {}", message),
            OutputFormat::Table | OutputFormat::Text => println!("{} {}", "✓".green().bold(), message.green()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topo_core::{extract_parallel_settings, DeviceDescriptor, RawConfig, Topology};

    fn report(doc: &str, total: u32, devices: u32) -> TopologyReport {
        let config = RawConfig::parse(doc).unwrap();
        let settings = extract_parallel_settings(&config, total).unwrap();
        let fleet: Vec<_> = (0..devices)
            .map(|i| DeviceDescriptor::new(i, "A100").with_memory(512, 40960))
            .collect();
        let topology = Topology::build(&settings, &fleet);
        TopologyReport::new(settings, topology, config)
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_table_rows() {
        let report = report("pipe_parallel_size: 2\nmodel_parallel_size: 2\n", 8, 6);
        let table = OutputFormatter::new(OutputFormat::Table).render_report(&report).unwrap();

        assert!(table.contains("Flat Index"));
        assert!(table.contains("GPU 5 (A100) | Mem: 512MB/40960MB"));
        assert!(table.contains("GPU 7 (Placeholder)"));
    }

    #[test]
    fn test_table_degenerate() {
        let report = report("pipe_parallel_size: 4\nmodel_parallel_size: 4\n", 8, 8);
        let table = OutputFormatter::new(OutputFormat::Table).render_report(&report).unwrap();
        assert!(table.contains("No devices assigned"));
        assert!(!table.contains("Flat Index"));
    }

    #[test]
    fn test_json_output() {
        let report = report("model_parallel_size: 4\n", 8, 0);
        let json = OutputFormatter::new(OutputFormat::Json).render_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["parallel_settings"]["data_parallel_size"], 2);
        assert_eq!(value["topology"][1][0][3], "GPU 7 (Placeholder)");
    }

    #[test]
    fn test_yaml_output() {
        let report = report("", 2, 0);
        let yaml = OutputFormatter::new(OutputFormat::Yaml).render_report(&report).unwrap();
        assert!(yaml.contains("parallel_settings:"));
        assert!(yaml.contains("data_parallel_size: 2"));
    }

    #[test]
    fn test_text_output() {
        let report = report("pipe_parallel_size: 2\n", 2, 1);
        let text = OutputFormatter::new(OutputFormat::Text).render_report(&report).unwrap();
        assert!(text.starts_with("Parallel Settings:"));
        assert!(text.contains("Data Parallel Group 0:\n  Pipeline Stage 0:\n    GPU 0 (A100)"));
        assert!(text.contains("  Pipeline Stage 1:\n    GPU 1 (Placeholder)"));
    }
}
