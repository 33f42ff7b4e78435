//! topo - inspect the device topology of a 3D-parallel training configuration

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use topo_adapter_gpu::GpuBackend;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod settings;

use output::OutputFormat;
use settings::ToolSettings;

/// Inspect the device topology implied by a 3D-parallel training configuration
#[derive(Debug, Parser)]
#[command(name = "topo")]
#[command(version)]
pub struct Cli {
    /// Tool settings file (YAML)
    #[arg(short, long, value_name = "FILE", global = true)]
    settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level (overrides the settings file)
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the topology of a configuration
    Show {
        #[command(flatten)]
        topology: TopologyArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },

    /// Write the topology JSON document once
    Write {
        #[command(flatten)]
        topology: TopologyArgs,

        /// Destination file
        #[arg(short = 'f', long, value_name = "PATH")]
        output_file: Option<PathBuf>,
    },

    /// Rewrite the topology JSON document on an interval
    Watch {
        #[command(flatten)]
        topology: TopologyArgs,

        /// Seconds between cycles
        #[arg(short, long, value_name = "SECS")]
        interval: Option<u64>,

        /// Destination file
        #[arg(short = 'f', long, value_name = "PATH")]
        output_file: Option<PathBuf>,
    },

    /// Serve the topology over HTTP
    Serve {
        #[command(flatten)]
        topology: TopologyArgs,

        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Bind port
        #[arg(short, long)]
        port: Option<u16>,

        /// Page auto-refresh in seconds (0 disables)
        #[arg(long, value_name = "SECS")]
        refresh: Option<u32>,
    },

    /// Print the effective tool settings
    Settings,
}

/// Options shared by every topology command
#[derive(Debug, Args)]
pub struct TopologyArgs {
    /// Training configuration file (YAML)
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Total number of devices to partition
    #[arg(short = 'n', long)]
    total_gpus: Option<u32>,

    /// Fail when pipe_parallel_size * model_parallel_size exceeds the device count
    #[arg(long)]
    strict: bool,

    /// Telemetry backend (nvml, mock)
    #[arg(long)]
    backend: Option<GpuBackend>,

    /// Fleet size of the mock backend
    #[arg(long, value_name = "N")]
    mock_devices: Option<u32>,

    /// Device indices to query (comma-separated); defaults to CUDA_VISIBLE_DEVICES
    #[arg(long, value_delimiter = ',', value_name = "INDICES")]
    visible_devices: Option<Vec<u32>>,
}

impl TopologyArgs {
    /// Apply command-line overrides on top of the loaded settings
    fn apply(&self, settings: &mut ToolSettings) {
        if let Some(total) = self.total_gpus {
            settings.total_gpus = total;
        }
        if self.strict {
            settings.strict = true;
        }
        if let Some(backend) = self.backend {
            settings.telemetry.backend = backend;
        }
        if let Some(count) = self.mock_devices {
            settings.telemetry.mock_device_count = count;
        }
        if let Some(indices) = &self.visible_devices {
            settings.telemetry.visible_devices = Some(indices.clone());
        }
    }
}

impl Cli {
    /// Settings with every command-line override applied
    fn effective_settings(&self) -> Result<ToolSettings> {
        let mut settings = ToolSettings::load(self.settings.as_deref())?;
        self.apply_overrides(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    fn apply_overrides(&self, settings: &mut ToolSettings) {
        match &self.command {
            Commands::Show { topology, .. } => topology.apply(settings),
            Commands::Write { topology, output_file } => {
                topology.apply(settings);
                if let Some(path) = output_file {
                    settings.output_file = path.clone();
                }
            }
            Commands::Watch {
                topology,
                interval,
                output_file,
            } => {
                topology.apply(settings);
                if let Some(secs) = interval {
                    settings.poll_interval_secs = *secs;
                }
                if let Some(path) = output_file {
                    settings.output_file = path.clone();
                }
            }
            Commands::Serve {
                topology,
                host,
                port,
                refresh,
            } => {
                topology.apply(settings);
                if let Some(host) = host {
                    settings.server.host = host.clone();
                }
                if let Some(port) = port {
                    settings.server.port = *port;
                }
                if let Some(refresh) = refresh {
                    settings.server.refresh_secs = *refresh;
                }
            }
            Commands::Settings => {}
        }

        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
        }
        if self.verbose {
            settings.log_level = "debug".to_string();
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "topo={level},topo_core={level},topo_adapter_gpu={level},topo_web={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.effective_settings()?;

    init_logging(&settings.log_level);
    debug!("Starting topo with {:?}", cli);

    match cli.command {
        Commands::Show { topology, output } => {
            let generator = commands::build_generator(&settings, &topology.config)?;
            commands::show::show_topology(&generator, output).await?;
        }

        Commands::Write { topology, .. } => {
            let generator = commands::build_generator(&settings, &topology.config)?;
            commands::write::write_topology(&generator, &settings.output_file).await?;
        }

        Commands::Watch { topology, .. } => {
            let generator = commands::build_generator(&settings, &topology.config)?;
            commands::watch::watch_topology(&generator, &settings.output_file, settings.poll_interval()).await?;
        }

        Commands::Serve { topology, .. } => {
            let generator = commands::build_generator(&settings, &topology.config)?;
            commands::serve::serve_topology(generator, settings.server_config()).await?;
        }

        Commands::Settings => {
            commands::settings::show_settings(&settings)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert()
    }

    #[test]
    fn test_show_parsing() {
        let cli = Cli::try_parse_from(["topo", "show", "20B.yml", "-n", "8", "--output", "json"]).unwrap();
        match cli.command {
            Commands::Show { topology, output } => {
                assert_eq!(topology.config, PathBuf::from("20B.yml"));
                assert_eq!(topology.total_gpus, Some(8));
                assert_eq!(output, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_telemetry_flags() {
        let cli = Cli::try_parse_from([
            "topo",
            "write",
            "20B.yml",
            "--backend",
            "mock",
            "--mock-devices",
            "16",
            "--visible-devices",
            "3,1",
        ])
        .unwrap();
        match cli.command {
            Commands::Write { topology, output_file } => {
                assert_eq!(topology.backend, Some(GpuBackend::Mock));
                assert_eq!(topology.mock_devices, Some(16));
                assert_eq!(topology.visible_devices, Some(vec![3, 1]));
                assert_eq!(output_file, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["topo", "show", "20B.yml", "--backend", "rocm"]).is_err());
    }

    #[test]
    fn test_config_is_required() {
        assert!(Cli::try_parse_from(["topo", "serve"]).is_err());
        assert!(Cli::try_parse_from(["topo", "settings"]).is_ok());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["topo", "settings", "-v", "--log-level", "warn"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.log_level.as_deref(), Some("warn"));
    }

    fn overridden(args: &[&str]) -> ToolSettings {
        let cli = Cli::try_parse_from(args).unwrap();
        let mut settings = ToolSettings::default();
        cli.apply_overrides(&mut settings);
        settings
    }

    #[test]
    fn test_serve_overrides() {
        let settings = overridden(&[
            "topo",
            "serve",
            "20B.yml",
            "--total-gpus",
            "32",
            "--strict",
            "--host",
            "localhost",
            "--port",
            "8080",
            "--refresh",
            "0",
        ]);

        assert_eq!(settings.total_gpus, 32);
        assert!(settings.strict);
        assert_eq!(settings.server.host, "localhost");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.refresh_secs, 0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_watch_overrides() {
        let settings = overridden(&["topo", "watch", "20B.yml", "-i", "30", "-f", "/tmp/topo.json"]);
        assert_eq!(settings.poll_interval_secs, 30);
        assert_eq!(settings.output_file, PathBuf::from("/tmp/topo.json"));
        // Server settings are untouched outside `serve`
        assert_eq!(settings.server, ToolSettings::default().server);
    }

    #[test]
    fn test_write_overrides() {
        let settings = overridden(&[
            "topo",
            "write",
            "20B.yml",
            "--output-file",
            "out.json",
            "--backend",
            "mock",
            "--visible-devices",
            "2,0",
        ]);
        assert_eq!(settings.output_file, PathBuf::from("out.json"));
        assert_eq!(settings.poll_interval_secs, 5);
        assert_eq!(settings.telemetry.backend, GpuBackend::Mock);
        assert_eq!(settings.telemetry.visible_devices, Some(vec![2, 0]));
    }

    #[test]
    fn test_log_level_overrides() {
        let settings = overridden(&["topo", "settings", "--log-level", "warn"]);
        assert_eq!(settings.log_level, "warn");

        let settings = overridden(&["topo", "settings", "--log-level", "warn", "-v"]);
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let settings = overridden(&["topo", "show", "20B.yml", "-n", "0"]);
        assert!(settings.validate().is_err());
    }
}
