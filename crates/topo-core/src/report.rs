//! Topology report and its text/JSON renderings

use crate::config::RawConfig;
use crate::settings::ParallelSettings;
use crate::topology::Topology;
use crate::{Error, Result};
use serde::Serialize;
use std::fs::Permissions;
use std::io::Write as _;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Settings, topology and the configuration they came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopologyReport {
    pub parallel_settings: ParallelSettings,
    pub topology: Topology,
    pub configuration: RawConfig,
}

impl TopologyReport {
    pub fn new(parallel_settings: ParallelSettings, topology: Topology, configuration: RawConfig) -> Self {
        Self {
            parallel_settings,
            topology,
            configuration,
        }
    }

    /// ZeRO optimization stage of the underlying configuration
    pub fn zero_stage(&self) -> u64 {
        self.configuration.zero_stage()
    }

    /// JSON document with four-space indentation
    pub fn to_json_pretty(&self) -> Result<String> {
        to_json_pretty(self)
    }

    /// Multi-line human readable rendering
    pub fn render_text(&self) -> Result<String> {
        let mut out = String::from("Parallel Settings:\n");
        out.push_str(&to_json_pretty(&self.parallel_settings)?);
        out.push_str(&format!("\n\nZeRO Optimization Stage: {}\n\n", self.zero_stage()));
        out.push_str("Generated 3D Topology:\n");

        if self.topology.is_empty() {
            out.push_str(
                "  (no devices assigned: pipe_parallel_size * model_parallel_size exceeds the device count)\n",
            );
        }
        for (dp, data_group) in self.topology.groups().iter().enumerate() {
            out.push_str(&format!("Data Parallel Group {}:\n", dp));
            for (pp, pipe_group) in data_group.iter().enumerate() {
                out.push_str(&format!("  Pipeline Stage {}:\n", pp));
                for cell in pipe_group {
                    out.push_str(&format!("    {}\n", cell));
                }
            }
        }

        out.push_str("\nFull Configuration:\n");
        out.push_str(&to_json_pretty(&self.configuration)?);
        Ok(out)
    }

    /// Write the JSON document to `path`, replacing any previous file atomically
    pub fn write_json_atomic(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json_pretty()?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let write_err = |e: std::io::Error| Error::output_write(format!("{}: {}", path.display(), e));

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        // The temporary file is owner-only; the replacement keeps the previous mode
        if let Some(permissions) = output_permissions(path) {
            tmp.as_file().set_permissions(permissions).map_err(write_err)?;
        }
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        info!("Output successfully written to '{}'", path.display());
        Ok(())
    }
}

/// Mode for the replacement file: that of the file being replaced, or
/// `rw-r--r--` for a new file on unix
fn output_permissions(path: &Path) -> Option<Permissions> {
    match std::fs::metadata(path) {
        Ok(metadata) => Some(metadata.permissions()),
        Err(_) => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

/// Serialize with the four-space indentation used for every JSON output
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| Error::output_write(e.to_string()))
}
