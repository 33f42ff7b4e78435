//! # topo-core
//!
//! Core types and algorithms for mapping a 3D-parallel training
//! configuration onto a device fleet.
//!
//! This crate provides:
//!
//! - Loading of the raw training configuration (YAML)
//! - Extraction of pipeline, model and data parallel degrees
//! - Deterministic enumeration of (data, pipeline, model) device coordinates
//! - The [`DeviceTelemetry`] capability implemented by GPU adapters
//! - Text and JSON renderings of the resulting report
//!
//! ## Example
//!
//! ```rust
//! use topo_core::{extract_parallel_settings, RawConfig, Topology};
//!
//! let config = RawConfig::parse("pipe_parallel_size: 2\nmodel_parallel_size: 2\n").unwrap();
//! let settings = extract_parallel_settings(&config, 8).unwrap();
//! assert_eq!(settings.data_parallel_size(), 2);
//!
//! let topology = Topology::build(&settings, &[]);
//! assert_eq!(topology.cell_count(), 8);
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod report;
pub mod settings;
pub mod topology;
pub mod traits;
pub mod types;

pub use config::RawConfig;
pub use error::{Error, Result};
pub use generator::{GeneratorConfig, ReportGenerator};
pub use report::TopologyReport;
pub use settings::{extract_parallel_settings, ParallelSettings, SettingsExtractor};
pub use topology::{DeviceCell, DeviceCoord, Topology};
pub use traits::{DeviceTelemetry, StaticDeviceTelemetry};
pub use types::{DegeneratePolicy, DeviceDescriptor};
