//! 3D device topology construction
//!
//! Devices are enumerated data-parallel outermost, pipeline-parallel in the
//! middle and model-parallel innermost. A single counter walks that nesting
//! and is the flat device index: `(dp, pp, mp)` maps to
//! `dp * pipe * model + pp * model + mp`.

use crate::settings::ParallelSettings;
use crate::types::DeviceDescriptor;
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::debug;

/// Position of a device in the (data, pipeline, model) grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeviceCoord {
    pub data: u32,
    pub pipe: u32,
    pub model: u32,
}

impl DeviceCoord {
    pub fn new(data: u32, pipe: u32, model: u32) -> Self {
        Self { data, pipe, model }
    }

    /// Flat device index of this coordinate
    pub fn flat_index(&self, settings: &ParallelSettings) -> u64 {
        let pipe = u64::from(settings.pipe_parallel_size());
        let model = u64::from(settings.model_parallel_size());
        u64::from(self.data) * pipe * model + u64::from(self.pipe) * model + u64::from(self.model)
    }

    /// Coordinate of a flat device index, `None` when it lies outside the topology
    pub fn from_flat_index(index: u64, settings: &ParallelSettings) -> Option<Self> {
        if index >= settings.device_count() {
            return None;
        }

        let pipe = u64::from(settings.pipe_parallel_size());
        let model = u64::from(settings.model_parallel_size());
        // index < device_count, so every component fits its u32 degree
        Some(Self {
            data: (index / (pipe * model)) as u32,
            pipe: ((index / model) % pipe) as u32,
            model: (index % model) as u32,
        })
    }
}

impl fmt::Display for DeviceCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(dp={}, pp={}, mp={})", self.data, self.pipe, self.model)
    }
}

/// One slot of the topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCell {
    /// Slot backed by a visible device
    Bound(DeviceDescriptor),
    /// Slot with no visible device, tagged with its flat index
    Placeholder { index: u64 },
}

impl DeviceCell {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, DeviceCell::Placeholder { .. })
    }

    /// Bound device, if any
    pub fn device(&self) -> Option<&DeviceDescriptor> {
        match self {
            DeviceCell::Bound(device) => Some(device),
            DeviceCell::Placeholder { .. } => None,
        }
    }
}

impl fmt::Display for DeviceCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceCell::Bound(device) => write!(f, "{}", device),
            DeviceCell::Placeholder { index } => write!(f, "GPU {} (Placeholder)", index),
        }
    }
}

impl Serialize for DeviceCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Data-parallel groups of pipeline stages of model-parallel cells
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Topology {
    groups: Vec<Vec<Vec<DeviceCell>>>,
}

impl Topology {
    /// Build the topology for `settings`, binding cells to `devices` in order
    pub fn build(settings: &ParallelSettings, devices: &[DeviceDescriptor]) -> Self {
        let mut groups = Vec::with_capacity(settings.data_parallel_size() as usize);
        let mut next_index: u64 = 0;

        for _dp in 0..settings.data_parallel_size() {
            let mut data_group = Vec::with_capacity(settings.pipe_parallel_size() as usize);
            for _pp in 0..settings.pipe_parallel_size() {
                let mut pipe_group = Vec::with_capacity(settings.model_parallel_size() as usize);
                for _mp in 0..settings.model_parallel_size() {
                    let cell = usize::try_from(next_index)
                        .ok()
                        .and_then(|i| devices.get(i))
                        .map(|device| DeviceCell::Bound(device.clone()))
                        .unwrap_or(DeviceCell::Placeholder { index: next_index });
                    pipe_group.push(cell);
                    next_index += 1;
                }
                data_group.push(pipe_group);
            }
            groups.push(data_group);
        }

        debug!(
            "Built topology with {} cells from {} visible devices",
            next_index,
            devices.len()
        );
        Self { groups }
    }

    /// Data-parallel groups
    pub fn groups(&self) -> &[Vec<Vec<DeviceCell>>] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Cell at a coordinate
    pub fn get(&self, coord: DeviceCoord) -> Option<&DeviceCell> {
        self.groups
            .get(coord.data as usize)?
            .get(coord.pipe as usize)?
            .get(coord.model as usize)
    }

    /// Every cell with its coordinate and flat index, in enumeration order
    pub fn cells(&self) -> impl Iterator<Item = (DeviceCoord, u64, &DeviceCell)> + '_ {
        self.groups
            .iter()
            .enumerate()
            .flat_map(|(dp, data_group)| {
                data_group.iter().enumerate().flat_map(move |(pp, pipe_group)| {
                    pipe_group
                        .iter()
                        .enumerate()
                        .map(move |(mp, cell)| (DeviceCoord::new(dp as u32, pp as u32, mp as u32), cell))
                })
            })
            .enumerate()
            .map(|(flat, (coord, cell))| (coord, flat as u64, cell))
    }

    pub fn cell_count(&self) -> usize {
        self.groups.iter().flatten().map(Vec::len).sum()
    }

    pub fn placeholder_count(&self) -> usize {
        self.cells().filter(|(_, _, cell)| cell.is_placeholder()).count()
    }
}
