//! Device visibility filtering
//!
//! Mirrors how CUDA scopes a process to a subset of devices: a
//! comma-separated list of indices in `CUDA_VISIBLE_DEVICES`. Entries that
//! are not plain indices (UUIDs, `-1`) are dropped.

use tracing::debug;

/// Environment variable restricting the visible devices
pub const CUDA_VISIBLE_DEVICES: &str = "CUDA_VISIBLE_DEVICES";

/// Parse a visibility list. `None` means every device is visible.
pub fn parse_visible_devices(value: &str) -> Option<Vec<u32>> {
    if value.trim().is_empty() {
        return None;
    }

    Some(
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty() && entry.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|entry| entry.parse().ok())
            .collect(),
    )
}

/// Resolve the effective allow-list: explicit list first, then the environment
pub fn resolve_visible_devices(explicit: Option<Vec<u32>>) -> Option<Vec<u32>> {
    if explicit.is_some() {
        return explicit;
    }

    let value = std::env::var(CUDA_VISIBLE_DEVICES).ok()?;
    let parsed = parse_visible_devices(&value);
    debug!("{}={:?} -> {:?}", CUDA_VISIBLE_DEVICES, value, parsed);
    parsed
}
