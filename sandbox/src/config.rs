//! Bridge configuration.

use serde::Deserialize;

use crate::error::BridgeError;

/// Configuration for a bridge and the instances it creates.
///
/// Controls memory limits, instruction fuel, reference-table size, and how
/// much work one event-loop turn may do.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Maximum linear memory pages (1 page = 64 KiB).
    /// Default: 256 pages = 16 MiB.
    pub max_memory_pages: u32,

    /// Wasmtime fuel limit (instruction metering). `None` disables metering;
    /// the limit covers the whole lifetime of an instance.
    pub fuel_limit: Option<u64>,

    /// Maximum reference-table slots, sentinels included.
    pub max_table_slots: usize,

    /// Maximum tasks `run_until_idle` runs before giving up.
    pub max_tasks_per_turn: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_memory_pages: 256, // 16 MiB
            fuel_limit: None,
            max_table_slots: 1 << 20,
            max_tasks_per_turn: 10_000,
        }
    }
}

impl BridgeConfig {
    /// Parse from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Maximum linear memory in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_pages as usize * 65536
    }
}
