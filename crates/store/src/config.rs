//! Store configuration

use flaxkv_core::Limits;
use flaxkv_engine::EngineKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_engine() -> EngineKind {
    EngineKind::MmapBtree
}

fn default_flush_interval_ms() -> u64 {
    300
}

fn default_high_water() -> usize {
    8192
}

/// Configuration accepted when opening a store
///
/// # Example
///
/// ```ignore
/// use flaxkv_store::StoreConfig;
/// use flaxkv_engine::EngineKind;
///
/// let config = StoreConfig::new("./db")
///     .engine(EngineKind::Lsm)
///     .flush_interval_ms(100)
///     .high_water(1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database directory
    pub path: PathBuf,
    /// Which embedded engine backs the store
    #[serde(default = "default_engine")]
    pub engine: EngineKind,
    /// Timer period of the background flusher, milliseconds
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Overlay entry count above which writers block on a flush barrier
    #[serde(default = "default_high_water")]
    pub high_water: usize,
    /// Drop all engine data before accepting writes
    #[serde(default)]
    pub rebuild: bool,
    /// Engine cache sizing hint in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_size_hint: Option<usize>,
    /// Codec size limits
    #[serde(default)]
    pub limits: Limits,
}

impl StoreConfig {
    /// Configuration with defaults for `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            engine: default_engine(),
            flush_interval_ms: default_flush_interval_ms(),
            high_water: default_high_water(),
            rebuild: false,
            map_size_hint: None,
            limits: Limits::default(),
        }
    }

    /// Select the backing engine
    pub fn engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    /// Set the flusher timer period
    pub fn flush_interval_ms(mut self, ms: u64) -> Self {
        self.flush_interval_ms = ms;
        self
    }

    /// Set the overlay high-water mark
    pub fn high_water(mut self, entries: usize) -> Self {
        self.high_water = entries;
        self
    }

    /// Request a rebuild at open
    pub fn rebuild(mut self, rebuild: bool) -> Self {
        self.rebuild = rebuild;
        self
    }

    /// Provide an engine cache sizing hint
    pub fn map_size_hint(mut self, bytes: usize) -> Self {
        self.map_size_hint = Some(bytes);
        self
    }

    /// Override codec limits
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Timer period as a `Duration`
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}
