//! Sandbox configuration.

use std::collections::BTreeSet;
use std::path::PathBuf;

/// Configuration for the wasm engine and its code cache.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Directory the code store lives under. Code is kept in `base_dir/wasm`.
    pub base_dir: PathBuf,

    /// Features a module may require through `requires_<feature>` exports.
    pub supported_features: BTreeSet<String>,

    /// Number of compiled modules kept in memory.
    pub memory_cache_capacity: usize,

    /// Maximum linear memory pages (1 page = 64 KiB), including the host
    /// region. Default: 256 pages = 16 MiB.
    pub max_memory_pages: u32,
}

impl SandboxConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_features(mut self, csv: &str) -> Self {
        self.supported_features = features_from_csv(csv);
        self
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            base_dir: std::env::temp_dir().join("callgate"),
            supported_features: BTreeSet::new(),
            memory_cache_capacity: 100,
            max_memory_pages: 256, // 16 MiB
        }
    }
}

/// Parse a comma separated feature list such as `"staking, iterator"`.
/// Blank entries are ignored.
pub fn features_from_csv(csv: &str) -> BTreeSet<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}
