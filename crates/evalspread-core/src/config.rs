//! Run configuration: engine launch settings, search settings, worker count.
//!
//! Every field has a default, so a config file only needs the keys it
//! overrides. CLI flags are applied on top by the binary.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of candidate moves sampled per position.
pub const DEFAULT_CANDIDATES: usize = 5;
/// Default fixed search depth in plies.
pub const DEFAULT_DEPTH: u32 = 20;
/// Default engine worker threads.
pub const DEFAULT_THREADS: u32 = 6;
/// Default engine hash table size in MB.
pub const DEFAULT_HASH_MB: u32 = 4096;
/// Default supervising timeout per wait on engine output.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 300;

/// How to launch and configure one engine process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Executable path or name on `PATH`.
    pub path: String,
    /// Extra command-line arguments.
    pub args: Vec<String>,
    pub threads: u32,
    pub hash_mb: u32,
    /// Additional `setoption` pairs sent after Threads and Hash.
    pub options: BTreeMap<String, String>,
    /// 0 disables the timeout.
    pub query_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: "stockfish".to_string(),
            args: Vec::new(),
            threads: DEFAULT_THREADS,
            hash_mb: DEFAULT_HASH_MB,
            options: BTreeMap::new(),
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }
}

impl EngineConfig {
    pub fn query_timeout(&self) -> Option<Duration> {
        (self.query_timeout_secs > 0).then(|| Duration::from_secs(self.query_timeout_secs))
    }
}

/// Candidate count and depth used for every query of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub candidates: usize,
    pub depth: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_CANDIDATES,
            depth: DEFAULT_DEPTH,
        }
    }
}

/// Complete configuration for an evaluate run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalspreadConfig {
    pub engine: EngineConfig,
    pub search: SearchSettings,
    /// Positions analysed concurrently, one engine per worker.
    pub workers: usize,
}

impl Default for EvalspreadConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            search: SearchSettings::default(),
            workers: 1,
        }
    }
}

impl EvalspreadConfig {
    /// Clamp values that would make a run meaningless.
    pub fn normalized(mut self) -> Self {
        self.search.candidates = self.search.candidates.max(1);
        self.search.depth = self.search.depth.max(1);
        self.engine.threads = self.engine.threads.max(1);
        self.engine.hash_mb = self.engine.hash_mb.max(1);
        self.workers = self.workers.max(1);
        self
    }
}

/// Load a configuration JSON file.
pub fn load_config_from_path(path: &Path) -> std::io::Result<EvalspreadConfig> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str::<EvalspreadConfig>(&raw).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("failed to parse config JSON: {e}"),
        )
    })
}
