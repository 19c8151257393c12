//! Closed configuration surface (expanded spec §1.3).
//!
//! Every runtime-tunable value named anywhere in the specification lives on
//! this struct. Loaded from a TOML file, then overridden key-by-key from
//! `LORAFLOW_*` environment variables, then validated once at startup —
//! never re-read afterward.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_log_filter() -> String {
    "info".to_string()
}
fn default_worker_concurrency() -> usize {
    num_cpus_or_two()
}
fn default_generator_timeout_s() -> u64 {
    15
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_max_job_duration_s() -> u64 {
    600
}
fn default_ws_buffer_size() -> usize {
    64
}
fn default_ws_terminal_retain_s() -> u64 {
    300
}
fn default_cache_ttl_s() -> u64 {
    600
}
fn default_cache_max_entries() -> usize {
    1024
}
fn default_cache_max_bytes() -> u64 {
    64 * 1024 * 1024
}
fn default_immediate_mode_deadline_ms() -> u64 {
    5_000
}
fn default_queue_capacity() -> usize {
    256
}

fn num_cpus_or_two() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2)
}

/// Every tunable in the system, in one place. Fields without a `#[serde(default
/// = ...)]` are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Base URL of the external generator service (spec §4.B).
    pub generator_base_url: String,

    #[serde(default = "default_generator_timeout_s")]
    pub generator_timeout_s: u64,

    /// Durable broker connection string. `None` means the queue runs the
    /// in-process backend from first boot (spec §4.D).
    #[serde(default)]
    pub broker_url: Option<String>,

    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_job_duration_s")]
    pub max_job_duration_s: u64,

    #[serde(default = "default_ws_buffer_size")]
    pub ws_buffer_size: usize,

    #[serde(default = "default_ws_terminal_retain_s")]
    pub ws_terminal_retain_s: u64,

    #[serde(default = "default_cache_ttl_s")]
    pub cache_ttl_s: u64,

    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    #[serde(default = "default_cache_max_bytes")]
    pub cache_max_bytes: u64,

    #[serde(default = "default_immediate_mode_deadline_ms")]
    pub immediate_mode_deadline_ms: u64,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Path to the adapter catalog TOML (spec §2 supplemental feature).
    #[serde(default)]
    pub adapter_catalog_path: Option<String>,

    /// Directory for optional job-store snapshots (spec §2 supplemental
    /// feature). `None` disables persistence; jobs live in memory only.
    #[serde(default)]
    pub snapshot_dir: Option<String>,

    /// When true, the server refuses to start if `broker_url` is configured
    /// but unreachable, rather than silently degrading to the in-process
    /// queue (exit code 2, spec §6). Ignored when `broker_url` is unset.
    #[serde(default)]
    pub disable_in_process_fallback: bool,
}

impl Config {
    /// Load from a TOML file, then apply `LORAFLOW_*` environment overrides,
    /// then validate. This is the only entry point production binaries use.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CoreError::InvalidParameters(format!("reading {}: {e}", path.display())))?;
        let mut config: Config = toml::from_str(&raw)
            .map_err(|e| CoreError::InvalidParameters(format!("parsing {}: {e}", path.display())))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `LORAFLOW_<FIELD>` environment variable overrides in place.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LORAFLOW_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("LORAFLOW_LOG_FILTER") {
            self.log_filter = v;
        }
        if let Ok(v) = std::env::var("LORAFLOW_GENERATOR_BASE_URL") {
            self.generator_base_url = v;
        }
        if let Ok(v) = std::env::var("LORAFLOW_BROKER_URL") {
            self.broker_url = Some(v);
        }
        if let Ok(v) = env_parsed::<u64>("LORAFLOW_GENERATOR_TIMEOUT_S") {
            self.generator_timeout_s = v;
        }
        if let Ok(v) = env_parsed::<usize>("LORAFLOW_WORKER_CONCURRENCY") {
            self.worker_concurrency = v;
        }
        if let Ok(v) = env_parsed::<u64>("LORAFLOW_POLL_INTERVAL_MS") {
            self.poll_interval_ms = v;
        }
        if let Ok(v) = env_parsed::<u64>("LORAFLOW_MAX_JOB_DURATION_S") {
            self.max_job_duration_s = v;
        }
        if let Ok(v) = env_parsed::<usize>("LORAFLOW_WS_BUFFER_SIZE") {
            self.ws_buffer_size = v;
        }
        if let Ok(v) = env_parsed::<u64>("LORAFLOW_CACHE_TTL_S") {
            self.cache_ttl_s = v;
        }
        if let Ok(v) = std::env::var("LORAFLOW_SNAPSHOT_DIR") {
            self.snapshot_dir = Some(v);
        }
        if let Ok(v) = env_parsed::<bool>("LORAFLOW_DISABLE_IN_PROCESS_FALLBACK") {
            self.disable_in_process_fallback = v;
        }
    }

    /// Reject an implausible configuration before anything binds a socket or
    /// spawns a worker.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.generator_base_url.is_empty() {
            return Err(CoreError::InvalidParameters(
                "generator_base_url must not be empty".to_string(),
            ));
        }
        if self.worker_concurrency == 0 {
            return Err(CoreError::InvalidParameters(
                "worker_concurrency must be at least 1".to_string(),
            ));
        }
        if self.generator_timeout_s == 0 {
            return Err(CoreError::InvalidParameters(
                "generator_timeout_s must be positive".to_string(),
            ));
        }
        if self.ws_buffer_size == 0 {
            return Err(CoreError::InvalidParameters(
                "ws_buffer_size must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(CoreError::InvalidParameters(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<T, ()> {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).ok_or(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
