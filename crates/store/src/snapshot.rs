//! Optional snapshot persistence (expanded spec §2).
//!
//! Unlike the teacher's WAL-backed daemon, the job store has no event log to
//! replay — a job's entire state is small and already serializable, so a
//! snapshot is simply "write the whole job list out" on a timer or clean
//! shutdown, and "read it back in" on startup. When `snapshot_dir` is unset
//! in configuration, none of this runs and jobs live in memory only.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use loraflow_core::Job;
use serde::{Deserialize, Serialize};
use std::path::Path;

const CURRENT_SNAPSHOT_VERSION: u32 = 1;
const SNAPSHOT_FILE_NAME: &str = "jobs.snapshot.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    #[serde(rename = "v")]
    version: u32,
    jobs: Vec<Job>,
    created_at: DateTime<Utc>,
}

/// Write the full job list to `dir/jobs.snapshot.json`, atomically via a
/// temp file plus rename so a crash mid-write never corrupts the on-disk
/// snapshot.
pub fn write_snapshot(dir: &Path, jobs: Vec<Job>) -> Result<(), StoreError> {
    std::fs::create_dir_all(dir).map_err(|e| StoreError::Snapshot(e.to_string()))?;
    let snapshot = Snapshot {
        version: CURRENT_SNAPSHOT_VERSION,
        jobs,
        created_at: Utc::now(),
    };
    let body = serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Snapshot(e.to_string()))?;

    let final_path = dir.join(SNAPSHOT_FILE_NAME);
    let tmp_path = dir.join(format!("{SNAPSHOT_FILE_NAME}.tmp"));
    std::fs::write(&tmp_path, body).map_err(|e| StoreError::Snapshot(e.to_string()))?;
    std::fs::rename(&tmp_path, &final_path).map_err(|e| StoreError::Snapshot(e.to_string()))?;
    Ok(())
}

/// Load jobs from `dir/jobs.snapshot.json`. Returns an empty list if no
/// snapshot file exists yet (first boot).
pub fn load_snapshot(dir: &Path) -> Result<Vec<Job>, StoreError> {
    let path = dir.join(SNAPSHOT_FILE_NAME);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(&path).map_err(|e| StoreError::Snapshot(e.to_string()))?;
    let snapshot: Snapshot = serde_json::from_str(&raw).map_err(|e| StoreError::Snapshot(e.to_string()))?;
    Ok(snapshot.jobs)
}
