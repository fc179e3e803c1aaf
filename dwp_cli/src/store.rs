//! JSON-lines cycle store: one serialized `CycleRecord` per line, appended
//! atomically enough for a single-writer daemon.

use dwp_core::{CycleRecord, CycleStore};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CycleStore for JsonlStore {
    fn save(&mut self, record: &CycleRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Scan the file for the highest cycle_number on a line. Called once per
    /// line on startup (and after pruning), so a linear scan is fine.
    fn latest_cumulative(
        &mut self,
        line: &str,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut latest = 0u64;
        for entry in BufReader::new(file).lines() {
            let entry = entry?;
            // Skip unparsable lines rather than wedging the counter.
            let Ok(value) = serde_json::from_str::<serde_json::Value>(&entry) else {
                continue;
            };
            if value.get("line").and_then(|v| v.as_str()) == Some(line)
                && let Some(n) = value.get("cycle_number").and_then(|v| v.as_u64())
            {
                latest = latest.max(n);
            }
        }
        Ok(latest)
    }
}
