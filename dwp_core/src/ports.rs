//! Outbound interfaces of the polling engine. Implementations live in the
//! binary crate (or in tests).
use crate::types::CycleRecord;
use dwp_config::Device;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Durable storage for finished cycle records.
pub trait CycleStore {
    fn save(&mut self, record: &CycleRecord) -> Result<(), BoxedError>;

    /// Highest cycle_number already persisted for a line (0 when none).
    /// Seeds the in-memory counter cache on startup and after pruning.
    fn latest_cumulative(&mut self, line: &str) -> Result<u64, BoxedError>;
}

/// Source of the active device tree, re-consulted periodically so machines
/// can be added or retired without a restart.
pub trait DeviceConfigSource {
    fn devices(&mut self) -> Result<Vec<Device>, BoxedError>;
}

/// Optional live sink for finished records (dashboard feed, message bus).
/// Publish failures are logged and never block persistence.
pub trait OutputPort {
    fn publish(&mut self, record: &CycleRecord) -> Result<(), BoxedError>;
}
