//! Test and helper mocks for dwp_core

use std::collections::HashMap;
use std::time::Duration;

/// A reader that always errors; useful when driving the detector stage with
/// externally produced readings via `Poller::process_reading`.
pub struct NoopReader;

impl dwp_traits::RegisterReader for NoopReader {
    fn read(
        &mut self,
        _address: &str,
        _unit_id: u8,
        _channels: &[(&str, u16)],
        _timeout: Duration,
    ) -> Result<HashMap<String, i32>, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("noop reader")))
    }
}
