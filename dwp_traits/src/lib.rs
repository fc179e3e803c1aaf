pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::collections::HashMap;
use std::time::Duration;

/// Field-bus register access for one device. One call covers a named group
/// of register offsets; implementations block up to `timeout`.
pub trait RegisterReader {
    fn read(
        &mut self,
        address: &str,
        unit_id: u8,
        channels: &[(&str, u16)],
        timeout: Duration,
    ) -> Result<HashMap<String, i32>, Box<dyn std::error::Error + Send + Sync>>;
}

impl<R: RegisterReader + ?Sized> RegisterReader for Box<R> {
    fn read(
        &mut self,
        address: &str,
        unit_id: u8,
        channels: &[(&str, u16)],
        timeout: Duration,
    ) -> Result<HashMap<String, i32>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(address, unit_id, channels, timeout)
    }
}
