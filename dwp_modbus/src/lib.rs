#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Field-bus adapters for the DWP polling daemon.
//!
//! `TcpReader` talks Modbus/TCP to real press PLCs. `SimulatedPress`
//! produces synthetic press cycles with the same register interface so the
//! full pipeline runs without hardware.
pub mod error;
pub mod tcp;

pub use error::BusError;
pub use tcp::TcpReader;

use dwp_traits::RegisterReader;
use std::collections::HashMap;
use std::time::Duration;

/// Synthetic press device. Every call advances one tick per address and
/// returns a deterministic rise/hold/fall pressure curve per register, so
/// consecutive polls observe complete cycles.
pub struct SimulatedPress {
    ticks: HashMap<String, u64>,
    /// One full cycle (idle + press + idle) in ticks.
    period: u64,
}

impl SimulatedPress {
    pub fn new() -> Self {
        Self {
            ticks: HashMap::new(),
            period: 30,
        }
    }

    /// Pressure value for one register at one tick.
    fn value_at(&self, register: u16, tick: u64) -> i32 {
        let phase = tick % self.period;
        // Peak varies a little per register so L/R channels are not clones.
        let peak = 34 + i64::from(register % 5);
        let v = match phase {
            0..=9 => 0,
            10..=14 => peak * (i64::try_from(phase).unwrap_or(10) - 9) / 5,
            15..=21 => peak - i64::try_from(phase % 3).unwrap_or(0),
            22..=25 => peak * (26 - i64::try_from(phase).unwrap_or(26)) / 4,
            _ => 0,
        };
        i32::try_from(v).unwrap_or(0)
    }
}

impl Default for SimulatedPress {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterReader for SimulatedPress {
    fn read(
        &mut self,
        address: &str,
        _unit_id: u8,
        channels: &[(&str, u16)],
        _timeout: Duration,
    ) -> Result<HashMap<String, i32>, Box<dyn std::error::Error + Send + Sync>> {
        let tick = {
            let t = self.ticks.entry(address.to_string()).or_insert(0);
            let now = *t;
            *t += 1;
            now
        };
        let mut values = HashMap::with_capacity(channels.len());
        for (name, register) in channels {
            values.insert((*name).to_string(), self.value_at(*register, tick));
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_press_returns_all_requested_channels() {
        let mut press = SimulatedPress::new();
        let channels = [("toe_heel_left", 0u16), ("side_left", 2u16)];
        let values = press
            .read("sim://a", 1, &channels, Duration::from_secs(1))
            .unwrap();
        assert_eq!(values.len(), 2);
        assert!(values.contains_key("toe_heel_left"));
        assert!(values.contains_key("side_left"));
    }

    #[test]
    fn simulated_press_produces_full_cycles() {
        let mut press = SimulatedPress::new();
        let channels = [("toe_heel_left", 0u16)];
        let mut seen_high = false;
        let mut returned_to_zero = false;
        for _ in 0..40 {
            let values = press
                .read("sim://a", 1, &channels, Duration::from_secs(1))
                .unwrap();
            let v = values["toe_heel_left"];
            if v >= 30 {
                seen_high = true;
            }
            if seen_high && v == 0 {
                returned_to_zero = true;
            }
        }
        assert!(seen_high, "simulation never reached press pressure");
        assert!(returned_to_zero, "simulation never completed a cycle");
    }

    #[test]
    fn per_address_tick_counters_are_independent() {
        let mut press = SimulatedPress::new();
        let channels = [("toe_heel_left", 0u16)];
        for _ in 0..12 {
            press
                .read("sim://a", 1, &channels, Duration::from_secs(1))
                .unwrap();
        }
        // Address b starts from idle even though a is mid-cycle.
        let b = press
            .read("sim://b", 1, &channels, Duration::from_secs(1))
            .unwrap();
        assert_eq!(b["toe_heel_left"], 0);
    }
}
