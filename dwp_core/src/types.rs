//! Shared domain types for cycle detection and recording.
use dwp_config::MachineConfig;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::quality::QualityGrade;
use crate::waveform::WaveformStats;

/// Press position on a machine. Each machine runs a left and a right mold
/// independently; they are tracked as separate cycle streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Position {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

impl Position {
    pub fn code(self) -> &'static str {
        match self {
            Position::Left => "L",
            Position::Right => "R",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Identity of one independent cycle stream: line, machine number, position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CycleKey {
    pub line: String,
    pub machine: u16,
    pub position: Position,
}

impl fmt::Display for CycleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-mc{}-{}", self.line, self.machine, self.position)
    }
}

/// One buffered pressure reading with its capture timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub value: i32,
    pub ts_ms: u64,
}

/// How a cycle finished. Timed-out cycles are discarded and never recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleType {
    Complete,
    ShortCycle,
    Overflow,
}

/// The persisted result of one detected press cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleRecord {
    pub line: String,
    pub machine: u16,
    pub position: Position,
    /// Strictly increasing per line, seeded from the store on startup.
    pub cycle_number: u64,
    pub cycle_type: CycleType,
    pub grade: QualityGrade,
    pub th_pass: bool,
    pub side_pass: bool,
    pub peak_th: i32,
    pub peak_side: i32,
    pub started_at_ms: u64,
    pub ended_at_ms: u64,
    pub duration_secs: f64,
    /// Captured sample count before trailing-zero padding.
    pub sample_count: usize,
    pub waveform_th: Vec<i32>,
    pub waveform_side: Vec<i32>,
    pub th_stats: WaveformStats,
    pub side_stats: WaveformStats,
}

/// One position's pair of raw register values from a single poll.
#[derive(Debug, Clone, Copy)]
pub struct PositionReading {
    pub th: i32,
    pub side: i32,
}

/// All four channels of one machine from a single poll. Timestamps are
/// assigned by the detector stage on receipt, not carried here.
#[derive(Debug, Clone)]
pub struct MachineReading {
    pub device: String,
    pub line: String,
    pub machine: MachineConfig,
    pub left: PositionReading,
    pub right: PositionReading,
}

pub const CH_TH_L: &str = "th_l";
pub const CH_TH_R: &str = "th_r";
pub const CH_SIDE_L: &str = "side_l";
pub const CH_SIDE_R: &str = "side_r";

impl MachineReading {
    /// Register channel map for one machine, in polling order.
    pub fn channels(machine: &MachineConfig) -> [(&'static str, u16); 4] {
        [
            (CH_TH_L, machine.addr_th_l),
            (CH_TH_R, machine.addr_th_r),
            (CH_SIDE_L, machine.addr_side_l),
            (CH_SIDE_R, machine.addr_side_r),
        ]
    }

    /// Assemble a reading from a reader's channel map; missing channels read
    /// as zero.
    pub fn from_values(
        device: &str,
        line: &str,
        machine: &MachineConfig,
        values: &HashMap<String, i32>,
    ) -> Self {
        let get = |name: &str| values.get(name).copied().unwrap_or(0);
        Self {
            device: device.to_string(),
            line: line.to_string(),
            machine: machine.clone(),
            left: PositionReading {
                th: get(CH_TH_L),
                side: get(CH_SIDE_L),
            },
            right: PositionReading {
                th: get(CH_TH_R),
                side: get(CH_SIDE_R),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_key_display() {
        let key = CycleKey {
            line: "G5".into(),
            machine: 3,
            position: Position::Left,
        };
        assert_eq!(key.to_string(), "G5-mc3-L");
    }

    #[test]
    fn record_serializes_with_wire_codes() {
        let record = CycleRecord {
            line: "G5".into(),
            machine: 1,
            position: Position::Left,
            cycle_number: 7,
            cycle_type: CycleType::ShortCycle,
            grade: QualityGrade::ShortCycle,
            th_pass: false,
            side_pass: false,
            peak_th: 12,
            peak_side: 9,
            started_at_ms: 0,
            ended_at_ms: 400,
            duration_secs: 0.4,
            sample_count: 2,
            waveform_th: vec![12, 0],
            waveform_side: vec![9, 0],
            th_stats: WaveformStats::default(),
            side_stats: WaveformStats::default(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["position"], "L");
        assert_eq!(json["cycle_type"], "SHORT_CYCLE");
        assert_eq!(json["grade"], "SHORT_CYCLE");
        assert_eq!(json["cycle_number"], 7);
    }

    #[test]
    fn reading_from_values_defaults_missing_channels_to_zero() {
        let machine = MachineConfig {
            name: "mc1".into(),
            addr_th_l: 0,
            addr_th_r: 1,
            addr_side_l: 2,
            addr_side_r: 3,
        };
        let mut values = HashMap::new();
        values.insert(CH_TH_L.to_string(), 42);
        let r = MachineReading::from_values("plc1", "G5", &machine, &values);
        assert_eq!(r.left.th, 42);
        assert_eq!(r.left.side, 0);
        assert_eq!(r.right.th, 0);
    }
}
