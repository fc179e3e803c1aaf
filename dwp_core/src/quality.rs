//! Quality classification of finished cycles.
//!
//! A pure function of the two channel peaks, the cycle type, and the
//! configured pressure bands. Nothing in here touches detector state, so the
//! same peaks always classify the same way.
use crate::types::CycleType;
use dwp_config::QualityCfg;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityGrade {
    Excellent,
    Good,
    Marginal,
    SensorLow,
    PressureHigh,
    Defective,
    ShortCycle,
    Overflow,
}

/// Grade plus per-channel pass flags. A channel passes when its peak lands
/// inside the strict good band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub grade: QualityGrade,
    pub th_pass: bool,
    pub side_pass: bool,
}

pub fn classify(
    peak_th: i32,
    peak_side: i32,
    cycle_type: CycleType,
    cfg: &QualityCfg,
) -> Classification {
    let in_band = |v: i32, lo: i32, hi: i32| (lo..=hi).contains(&v);
    let th_pass = in_band(peak_th, cfg.good_min, cfg.good_max);
    let side_pass = in_band(peak_side, cfg.good_min, cfg.good_max);
    let th_marginal = in_band(peak_th, cfg.marginal_min, cfg.marginal_max);
    let side_marginal = in_band(peak_side, cfg.marginal_min, cfg.marginal_max);

    let grade = match cycle_type {
        CycleType::ShortCycle => QualityGrade::ShortCycle,
        CycleType::Overflow => QualityGrade::Overflow,
        CycleType::Complete => {
            if th_pass && side_pass {
                QualityGrade::Excellent
            } else if in_band(peak_th, cfg.good_extended_min, cfg.good_extended_max)
                && in_band(peak_side, cfg.good_extended_min, cfg.good_extended_max)
            {
                QualityGrade::Good
            } else if (th_pass && side_marginal) || (side_pass && th_marginal) {
                // One channel solidly in band, the other drifting but not wild.
                QualityGrade::Marginal
            } else if peak_th < cfg.sensor_low_below && peak_side < cfg.sensor_low_below {
                QualityGrade::SensorLow
            } else if peak_th > cfg.pressure_high_above || peak_side > cfg.pressure_high_above {
                QualityGrade::PressureHigh
            } else {
                QualityGrade::Defective
            }
        }
    };

    Classification {
        grade,
        th_pass,
        side_pass,
    }
}
