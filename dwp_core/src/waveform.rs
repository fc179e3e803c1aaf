//! Waveform normalization and statistics.
//!
//! Cycles are captured at whatever cadence the field bus delivers, so two
//! cycles of the same duration can carry different sample counts. Records
//! store a time-based resample at a fixed rate instead, which makes waveforms
//! comparable across machines and poll jitter.
use crate::types::Sample;
use serde::Serialize;

/// Resample a captured waveform onto a fixed time grid via linear
/// interpolation.
///
/// The output has `duration_secs * rate_hz` points (at least one) spread
/// evenly over `[first.ts_ms, last.ts_ms]`, rounded back to integer readings.
/// Degenerate inputs (fewer than two samples, or a zero-width time span)
/// produce a constant array.
pub fn resample(samples: &[Sample], duration_secs: f64, rate_hz: u32) -> Vec<i32> {
    let n = ((duration_secs * f64::from(rate_hz)).round() as usize).max(1);
    let Some(first) = samples.first() else {
        return vec![0; n];
    };
    let Some(last) = samples.last() else {
        return vec![0; n];
    };
    if samples.len() < 2 || last.ts_ms <= first.ts_ms || n == 1 {
        return vec![first.value; n];
    }

    let start = first.ts_ms as f64;
    let span = (last.ts_ms - first.ts_ms) as f64;
    let mut out = Vec::with_capacity(n);
    let mut j = 0usize;
    for i in 0..n {
        let target = start + (i as f64) * span / ((n - 1) as f64);
        // Advance to the segment containing target; targets are monotonic so
        // j never moves backwards.
        while j + 2 < samples.len() && (samples[j + 1].ts_ms as f64) < target {
            j += 1;
        }
        let a = samples[j];
        let b = samples[j + 1];
        let seg = (b.ts_ms.saturating_sub(a.ts_ms)) as f64;
        let v = if seg <= 0.0 {
            a.value as f64
        } else {
            let t = ((target - a.ts_ms as f64) / seg).clamp(0.0, 1.0);
            a.value as f64 + t * ((b.value - a.value) as f64)
        };
        out.push(v.round() as i32);
    }
    out
}

/// Peak pressure of a captured waveform (0 when empty).
pub fn peak(samples: &[Sample]) -> i32 {
    samples.iter().map(|s| s.value).max().unwrap_or(0)
}

/// Summary statistics of a resampled waveform.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WaveformStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub median: f32,
    pub std_dev: f32,
    pub peak_to_peak: f32,
    pub rms: f32,
}

/// Compute summary statistics; all-zero stats for an empty input.
pub fn statistics(values: &[i32]) -> WaveformStats {
    if values.is_empty() {
        return WaveformStats::default();
    }
    let n = values.len() as f64;
    let mut min = i32::MAX;
    let mut max = i32::MIN;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
        sum += f64::from(v);
        sum_sq += f64::from(v) * f64::from(v);
    }
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);

    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f32 / 2.0
    } else {
        sorted[mid] as f32
    };

    WaveformStats {
        min: min as f32,
        max: max as f32,
        mean: mean as f32,
        median,
        std_dev: variance.sqrt() as f32,
        peak_to_peak: (max - min) as f32,
        rms: (sum_sq / n).sqrt() as f32,
    }
}

/// Centered moving-average smoothing. `window <= 1` is a passthrough.
pub fn smooth(values: &[i32], window: usize) -> Vec<i32> {
    if window <= 1 || values.len() < 2 {
        return values.to_vec();
    }
    let half = window / 2;
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(values.len());
        let sum: f64 = values[lo..hi].iter().map(|&v| f64::from(v)).sum();
        out.push((sum / (hi - lo) as f64).round() as i32);
    }
    out
}
