//! Per-position cycle detection state machine.
//!
//! Each `CycleKey` runs its own independent IDLE/ACTIVE machine. A cycle
//! starts when either channel reaches the start threshold and ends after a
//! debounced run of end readings. End readings only advance the debounce
//! counter; they are never buffered, so the waveform tail is synthesized at
//! completion instead.
use crate::types::{CycleKey, CycleType, Sample};
use dwp_config::DetectorCfg;
use std::collections::HashMap;

#[derive(Debug)]
struct CycleState {
    th_buf: Vec<Sample>,
    side_buf: Vec<Sample>,
    started_at_ms: u64,
    end_streak: u32,
}

impl CycleState {
    fn push(&mut self, th: i32, side: i32, now_ms: u64) {
        self.th_buf.push(Sample {
            value: th,
            ts_ms: now_ms,
        });
        self.side_buf.push(Sample {
            value: side,
            ts_ms: now_ms,
        });
    }
}

/// A finished cycle with its captured waveforms, ready for normalization.
#[derive(Debug)]
pub struct CompletedCycle {
    pub th: Vec<Sample>,
    pub side: Vec<Sample>,
    pub cycle_type: CycleType,
    pub started_at_ms: u64,
    pub ended_at_ms: u64,
    /// Sample count before trailing-zero padding; short-cycle detection and
    /// the persisted sample_count both use this.
    pub captured: usize,
}

impl CompletedCycle {
    pub fn duration_secs(&self) -> f64 {
        self.ended_at_ms.saturating_sub(self.started_at_ms) as f64 / 1000.0
    }
}

pub struct CycleDetector {
    cfg: DetectorCfg,
    active: HashMap<CycleKey, CycleState>,
}

impl CycleDetector {
    pub fn new(cfg: DetectorCfg) -> Self {
        Self {
            cfg,
            active: HashMap::new(),
        }
    }

    pub fn cfg(&self) -> &DetectorCfg {
        &self.cfg
    }

    /// Feed one reading for one position. Returns a completed cycle at most
    /// once per call.
    pub fn process(
        &mut self,
        key: &CycleKey,
        th: i32,
        side: i32,
        now_ms: u64,
    ) -> Option<CompletedCycle> {
        // Failsafe first: a cycle stuck active strictly past the timeout is
        // dropped without a record, then the current reading is evaluated
        // fresh.
        if let Some(state) = self.active.get(key) {
            let timeout_ms = self.cfg.cycle_timeout_secs.saturating_mul(1000);
            if now_ms.saturating_sub(state.started_at_ms) > timeout_ms {
                tracing::warn!(cycle = %key, "active cycle exceeded timeout, discarding");
                self.active.remove(key);
            }
        }

        match self.active.get_mut(key) {
            None => {
                if th >= self.cfg.start_threshold || side >= self.cfg.start_threshold {
                    let mut state = CycleState {
                        th_buf: Vec::with_capacity(self.cfg.max_buffer_len.min(64)),
                        side_buf: Vec::with_capacity(self.cfg.max_buffer_len.min(64)),
                        started_at_ms: now_ms,
                        end_streak: 0,
                    };
                    state.push(th, side, now_ms);
                    tracing::debug!(cycle = %key, th, side, "cycle started");
                    self.active.insert(key.clone(), state);
                }
                None
            }
            Some(state) => {
                let is_end = th <= self.cfg.end_threshold && side <= self.cfg.end_threshold;
                if is_end {
                    state.end_streak += 1;
                    let long_enough = now_ms.saturating_sub(state.started_at_ms)
                        >= self.cfg.min_cycle_duration_ms;
                    if state.end_streak >= self.cfg.consecutive_ends_required && long_enough {
                        let state = self.active.remove(key)?;
                        return Some(finish(state, &self.cfg, now_ms, false));
                    }
                    None
                } else {
                    state.end_streak = 0;
                    state.push(th, side, now_ms);
                    if state.th_buf.len() > self.cfg.max_buffer_len {
                        tracing::warn!(
                            cycle = %key,
                            buffered = state.th_buf.len(),
                            "buffer limit exceeded, force-completing"
                        );
                        let state = self.active.remove(key)?;
                        return Some(finish(state, &self.cfg, now_ms, true));
                    }
                    None
                }
            }
        }
    }

    /// Drop state for positions no longer in the device tree.
    pub fn prune<F: FnMut(&CycleKey) -> bool>(&mut self, mut keep: F) {
        self.active.retain(|k, _| keep(k));
        self.active.shrink_to_fit();
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Buffered sample count for one position (0 when idle).
    pub fn buffered(&self, key: &CycleKey) -> usize {
        self.active.get(key).map_or(0, |s| s.th_buf.len())
    }
}

fn finish(
    mut state: CycleState,
    cfg: &DetectorCfg,
    now_ms: u64,
    overflow: bool,
) -> CompletedCycle {
    let captured = state.th_buf.len();

    // Pad the tail so the resampled waveform returns to rest. Overflowed
    // cycles get a single closing zero.
    let pad = if overflow {
        1
    } else {
        cfg.trailing_zeros_to_keep
    };
    for _ in 0..pad {
        state.push(0, 0, now_ms);
    }
    trim_trailing_zeros(
        &mut state.th_buf,
        &mut state.side_buf,
        cfg.trailing_zeros_to_keep,
        cfg.min_samples,
    );

    let cycle_type = if overflow {
        CycleType::Overflow
    } else if captured < cfg.min_samples {
        CycleType::ShortCycle
    } else {
        CycleType::Complete
    };

    CompletedCycle {
        th: state.th_buf,
        side: state.side_buf,
        cycle_type,
        started_at_ms: state.started_at_ms,
        ended_at_ms: now_ms,
        captured,
    }
}

/// Keep at most `keep` trailing all-zero pairs, never shrinking below
/// `min_len`.
fn trim_trailing_zeros(th: &mut Vec<Sample>, side: &mut Vec<Sample>, keep: usize, min_len: usize) {
    let zeros = th
        .iter()
        .zip(side.iter())
        .rev()
        .take_while(|(a, b)| a.value == 0 && b.value == 0)
        .count();
    if zeros <= keep {
        return;
    }
    let excess = zeros - keep;
    let removable = th.len().saturating_sub(min_len);
    let drop = excess.min(removable);
    th.truncate(th.len() - drop);
    side.truncate(side.len() - drop);
}
