use dwp_config::DetectorCfg;
use dwp_core::{CycleDetector, CycleKey, CycleType, Position};

fn cfg() -> DetectorCfg {
    DetectorCfg {
        start_threshold: 5,
        end_threshold: 5,
        consecutive_ends_required: 3,
        min_cycle_duration_ms: 200,
        min_samples: 3,
        max_buffer_len: 10,
        cycle_timeout_secs: 100,
        trailing_zeros_to_keep: 3,
        resample_rate_hz: 1,
        smoothing_window: 0,
    }
}

fn key() -> CycleKey {
    CycleKey {
        line: "G5".into(),
        machine: 1,
        position: Position::Left,
    }
}

#[test]
fn below_start_threshold_stays_idle() {
    let mut det = CycleDetector::new(cfg());
    let key = key();
    for t in 0..10u64 {
        assert!(det.process(&key, 4, 4, t * 100).is_none());
    }
    assert_eq!(det.active_count(), 0);
    assert_eq!(det.buffered(&key), 0);
}

#[test]
fn full_cycle_completes_exactly_once() {
    let mut det = CycleDetector::new(cfg());
    let key = key();

    assert!(det.process(&key, 10, 8, 0).is_none());
    assert!(det.process(&key, 30, 20, 100).is_none());
    assert!(det.process(&key, 20, 12, 200).is_none());
    assert!(det.process(&key, 0, 0, 300).is_none());
    assert!(det.process(&key, 0, 0, 400).is_none());
    let done = det.process(&key, 0, 0, 500).expect("third end reading completes");

    assert_eq!(done.cycle_type, CycleType::Complete);
    assert_eq!(done.captured, 3);
    assert_eq!(done.started_at_ms, 0);
    assert_eq!(done.ended_at_ms, 500);
    // Three captured samples plus the padded zero tail.
    assert_eq!(done.th.len(), 6);
    assert_eq!(done.side.len(), 6);
    assert_eq!(done.th.last().map(|s| s.value), Some(0));

    // The machine is idle again; more end readings do nothing.
    assert!(det.process(&key, 0, 0, 600).is_none());
    assert_eq!(det.active_count(), 0);
}

#[test]
fn end_blip_resets_debounce() {
    let mut det = CycleDetector::new(cfg());
    let key = key();

    assert!(det.process(&key, 10, 8, 0).is_none());
    assert!(det.process(&key, 0, 0, 100).is_none());
    assert!(det.process(&key, 0, 0, 200).is_none());
    // Pressure returns: the two end readings above were a blip.
    assert!(det.process(&key, 15, 10, 300).is_none());
    assert!(det.process(&key, 0, 0, 400).is_none());
    assert!(det.process(&key, 0, 0, 500).is_none());
    let done = det.process(&key, 0, 0, 600).expect("fresh streak completes");

    // The blip's end readings were never buffered; both active readings were.
    assert_eq!(done.captured, 2);
    assert_eq!(done.ended_at_ms, 600);
}

#[test]
fn too_few_samples_is_a_short_cycle() {
    let mut det = CycleDetector::new(cfg());
    let key = key();

    assert!(det.process(&key, 10, 8, 0).is_none());
    assert!(det.process(&key, 12, 9, 100).is_none());
    assert!(det.process(&key, 0, 0, 300).is_none());
    assert!(det.process(&key, 0, 0, 400).is_none());
    let done = det.process(&key, 0, 0, 500).expect("completes");

    assert_eq!(done.cycle_type, CycleType::ShortCycle);
    assert_eq!(done.captured, 2);
}

#[test]
fn min_duration_delays_completion() {
    let mut det = CycleDetector::new(cfg());
    let key = key();

    assert!(det.process(&key, 10, 8, 0).is_none());
    assert!(det.process(&key, 11, 9, 10).is_none());
    assert!(det.process(&key, 12, 9, 20).is_none());
    // Debounce satisfied at t=50 but the cycle is still under 200ms.
    assert!(det.process(&key, 0, 0, 30).is_none());
    assert!(det.process(&key, 0, 0, 40).is_none());
    assert!(det.process(&key, 0, 0, 50).is_none());
    let done = det.process(&key, 0, 0, 250).expect("completes once old enough");
    assert_eq!(done.cycle_type, CycleType::Complete);
    assert_eq!(done.ended_at_ms, 250);
}

#[test]
fn buffer_overflow_force_completes() {
    let mut det = CycleDetector::new(cfg());
    let key = key();

    let mut done = None;
    for i in 0..20u64 {
        if let Some(d) = det.process(&key, 10, 8, i * 100) {
            done = Some((i, d));
            break;
        }
    }
    let (at, done) = done.expect("overflow must force completion");
    // max_buffer_len is 10, so the 11th buffered sample trips the guard.
    assert_eq!(at, 10);
    assert_eq!(done.cycle_type, CycleType::Overflow);
    assert_eq!(done.captured, 11);
    assert_eq!(done.th.last().map(|s| s.value), Some(0));
    assert_eq!(det.active_count(), 0);
}

#[test]
fn timed_out_cycle_is_discarded_without_a_record() {
    let mut det = CycleDetector::new(cfg());
    let key = key();

    assert!(det.process(&key, 10, 8, 0).is_none());
    assert!(det.process(&key, 12, 9, 50_000).is_none());
    assert_eq!(det.buffered(&key), 2);

    // At exactly 100s the cycle is still live.
    assert!(det.process(&key, 11, 9, 100_000).is_none());
    assert_eq!(det.buffered(&key), 3);

    // Strictly past 100s it is dropped and this reading opens a fresh one.
    assert!(det.process(&key, 10, 8, 100_001).is_none());
    assert_eq!(det.buffered(&key), 1);

    assert!(det.process(&key, 20, 15, 100_101).is_none());
    assert!(det.process(&key, 25, 18, 100_201).is_none());
    assert!(det.process(&key, 0, 0, 100_301).is_none());
    assert!(det.process(&key, 0, 0, 100_401).is_none());
    let done = det.process(&key, 0, 0, 100_501).expect("new cycle completes");
    assert_eq!(done.started_at_ms, 100_001);
    assert_eq!(done.captured, 3);
}

#[test]
fn prune_drops_unlisted_positions() {
    let mut det = CycleDetector::new(cfg());
    let keep = key();
    let gone = CycleKey {
        line: "G6".into(),
        machine: 2,
        position: Position::Right,
    };

    det.process(&keep, 10, 8, 0);
    det.process(&gone, 10, 8, 0);
    assert_eq!(det.active_count(), 2);

    det.prune(|k| k.line == "G5");
    assert_eq!(det.active_count(), 1);
    assert_eq!(det.buffered(&keep), 1);
    assert_eq!(det.buffered(&gone), 0);
}
