//! Polling orchestrator: sweeps the device tree, feeds the detector, and
//! turns completed cycles into persisted records.
//!
//! Failure isolation rules:
//! - A failed register read skips that machine for the tick and leaves its
//!   detector state untouched; mid-cycle captures survive transport gaps.
//! - A failed save drops the record and does not advance the line counter,
//!   so cycle numbers stay contiguous in the store.
use crate::detector::{CompletedCycle, CycleDetector};
use crate::error::{PollError, Result, map_bus_error_dyn};
use crate::ports::{CycleStore, DeviceConfigSource, OutputPort};
use crate::quality;
use crate::types::{CycleKey, CycleRecord, CycleType, MachineReading, Position};
use crate::waveform;
use dwp_config::{Device, DetectorCfg, MaintenanceCfg, PollingCfg, QualityCfg};
use dwp_traits::RegisterReader;
use dwp_traits::clock::{Clock, MonotonicClock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Per-device read health.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceStats {
    pub reads_ok: u64,
    pub read_errors: u64,
}

/// Running totals, logged periodically and inspectable in tests.
#[derive(Debug, Default)]
pub struct PollStats {
    pub ticks: u64,
    pub reads_ok: u64,
    pub read_errors: u64,
    pub cycles_complete: u64,
    pub cycles_short: u64,
    pub cycles_overflow: u64,
    pub save_errors: u64,
    pub per_device: HashMap<String, DeviceStats>,
}

pub struct Poller<R: RegisterReader, S: CycleStore, D: DeviceConfigSource> {
    reader: R,
    store: S,
    source: D,
    output: Option<Box<dyn OutputPort>>,
    polling: PollingCfg,
    quality: QualityCfg,
    maintenance: MaintenanceCfg,
    detector: CycleDetector,
    devices: Vec<Device>,
    /// Last persisted cycle_number per line; advanced only on successful save.
    counters: HashMap<String, u64>,
    tick: u64,
    stats: PollStats,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl<R: RegisterReader, S: CycleStore, D: DeviceConfigSource> Poller<R, S, D> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reader: R,
        store: S,
        mut source: D,
        output: Option<Box<dyn OutputPort>>,
        polling: PollingCfg,
        detector: DetectorCfg,
        quality: QualityCfg,
        maintenance: MaintenanceCfg,
        clock: Option<Box<dyn Clock + Send + Sync>>,
    ) -> Result<Self> {
        let devices = source
            .devices()
            .map_err(|e| eyre::Report::new(PollError::Config(e.to_string())))?;
        dwp_config::validate_devices(&devices)?;
        let clock: Arc<dyn Clock + Send + Sync> = match clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };
        let epoch = clock.now();
        tracing::info!(devices = devices.len(), "poller initialized");
        Ok(Self {
            reader,
            store,
            source,
            output,
            polling,
            quality,
            maintenance,
            detector: CycleDetector::new(detector),
            devices,
            counters: HashMap::new(),
            tick: 0,
            stats: PollStats::default(),
            clock,
            epoch,
        })
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    /// Take the accumulated statistics, resetting them to zero.
    pub fn take_stats(&mut self) -> PollStats {
        let ticks = self.tick;
        let mut taken = std::mem::take(&mut self.stats);
        taken.ticks = ticks;
        self.stats.ticks = ticks;
        taken
    }

    /// Number of positions currently mid-cycle.
    pub fn active_cycles(&self) -> usize {
        self.detector.active_count()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.polling.tick_interval_secs)
    }

    fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// One full sweep over the device tree plus housekeeping.
    pub fn run_tick(&mut self) {
        let timeout = Duration::from_secs(self.polling.read_timeout_secs);
        let unit_id = self.polling.unit_id;
        let devices = self.devices.clone();
        for device in &devices {
            for line in &device.lines {
                let line_id = line.line_id();
                for machine in &line.machines {
                    let channels = MachineReading::channels(machine);
                    match self.reader.read(&device.address, unit_id, &channels, timeout) {
                        Ok(values) => {
                            let reading = MachineReading::from_values(
                                &device.name,
                                &line_id,
                                machine,
                                &values,
                            );
                            self.process_reading(reading);
                        }
                        Err(e) => {
                            let err = map_bus_error_dyn(&*e);
                            self.note_read_failure(&device.name, &machine.name, &err.to_string());
                        }
                    }
                }
            }
        }
        self.tick_housekeeping();
    }

    /// Run one reading through both position state machines. Shared by the
    /// direct sweep and the worker-fed event loop.
    pub fn process_reading(&mut self, reading: MachineReading) {
        let now_ms = self.now_ms();
        self.stats.reads_ok += 1;
        self.stats
            .per_device
            .entry(reading.device.clone())
            .or_default()
            .reads_ok += 1;

        let machine = reading.machine.machine_number();
        for (position, pr) in [
            (Position::Left, reading.left),
            (Position::Right, reading.right),
        ] {
            let key = CycleKey {
                line: reading.line.clone(),
                machine,
                position,
            };
            if let Some(done) = self.detector.process(&key, pr.th, pr.side, now_ms) {
                self.finalize(&key, done);
            }
        }
    }

    /// Record a failed machine read. Detector state is deliberately left
    /// alone; the next good read continues the capture.
    pub fn note_read_failure(&mut self, device: &str, machine: &str, error: &str) {
        tracing::warn!(device, machine, error, "register read failed");
        self.stats.read_errors += 1;
        self.stats
            .per_device
            .entry(device.to_string())
            .or_default()
            .read_errors += 1;
    }

    fn finalize(&mut self, key: &CycleKey, done: CompletedCycle) {
        match done.cycle_type {
            CycleType::Complete => self.stats.cycles_complete += 1,
            CycleType::ShortCycle => self.stats.cycles_short += 1,
            CycleType::Overflow => self.stats.cycles_overflow += 1,
        }

        let rate_hz = self.detector.cfg().resample_rate_hz;
        let window = self.detector.cfg().smoothing_window;
        let duration_secs = done.duration_secs();
        let mut waveform_th = waveform::resample(&done.th, duration_secs, rate_hz);
        let mut waveform_side = waveform::resample(&done.side, duration_secs, rate_hz);
        if window > 1 {
            waveform_th = waveform::smooth(&waveform_th, window);
            waveform_side = waveform::smooth(&waveform_side, window);
        }
        let peak_th = waveform::peak(&done.th);
        let peak_side = waveform::peak(&done.side);
        let cls = quality::classify(peak_th, peak_side, done.cycle_type, &self.quality);

        let cycle_number = match self.next_cycle_number(&key.line) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(cycle = %key, error = %e, "counter seed failed, dropping cycle");
                self.stats.save_errors += 1;
                return;
            }
        };

        let record = CycleRecord {
            line: key.line.clone(),
            machine: key.machine,
            position: key.position,
            cycle_number,
            cycle_type: done.cycle_type,
            grade: cls.grade,
            th_pass: cls.th_pass,
            side_pass: cls.side_pass,
            peak_th,
            peak_side,
            started_at_ms: done.started_at_ms,
            ended_at_ms: done.ended_at_ms,
            duration_secs,
            sample_count: done.captured,
            th_stats: waveform::statistics(&waveform_th),
            side_stats: waveform::statistics(&waveform_side),
            waveform_th,
            waveform_side,
        };

        match self.store.save(&record) {
            Ok(()) => {
                self.counters.insert(key.line.clone(), cycle_number);
                tracing::info!(
                    cycle = %key,
                    number = cycle_number,
                    cycle_type = ?record.cycle_type,
                    grade = ?record.grade,
                    peak_th,
                    peak_side,
                    "cycle recorded"
                );
                if let Some(out) = self.output.as_mut()
                    && let Err(e) = out.publish(&record)
                {
                    tracing::warn!(cycle = %key, error = %e, "output publish failed");
                }
            }
            Err(e) => {
                self.stats.save_errors += 1;
                tracing::warn!(cycle = %key, error = %e, "save failed, cycle dropped");
            }
        }
    }

    /// Next cycle_number for a line: cached last value plus one, seeded from
    /// the store on a cache miss.
    fn next_cycle_number(&mut self, line: &str) -> std::result::Result<u64, PollError> {
        let current = match self.counters.get(line) {
            Some(n) => *n,
            None => self
                .store
                .latest_cumulative(line)
                .map_err(|e| PollError::Persistence(e.to_string()))?,
        };
        Ok(current + 1)
    }

    /// End-of-tick bookkeeping: device refresh, memory pruning, stats log.
    pub fn tick_housekeeping(&mut self) {
        self.tick += 1;
        self.stats.ticks = self.tick;

        let refresh = self.polling.config_refresh_ticks;
        if refresh > 0 && self.tick.is_multiple_of(refresh) {
            self.refresh_devices();
        }
        let cleanup = self.maintenance.cleanup_interval_ticks;
        if cleanup > 0 && self.tick.is_multiple_of(cleanup) {
            self.run_maintenance();
        }
        let stats_every = self.polling.stats_interval_ticks;
        if stats_every > 0 && self.tick.is_multiple_of(stats_every) {
            tracing::info!(
                ticks = self.stats.ticks,
                reads_ok = self.stats.reads_ok,
                read_errors = self.stats.read_errors,
                cycles_complete = self.stats.cycles_complete,
                cycles_short = self.stats.cycles_short,
                cycles_overflow = self.stats.cycles_overflow,
                save_errors = self.stats.save_errors,
                active_cycles = self.detector.active_count(),
                "poll statistics"
            );
        }
    }

    fn refresh_devices(&mut self) {
        match self.source.devices() {
            Ok(devices) => match dwp_config::validate_devices(&devices) {
                Ok(()) => {
                    if devices != self.devices {
                        tracing::info!(devices = devices.len(), "device tree refreshed");
                        self.devices = devices;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "refreshed device tree invalid, keeping previous")
                }
            },
            Err(e) => tracing::warn!(error = %e, "device refresh failed, keeping previous"),
        }
    }

    /// Drop detector state for positions no longer configured, and counters
    /// for lines no longer configured.
    fn run_maintenance(&mut self) {
        let mut live_keys: HashSet<CycleKey> = HashSet::new();
        let mut live_lines: HashSet<String> = HashSet::new();
        for device in &self.devices {
            for line in &device.lines {
                let line_id = line.line_id();
                for machine in &line.machines {
                    for position in [Position::Left, Position::Right] {
                        live_keys.insert(CycleKey {
                            line: line_id.clone(),
                            machine: machine.machine_number(),
                            position,
                        });
                    }
                }
                live_lines.insert(line_id);
            }
        }
        let live_devices: HashSet<&str> = self.devices.iter().map(|d| d.name.as_str()).collect();
        let before = self.detector.active_count();
        self.detector.prune(|key| live_keys.contains(key));
        self.counters.retain(|line, _| live_lines.contains(line));
        self.counters.shrink_to_fit();
        self.stats
            .per_device
            .retain(|name, _| live_devices.contains(name.as_str()));
        let pruned = before - self.detector.active_count();
        if pruned > 0 {
            tracing::info!(pruned, "stale detector state pruned");
        }
    }

    /// Tick until the shutdown flag is raised.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        let interval = self.tick_interval();
        tracing::info!(
            interval_secs = self.polling.tick_interval_secs,
            "poll loop starting"
        );
        while !shutdown.load(Ordering::Relaxed) {
            self.run_tick();
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            self.clock.sleep(interval);
        }
        tracing::info!("poll loop stopped");
        Ok(())
    }
}
