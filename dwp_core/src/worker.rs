//! Per-device polling workers.
//!
//! Each worker owns its reader and sweeps one device on its own thread, so a
//! PLC that blocks on a dead TCP connection cannot stall the sweep of the
//! others. Readings flow over a bounded channel into the single-threaded
//! detector stage, which keeps all cycle state free of locks.
//!
//! Safety: each `DeviceWorker` spawns exactly one thread that is shut down
//! when the worker is dropped, preventing thread leaks.
use crate::error::Result;
use crate::poller::Poller;
use crate::ports::{CycleStore, DeviceConfigSource};
use crate::types::MachineReading;
use crossbeam_channel as xch;
use dwp_config::Device;
use dwp_traits::RegisterReader;
use dwp_traits::clock::{Clock, MonotonicClock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// One message from a device worker to the detector stage.
#[derive(Debug)]
pub enum PollEvent {
    Reading(MachineReading),
    ReadFailed {
        device: String,
        machine: String,
        error: String,
    },
}

pub struct DeviceWorker {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl DeviceWorker {
    pub fn spawn<R, C>(
        mut reader: R,
        device: Device,
        unit_id: u8,
        timeout: Duration,
        interval: Duration,
        tx: xch::Sender<PollEvent>,
        clock: C,
    ) -> Self
    where
        R: RegisterReader + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            'poll: loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!(device = %device.name, "worker received shutdown signal");
                    break;
                }

                for line in &device.lines {
                    let line_id = line.line_id();
                    for machine in &line.machines {
                        let channels = MachineReading::channels(machine);
                        let event = match reader.read(&device.address, unit_id, &channels, timeout)
                        {
                            Ok(values) => PollEvent::Reading(MachineReading::from_values(
                                &device.name,
                                &line_id,
                                machine,
                                &values,
                            )),
                            Err(e) => PollEvent::ReadFailed {
                                device: device.name.clone(),
                                machine: machine.name.clone(),
                                error: e.to_string(),
                            },
                        };
                        // If send fails, the detector stage is gone; exit.
                        if tx.send(event).is_err() {
                            tracing::debug!(
                                device = %device.name,
                                "worker consumer disconnected, exiting thread"
                            );
                            break 'poll;
                        }
                    }
                }

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(interval);
            }
            tracing::trace!("device worker exiting cleanly");
        });

        Self {
            shutdown,
            join_handle: Some(join_handle),
        }
    }
}

impl Drop for DeviceWorker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // The thread exits either between reads or after the current read's
        // timeout expires.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("device worker joined"),
                Err(e) => tracing::warn!(?e, "device worker panicked during shutdown"),
            }
        }
    }
}

/// Spawn one worker per device with its own reader from `make_reader`.
pub fn spawn_device_workers<R, F>(
    devices: &[Device],
    unit_id: u8,
    timeout: Duration,
    interval: Duration,
    make_reader: F,
) -> (Vec<DeviceWorker>, xch::Receiver<PollEvent>)
where
    R: RegisterReader + Send + 'static,
    F: Fn(&Device) -> R,
{
    let (tx, rx) = xch::bounded(devices.len().max(1) * 16);
    let workers = devices
        .iter()
        .map(|d| {
            DeviceWorker::spawn(
                make_reader(d),
                d.clone(),
                unit_id,
                timeout,
                interval,
                tx.clone(),
                MonotonicClock::new(),
            )
        })
        .collect();
    (workers, rx)
}

/// Detector stage for worker mode: drains poll events and runs housekeeping
/// on the poller's tick interval. The poller's own reader is unused here
/// (pass `mocks::NoopReader`).
pub fn run_event_loop<R, S, D>(
    poller: &mut Poller<R, S, D>,
    rx: &xch::Receiver<PollEvent>,
    shutdown: &AtomicBool,
) -> Result<()>
where
    R: RegisterReader,
    S: CycleStore,
    D: DeviceConfigSource,
{
    let ticker = xch::tick(poller.tick_interval());
    tracing::info!("detector stage starting");
    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        xch::select! {
            recv(rx) -> event => match event {
                Ok(PollEvent::Reading(reading)) => poller.process_reading(reading),
                Ok(PollEvent::ReadFailed { device, machine, error }) => {
                    poller.note_read_failure(&device, &machine, &error);
                }
                // All workers gone.
                Err(_) => break,
            },
            recv(ticker) -> _ => poller.tick_housekeeping(),
        }
    }
    tracing::info!("detector stage stopped");
    Ok(())
}
