#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core cycle-detection engine (transport-agnostic).
//!
//! This crate turns streams of raw pressure register readings into finished
//! cycle records. All field-bus access goes through
//! `dwp_traits::RegisterReader`; persistence and device configuration go
//! through the traits in `ports`.
//!
//! ## Architecture
//!
//! - **Detection**: per-position IDLE/ACTIVE state machine with debounced
//!   end detection (`detector` module)
//! - **Normalization**: time-based waveform resampling and statistics
//!   (`waveform` module)
//! - **Classification**: peak-pressure quality grading (`quality` module)
//! - **Orchestration**: device sweep, counters, maintenance (`poller` module)
//! - **Concurrency**: per-device reader threads feeding a single-threaded
//!   detector stage (`worker` module)

pub mod detector;
pub mod error;
pub mod mocks;
pub mod poller;
pub mod ports;
pub mod quality;
pub mod types;
pub mod waveform;
pub mod worker;

pub use detector::{CompletedCycle, CycleDetector};
pub use error::{PollError, Result};
pub use poller::{DeviceStats, PollStats, Poller};
pub use ports::{CycleStore, DeviceConfigSource, OutputPort};
pub use quality::{Classification, QualityGrade, classify};
pub use types::{
    CycleKey, CycleRecord, CycleType, MachineReading, Position, PositionReading, Sample,
};
pub use waveform::WaveformStats;
pub use worker::{DeviceWorker, PollEvent, run_event_loop, spawn_device_workers};
