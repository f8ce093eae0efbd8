// src/audio/spectrum/mod.rs
//! Real-time spectral estimator.
//!
//! The render thread feeds samples through a [`SampleProducer`]; a periodic
//! consumer runs [`SpectrumEstimator::run_cycle`] (usually via
//! [`AnalysisWorker`]) and publishes one level per display frequency, which
//! any thread can read through a [`SpectrumHandle`].
//!
//! Producer and consumer meet in an overwriting ring buffer behind a mutex.
//! The producer only ever try-locks it, so `push` never blocks and never
//! allocates; when the consumer holds the lock the samples wait in a private
//! ring until the next push. A full FIFO drops its oldest samples, never the
//! incoming ones. The sample rate is a single atomic word.

mod bands;
mod capture;
mod dynamics;
mod fft;
mod worker;

use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicU32, AtomicUsize, Ordering},
    Arc, Mutex, PoisonError, TryLockError,
};

use ringbuf::{traits::*, HeapRb};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{AnalyzerConfig, ConfigError, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};

pub use bands::{BandMapper, FrequencyTable, REFERENCE_HZ};
pub use capture::CaptureRing;
pub use dynamics::DynamicsShaper;
pub use fft::WindowedTransform;
pub use worker::AnalysisWorker;

/// FIFO capacity between producer and consumer, in analysis blocks.
const FIFO_BLOCKS: usize = 4;

/// Failures inside one analysis cycle. They never leave the consumer; the
/// cycle falls back to decay instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("expected a block of {expected} samples, got {actual}")]
    BlockLength { expected: usize, actual: usize },
    #[error("FFT failed: {0}")]
    Transform(#[from] realfft::FftError),
    #[error("analysis panicked: {0}")]
    Panicked(String),
}

/// Where the consumer stands with respect to the captured data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerState {
    /// Buffer filling, nothing new to analyze
    Idle,
    /// The ring wrapped since the last analysis
    BlockReady,
    /// Transform, mapping and shaping in progress
    Analyzing,
}

/// What one consumer cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A fresh block went through the full pipeline.
    Analyzed,
    /// No fresh block (or the transform failed); levels decayed.
    Decayed,
}

/// State shared by producer, consumer and display.
struct Shared {
    /// `f32` bits of the current sample rate
    sample_rate: AtomicU32,
    /// Samples overwritten before the consumer got to them
    overruns: AtomicUsize,
    /// Most recently published levels in dB
    levels: Mutex<Vec<f32>>,
    frequencies: Vec<f32>,
    floor_db: f32,
    ceiling_db: f32,
}

impl Shared {
    fn sample_rate(&self) -> f32 {
        f32::from_bits(self.sample_rate.load(Ordering::Acquire))
    }

    fn configure(&self, sample_rate: f32) {
        if sample_rate.is_finite() && (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate)
        {
            self.sample_rate
                .store(sample_rate.to_bits(), Ordering::Release);
        } else {
            warn!(sample_rate, "ignoring invalid sample rate");
        }
    }
}

/// Build a connected producer/estimator pair for `config`.
pub fn channel(config: &AnalyzerConfig) -> Result<(SampleProducer, SpectrumEstimator), ConfigError> {
    config.validate()?;

    let table = FrequencyTable::new(config.num_points, config.min_hz, config.max_hz);
    let shared = Arc::new(Shared {
        sample_rate: AtomicU32::new(config.default_sample_rate.to_bits()),
        overruns: AtomicUsize::new(0),
        levels: Mutex::new(vec![config.floor_db; config.num_points]),
        frequencies: table.as_slice().to_vec(),
        floor_db: config.floor_db,
        ceiling_db: config.ceiling_db,
    });

    let capacity = config.block_size * FIFO_BLOCKS;
    let fifo = Arc::new(Mutex::new(HeapRb::<f32>::new(capacity)));

    let transform = WindowedTransform::new(config.block_size);
    let mapper = BandMapper::new(
        &table,
        config.block_size,
        config.bandwidth,
        config.default_sample_rate,
    );
    let mut shaper = DynamicsShaper::new(config, &table);
    shaper.set_normalization(mapper.tone_gain(transform.enbw()));

    let estimator = SpectrumEstimator {
        fifo: Arc::clone(&fifo),
        shared: Arc::clone(&shared),
        ring: CaptureRing::new(config.block_size),
        transform,
        mapper,
        shaper,
        drain: vec![0.0; config.block_size],
        block: vec![0.0; config.block_size],
        energies: vec![None; config.num_points],
        levels: vec![config.floor_db; config.num_points],
        table,
        state: AnalyzerState::Idle,
        reported_overruns: 0,
    };
    let producer = SampleProducer {
        fifo,
        pending: HeapRb::new(capacity),
        shared,
    };
    Ok((producer, estimator))
}

/// Real-time entry point, owned by the audio render path.
pub struct SampleProducer {
    fifo: Arc<Mutex<HeapRb<f32>>>,
    /// Samples held back while the consumer had the FIFO locked
    pending: HeapRb<f32>,
    shared: Arc<Shared>,
}

impl SampleProducer {
    /// Queue samples for analysis. Never blocks or allocates; an empty slice
    /// is a no-op. When the consumer has fallen behind, the oldest queued
    /// samples are overwritten and counted.
    pub fn push(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let mut fifo = match self.fifo.try_lock() {
            Ok(fifo) => fifo,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                let lost = overflow(&self.pending, samples.len());
                self.pending.push_slice_overwrite(samples);
                self.count_overruns(lost);
                return;
            }
        };

        let (older, newer) = self.pending.as_slices();
        let lost = overflow(&fifo, older.len() + newer.len() + samples.len());
        fifo.push_slice_overwrite(older);
        fifo.push_slice_overwrite(newer);
        fifo.push_slice_overwrite(samples);
        drop(fifo);

        self.pending.clear();
        self.count_overruns(lost);
    }

    fn count_overruns(&self, lost: usize) {
        if lost > 0 {
            self.shared.overruns.fetch_add(lost, Ordering::Relaxed);
        }
    }

    /// Same as [`SpectrumHandle::configure`].
    pub fn configure(&self, sample_rate: f32) {
        self.shared.configure(sample_rate);
    }

    pub fn handle(&self) -> SpectrumHandle {
        SpectrumHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Cheap, cloneable view for configuration and display.
#[derive(Clone)]
pub struct SpectrumHandle {
    shared: Arc<Shared>,
}

impl SpectrumHandle {
    /// Set the operating sample rate. Non-finite rates and rates outside
    /// [`MIN_SAMPLE_RATE`]..=[`MAX_SAMPLE_RATE`] are ignored; the previous
    /// value stays in effect. Takes effect on the next consumer cycle.
    pub fn configure(&self, sample_rate: f32) {
        self.shared.configure(sample_rate);
    }

    pub fn sample_rate(&self) -> f32 {
        self.shared.sample_rate()
    }

    /// Copy of the most recently published levels, one per display frequency.
    pub fn get_levels(&self) -> Vec<f32> {
        self.shared
            .levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Copy the published levels into `out` without allocating.
    pub fn read_levels(&self, out: &mut [f32]) {
        let levels = self
            .shared
            .levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let len = out.len().min(levels.len());
        out[..len].copy_from_slice(&levels[..len]);
    }

    /// Display frequencies the levels correspond to, in Hz.
    pub fn frequencies(&self) -> &[f32] {
        &self.shared.frequencies
    }

    pub fn num_points(&self) -> usize {
        self.shared.frequencies.len()
    }

    pub fn floor_db(&self) -> f32 {
        self.shared.floor_db
    }

    pub fn ceiling_db(&self) -> f32 {
        self.shared.ceiling_db
    }

    /// Total samples dropped because the consumer fell behind.
    pub fn overruns(&self) -> usize {
        self.shared.overruns.load(Ordering::Relaxed)
    }
}

/// Samples that appending `incoming` to `rb` would overwrite or discard.
fn overflow(rb: &HeapRb<f32>, incoming: usize) -> usize {
    (rb.occupied_len() + incoming).saturating_sub(rb.capacity().get())
}

/// Run one analysis, turning a panic into an error so the cycle can decay.
fn contain_panic<F>(analysis: F) -> Result<(), AnalysisError>
where
    F: FnOnce() -> Result<(), AnalysisError>,
{
    panic::catch_unwind(AssertUnwindSafe(analysis)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|msg| msg.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string payload".to_string());
        Err(AnalysisError::Panicked(message))
    })
}

/// Consumer side: capture ring, transform, mapper and shaper.
pub struct SpectrumEstimator {
    fifo: Arc<Mutex<HeapRb<f32>>>,
    shared: Arc<Shared>,
    table: FrequencyTable,
    ring: CaptureRing,
    transform: WindowedTransform,
    mapper: BandMapper,
    shaper: DynamicsShaper,
    /// Staging for samples popped off the FIFO
    drain: Vec<f32>,
    /// Chronological copy of the ring handed to the transform
    block: Vec<f32>,
    energies: Vec<Option<f32>>,
    levels: Vec<f32>,
    state: AnalyzerState,
    reported_overruns: usize,
}

impl SpectrumEstimator {
    pub fn handle(&self) -> SpectrumHandle {
        SpectrumHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> AnalyzerState {
        self.state
    }

    /// Sample rate the bin mapping currently uses.
    pub fn sample_rate_in_use(&self) -> f32 {
        self.mapper.sample_rate()
    }

    pub fn frequencies(&self) -> &FrequencyTable {
        &self.table
    }

    /// Run one consumer cycle: pick up the sample rate, drain the FIFO into the
    /// ring, analyze a ready block (or decay), and publish the levels.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let sample_rate = self.shared.sample_rate();
        if sample_rate != self.mapper.sample_rate() {
            self.mapper.rebuild(&self.table, sample_rate);
            self.shaper
                .set_normalization(self.mapper.tone_gain(self.transform.enbw()));
            debug!(sample_rate, "rebuilt bin mapping");
        }

        self.drain_fifo();

        let outcome = if self.state == AnalyzerState::BlockReady {
            self.state = AnalyzerState::Analyzing;
            match contain_panic(|| self.analyze()) {
                Ok(()) => CycleOutcome::Analyzed,
                Err(err) => {
                    warn!(%err, "analysis failed, decaying instead");
                    self.shaper.shape_decay(&mut self.levels);
                    CycleOutcome::Decayed
                }
            }
        } else {
            self.shaper.shape_decay(&mut self.levels);
            CycleOutcome::Decayed
        };
        self.state = AnalyzerState::Idle;

        self.publish();
        outcome
    }

    /// Move everything the producer queued into the ring. Only the newest
    /// block's worth matters, older samples are skipped.
    fn drain_fifo(&mut self) {
        let popped = {
            let mut fifo = self.fifo.lock().unwrap_or_else(PoisonError::into_inner);
            let excess = fifo.occupied_len().saturating_sub(self.ring.block_size());
            if excess > 0 {
                fifo.skip(excess);
            }
            fifo.pop_slice(&mut self.drain)
        };
        self.ring.write(&self.drain[..popped]);

        if self.ring.is_ready() {
            self.state = AnalyzerState::BlockReady;
        }

        let overruns = self.shared.overruns.load(Ordering::Relaxed);
        if overruns != self.reported_overruns {
            debug!(
                dropped = overruns - self.reported_overruns,
                "consumer fell behind, samples dropped"
            );
            self.reported_overruns = overruns;
        }
    }

    fn analyze(&mut self) -> Result<(), AnalysisError> {
        self.ring.snapshot_into(&mut self.block);
        let magnitudes = self.transform.analyze(&self.block)?;
        self.mapper.aggregate(magnitudes, &mut self.energies);
        self.shaper.shape_fresh(&self.energies, &mut self.levels);
        Ok(())
    }

    fn publish(&self) {
        let mut levels = self
            .shared
            .levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        levels.copy_from_slice(&self.levels);
    }

    /// Drop captured samples and level history.
    pub fn reset(&mut self) {
        self.fifo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.ring.clear();
        self.shaper.reset();
        self.state = AnalyzerState::Idle;
        self.levels.fill(self.shaper.floor_db());
        self.publish();
    }
}
