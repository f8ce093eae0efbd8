// src/audio/spectrum/worker.rs
//! Background thread that runs the estimator at a fixed refresh rate.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, trace};

use super::{CycleOutcome, SpectrumEstimator, SpectrumHandle};

/// Paces consumer cycles. A late cycle restarts the schedule from now instead
/// of bursting to catch up.
struct IntervalTimer {
    interval: Duration,
    next_tick: Instant,
    skipped: u64,
}

impl IntervalTimer {
    fn new(freq_hz: f32) -> Self {
        let interval = Duration::from_secs_f32(1.0 / freq_hz);
        Self {
            interval,
            next_tick: Instant::now() + interval,
            skipped: 0,
        }
    }

    /// Time left until the next tick, advancing the schedule.
    fn until_next_tick(&mut self) -> Duration {
        let now = Instant::now();
        let wait = if self.next_tick > now {
            self.next_tick - now
        } else {
            self.skipped += 1;
            trace!(skipped = self.skipped, "analysis cycle ran late");
            self.next_tick = now;
            Duration::ZERO
        };
        self.next_tick += self.interval;
        wait
    }
}

/// Owns a [`SpectrumEstimator`] on a dedicated thread and calls
/// [`SpectrumEstimator::run_cycle`] `refresh_hz` times per second.
///
/// Dropping the worker stops and joins the thread.
pub struct AnalysisWorker {
    handle: SpectrumHandle,
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<SpectrumEstimator>>,
}

impl AnalysisWorker {
    pub fn spawn(mut estimator: SpectrumEstimator, refresh_hz: f32) -> Result<Self> {
        if !(refresh_hz.is_finite() && refresh_hz > 0.0) {
            return Err(anyhow!("refresh rate must be positive, got {refresh_hz}"));
        }

        let handle = estimator.handle();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("spectrum-analysis".into())
            .spawn(move || {
                info!(refresh_hz, "analysis worker started");
                let mut timer = IntervalTimer::new(refresh_hz);
                let mut analyzed = 0u64;
                loop {
                    match shutdown_rx.recv_timeout(timer.until_next_tick()) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    if estimator.run_cycle() == CycleOutcome::Analyzed {
                        analyzed += 1;
                    }
                }
                debug!(analyzed, "analysis worker stopped");
                estimator
            })
            .context("failed to spawn analysis thread")?;

        Ok(Self {
            handle,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> &SpectrumHandle {
        &self.handle
    }

    /// Stop the thread and hand the estimator back.
    pub fn stop(mut self) -> Result<SpectrumEstimator> {
        self.shutdown.take();
        let thread = self
            .thread
            .take()
            .ok_or_else(|| anyhow!("analysis worker already stopped"))?;
        thread
            .join()
            .map_err(|_| anyhow!("analysis thread panicked"))
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
