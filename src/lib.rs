// src/lib.rs
//! Levelscope - a real-time spectral level estimator with a terminal display.
//!
//! The core lives in [`audio::spectrum`]: feed samples through a
//! [`audio::SampleProducer`], run [`audio::SpectrumEstimator::run_cycle`]
//! periodically (or let [`audio::AnalysisWorker`] do it), and read levels in
//! dB from any [`audio::SpectrumHandle`].

pub mod app;
pub mod audio;
pub mod config;
pub mod telemetry;
pub mod ui;
