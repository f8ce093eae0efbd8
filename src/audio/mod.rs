// src/audio/mod.rs
//! Audio module - playback, capture and spectral analysis.

pub mod player;
pub mod sample_capture;
pub mod spectrum;

// Re-export commonly used types
pub use player::Player;
pub use sample_capture::SampleCapture;
pub use spectrum::{AnalysisWorker, SampleProducer, SpectrumEstimator, SpectrumHandle};
