// src/audio/spectrum/fft.rs
//! Hann-windowed real FFT producing a calibrated magnitude spectrum.

use std::sync::Arc;

use realfft::num_complex::Complex32;
use realfft::{RealFftPlanner, RealToComplex};

use super::AnalysisError;

/// Windowed transform stage. All buffers are allocated once in `new`.
pub struct WindowedTransform {
    fft: Arc<dyn RealToComplex<f32>>,
    /// Periodic Hann window, one coefficient per input sample
    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    magnitudes: Vec<f32>,
    /// Scales raw bin magnitudes so an on-bin sinusoid of amplitude A reads A
    amplitude_scale: f32,
    /// Equivalent noise bandwidth of the window, in bins
    enbw: f32,
}

impl WindowedTransform {
    pub fn new(block_size: usize) -> Self {
        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(block_size);

        let window: Vec<f32> = (0..block_size)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / block_size as f32).cos())
            })
            .collect();

        let sum: f32 = window.iter().sum();
        let sum_sq: f32 = window.iter().map(|w| w * w).sum();

        Self {
            input: fft.make_input_vec(),
            spectrum: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            magnitudes: vec![0.0; block_size / 2 + 1],
            amplitude_scale: 2.0 / sum,
            enbw: block_size as f32 * sum_sq / (sum * sum),
            window,
            fft,
        }
    }

    pub fn block_size(&self) -> usize {
        self.window.len()
    }

    pub fn enbw(&self) -> f32 {
        self.enbw
    }

    /// Window `block` (oldest sample first) and return `block_size / 2 + 1`
    /// magnitudes. Non-finite samples are analyzed as silence.
    pub fn analyze(&mut self, block: &[f32]) -> Result<&[f32], AnalysisError> {
        if block.len() != self.window.len() {
            return Err(AnalysisError::BlockLength {
                expected: self.window.len(),
                actual: block.len(),
            });
        }

        for ((slot, &sample), &w) in self.input.iter_mut().zip(block).zip(&self.window) {
            let sample = if sample.is_finite() { sample } else { 0.0 };
            *slot = sample * w;
        }

        self.fft
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)?;

        let scale = self.amplitude_scale;
        for (mag, c) in self.magnitudes.iter_mut().zip(&self.spectrum) {
            *mag = c.norm() * scale;
        }
        Ok(&self.magnitudes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_bins: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq_bins * i as f32 / len as f32).sin()
            })
            .collect()
    }

    #[test]
    fn hann_enbw_is_one_and_a_half_bins() {
        let transform = WindowedTransform::new(1024);
        assert!((transform.enbw() - 1.5).abs() < 1e-3);
    }

    #[test]
    fn on_bin_sine_reads_its_amplitude() {
        let mut transform = WindowedTransform::new(1024);
        let block = sine(32.0, 0.5, 1024);
        let magnitudes = transform.analyze(&block).unwrap();

        assert_eq!(magnitudes.len(), 513);
        assert!((magnitudes[32] - 0.5).abs() < 1e-3, "got {}", magnitudes[32]);
        assert!((magnitudes[31] - 0.25).abs() < 1e-3);
        assert!(magnitudes[40] < 1e-4);
    }

    #[test]
    fn non_finite_samples_are_silenced() {
        let mut transform = WindowedTransform::new(256);
        let mut block = vec![0.0; 256];
        block[10] = f32::NAN;
        block[20] = f32::INFINITY;
        let magnitudes = transform.analyze(&block).unwrap();
        assert!(magnitudes.iter().all(|m| *m == 0.0));
    }

    #[test]
    fn wrong_block_length_is_rejected() {
        let mut transform = WindowedTransform::new(256);
        assert!(matches!(
            transform.analyze(&[0.0; 128]),
            Err(AnalysisError::BlockLength {
                expected: 256,
                actual: 128
            })
        ));
    }
}
