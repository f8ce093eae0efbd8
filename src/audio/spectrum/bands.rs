// src/audio/spectrum/bands.rs
//! Log-spaced display frequencies and their mapping onto FFT bins.

use std::f32::consts::LN_2;

use crate::config::MIN_SAMPLE_RATE;

/// Immutable table of display frequencies, log-spaced from `min_hz` to `max_hz`.
#[derive(Debug, Clone)]
pub struct FrequencyTable {
    frequencies: Vec<f32>,
}

impl FrequencyTable {
    pub fn new(num_points: usize, min_hz: f32, max_hz: f32) -> Self {
        let ratio = max_hz / min_hz;
        let last = (num_points - 1) as f32;
        let frequencies = (0..num_points)
            .map(|i| min_hz * ratio.powf(i as f32 / last))
            .collect();
        Self { frequencies }
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.frequencies
    }

    /// Index of the display frequency closest to `freq` on a log scale.
    pub fn nearest_index(&self, freq: f32) -> usize {
        let target = freq.max(f32::MIN_POSITIVE).log2();
        self.frequencies
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (a.log2() - target).abs();
                let db = (b.log2() - target).abs();
                da.total_cmp(&db)
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

/// Contiguous bin range of one display point and where its weights start.
#[derive(Debug, Clone, Copy, Default)]
struct BinSpan {
    start: usize,
    end: usize,
    weights_at: usize,
    weight_sum: f32,
}

/// Maps display frequencies onto Gaussian-weighted ranges of transform bins.
///
/// A bin's weight is `exp(-k · d²)`, `d` being its distance from the display
/// frequency in octaves, scaled by the bin's own width in octaves. The
/// aggregate is the weighted RMS of the bin magnitudes, i.e. an average over
/// log-frequency, so a pure tone peaks at the display point nearest to it.
pub struct BandMapper {
    block_size: usize,
    bandwidth: f32,
    /// Gaussian exponent `k`; the range edges sit three standard deviations out
    sharpness: f32,
    sample_rate: f32,
    spans: Vec<BinSpan>,
    weights: Vec<f32>,
}

/// Reference frequency for tone calibration and tilt.
pub const REFERENCE_HZ: f32 = 1_000.0;

impl BandMapper {
    pub fn new(table: &FrequencyTable, block_size: usize, bandwidth: f32, sample_rate: f32) -> Self {
        let sigma = (1.0 + bandwidth).log2() / 3.0;
        let mut mapper = Self {
            block_size,
            bandwidth,
            sharpness: 1.0 / (2.0 * sigma * sigma),
            sample_rate: 0.0,
            spans: vec![BinSpan::default(); table.len()],
            weights: Vec::with_capacity(max_weight_count(table, block_size, bandwidth)),
        };
        mapper.rebuild(table, sample_rate);
        mapper
    }

    /// Sample rate the current bin table was built for.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Highest valid bin index.
    fn nyquist_bin(&self) -> usize {
        self.block_size / 2
    }

    /// `round(freq * block_size / sample_rate)`, saturating instead of
    /// overflowing for absurd inputs.
    fn bin_of(&self, freq: f32) -> usize {
        let bin = (freq * self.block_size as f32 / self.sample_rate).round();
        if bin.is_finite() && bin > 0.0 {
            bin as usize
        } else {
            0
        }
    }

    /// Recompute every bin range and weight for `sample_rate`.
    pub fn rebuild(&mut self, table: &FrequencyTable, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.weights.clear();

        let bin_hz = sample_rate / self.block_size as f32;
        let spread = 1.0 + self.bandwidth;

        for (i, &freq) in table.as_slice().iter().enumerate() {
            let start = self.bin_of(freq / spread).max(1);
            let end = self.bin_of(freq * spread).min(self.nyquist_bin()) + 1;
            let (start, end) = if start < end { (start, end) } else { (0, 0) };
            let weights_at = self.weights.len();
            let mut weight_sum = 0.0;

            for bin in start..end {
                let bin_freq = bin as f32 * bin_hz;
                let distance = (bin_freq / freq).log2();
                let octave_width = 1.0 / (bin as f32 * LN_2);
                let weight = (-self.sharpness * distance * distance).exp() * octave_width;
                self.weights.push(weight);
                weight_sum += weight;
            }

            self.spans[i] = BinSpan {
                start,
                end,
                weights_at,
                weight_sum,
            };
        }
    }

    /// Aggregate `magnitudes` (length `block_size / 2 + 1`) into one value per
    /// display point. Points without usable bins read `None`.
    pub fn aggregate(&self, magnitudes: &[f32], out: &mut [Option<f32>]) {
        for (span, value) in self.spans.iter().zip(out.iter_mut()) {
            if span.weight_sum <= f32::MIN_POSITIVE || span.end > magnitudes.len() {
                *value = None;
                continue;
            }

            let weights = &self.weights[span.weights_at..span.weights_at + (span.end - span.start)];
            let energy: f32 = magnitudes[span.start..span.end]
                .iter()
                .zip(weights)
                .map(|(m, w)| w * m * m)
                .sum();
            *value = Some((energy / span.weight_sum).sqrt());
        }
    }

    /// Gain that maps the aggregate of a full-scale sinusoid at
    /// [`REFERENCE_HZ`] to 1.0, given the window's noise bandwidth.
    pub fn tone_gain(&self, enbw: f32) -> f32 {
        let reference_bin = REFERENCE_HZ * self.block_size as f32 / self.sample_rate;
        let weight_integral = (std::f32::consts::PI / self.sharpness).sqrt();
        (reference_bin * LN_2 * weight_integral / enbw).sqrt()
    }

    #[cfg(test)]
    fn span(&self, point: usize) -> (usize, usize) {
        (self.spans[point].start, self.spans[point].end)
    }

    #[cfg(test)]
    fn weight_capacity(&self) -> usize {
        self.weights.capacity()
    }
}

/// Most weights any accepted sample rate can need. Spans only narrow as the
/// rate rises, so [`MIN_SAMPLE_RATE`] bounds every rebuild.
fn max_weight_count(table: &FrequencyTable, block_size: usize, bandwidth: f32) -> usize {
    let spread = 1.0 + bandwidth;
    let nyquist = block_size / 2;
    table
        .as_slice()
        .iter()
        .map(|&freq| {
            let bins = freq * (spread - 1.0 / spread) * block_size as f32 / MIN_SAMPLE_RATE;
            (bins.ceil() as usize + 2).min(nyquist)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_canonical_formula() {
        let table = FrequencyTable::new(1024, 20.0, 20_000.0);
        assert_eq!(table.len(), 1024);
        assert!((table.as_slice()[0] - 20.0).abs() < 1e-3);
        assert!((table.as_slice()[1023] - 20_000.0).abs() < 0.5);

        let expected = 20.0 * 1000f32.powf(500.0 / 1023.0);
        assert!((table.as_slice()[500] - expected).abs() < 0.01);
        assert!(table.as_slice().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn nearest_index_finds_one_kilohertz() {
        let table = FrequencyTable::new(200, 20.0, 20_000.0);
        let index = table.nearest_index(1_000.0);
        assert_eq!(index, 113);
    }

    #[test]
    fn spans_stay_inside_the_spectrum() {
        let table = FrequencyTable::new(256, 20.0, 20_000.0);
        for sample_rate in [8_000.0, 22_050.0, 44_100.0, 192_000.0] {
            let mapper = BandMapper::new(&table, 1024, 0.3, sample_rate);
            for point in 0..table.len() {
                let (start, end) = mapper.span(point);
                if start < end {
                    assert!(start >= 1);
                    assert!(end <= 513, "{sample_rate} Hz point {point}: end {end}");
                }
            }
        }
    }

    #[test]
    fn span_covers_bandwidth_around_center() {
        let table = FrequencyTable::new(200, 20.0, 20_000.0);
        let mapper = BandMapper::new(&table, 1024, 0.3, 44_100.0);
        let point = table.nearest_index(1_000.0);
        let (start, end) = mapper.span(point);
        assert_eq!((start, end), (18, 32));
    }

    #[test]
    fn points_without_bins_read_none() {
        let table = FrequencyTable::new(64, 20.0, 20_000.0);
        let mapper = BandMapper::new(&table, 1024, 0.3, 8_000.0);
        let magnitudes = vec![1.0; 513];
        let mut out = vec![None; 64];
        mapper.aggregate(&magnitudes, &mut out);

        assert_eq!(out[63], None);
        assert!(out.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn flat_spectrum_aggregates_to_its_level() {
        let table = FrequencyTable::new(64, 100.0, 10_000.0);
        let mapper = BandMapper::new(&table, 4096, 0.3, 48_000.0);
        let magnitudes = vec![0.25; 2049];
        let mut out = vec![None; 64];
        mapper.aggregate(&magnitudes, &mut out);

        for value in out {
            let value = value.unwrap();
            assert!((value - 0.25).abs() < 1e-4, "got {value}");
        }
    }

    #[test]
    fn rebuild_tracks_new_sample_rate() {
        let table = FrequencyTable::new(200, 20.0, 20_000.0);
        let mut mapper = BandMapper::new(&table, 1024, 0.3, 44_100.0);
        let point = table.nearest_index(1_000.0);
        let before = mapper.span(point);

        mapper.rebuild(&table, 22_050.0);
        let after = mapper.span(point);

        assert_eq!(mapper.sample_rate(), 22_050.0);
        assert!(after.0 > before.0);
        assert!(after.1 > before.1);
    }

    #[test]
    fn rebuild_never_grows_the_weight_buffer() {
        let table = FrequencyTable::new(512, 20.0, 20_000.0);
        let mut mapper = BandMapper::new(&table, 8192, 0.5, 44_100.0);
        let reserved = mapper.weight_capacity();

        for rate in [8_000.0, 192_000.0, MIN_SAMPLE_RATE, 1_536_000.0, 44_100.0] {
            mapper.rebuild(&table, rate);
            assert_eq!(mapper.weight_capacity(), reserved, "{rate} Hz");
        }
    }
}
