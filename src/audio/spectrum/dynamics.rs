// src/audio/spectrum/dynamics.rs
//! Turns aggregated band energies into clamped display levels in dB.

use super::bands::{FrequencyTable, REFERENCE_HZ};
use crate::config::AnalyzerConfig;

/// Normalization, tilt, attack/release ballistics, cross-band smoothing and
/// clamping. Temporal state is kept as linear magnitudes.
pub struct DynamicsShaper {
    /// Per-point tilt gain relative to the 1 kHz reference
    tilt_gains: Vec<f32>,
    normalization: f32,
    attack: f32,
    release: f32,
    decay: f32,
    floor_db: f32,
    ceiling_db: f32,
    ceiling_linear: f32,
    /// Half of a symmetric Gaussian kernel, index = distance from center
    kernel: Vec<f32>,
    /// Previous-cycle levels (linear)
    previous: Vec<f32>,
    scratch_db: Vec<f32>,
}

impl DynamicsShaper {
    pub fn new(config: &AnalyzerConfig, table: &FrequencyTable) -> Self {
        let tilt_gains = table
            .as_slice()
            .iter()
            .map(|&freq| {
                let tilt_db = config.tilt_db_per_octave * (freq / REFERENCE_HZ).log2();
                10f32.powf(tilt_db / 20.0)
            })
            .collect();

        let radius = config.smoothing_radius;
        let sigma = (radius as f32 / 2.0).max(0.5);
        let kernel = (0..=radius)
            .map(|j| (-0.5 * (j * j) as f32 / (sigma * sigma)).exp())
            .collect();

        Self {
            tilt_gains,
            normalization: 1.0,
            attack: config.attack,
            release: config.release,
            decay: config.decay,
            floor_db: config.floor_db,
            ceiling_db: config.ceiling_db,
            ceiling_linear: db_to_gain(config.ceiling_db),
            kernel,
            previous: vec![0.0; table.len()],
            scratch_db: vec![config.floor_db; table.len()],
        }
    }

    /// Set the fixed gain applied to raw aggregates before tilt.
    pub fn set_normalization(&mut self, gain: f32) {
        if gain.is_finite() && gain > 0.0 {
            self.normalization = gain;
        }
    }

    pub fn floor_db(&self) -> f32 {
        self.floor_db
    }

    /// Blend a freshly analyzed cycle into the state and write display levels.
    /// Points without an aggregate (`None`) decay as if no block arrived.
    pub fn shape_fresh(&mut self, raw: &[Option<f32>], out_db: &mut [f32]) {
        for ((prev, &value), &tilt) in self.previous.iter_mut().zip(raw).zip(&self.tilt_gains) {
            let Some(value) = value else {
                *prev *= self.decay;
                continue;
            };
            let target = value * self.normalization * tilt;
            let target = if target.is_nan() {
                0.0
            } else {
                target.clamp(0.0, self.ceiling_linear)
            };

            let blend = if target > *prev {
                self.attack
            } else {
                self.release
            };
            *prev += blend * (target - *prev);
        }
        self.publish(out_db);
    }

    /// No fresh block: relax every level toward the floor.
    pub fn shape_decay(&mut self, out_db: &mut [f32]) {
        for prev in self.previous.iter_mut() {
            *prev *= self.decay;
        }
        self.publish(out_db);
    }

    fn publish(&mut self, out_db: &mut [f32]) {
        let (floor, ceiling) = (self.floor_db, self.ceiling_db);
        for (db, &level) in self.scratch_db.iter_mut().zip(&self.previous) {
            *db = gain_to_db(level, floor, ceiling);
        }

        let radius = self.kernel.len() - 1;
        let len = self.scratch_db.len();
        for (i, out) in out_db.iter_mut().enumerate().take(len) {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(len - 1);
            let mut sum = 0.0;
            let mut weight_sum = 0.0;
            for (j, &db) in self.scratch_db[lo..=hi].iter().enumerate() {
                let weight = self.kernel[(lo + j).abs_diff(i)];
                sum += db * weight;
                weight_sum += weight;
            }
            *out = (sum / weight_sum).clamp(self.floor_db, self.ceiling_db);
        }
    }

    /// Forget all history; every level returns to the floor.
    pub fn reset(&mut self) {
        self.previous.fill(0.0);
    }
}

fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Non-positive and non-finite levels map to the floor rather than -inf.
fn gain_to_db(level: f32, floor_db: f32, ceiling_db: f32) -> f32 {
    if level > 0.0 && level.is_finite() {
        (20.0 * level.log10()).clamp(floor_db, ceiling_db)
    } else {
        floor_db
    }
}
