// src/app/state.rs
//! Application state management.

use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::Frame;
use tracing::info;

use crate::{
    audio::{spectrum, AnalysisWorker, Player, SpectrumHandle},
    config::Settings,
    ui::{
        keybindings::{key_to_action, Action},
        layout::{compute_layout, SectionVisibility},
        widgets::{render_status_panel, SpectrumRenderer, StatusInfo},
    },
};

/// Test tone limits when transposing.
const MIN_TONE_HZ: f32 = 20.0;
const MAX_TONE_HZ: f32 = 20_000.0;

/// What the player is fed with.
#[derive(Debug, Clone, PartialEq)]
pub enum Playback {
    File(PathBuf),
    Tone(f32),
}

/// Main application state.
pub struct App {
    player: Player,
    /// Keeps consumer cycles running for as long as the app lives
    worker: AnalysisWorker,
    spectrum: SpectrumHandle,
    renderer: SpectrumRenderer,
    playback: Playback,
    /// Reused between frames
    levels: Vec<f32>,
    pub visibility: SectionVisibility,
}

impl App {
    /// Wire up estimator, worker and player, and start `playback`.
    pub fn new(settings: &Settings, playback: Playback) -> Result<Self> {
        let (producer, estimator) = spectrum::channel(&settings.analyzer)?;
        let worker = AnalysisWorker::spawn(estimator, settings.analyzer.refresh_hz)?;
        let spectrum = worker.handle().clone();
        let player = Player::new(producer)?;

        let app = Self {
            player,
            worker,
            levels: vec![spectrum.floor_db(); spectrum.num_points()],
            spectrum,
            renderer: SpectrumRenderer::new(&settings.display),
            playback,
            visibility: SectionVisibility::default(),
        };
        app.start_playback();
        Ok(app)
    }

    fn start_playback(&self) {
        match &self.playback {
            Playback::File(path) => self.player.play(path),
            Playback::Tone(freq_hz) => self.player.tone(*freq_hz),
        }
    }

    /// Handle a key event and return true if the app should quit.
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        match key_to_action(&key) {
            Action::TogglePause => {
                if !self.player.is_playing() {
                    self.start_playback();
                } else if self.player.is_paused() {
                    self.player.resume();
                } else {
                    self.player.pause();
                }
            }
            Action::Stop => self.player.stop(),
            Action::Transpose(semitones) => {
                if let Playback::Tone(freq_hz) = self.playback {
                    let shifted = transpose(freq_hz, semitones);
                    info!(freq_hz = shifted, "test tone");
                    self.playback = Playback::Tone(shifted);
                    self.start_playback();
                }
            }
            Action::ToggleSection(section) => self.visibility.toggle(section),
            Action::Quit => {
                self.player.stop();
                return true;
            }
            Action::None => {}
        }
        false
    }

    /// Pull the latest published levels.
    pub fn refresh(&mut self) {
        self.spectrum.read_levels(&mut self.levels);
    }

    /// Draw the application UI.
    pub fn draw(&mut self, f: &mut Frame<'_>) {
        let layout = compute_layout(f.area(), &self.visibility);

        if let Some(area) = layout.status_area {
            let source = match &self.playback {
                Playback::File(path) => path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
                Playback::Tone(freq_hz) => format!("sine {freq_hz:.1} Hz"),
            };
            let info = StatusInfo {
                source: &source,
                is_playing: self.player.is_playing(),
                is_paused: self.player.is_paused(),
                sample_rate: self.spectrum.sample_rate(),
                peak: self.peak(),
                overruns: self.spectrum.overruns(),
            };
            render_status_panel(f, area, &info);
        }

        if let Some(area) = layout.spectrum_area {
            self.renderer.render(
                f,
                area,
                &self.levels,
                self.spectrum.frequencies(),
                self.spectrum.floor_db(),
                self.spectrum.ceiling_db(),
            );
        }
    }

    /// Loudest display point above the floor.
    fn peak(&self) -> Option<(f32, f32)> {
        let floor = self.spectrum.floor_db();
        self.levels
            .iter()
            .zip(self.spectrum.frequencies())
            .filter(|(db, _)| **db > floor)
            .max_by(|a, b| a.0.total_cmp(b.0))
            .map(|(&db, &freq)| (freq, db))
    }

    /// Stop the analysis thread.
    pub fn shutdown(self) -> Result<()> {
        self.player.stop();
        self.worker.stop().map(drop)
    }
}

/// Shift `freq_hz` by `semitones` in equal temperament, kept within the
/// audible range.
pub fn transpose(freq_hz: f32, semitones: i32) -> f32 {
    (freq_hz * 2f32.powf(semitones as f32 / 12.0)).clamp(MIN_TONE_HZ, MAX_TONE_HZ)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transpose_by_octave_doubles() {
        assert!((transpose(440.0, 12) - 880.0).abs() < 1e-2);
        assert!((transpose(440.0, -12) - 220.0).abs() < 1e-2);
        assert!((transpose(440.0, 1) - 466.16).abs() < 1e-2);
    }

    #[test]
    fn transpose_stays_audible() {
        assert_eq!(transpose(19_500.0, 12), MAX_TONE_HZ);
        assert_eq!(transpose(21.0, -12), MIN_TONE_HZ);
    }
}
