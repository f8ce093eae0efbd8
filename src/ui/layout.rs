// src/ui/layout.rs
//! Layout computation for the UI panels.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Visibility state for UI sections.
#[derive(Debug, Clone, Copy)]
pub struct SectionVisibility {
    pub status: bool,
    pub spectrum: bool,
}

impl Default for SectionVisibility {
    fn default() -> Self {
        Self {
            status: true,
            spectrum: true,
        }
    }
}

impl SectionVisibility {
    /// Toggle a section by number (1-2).
    pub fn toggle(&mut self, section: usize) {
        match section {
            1 => self.status = !self.status,
            2 => self.spectrum = !self.spectrum,
            _ => {}
        }
    }
}

/// Computed layout areas for rendering.
#[derive(Debug, PartialEq)]
pub struct ComputedLayout {
    pub status_area: Option<Rect>,
    pub spectrum_area: Option<Rect>,
}

/// Height of the status panel, borders included.
const STATUS_HEIGHT: u16 = 5;

/// Split the terminal between the status panel on top and the spectrum below.
pub fn compute_layout(area: Rect, visibility: &SectionVisibility) -> ComputedLayout {
    match (visibility.status, visibility.spectrum) {
        (true, true) => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(STATUS_HEIGHT), Constraint::Min(3)])
                .split(area);
            ComputedLayout {
                status_area: Some(chunks[0]),
                spectrum_area: Some(chunks[1]),
            }
        }
        (true, false) => ComputedLayout {
            status_area: Some(area),
            spectrum_area: None,
        },
        (false, true) => ComputedLayout {
            status_area: None,
            spectrum_area: Some(area),
        },
        (false, false) => ComputedLayout {
            status_area: None,
            spectrum_area: None,
        },
    }
}
