// src/ui/widgets/spectrum.rs
//! Bar rendering of the published spectrum levels.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::config::DisplayConfig;

/// Partial block characters, one eighth of a cell per step.
const EIGHTHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Renderer for the level spectrum, low frequencies on the left.
pub struct SpectrumRenderer {
    /// Bar width in characters
    bar_width: usize,
    /// Gap between bars
    bar_gap: usize,
}

impl SpectrumRenderer {
    pub fn new(display: &DisplayConfig) -> Self {
        Self {
            bar_width: display.bar_width.max(1),
            bar_gap: display.bar_gap,
        }
    }

    /// Render `levels_db` (one per display frequency in `frequencies`) inside a
    /// bordered block.
    pub fn render(
        &self,
        f: &mut Frame<'_>,
        area: Rect,
        levels_db: &[f32],
        frequencies: &[f32],
        floor_db: f32,
        ceiling_db: f32,
    ) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("2: Spectrum ({floor_db:.0}..{ceiling_db:.0} dB)"));
        let inner = block.inner(area);
        f.render_widget(block, area);

        if inner.height < 2 || inner.width < 2 {
            return;
        }

        let bar_spacing = self.bar_width + self.bar_gap;
        let bars = (inner.width as usize + self.bar_gap) / bar_spacing;
        let heights = bar_heights(levels_db, bars, floor_db, ceiling_db);

        // Last row carries frequency labels.
        let rows = inner.height as usize - 1;
        let mut lines: Vec<Line> = (0..rows)
            .map(|row| {
                let row_from_bottom = rows - row - 1;
                let mut text = String::with_capacity(inner.width as usize);
                for (i, &height) in heights.iter().enumerate() {
                    let cell = cell_char(height * rows as f32, row_from_bottom);
                    text.extend(std::iter::repeat_n(cell, self.bar_width));
                    if i + 1 < heights.len() {
                        text.extend(std::iter::repeat_n(' ', self.bar_gap));
                    }
                }
                Line::from(Span::styled(text, Style::default().fg(row_color(row_from_bottom, rows))))
            })
            .collect();
        lines.push(Line::from(axis_labels(frequencies, inner.width as usize)));

        f.render_widget(Paragraph::new(lines), inner);
    }
}

/// Reduce `levels_db` to `bars` bar heights in 0..=1. Each bar shows the
/// loudest display point it covers.
pub fn bar_heights(levels_db: &[f32], bars: usize, floor_db: f32, ceiling_db: f32) -> Vec<f32> {
    if levels_db.is_empty() || bars == 0 {
        return Vec::new();
    }
    let span = (ceiling_db - floor_db).max(f32::EPSILON);
    (0..bars)
        .map(|bar| {
            let start = bar * levels_db.len() / bars;
            let end = ((bar + 1) * levels_db.len() / bars).max(start + 1);
            let loudest = levels_db[start..end.min(levels_db.len())]
                .iter()
                .copied()
                .fold(floor_db, f32::max);
            ((loudest - floor_db) / span).clamp(0.0, 1.0)
        })
        .collect()
}

/// Character for one cell of a bar whose top sits `filled` cells above the
/// bottom row.
fn cell_char(filled: f32, row_from_bottom: usize) -> char {
    let above = filled - row_from_bottom as f32;
    if above >= 1.0 {
        '█'
    } else if above > 0.0 {
        let eighths = (above * 8.0) as usize;
        if eighths == 0 { ' ' } else { EIGHTHS[eighths - 1] }
    } else {
        ' '
    }
}

fn row_color(row_from_bottom: usize, rows: usize) -> Color {
    let fraction = (row_from_bottom + 1) as f32 / rows.max(1) as f32;
    if fraction > 0.85 {
        Color::Red
    } else if fraction > 0.6 {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Frequencies at the left edge, the middle and the right edge.
fn axis_labels(frequencies: &[f32], width: usize) -> String {
    let (Some(&first), Some(&last)) = (frequencies.first(), frequencies.last()) else {
        return String::new();
    };
    let middle = frequencies[frequencies.len() / 2];
    let left = format_hz(first);
    let center = format_hz(middle);
    let right = format_hz(last);

    let mut line = vec![' '; width];
    let mut place = |text: &str, at: usize| {
        for (offset, c) in text.chars().enumerate() {
            if let Some(slot) = line.get_mut(at + offset) {
                *slot = c;
            }
        }
    };
    place(&left, 0);
    place(&center, (width / 2).saturating_sub(center.len() / 2));
    place(&right, width.saturating_sub(right.len()));
    line.into_iter().collect()
}

fn format_hz(freq: f32) -> String {
    if freq >= 1_000.0 {
        format!("{:.1}k", freq / 1_000.0)
    } else {
        format!("{freq:.0}")
    }
}
