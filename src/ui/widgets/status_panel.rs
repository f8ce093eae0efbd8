// src/ui/widgets/status_panel.rs
//! Playback and analyzer status panel.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// What the status panel shows.
pub struct StatusInfo<'a> {
    /// File name or tone description
    pub source: &'a str,
    pub is_playing: bool,
    pub is_paused: bool,
    pub sample_rate: f32,
    /// Loudest display point as (frequency Hz, level dB)
    pub peak: Option<(f32, f32)>,
    pub overruns: usize,
}

/// Render the status panel.
pub fn render_status_panel(f: &mut Frame<'_>, area: Rect, info: &StatusInfo<'_>) {
    f.render_widget(Block::default().borders(Borders::ALL).title("1: Status"), area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let state = if !info.is_playing {
        Span::styled(" ⏹ stopped ", Style::default().fg(Color::Gray))
    } else if info.is_paused {
        Span::styled(" ⏸ paused ", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(" ⏵ playing ", Style::default().fg(Color::Green))
    };
    f.render_widget(
        Paragraph::new(Line::from(vec![state, Span::raw(info.source)])),
        inner[0],
    );

    let peak = match info.peak {
        Some((freq, db)) => format!("peak {freq:.0} Hz at {db:.1} dB"),
        None => "peak -".to_string(),
    };
    let details = format!(
        "{:.0} Hz | {peak} | dropped {}   [space] pause  [s] stop  [up/down] tone  [q] quit",
        info.sample_rate, info.overruns
    );
    f.render_widget(
        Paragraph::new(details).alignment(Alignment::Left),
        inner[1],
    );
}
