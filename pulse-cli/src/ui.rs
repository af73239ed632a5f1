use pulse_lib::metronome::BEATS_PER_BAR;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Terminal,
};

use crate::controls::StatusSnapshot;

const KEYS: &str =
    "space play/pause · s stop · r restart · p repeat · m metronome · -/= bpm · ←/→ scrub · q quit";

pub fn draw_status(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    status: &StatusSnapshot,
    log_lines: &[String],
) {
    let _ = terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(f.size());

        let header = Paragraph::new(vec![
            Line::from(Span::styled(
                "PULSE",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(KEYS, Style::default().fg(Color::DarkGray))),
        ]);
        f.render_widget(header, chunks[0]);

        let progress = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Position"))
            .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
            .ratio(status.progress.clamp(0.0, 1.0))
            .label(status.progress_label.as_str());
        f.render_widget(progress, chunks[1]);

        let status_widget = Paragraph::new(status.text.as_str())
            .style(Style::default().fg(Color::Green))
            .block(Block::default().borders(Borders::ALL).title("Playback"));
        f.render_widget(status_widget, chunks[2]);

        let beats = Paragraph::new(beat_line(status.beat))
            .block(Block::default().borders(Borders::ALL).title("Beat"));
        f.render_widget(beats, chunks[3]);

        let log_height = chunks[4].height.saturating_sub(2) as usize;
        let start = log_lines.len().saturating_sub(log_height);
        let log_text = if log_lines.is_empty() {
            "No logs yet.".to_string()
        } else {
            log_lines[start..].join("\n")
        };
        let log_widget = Paragraph::new(log_text)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("Logs"));
        f.render_widget(log_widget, chunks[4]);
    });
}

/// One dot per beat in the bar; the current beat is lit, the downbeat in yellow.
fn beat_line(beat: Option<u64>) -> Line<'static> {
    let spans = (0..BEATS_PER_BAR)
        .map(|slot| {
            let lit = beat == Some(slot);
            let color = match (lit, slot) {
                (true, 0) => Color::Yellow,
                (true, _) => Color::Cyan,
                (false, _) => Color::DarkGray,
            };
            Span::styled(
                if lit { "● " } else { "○ " },
                Style::default().fg(color),
            )
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}
