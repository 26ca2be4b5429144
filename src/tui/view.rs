use rand::Rng;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};

use crate::music::params::{StreamKind, stream};
use crate::shared::DisplayState;

const ACCENT_COLORS: [Color; 6] = [
    Color::Cyan,
    Color::Magenta,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Red,
];

// each seed gets its own look, from the same stream that styled the
// original screen effects; it can never shift a musical draw
pub fn accent_for_seed(seed: u64) -> Color {
    let mut rng = stream(seed, StreamKind::Degradation);
    ACCENT_COLORS[rng.gen_range(0..ACCENT_COLORS.len())]
}

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, accent: Color) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // piece parameters
            Constraint::Length(3), // level gauge
            Constraint::Min(0),
        ])
        .split(area);

    draw_piece(frame, sections[0], state);
    draw_level(frame, sections[1], state, accent);
}

fn draw_piece(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let playing = if state.playing { "\u{25b6}" } else { " " };
    let lines = vec![
        Line::from(format!("seed     0x{:X}", state.seed)),
        Line::from(format!(
            "piece    {} BPM, {} pentatonic, root {:.2} Hz",
            state.bpm, state.scale_label, state.root_freq
        )),
        Line::from(format!(
            "voicing  {} bass, delay {} beats",
            state.bass_label, state.delay_beats
        )),
        Line::from(format!(
            "stream   segment {}  {} {}",
            state.segment_index, state.state_label, playing
        )),
        Line::from(format!("stalls   {}", state.backpressure_events)),
        Line::from("press q or esc to quit"),
    ];
    let block = Block::default().borders(Borders::ALL).title("seedbeat");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_level(frame: &mut Frame, area: Rect, state: &DisplayState, accent: Color) {
    let ratio = f64::from(state.level).clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("level"))
        .gauge_style(Style::default().fg(accent))
        .ratio(ratio)
        .label(format!("{:.3}", state.level));
    frame.render_widget(gauge, area);
}
