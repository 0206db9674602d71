use super::app::Session;
use crate::stats::RollingBuffer;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Sparkline},
};

const HELP: &str = ":c :h :k=kind for profiles; :f= to filter; :s sort; :r refresh; ↓ and ↑ to paginate";

pub fn render(frame: &mut Frame, session: &Session) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Prompt and help
            Constraint::Length(3), // goroutines
            Constraint::Length(3), // threads
            Constraint::Length(3), // blocked
            Constraint::Length(1), // Status
            Constraint::Min(0),    // Report
        ])
        .split(frame.area());

    render_prompt(frame, session, chunks[0]);

    let stats = session.stats();
    render_sparkline(frame, "goroutines", &stats.goroutines, chunks[1]);
    render_sparkline(frame, "threads", &stats.threads, chunks[2]);
    render_sparkline(frame, "blocked", &stats.blocks, chunks[3]);

    render_status(frame, session, chunks[4]);
    render_report(frame, session, chunks[5]);
}

fn render_prompt(frame: &mut Frame, session: &Session, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(33), Constraint::Percentage(67)])
        .split(area);

    frame.render_widget(Paragraph::new(session.prompt()), chunks[0]);
    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().bg(Color::Blue).fg(Color::White)),
        chunks[1],
    );
}

fn render_sparkline(frame: &mut Frame, title: &str, buffer: &RollingBuffer, area: Rect) {
    let title = match buffer.last() {
        Some(v) => format!("{} ({})", title, v),
        None => title.to_string(),
    };
    let data = buffer.as_vec();
    let sparkline = Sparkline::default()
        .block(Block::default().title(title))
        .data(&data)
        .style(Style::default().fg(Color::Cyan));
    frame.render_widget(sparkline, area);
}

fn render_status(frame: &mut Frame, session: &Session, area: Rect) {
    let sort = if session.is_cumulative() { "cum" } else { "flat" };
    let mut spans = vec![
        Span::styled(
            format!(" {} ", session.kind()),
            Style::default().bg(Color::Cyan).fg(Color::Black),
        ),
        Span::raw(format!(" sort={} page={}", sort, session.page() + 1)),
    ];
    if !session.filter_text().is_empty() {
        spans.push(Span::raw(format!(" filter={}", session.filter_text())));
    }
    if let Some(at) = session.stats().last().and_then(|s| s.taken_at()) {
        spans.push(Span::styled(
            format!(" │ stats {}", at.format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if !session.status().is_empty() {
        spans.push(Span::styled(
            format!(" │ {}", session.status()),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_report(frame: &mut Frame, session: &Session, area: Rect) {
    let report = session.report();
    let header = report
        .header
        .iter()
        .map(|h| Line::styled(h.as_str(), Style::default().add_modifier(Modifier::BOLD)));
    let lines = session.page_lines().iter().map(|l| Line::raw(l.as_str()));
    let text: Vec<Line> = header.chain(lines).collect();
    frame.render_widget(Paragraph::new(text), area);
}
