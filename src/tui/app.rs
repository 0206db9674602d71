use super::command::{Command, CommandBuffer};
use super::ui;
use crate::error::{Error, Result};
use crate::report::{self, TextOptions, TextReport, compile_filter};
use crate::stats::StatsPoller;
use crate::store::Registry;
use crossterm::{
    event::{self, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, prelude::*};
use regex::Regex;
use std::io::{self, stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Rows taken by everything but the report lines
pub const CHROME_ROWS: u16 = 11;

/// Input to the session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Key(KeyCode, KeyModifiers),
    Tick,
    Resize(u16, u16),
}

/// Terminal dashboard state
pub struct Session {
    registry: Arc<Registry>,
    kind: String,
    buffer: CommandBuffer,
    page: usize,
    filter_text: String,
    filter: Option<Regex>,
    cumulative: bool,
    report: TextReport,
    status: String,
    stats: StatsPoller,
    width: u16,
    height: u16,
    running: bool,
}

impl Session {
    pub fn new(registry: Arc<Registry>, kind: &str) -> Result<Self> {
        registry.require(kind)?;
        let stats = StatsPoller::new(registry.fetcher().clone());
        Ok(Session {
            registry,
            kind: kind.to_string(),
            buffer: CommandBuffer::default(),
            page: 0,
            filter_text: String::new(),
            filter: None,
            cumulative: false,
            report: TextReport::default(),
            status: String::new(),
            stats,
            width: 80,
            height: 24,
            running: true,
        })
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Key(code, modifiers) => self.handle_key(code, modifiers),
            Event::Tick => {
                self.load(false);
                self.stats.poll(self.width as usize);
            }
            Event::Resize(width, height) => {
                self.width = width;
                self.height = height;
                self.stats.resize(width as usize);
            }
        }
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            self.running = false;
            return;
        }

        if self.buffer.is_composing() {
            match code {
                KeyCode::Enter => {
                    if let Some(text) = self.buffer.commit() {
                        self.execute(&text);
                    }
                }
                KeyCode::Esc => self.buffer.cancel(),
                KeyCode::Backspace => self.buffer.pop(),
                KeyCode::Char(c) => self.buffer.push(c),
                _ => {}
            }
            return;
        }

        match code {
            KeyCode::Char(':') => self.buffer.start(),
            KeyCode::Char('q') => self.running = false,
            KeyCode::Up | KeyCode::PageUp => self.page = self.page.saturating_sub(1),
            KeyCode::Down | KeyCode::PageDown => self.page = self.page.saturating_add(1),
            _ => {}
        }
    }

    fn execute(&mut self, text: &str) {
        let Some(command) = Command::parse(text) else {
            self.status = format!("unknown command :{}", text);
            return;
        };
        log::debug!("command {:?}", command);

        match command {
            Command::Kind(kind) => {
                if let Err(e) = self.registry.require(&kind) {
                    self.status = e.to_string();
                    return;
                }
                self.kind = kind;
                self.page = 0;
                self.filter_text.clear();
                self.filter = None;
                self.load(false);
            }
            Command::Refresh => {
                self.page = 0;
                self.load(true);
            }
            Command::ToggleSort => {
                self.cumulative = !self.cumulative;
                self.page = 0;
                self.load(false);
            }
            Command::Filter(text) => match compile_filter(&text) {
                Ok(filter) => {
                    self.filter_text = text;
                    self.filter = filter;
                    self.page = 0;
                    self.load(false);
                }
                Err(e) => self.status = e.to_string(),
            },
            Command::Page(n) => self.page = n.saturating_sub(1),
        }
    }

    /// Fetch (or reuse) the current kind and rebuild the report.
    ///
    /// On failure the previous report stays displayed.
    fn load(&mut self, force: bool) {
        match self.build_report(force) {
            Ok(report) => {
                self.report = report;
                self.status.clear();
            }
            Err(e) => {
                log::warn!("loading {} failed: {}", self.kind, e);
                self.status = e.to_string();
            }
        }
    }

    fn build_report(&self, force: bool) -> Result<TextReport> {
        let profile = self.registry.require(&self.kind)?.fetch(force, 0)?;
        let tree = report::apply(&profile, self.filter.as_ref(), self.cumulative);
        Ok(report::render_text(&tree, &TextOptions::default()))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn is_cumulative(&self) -> bool {
        self.cumulative
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn prompt(&self) -> String {
        self.buffer.prompt()
    }

    pub fn report(&self) -> &TextReport {
        &self.report
    }

    pub fn stats(&self) -> &StatsPoller {
        &self.stats
    }

    /// Report lines that fit on one screen
    pub fn page_size(&self) -> usize {
        let header = self.report.header.len() as u16;
        self.height.saturating_sub(CHROME_ROWS + header).max(1) as usize
    }

    /// Lines of the current page; empty past the end
    pub fn page_lines(&self) -> &[String] {
        let size = self.page_size();
        let lines = &self.report.lines;
        let start = self.page.saturating_mul(size);
        if start >= lines.len() {
            return &[];
        }
        &lines[start..(start + size).min(lines.len())]
    }

    /// Run the dashboard until the operator quits
    pub fn run(&mut self, interval: Duration) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal, interval);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        interval: Duration,
    ) -> Result<()> {
        let size = terminal.size()?;
        self.handle(Event::Resize(size.width, size.height));
        self.draw(terminal)?;
        self.handle(Event::Tick);
        let mut last_tick = Instant::now();

        while self.running {
            self.draw(terminal)?;

            let timeout = interval.saturating_sub(last_tick.elapsed());
            if event::poll(timeout)? {
                match event::read()? {
                    event::Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle(Event::Key(key.code, key.modifiers));
                    }
                    event::Event::Resize(width, height) => {
                        self.handle(Event::Resize(width, height));
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= interval {
                self.handle(Event::Tick);
                last_tick = Instant::now();
            }
        }

        Ok(())
    }

    fn draw(&self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        terminal
            .draw(|frame| ui::render(frame, self))
            .map(|_| ())
            .map_err(Error::Io)
    }
}
