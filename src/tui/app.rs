//! Main application state and rendering

use crate::data::{level_for_xp, LEVEL_THRESHOLDS};
use crate::shell::{BufferedOutput, EditorKey, EditorSession, Mode, OutputLine, SessionInterpreter};
use crate::tui::widgets::ProgressBar;
use crate::tui::{create_main_layout, styled_block, Theme, EDITOR_KEYS, SMALL_LOGO, WELCOME};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::time::Duration;

/// Lines kept in the scrollback
const MAX_SCROLLBACK: usize = 1000;

/// Application state
pub struct App {
    pub session: SessionInterpreter,
    pub theme: Theme,
    pub running: bool,
    pub output: BufferedOutput,
    pub input_buffer: String,
    /// Lines scrolled up from the bottom of the scrollback
    pub scroll: u16,
    /// Position in history while recalling with Up/Down
    recall: Option<usize>,
}

impl App {
    pub fn new(session: SessionInterpreter) -> Self {
        let theme = Theme::default();
        let mut output = BufferedOutput::new();
        for line in WELCOME.lines() {
            output.lines.push(OutputLine::colored(line, crate::data::Color::Cyan));
        }
        Self {
            session,
            theme,
            running: true,
            output,
            input_buffer: String::new(),
            scroll: 0,
            recall: None,
        }
    }

    /// Handle keyboard input
    pub fn handle_input(&mut self) -> std::io::Result<bool> {
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(true);
                }
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                    self.running = false;
                    return Ok(false);
                }

                if matches!(self.session.mode(), Mode::Editor(_)) {
                    self.handle_editor_key(key);
                    return Ok(true);
                }

                match key.code {
                    KeyCode::Enter => self.submit(),
                    KeyCode::Backspace => {
                        self.input_buffer.pop();
                    }
                    KeyCode::Esc => self.input_buffer.clear(),
                    KeyCode::Up => self.recall_older(),
                    KeyCode::Down => self.recall_newer(),
                    KeyCode::PageUp => self.scroll = self.scroll.saturating_add(5),
                    KeyCode::PageDown => self.scroll = self.scroll.saturating_sub(5),
                    KeyCode::Char(c) => self.input_buffer.push(c),
                    _ => {}
                }
            }
        }
        Ok(true)
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        let editor_key = match key.code {
            KeyCode::Char('s') if control => EditorKey::Save,
            KeyCode::Char('x') if control => EditorKey::SaveAndExit,
            KeyCode::Char('q') if control => EditorKey::Exit,
            KeyCode::Esc => EditorKey::ExitWithoutSaving,
            KeyCode::Char(c) => EditorKey::Char(c),
            KeyCode::Enter => EditorKey::Enter,
            KeyCode::Backspace => EditorKey::Backspace,
            KeyCode::Delete => EditorKey::Delete,
            KeyCode::Left => EditorKey::Left,
            KeyCode::Right => EditorKey::Right,
            KeyCode::Up => EditorKey::Up,
            KeyCode::Down => EditorKey::Down,
            KeyCode::Home => EditorKey::Home,
            KeyCode::End => EditorKey::End,
            _ => return,
        };
        self.session.editor_key(editor_key, &mut self.output);
        self.trim_scrollback();
    }

    /// Commit the input line to the session
    fn submit(&mut self) {
        let line = std::mem::take(&mut self.input_buffer);
        let echo = if self.session.mode().is_secret() {
            self.session.prompt()
        } else {
            format!("{}{}", self.session.prompt(), line)
        };
        self.output
            .lines
            .push(OutputLine::colored(echo, crate::data::Color::Gray));

        self.session.submit_line(&line, &mut self.output);
        self.output.cleared = false;
        self.recall = None;
        self.scroll = 0;
        self.trim_scrollback();
    }

    fn trim_scrollback(&mut self) {
        let len = self.output.lines.len();
        if len > MAX_SCROLLBACK {
            self.output.lines.drain(..len - MAX_SCROLLBACK);
        }
    }

    fn recall_older(&mut self) {
        let available = self.session.history().count();
        if available == 0 || self.session.mode().is_secret() {
            return;
        }
        let index = match self.recall {
            None => 0,
            Some(index) => (index + 1).min(available - 1),
        };
        self.recall = Some(index);
        if let Some(line) = self.session.history().nth(index) {
            self.input_buffer = line.to_string();
        }
    }

    fn recall_newer(&mut self) {
        match self.recall {
            None => {}
            Some(0) => {
                self.recall = None;
                self.input_buffer.clear();
            }
            Some(index) => {
                self.recall = Some(index - 1);
                if let Some(line) = self.session.history().nth(index - 1) {
                    self.input_buffer = line.to_string();
                }
            }
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let layout = create_main_layout(frame.area());

        self.render_header(frame, layout[0]);
        match self.session.mode() {
            Mode::Editor(editor) => self.render_editor(frame, layout[1], editor),
            _ => self.render_scrollback(frame, layout[1]),
        }
        self.render_input(frame, layout[2]);
        self.render_progress(frame, layout[3]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let header_layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(20),
                Constraint::Min(20),
                Constraint::Length(32),
            ])
            .split(area);
        let border = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border));

        let logo = Paragraph::new(SMALL_LOGO)
            .style(Style::default().fg(self.theme.accent).add_modifier(Modifier::BOLD))
            .block(border.clone());
        frame.render_widget(logo, header_layout[0]);

        let mission_title = match self.session.missions().active_mission() {
            Some(mission) => {
                let (done, total) = mission.progress();
                format!("{} ({}/{})", mission.title, done, total)
            }
            None => "No active mission".to_string(),
        };
        let title = Paragraph::new(mission_title)
            .style(Style::default().fg(self.theme.warning))
            .alignment(Alignment::Center)
            .block(border.clone());
        frame.render_widget(title, header_layout[1]);

        let progress = self.session.missions().progress();
        let rank = Paragraph::new(format!(" Lv {} | {} ", progress.level, progress.rank))
            .style(Style::default().fg(self.theme.fg))
            .alignment(Alignment::Right)
            .block(border);
        frame.render_widget(rank, header_layout[2]);
    }

    fn render_scrollback(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = self
            .output
            .lines
            .iter()
            .flat_map(|output| {
                let mut style = Style::default().fg(output.color.map_or(self.theme.fg, |c| self.theme.color(c)));
                if output.is_error {
                    style = style.fg(self.theme.alert).add_modifier(Modifier::BOLD);
                }
                output
                    .text
                    .split('\n')
                    .map(move |text| Line::from(Span::styled(text.to_string(), style)))
                    .collect::<Vec<_>>()
            })
            .collect();

        let visible = area.height.saturating_sub(2) as usize;
        let end = lines.len().saturating_sub(self.scroll as usize);
        let start = end.saturating_sub(visible);
        let terminal = Paragraph::new(lines[start..end].to_vec())
            .block(styled_block("Terminal", &self.theme));
        frame.render_widget(terminal, area);
    }

    fn render_editor(&self, frame: &mut Frame, area: Rect, editor: &EditorSession) {
        let visible = area.height.saturating_sub(2) as usize;
        let offset = (editor.cursor.row + 1).saturating_sub(visible);
        let lines: Vec<Line> = editor
            .buffer
            .lines()
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible)
            .map(|(row, text)| {
                Line::from(vec![
                    Span::styled(format!("{:>4} ", row + 1), Style::default().fg(self.theme.border)),
                    Span::styled(text.as_str(), Style::default().fg(self.theme.fg)),
                ])
            })
            .collect();

        let marker = if editor.dirty { " [modified]" } else { "" };
        let title = format!("nano {}{}", editor.path, marker);
        frame.render_widget(Paragraph::new(lines).block(styled_block(&title, &self.theme)), area);

        let x = area.x + 1 + 5 + editor.cursor.col as u16;
        let y = area.y + 1 + (editor.cursor.row - offset) as u16;
        frame.set_cursor_position((x, y));
    }

    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let text = match self.session.mode() {
            Mode::Editor(_) => EDITOR_KEYS.to_string(),
            mode if mode.is_secret() => {
                format!("{}{}_", self.session.prompt(), "*".repeat(self.input_buffer.chars().count()))
            }
            _ => format!("{}{}_", self.session.prompt(), self.input_buffer),
        };
        let input = Paragraph::new(text)
            .style(Style::default().fg(self.theme.success))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.success))
                    .title(format!(" {} ", self.session.mode().name())),
            );
        frame.render_widget(input, area);
    }

    fn render_progress(&self, frame: &mut Frame, area: Rect) {
        let progress = self.session.missions().progress();
        let floor = LEVEL_THRESHOLDS
            .get(level_for_xp(progress.xp).saturating_sub(1) as usize)
            .copied()
            .unwrap_or(0);
        let gained = progress.xp.saturating_sub(floor);
        let (label, max) = match progress.xp_to_next_level {
            Some(gap) => (
                format!(" XP {} | {} to level {} ", progress.xp, gap, progress.level + 1),
                gained + gap,
            ),
            None => (format!(" XP {} | max level ", progress.xp), gained),
        };
        frame.render_widget(
            ProgressBar::new(&label, gained, max).color(self.theme.success),
            area,
        );
    }
}
