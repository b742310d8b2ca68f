//! Terminal User Interface
//!
//! A thin ratatui frontend over [`SessionInterpreter`](crate::SessionInterpreter):
//! it draws the scrollback, the prompt and a progress bar, and forwards input.

pub mod app;
pub mod widgets;

pub use app::App;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders},
};

/// Color scheme for the terminal
pub struct Theme {
    pub fg: Color,
    pub accent: Color,
    pub alert: Color,
    pub success: Color,
    pub warning: Color,
    pub border: Color,
    pub header: Color,
    pub muted: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: Color::White,
            accent: Color::Cyan,
            alert: Color::Red,
            success: Color::Green,
            warning: Color::Yellow,
            border: Color::DarkGray,
            header: Color::Magenta,
            muted: Color::Gray,
        }
    }
}

impl Theme {
    /// Map an output presentation hint to a terminal color
    pub fn color(&self, hint: crate::data::Color) -> Color {
        use crate::data::Color as Hint;
        match hint {
            Hint::Default => self.fg,
            Hint::Green => self.success,
            Hint::Cyan => self.accent,
            Hint::Yellow => self.warning,
            Hint::Red => self.alert,
            Hint::Magenta => self.header,
            Hint::Gray => self.muted,
        }
    }
}

/// Create a styled border block
pub fn styled_block<'a>(title: &str, theme: &Theme) -> Block<'a> {
    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
}

/// Header banner
pub const SMALL_LOGO: &str = " TERMINAL QUEST ";

/// Shown once when the session opens
pub const WELCOME: &str = "\
╔══════════════════════════════════════════════════════════╗
║                    TERMINAL  QUEST                       ║
║        Learn the command line one mission at a time      ║
╚══════════════════════════════════════════════════════════╝
Type 'help' for commands and 'mission list' to find work.
Ctrl+C quits. PageUp/PageDown scroll. Up/Down recall history.";

/// Key bindings while the editor is open
pub const EDITOR_KEYS: &str = " ^S Save  ^X Save & Exit  ^Q Exit  Esc Discard & Exit ";

/// Header, body, input line and status bar
pub fn create_main_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Scrollback or editor
            Constraint::Length(3), // Input line
            Constraint::Length(2), // Progress bar
        ])
        .split(area)
        .to_vec()
}
