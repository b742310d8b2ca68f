//! Output boundary between the interpreter and whatever displays it

use crate::data::Color;
use serde::{Deserialize, Serialize};

/// One emitted chunk of text. `text` may span several rendered lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub text: String,
    pub is_error: bool,
    pub color: Option<Color>,
}

impl OutputLine {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
            color: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
            color: Some(Color::Red),
        }
    }

    pub fn colored(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            is_error: false,
            color: Some(color),
        }
    }
}

/// Receiver of interpreter output
pub trait OutputSink {
    fn emit(&mut self, line: OutputLine);

    /// Request to wipe the display
    fn clear(&mut self) {}
}

/// Sink that keeps everything in memory
#[derive(Debug, Clone, Default)]
pub struct BufferedOutput {
    pub lines: Vec<OutputLine>,
    pub cleared: bool,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// All emitted text joined with newlines
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn errors(&self) -> Vec<&OutputLine> {
        self.lines.iter().filter(|line| line.is_error).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.lines.iter().any(|line| line.is_error)
    }

    /// Hand back everything collected so far and start over
    pub fn take(&mut self) -> Vec<OutputLine> {
        self.cleared = false;
        std::mem::take(&mut self.lines)
    }
}

impl OutputSink for BufferedOutput {
    fn emit(&mut self, line: OutputLine) {
        self.lines.push(line);
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.cleared = true;
    }
}
