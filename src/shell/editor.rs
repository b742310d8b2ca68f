//! Text editor sub-machine
//!
//! A line-based buffer addressed by (row, column). Columns count characters,
//! not bytes. The session only edits the buffer; writing it back to the
//! filesystem is up to the interpreter.

use serde::{Deserialize, Serialize};

/// Cursor position in the buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Text buffer with line-based storage. Always holds at least one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBuffer {
    lines: Vec<String>,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
        }
    }

    /// Split on `\n` so that `as_string` gives back exactly `content`
    pub fn from_content(content: &str) -> Self {
        Self {
            lines: content.split('\n').map(str::to_string).collect(),
        }
    }

    pub fn as_string(&self) -> String {
        self.lines.join("\n")
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, row: usize) -> Option<&str> {
        self.lines.get(row).map(|s| s.as_str())
    }

    pub fn line_length(&self, row: usize) -> usize {
        self.lines.get(row).map(|s| s.chars().count()).unwrap_or(0)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.len() == 1 && self.lines[0].is_empty()
    }

    /// Insert a character at position
    pub fn insert_char(&mut self, pos: Position, ch: char) -> bool {
        let Some(line) = self.lines.get_mut(pos.row) else {
            return false;
        };
        match byte_offset(line, pos.col) {
            Some(offset) => {
                line.insert(offset, ch);
                true
            }
            None => false,
        }
    }

    /// Insert a newline at position, splitting the line
    pub fn insert_newline(&mut self, pos: Position) -> bool {
        let Some(line) = self.lines.get_mut(pos.row) else {
            return false;
        };
        match byte_offset(line, pos.col) {
            Some(offset) => {
                let rest = line.split_off(offset);
                self.lines.insert(pos.row + 1, rest);
                true
            }
            None => false,
        }
    }

    /// Delete the character at position; at end of line, join the next line
    pub fn delete_char(&mut self, pos: Position) -> bool {
        if pos.row >= self.lines.len() {
            return false;
        }
        let len = self.line_length(pos.row);
        if pos.col < len {
            if let Some(offset) = byte_offset(&self.lines[pos.row], pos.col) {
                self.lines[pos.row].remove(offset);
                return true;
            }
            false
        } else if pos.col == len && pos.row + 1 < self.lines.len() {
            let next = self.lines.remove(pos.row + 1);
            self.lines[pos.row].push_str(&next);
            true
        } else {
            false
        }
    }

    /// Delete the character before position; at column 0, join with the
    /// previous line. Returns the new cursor position.
    pub fn backspace(&mut self, pos: Position) -> Option<Position> {
        if pos.row >= self.lines.len() {
            return None;
        }
        if pos.col > 0 {
            let offset = byte_offset(&self.lines[pos.row], pos.col - 1)?;
            self.lines[pos.row].remove(offset);
            Some(Position::new(pos.row, pos.col - 1))
        } else if pos.row > 0 {
            let current = self.lines.remove(pos.row);
            let new_col = self.line_length(pos.row - 1);
            self.lines[pos.row - 1].push_str(&current);
            Some(Position::new(pos.row - 1, new_col))
        } else {
            None
        }
    }

    /// Append a line after the last one; an empty buffer takes it as its first line
    pub fn push_line(&mut self, text: &str) {
        if self.is_empty() {
            self.lines[0] = text.to_string();
        } else {
            self.lines.push(text.to_string());
        }
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn byte_offset(line: &str, col: usize) -> Option<usize> {
    if col == line.chars().count() {
        return Some(line.len());
    }
    line.char_indices().nth(col).map(|(offset, _)| offset)
}

/// Structured key input for the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Save,
    SaveAndExit,
    Exit,
    ExitWithoutSaving,
}

/// What the interpreter has to do after an editor input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    Continue,
    Save,
    SaveAndExit,
    Exit,
    /// Exit requested while the buffer has unsaved changes
    ExitRefused,
    Discard,
}

/// An open file in the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSession {
    pub path: String,
    pub buffer: TextBuffer,
    pub cursor: Position,
    pub dirty: bool,
}

impl EditorSession {
    pub fn open(path: &str, content: &str) -> Self {
        Self {
            path: path.to_string(),
            buffer: TextBuffer::from_content(content),
            cursor: Position::default(),
            dirty: false,
        }
    }

    pub fn content(&self) -> String {
        self.buffer.as_string()
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Replace the whole buffer and park the cursor at the end
    pub fn replace(&mut self, content: &str) {
        self.buffer = TextBuffer::from_content(content);
        self.cursor_to_end();
        self.dirty = true;
    }

    fn request_exit(&self) -> EditorAction {
        if self.dirty {
            EditorAction::ExitRefused
        } else {
            EditorAction::Exit
        }
    }

    fn cursor_to_end(&mut self) {
        let row = self.buffer.line_count() - 1;
        self.cursor = Position::new(row, self.buffer.line_length(row));
    }

    fn clamp_col(&mut self) {
        let len = self.buffer.line_length(self.cursor.row);
        if self.cursor.col > len {
            self.cursor.col = len;
        }
    }

    pub fn apply_key(&mut self, key: EditorKey) -> EditorAction {
        match key {
            EditorKey::Char(c) => {
                if self.buffer.insert_char(self.cursor, c) {
                    self.cursor.col += 1;
                    self.dirty = true;
                }
            }
            EditorKey::Enter => {
                if self.buffer.insert_newline(self.cursor) {
                    self.cursor = Position::new(self.cursor.row + 1, 0);
                    self.dirty = true;
                }
            }
            EditorKey::Backspace => {
                if let Some(position) = self.buffer.backspace(self.cursor) {
                    self.cursor = position;
                    self.dirty = true;
                }
            }
            EditorKey::Delete => {
                if self.buffer.delete_char(self.cursor) {
                    self.dirty = true;
                }
            }
            EditorKey::Left => {
                if self.cursor.col > 0 {
                    self.cursor.col -= 1;
                } else if self.cursor.row > 0 {
                    self.cursor.row -= 1;
                    self.cursor.col = self.buffer.line_length(self.cursor.row);
                }
            }
            EditorKey::Right => {
                if self.cursor.col < self.buffer.line_length(self.cursor.row) {
                    self.cursor.col += 1;
                } else if self.cursor.row + 1 < self.buffer.line_count() {
                    self.cursor = Position::new(self.cursor.row + 1, 0);
                }
            }
            EditorKey::Up => {
                if self.cursor.row > 0 {
                    self.cursor.row -= 1;
                    self.clamp_col();
                }
            }
            EditorKey::Down => {
                if self.cursor.row + 1 < self.buffer.line_count() {
                    self.cursor.row += 1;
                    self.clamp_col();
                }
            }
            EditorKey::Home => self.cursor.col = 0,
            EditorKey::End => self.cursor.col = self.buffer.line_length(self.cursor.row),
            EditorKey::Save => return EditorAction::Save,
            EditorKey::SaveAndExit => return EditorAction::SaveAndExit,
            EditorKey::Exit => return self.request_exit(),
            EditorKey::ExitWithoutSaving => return EditorAction::Discard,
        }
        EditorAction::Continue
    }

    /// Line-oriented input: a control word or a line to append
    pub fn apply_line(&mut self, line: &str) -> EditorAction {
        match line.trim() {
            "save" | ":w" => EditorAction::Save,
            "x" | ":wq" | ":x" => EditorAction::SaveAndExit,
            "exit" | ":q" => self.request_exit(),
            "exit!" | ":q!" => EditorAction::Discard,
            _ => {
                self.buffer.push_line(line);
                self.cursor_to_end();
                self.dirty = true;
                EditorAction::Continue
            }
        }
    }
}
