//! Custom widgets for the terminal UI

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Labelled progress bar, used for XP towards the next level
pub struct ProgressBar {
    value: u64,
    max: u64,
    label: String,
    color: Color,
}

impl ProgressBar {
    pub fn new(label: &str, value: u64, max: u64) -> Self {
        Self {
            value,
            max,
            label: label.to_string(),
            color: Color::Green,
        }
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Filled cells out of `width`
    fn filled(&self, width: u16) -> u16 {
        if self.max == 0 {
            return width;
        }
        let value = self.value.min(self.max);
        ((value * width as u64) / self.max) as u16
    }
}

impl Widget for ProgressBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 3 || area.height < 1 {
            return;
        }

        buf.set_string(area.x, area.y, &self.label, Style::default().fg(self.color));

        if area.height > 1 {
            let bar_y = area.y + 1;
            let inner = area.width - 2;
            let filled = self.filled(inner);
            buf.set_string(area.x, bar_y, "[", Style::default());
            buf.set_string(area.x + area.width - 1, bar_y, "]", Style::default());

            for x in 0..filled {
                buf.set_string(area.x + 1 + x, bar_y, "█", Style::default().fg(self.color));
            }
            for x in filled..inner {
                buf.set_string(area.x + 1 + x, bar_y, "░", Style::default().fg(Color::DarkGray));
            }
        }
    }
}
