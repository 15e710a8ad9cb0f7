//! Toast notification component
//!
//! A non-blocking overlay that auto-dismisses. Renders in the bottom-right
//! corner on top of all other content.

use crate::tui::theme::Theme;
use crate::util::{display_width, ellipsize};
use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use std::time::{Duration, Instant};

const TOAST_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    created_at: Instant,
    duration: Duration,
}

impl Toast {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            created_at: Instant::now(),
            duration: TOAST_DURATION,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.duration
    }

    /// Render in the bottom-right corner of `area`, above the footer
    pub fn render(&self, f: &mut Frame, area: Rect, theme: &Theme) {
        // 2 columns of padding each side, borders included
        let max_width = area.width.saturating_sub(4);
        let width = (display_width(&self.message) as u16 + 4).min(max_width);
        let height = 3;

        let x = area.right().saturating_sub(width + 2);
        let y = area.bottom().saturating_sub(height + 2);
        let toast_area = Rect::new(x, y, width, height).intersection(area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(theme.border_type)
            .border_style(Style::default().fg(theme.highlight))
            .style(Style::default().bg(theme.background));

        let message = ellipsize(&self.message, width.saturating_sub(4) as usize);
        let text = Paragraph::new(message)
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme.foreground))
            .block(block);

        f.render_widget(Clear, toast_area);
        f.render_widget(text, toast_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_toast_is_live() {
        let toast = Toast::new("Copied branch name");
        assert!(!toast.is_expired());
    }

    #[test]
    fn zero_duration_expires_immediately() {
        let mut toast = Toast::new("gone");
        toast.duration = Duration::ZERO;
        assert!(toast.is_expired());
    }
}
