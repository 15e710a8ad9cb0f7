// Colors for the TUI
//
// One palette, read by every view through `App::theme`.

use crate::logging::LogLevel;
use crate::session::Status;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::BorderType;

#[derive(Debug, Clone)]
pub struct Theme {
    // Base colors
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
    pub border: Color,
    pub border_focused: Color,
    pub border_type: BorderType,

    /// Toasts, active tab, flashed legend entry
    pub highlight: Color,
    pub selected_bg: Color,
    pub selected_fg: Color,
    pub key: Color,

    // Session status
    pub running: Color,
    pub ready: Color,
    pub paused: Color,
    pub loading: Color,
    /// Finished while nobody was looking
    pub notified: Color,

    pub error: Color,
    pub added: Color,
    pub removed: Color,

    // Log levels
    pub log_error: Color,
    pub log_warn: Color,
    pub log_info: Color,
    pub log_debug: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            background: Color::Reset,
            foreground: Color::White,
            muted: Color::DarkGray,
            border: Color::Gray,
            border_focused: Color::Cyan,
            border_type: BorderType::Rounded,

            highlight: Color::Cyan,
            selected_bg: Color::DarkGray,
            selected_fg: Color::Yellow,
            key: Color::Cyan,

            running: Color::Green,
            ready: Color::Blue,
            paused: Color::DarkGray,
            loading: Color::Yellow,
            notified: Color::Magenta,

            error: Color::Red,
            added: Color::Green,
            removed: Color::Red,

            log_error: Color::Red,
            log_warn: Color::Yellow,
            log_info: Color::Blue,
            log_debug: Color::Gray,
        }
    }

    pub fn status_color(&self, status: Status) -> Color {
        match status {
            Status::Running => self.running,
            Status::Ready => self.ready,
            Status::Paused => self.paused,
            Status::Loading => self.loading,
        }
    }

    pub fn log_color(&self, level: LogLevel) -> Color {
        match level {
            LogLevel::Error => self.log_error,
            LogLevel::Warn => self.log_warn,
            LogLevel::Info => self.log_info,
            LogLevel::Debug | LogLevel::Trace => self.log_debug,
        }
    }

    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }

    pub fn selected_style(&self) -> Style {
        Style::default()
            .bg(self.selected_bg)
            .fg(self.selected_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn key_style(&self) -> Style {
        Style::default().fg(self.key).add_modifier(Modifier::BOLD)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_distinguishable() {
        let theme = Theme::default();
        assert_ne!(
            theme.status_color(Status::Running),
            theme.status_color(Status::Ready)
        );
        assert_ne!(
            theme.status_color(Status::Paused),
            theme.status_color(Status::Loading)
        );
    }
}
