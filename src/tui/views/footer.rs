// Footer: status or error line above the key legend
//
// Adapts to terminal width: narrow terminals get only as many legend
// entries as fit.

use crate::tui::app::{App, GlobalKey};
use crate::tui::state::UiState;
use crate::util::{display_width, ellipsize, repo_name};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    if area.height == 0 {
        return;
    }
    let status_area = Rect::new(area.x, area.y, area.width, 1);
    f.render_widget(Paragraph::new(status_line(app, area.width as usize)), status_area);

    if area.height > 1 {
        let legend_area = Rect::new(area.x, area.y + 1, area.width, 1);
        f.render_widget(Paragraph::new(legend_line(app, area.width as usize)), legend_area);
    }
}

fn status_line(app: &App, width: usize) -> Line<'static> {
    let theme = &app.theme;

    if let Some(message) = app.error_message() {
        return Line::from(Span::styled(
            format!(" ✗ {}", ellipsize(message, width.saturating_sub(4))),
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        ));
    }

    match &app.state {
        UiState::Searching { input } => {
            return Line::from(vec![
                Span::styled(" / ", theme.key_style()),
                Span::styled(format!("{}▏", input.value), Style::default().fg(theme.foreground)),
                Span::styled("  ↑↓ topic · Enter keep · Esc clear", theme.muted_style()),
            ]);
        }
        UiState::CreatingSession { .. } => {
            return Line::from(Span::styled(
                " Name the session · Enter start · Esc cancel",
                theme.muted_style(),
            ));
        }
        UiState::FocusedOnPane { pane } => {
            return Line::from(Span::styled(
                format!(" {} pane focused · Ctrl+O leave · Shift+arrows move", pane.label()),
                theme.muted_style(),
            ));
        }
        _ => {}
    }

    let repos: Vec<String> = app
        .list
        .active_repos()
        .iter()
        .map(|r| repo_name(r))
        .collect();
    let mut text = format!(" {}", repos.join(", "));
    if !app.list.search().is_empty() {
        text.push_str(&format!(" · search \"{}\"", app.list.search()));
    }
    if app.config.auto_yes {
        text.push_str(" · auto-yes");
    }
    Line::from(Span::styled(ellipsize(&text, width), theme.muted_style()))
}

fn legend_line(app: &App, width: usize) -> Line<'static> {
    let theme = &app.theme;
    let mut spans = vec![Span::raw(" ")];
    let mut used = 1;

    for key in GlobalKey::LEGEND {
        let Some((label, description)) = key.legend() else {
            continue;
        };
        let entry_width = display_width(label) + display_width(description) + 3;
        if used + entry_width > width {
            break;
        }
        used += entry_width;

        let flashed = app.highlight == Some(key);
        let (key_style, desc_style) = if flashed {
            let style = Style::default()
                .fg(theme.background)
                .bg(theme.highlight)
                .add_modifier(Modifier::BOLD);
            (style, style)
        } else {
            (theme.key_style(), theme.muted_style())
        };
        spans.push(Span::styled(label.to_string(), key_style));
        spans.push(Span::styled(format!(" {}", description), desc_style));
        spans.push(Span::raw("  "));
    }
    Line::from(spans)
}
