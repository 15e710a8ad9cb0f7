// Session list: one row per visible session, two when expanded

use crate::session::{Session, Status};
use crate::tui::app::{App, NavPosition};
use crate::tui::components::scrollbar::render_scrollbar;
use crate::tui::layout::list_offset;
use crate::tui::state::UiState;
use crate::tui::theme::Theme;
use crate::util::{display_width, ellipsize, repo_name};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

fn status_glyph(session: &Session) -> &'static str {
    if session.dead {
        return "✗";
    }
    match session.status {
        Status::Running | Status::Ready if session.prompt_detected => "?",
        Status::Running => "●",
        Status::Ready => "○",
        Status::Loading => "◌",
        Status::Paused => "⏸",
    }
}

/// Title as drawn; a session still being named shows the typed text
fn display_title(session: &Session, app: &App) -> String {
    if !session.title.is_empty() {
        return session.title.clone();
    }
    match &app.state {
        UiState::CreatingSession { id, input, .. } if *id == session.id => {
            format!("{}▏", input.value)
        }
        _ => String::new(),
    }
}

fn first_line(session: &Session, app: &App, width: usize, selected: bool) -> Line<'static> {
    let theme: &Theme = &app.theme;
    let glyph_color = if session.notified {
        theme.notified
    } else if session.dead {
        theme.error
    } else {
        theme.status_color(session.status)
    };

    let mut right: Vec<Span> = Vec::new();
    let mut right_width = 0;
    if !session.diff_stats.is_empty() {
        let added = format!("+{}", session.diff_stats.added);
        let removed = format!("-{}", session.diff_stats.removed);
        right_width += added.len() + removed.len() + 2;
        right.push(Span::styled(format!(" {}", added), Style::default().fg(theme.added)));
        right.push(Span::styled(
            format!(" {}", removed),
            Style::default().fg(theme.removed),
        ));
    }
    if session.auto_yes {
        right_width += 2;
        right.push(Span::styled(" ✓", theme.muted_style()));
    }

    let title_width = width.saturating_sub(3 + right_width);
    let title = ellipsize(&display_title(session, app), title_width);
    let padding = title_width.saturating_sub(display_width(&title));

    let title_style = if selected {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.foreground)
    };

    let mut spans = vec![
        Span::styled(format!(" {} ", status_glyph(session)), Style::default().fg(glyph_color)),
        Span::styled(title, title_style),
        Span::raw(" ".repeat(padding)),
    ];
    spans.extend(right);
    Line::from(spans)
}

fn detail_line(session: &Session, app: &App, width: usize) -> Line<'static> {
    let mut parts = Vec::new();
    if session.status == Status::Loading && !session.loading_message.is_empty() {
        parts.push(session.loading_message.clone());
    } else {
        parts.push(session.status.label().to_string());
    }
    if !session.branch.is_empty() {
        parts.push(session.branch.clone());
    }
    if app.list.is_multi_repo() {
        parts.push(repo_name(&session.repo_path));
    }
    if !session.topic_name.is_empty() {
        parts.push(format!("#{}", session.topic_name));
    }
    let text = ellipsize(&parts.join(" · "), width.saturating_sub(3));
    Line::from(Span::styled(format!("   {}", text), app.theme.muted_style()))
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let list = &app.list;
    let focused = app.nav == NavPosition::SessionList && app.state.is_default();

    let title = format!(
        " Sessions ({}) · {} · {} ",
        list.visible_ids().len(),
        list.filter.label(),
        list.sort.label()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(theme.border_style(focused))
        .title(title);

    if list.visible_ids().is_empty() {
        let hint = Paragraph::new(Line::from(vec![
            Span::styled(" Press ", theme.muted_style()),
            Span::styled("n", theme.key_style()),
            Span::styled(" to start a session", theme.muted_style()),
        ]))
        .block(block);
        f.render_widget(hint, area);
        return;
    }

    let row_height = if list.expanded { 2 } else { 1 };
    let capacity = app.layout.list_capacity() / row_height;
    let offset = list_offset(list.selected_index(), capacity);
    let width = area.width.saturating_sub(2) as usize;

    let items: Vec<ListItem> = list
        .visible_sessions()
        .enumerate()
        .skip(offset)
        .take(capacity.max(1))
        .map(|(i, session)| {
            let selected = i == list.selected_index();
            let mut lines = vec![first_line(session, app, width, selected)];
            if list.expanded {
                lines.push(detail_line(session, app, width));
            }
            let style = if selected && focused {
                Style::default().bg(theme.selected_bg)
            } else if selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            ListItem::new(lines).style(style)
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
    render_scrollbar(
        f,
        area,
        list.visible_ids().len(),
        capacity,
        offset,
        Style::default().fg(theme.border),
    );
}
