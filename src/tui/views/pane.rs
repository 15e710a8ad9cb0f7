// Content pane: tab bar, then the selected session's preview, attached pane
// or diff

use crate::session::{PaneKind, Session};
use crate::tui::app::App;
use crate::tui::components::scrollbar::render_scrollbar;
use crate::tui::layout::{TABS, TAB_WIDTH};
use crate::tui::state::UiState;
use crate::util::ellipsize;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render_tabs(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let spans: Vec<Span> = TABS
        .iter()
        .map(|tab| {
            let label = format!("{:^width$}", tab.label(), width = TAB_WIDTH as usize);
            let style = if *tab == app.tab {
                Style::default()
                    .fg(theme.highlight)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                theme.muted_style()
            };
            Span::styled(label, style)
        })
        .collect();
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let focused = matches!(app.state, UiState::FocusedOnPane { .. });
    let session = app.list.selected();

    let title = match session {
        Some(s) if !s.title.is_empty() => format!(" {} · {} ", app.tab.label(), s.title),
        _ => format!(" {} ", app.tab.label()),
    };
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(theme.border_style(focused))
        .title(title);
    if focused {
        block = block.title_bottom(Line::from(" Ctrl+O to leave ").right_aligned());
    }

    let Some(session) = session else {
        let hint = Paragraph::new(Span::styled(" No session selected", theme.muted_style()))
            .block(block);
        f.render_widget(hint, area);
        return;
    };

    if session.is_paused() {
        let hint = Paragraph::new(Line::from(vec![
            Span::styled(" Session is paused. Press ", theme.muted_style()),
            Span::styled("r", theme.key_style()),
            Span::styled(" to resume.", theme.muted_style()),
        ]))
        .block(block);
        f.render_widget(hint, area);
        return;
    }

    match app.tab {
        PaneKind::Diff => render_diff(f, area, block, session, app),
        pane => render_screen(f, area, block, session, pane, app),
    }
}

/// Agent, shell or VCS pane: live contents when attached, else the preview
fn render_screen(
    f: &mut Frame,
    area: Rect,
    block: Block,
    session: &Session,
    pane: PaneKind,
    app: &App,
) {
    let theme = &app.theme;

    if let Some(contents) = app.focus.contents(&session.id, pane) {
        let paragraph = Paragraph::new(contents)
            .style(Style::default().fg(theme.foreground))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    if pane != PaneKind::Agent {
        let hint = Paragraph::new(Line::from(vec![
            Span::styled(" Press ", theme.muted_style()),
            Span::styled("Enter", theme.key_style()),
            Span::styled(format!(" to open the {} pane", pane.label()), theme.muted_style()),
        ]))
        .block(block);
        f.render_widget(hint, area);
        return;
    }

    if session.dead {
        let hint = Paragraph::new(Line::from(vec![
            Span::styled(" Agent has exited. Press ", theme.muted_style()),
            Span::styled("r", theme.key_style()),
            Span::styled(" to restart.", theme.muted_style()),
        ]))
        .block(block);
        f.render_widget(hint, area);
        return;
    }

    // A capture for a different selection is never shown
    let content = if app.preview_generation == app.list.generation() {
        app.preview.as_str()
    } else {
        ""
    };
    let content = if content.is_empty() && !session.loading_message.is_empty() {
        session.loading_message.as_str()
    } else {
        content
    };

    let total = content.lines().count();
    let viewport = area.height.saturating_sub(2) as usize;
    // Stick to the bottom like a terminal, scrolled back by the wheel
    let bottom = total.saturating_sub(viewport);
    let offset = bottom.saturating_sub(app.preview_scroll as usize);

    let paragraph = Paragraph::new(content)
        .style(Style::default().fg(theme.foreground))
        .scroll((offset as u16, 0))
        .block(block);
    f.render_widget(paragraph, area);
    render_scrollbar(
        f,
        area,
        total,
        viewport,
        offset,
        Style::default().fg(theme.border),
    );
}

/// Two summary lines, then one line per changed file
fn render_diff(f: &mut Frame, area: Rect, block: Block, session: &Session, app: &App) {
    let theme = &app.theme;
    let stats = &session.diff_stats;
    let width = area.width.saturating_sub(4) as usize;

    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!(" +{}", stats.added), Style::default().fg(theme.added)),
            Span::styled(format!(" -{}", stats.removed), Style::default().fg(theme.removed)),
            Span::styled(
                format!("  {} files changed", stats.files.len()),
                theme.muted_style(),
            ),
        ]),
        Line::raw(""),
    ];

    if stats.files.is_empty() {
        lines.push(Line::from(Span::styled(" No changes", theme.muted_style())));
    }
    for (i, file) in stats.files.iter().enumerate() {
        let style = if i == app.diff_selected {
            theme.selected_style()
        } else {
            Style::default().fg(theme.foreground)
        };
        lines.push(Line::from(Span::styled(format!(" {}", ellipsize(file, width)), style)));
    }

    let total = lines.len();
    let paragraph = Paragraph::new(Text::from(lines))
        .scroll((app.diff_scroll, 0))
        .block(block);
    f.render_widget(paragraph, area);
    render_scrollbar(
        f,
        area,
        total,
        area.height.saturating_sub(2) as usize,
        app.diff_scroll as usize,
        Style::default().fg(theme.border),
    );
}
