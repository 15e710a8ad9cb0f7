// Topic sidebar: All, Ungrouped, then one row per topic

use crate::tui::app::{App, NavPosition};
use crate::tui::list::SidebarItem;
use crate::util::ellipsize;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let list = &app.list;
    let searching = !list.search().is_empty();
    let focused = app.nav == NavPosition::Sidebar && app.state.is_default();
    let inner_width = area.width.saturating_sub(2) as usize;

    let items: Vec<ListItem> = list
        .sidebar()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let (label, marker, shared) = match item {
                SidebarItem::All => ("All".to_string(), false, false),
                SidebarItem::Ungrouped => ("Ungrouped".to_string(), false, false),
                SidebarItem::Topic(name) => {
                    let topic = list.topic(name);
                    (
                        name.clone(),
                        list.topic_active(name),
                        topic.is_some_and(|t| t.shared_worktree),
                    )
                }
            };

            // Right-hand column: match count while searching, else markers
            let suffix = if searching {
                format!(" {}", list.match_count(item))
            } else {
                let mut s = String::new();
                if shared {
                    s.push_str(" ⎇");
                }
                if marker {
                    s.push_str(" ●");
                }
                s
            };
            let label = ellipsize(&label, inner_width.saturating_sub(suffix.chars().count() + 1));

            let selected = i == list.sidebar_selected();
            let style = if selected && focused {
                theme.selected_style()
            } else if selected {
                Style::default()
                    .fg(theme.foreground)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.foreground)
            };
            let suffix_style = if marker && !searching {
                Style::default().fg(theme.notified)
            } else {
                theme.muted_style()
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!(" {}", label), style),
                Span::styled(suffix, suffix_style),
            ]))
        })
        .collect();

    let widget = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(theme.border_type)
            .border_style(theme.border_style(focused))
            .title(" Topics "),
    );
    f.render_widget(widget, area);
}
