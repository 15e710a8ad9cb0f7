// Overlay rendering
//
// Overlays are drawn on top of the main screen, one per UI state:
// - Text inputs: prompts, names, PR title and body, folder path
// - Pickers: repositories, history, topics, integrations
// - Yes/no questions
// - Context menu at the click or selection position
// - Help: key map plus the recent log tail

use crate::tui::app::App;
use crate::tui::layout::popup_rect;
use crate::tui::modal::{ContextMenu, Picker, TextInput};
use crate::tui::state::{HelpTopic, MenuAction, UiState};
use crate::util::ellipsize;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Lines of log shown at the bottom of the help screen
const HELP_LOG_LINES: usize = 8;

pub fn render(f: &mut Frame, app: &App) {
    match &app.state {
        // Drawn inline by the list, footer and pane
        UiState::Default
        | UiState::CreatingSession { .. }
        | UiState::Searching { .. }
        | UiState::FocusedOnPane { .. } => {}

        UiState::EnteringPrompt { input, .. } | UiState::SendingPrompt { input, .. } => {
            render_input(f, app, input, "Enter send · Alt+Enter newline · Esc cancel")
        }
        UiState::EditingPrBody { input, .. } => {
            render_input(f, app, input, "Enter create · Alt+Enter newline · Esc cancel")
        }
        UiState::AddingProject { input }
        | UiState::CreatingTopic { input, .. }
        | UiState::RenamingSession { input, .. }
        | UiState::RenamingTopic { input, .. }
        | UiState::EditingPrTitle { input, .. } => {
            render_input(f, app, input, "Enter confirm · Esc cancel")
        }

        UiState::ManagingIntegrations { picker } => {
            render_picker(f, app, picker, "Space toggle · Esc close")
        }
        UiState::ProjectHistory { picker, filtering } => {
            let hint = if *filtering {
                "Enter open · Esc stop filtering"
            } else {
                "1-9 open · / filter · n add · c trim · Esc close"
            };
            render_picker(f, app, picker, hint)
        }
        UiState::SwitchingRepo { picker, .. } => {
            render_picker(f, app, picker, "Enter switch · Space toggle · Esc close")
        }
        UiState::MovingToTopic { picker, .. } | UiState::PickingRepoForTopic { picker, .. } => {
            render_picker(f, app, picker, "Enter choose · Esc cancel")
        }

        UiState::Confirm(confirmation) => {
            render_question(f, app, &confirmation.message, "y confirm · n cancel")
        }
        UiState::SyncConfirm { message, .. } => {
            render_question(f, app, message, "y sync · n push anyway · Esc cancel")
        }
        UiState::ConfirmingTopicSharing { name, .. } => render_question(
            f,
            app,
            &format!("Share one worktree between all sessions in topic '{}'?", name),
            "y shared · n independent · Esc cancel",
        ),

        UiState::ContextMenu(menu) => render_menu(f, app, menu),
        UiState::Help { topic, .. } => render_help(f, app, *topic),
    }
}

/// Calculate centered rect for modal dialog
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

fn overlay_block<'a>(app: &App, title: String, hint: &'a str) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight))
        .style(Style::default().bg(app.theme.background))
        .title(title)
        .title_bottom(Line::from(format!(" {} ", hint)).centered())
}

fn render_input(f: &mut Frame, app: &App, input: &TextInput, hint: &str) {
    let frame = f.area();
    let width = (frame.width * 60 / 100).clamp(40, 90);
    let height = if input.is_multiline() { 12 } else { 3 };
    let area = centered_rect(width, height, frame);

    let text = format!("{}▏", input.value);
    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(app.theme.foreground))
        .wrap(Wrap { trim: false })
        .block(overlay_block(app, format!(" {} ", input.title), hint));

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

fn render_picker(f: &mut Frame, app: &App, picker: &Picker, hint: &str) {
    let theme = &app.theme;
    let frame = f.area();
    let width = (frame.width * 50 / 100).clamp(40, 80);
    let visible: Vec<(usize, &str)> = picker.visible().collect();
    // Border, query line, items
    let height = (visible.len() as u16 + 3).clamp(5, frame.height.saturating_sub(4).max(5));
    let area = centered_rect(width, height, frame);
    let inner_width = width.saturating_sub(4) as usize;

    let mut lines = vec![if picker.query().is_empty() {
        Line::from(Span::styled(" Type to filter...", theme.muted_style()))
    } else {
        Line::from(vec![
            Span::styled(" / ", theme.key_style()),
            Span::styled(picker.query().to_string(), Style::default().fg(theme.foreground)),
        ])
    }];

    // Keep the highlighted row inside the box
    let rows = height.saturating_sub(3) as usize;
    let skip = picker
        .selected_position()
        .saturating_sub(rows.saturating_sub(1));
    for (pos, (_, label)) in visible.iter().enumerate().skip(skip).take(rows) {
        let style = if pos == picker.selected_position() {
            theme.selected_style()
        } else {
            Style::default().fg(theme.foreground)
        };
        lines.push(Line::from(Span::styled(
            format!(" {}", ellipsize(label, inner_width)),
            style,
        )));
    }
    if visible.is_empty() {
        lines.push(Line::from(Span::styled(" No matches", theme.muted_style())));
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .block(overlay_block(app, format!(" {} ", picker.title), hint));
    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

fn render_question(f: &mut Frame, app: &App, message: &str, hint: &str) {
    let frame = f.area();
    let width = (frame.width * 50 / 100).clamp(40, 70);
    let text_width = width.saturating_sub(4).max(1) as usize;
    let rows = message.chars().count().div_ceil(text_width) as u16;
    let area = centered_rect(width, rows + 4, frame);

    let paragraph = Paragraph::new(Text::from(vec![
        Line::raw(""),
        Line::from(Span::styled(
            format!(" {}", message),
            Style::default()
                .fg(app.theme.foreground)
                .add_modifier(Modifier::BOLD),
        )),
    ]))
    .wrap(Wrap { trim: false })
    .block(overlay_block(app, " Confirm ".to_string(), hint));

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

/// Laid out exactly as mouse hit-testing expects: border, filter line,
/// then one entry per row
fn render_menu(f: &mut Frame, app: &App, menu: &ContextMenu<MenuAction>) {
    let theme = &app.theme;
    let area = popup_rect(menu.x, menu.y, menu.width(), menu.height(), f.area());

    let mut lines = vec![if menu.query().is_empty() {
        Line::from(Span::styled(" Type to filter...", theme.muted_style()))
    } else {
        Line::from(Span::styled(
            format!(" {}", menu.query()),
            Style::default().fg(theme.foreground),
        ))
    }];
    for (pos, (number, item)) in menu.visible().enumerate() {
        let style = if pos == menu.selected_position() {
            theme.selected_style()
        } else {
            Style::default().fg(theme.foreground)
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {} ", number), theme.key_style()),
            Span::styled(item.label.clone(), style),
        ]));
    }

    let paragraph = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(theme.border_type)
            .border_style(Style::default().fg(theme.highlight))
            .style(Style::default().bg(theme.background)),
    );
    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

/// Render the help overlay
fn render_help(f: &mut Frame, app: &App, topic: HelpTopic) {
    let theme = &app.theme;
    let key_style = theme.key_style();
    let desc_style = Style::default().fg(theme.foreground);
    let header_style = Style::default()
        .fg(theme.highlight)
        .add_modifier(Modifier::BOLD);

    // Helper to create a keybind line: "    key         description"
    let kb = |key: &str, desc: &str| -> Line {
        Line::from(vec![
            Span::raw("    "),
            Span::styled(format!("{:<12}", key), key_style),
            Span::styled(desc.to_string(), desc_style),
        ])
    };

    let mut lines = match topic {
        HelpTopic::Checkout => vec![
            Line::raw(""),
            Line::from(Span::styled("  Checkout", header_style)),
            Line::raw(""),
            Line::from(Span::styled(
                "  Checkout commits the session's changes and pauses it,",
                desc_style,
            )),
            Line::from(Span::styled(
                "  freeing its branch so you can check it out yourself.",
                desc_style,
            )),
            Line::from(Span::styled(
                "  Press r on the session later to resume where it left off.",
                desc_style,
            )),
        ],
        HelpTopic::General => vec![
            Line::raw(""),
            Line::from(Span::styled("  Sessions", header_style)),
            kb("n / N / S", "New / new with prompt / skip permissions"),
            kb("D", "Kill session"),
            kb("r", "Resume, or restart a dead agent"),
            kb("c", "Checkout (pause and free the branch)"),
            kb("i", "Send a prompt"),
            kb("y", "Toggle auto-accept"),
            kb("p / P", "Push branch / create PR"),
            kb("z", "Zen mode (full terminal)"),
            Line::raw(""),
            Line::from(Span::styled("  Navigation", header_style)),
            kb("↑/↓, j/k", "Move selection"),
            kb("←/→, h/l", "Sidebar / list / focus pane"),
            kb("Shift+arrows", "Move between sidebar, list and panes"),
            kb("Enter, o", "Open list / focus pane"),
            kb("Tab, t, g", "Cycle pane / shell / VCS"),
            kb("Ctrl+O", "Leave a focused pane"),
            kb("Space", "Context menu"),
            kb("/", "Search"),
            kb("f / s / e", "Filter / sort / expand list"),
            Line::raw(""),
            Line::from(Span::styled("  Topics and repositories", header_style)),
            kb("T / m / X", "New topic / move to topic / kill topic"),
            kb("R / H", "Switch repository / project history"),
            kb("I", "Integrations"),
            Line::raw(""),
            kb("?", "This help"),
            kb("q, Ctrl+C", "Quit"),
        ],
    };

    lines.push(Line::raw(""));
    lines.push(Line::from(Span::styled("  Recent log", header_style)));
    let entries = app.log_buffer.tail(HELP_LOG_LINES);
    if entries.is_empty() {
        lines.push(Line::from(Span::styled("    (empty)", theme.muted_style())));
    }
    for entry in entries {
        lines.push(Line::from(vec![
            Span::styled(
                format!("    {} ", entry.timestamp.format("%H:%M:%S")),
                theme.muted_style(),
            ),
            Span::styled(
                format!("{:<5} ", entry.level.as_str()),
                Style::default().fg(theme.log_color(entry.level)),
            ),
            Span::styled(entry.message, desc_style),
        ]));
    }

    let frame = f.area();
    let width = (frame.width * 70 / 100).clamp(60, 100);
    let height = lines.len() as u16 + 2;
    let area = centered_rect(width, height, frame);

    let paragraph = Paragraph::new(Text::from(lines))
        .style(Style::default().bg(theme.background))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.highlight))
                .border_type(theme.border_type)
                .title(" Help ")
                .title_bottom(Line::from(" Press any key to close ").centered()),
        );

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}
