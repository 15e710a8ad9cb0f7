// Views module - screen-level rendering
//
// Every region is drawn at the rectangle `ScreenLayout` computed for it, so
// what the operator sees and what mouse hit-testing assumes never disagree:
// - Sidebar: topic scopes with match counts and activity markers
// - List: sessions in display order
// - Pane: tab bar plus preview, focused pane contents or diff
// - Footer: status or error line and the key legend
//
// Overlays are drawn last, on top of everything.

mod footer;
mod list;
mod modal;
mod pane;
mod sidebar;

use super::app::App;
use ratatui::style::Style;
use ratatui::widgets::Block;
use ratatui::Frame;

/// Main UI render function - called on every frame
pub fn draw(f: &mut Frame, app: &App) {
    let bg_block = Block::default().style(Style::default().bg(app.theme.background));
    f.render_widget(bg_block, f.area());

    let layout = &app.layout;
    if layout.sidebar.width > 0 {
        sidebar::render(f, layout.sidebar, app);
    }
    list::render(f, layout.list, app);
    pane::render_tabs(f, layout.tabs, app);
    pane::render(f, layout.pane, app);
    footer::render(f, layout.footer, app);

    modal::render(f, app);

    if let Some(toast) = &app.toast {
        toast.render(f, layout.area, &app.theme);
    }
}
