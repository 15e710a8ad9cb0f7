//! Scrollbar rendering helper shared by the list and pane views

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

/// Render a minimal vertical scrollbar on the right edge of `area`.
///
/// Draws nothing when everything fits.
pub fn render_scrollbar(
    f: &mut Frame,
    area: Rect,
    total: usize,
    viewport: usize,
    offset: usize,
    style: Style,
) {
    if total <= viewport {
        return;
    }

    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(None)
        .end_symbol(None)
        .thumb_style(style);

    // ScrollbarState wants how far the content can scroll, not its length
    let content_length = total.saturating_sub(viewport);
    let mut state = ScrollbarState::new(content_length).position(offset.min(content_length));

    f.render_stateful_widget(scrollbar, area, &mut state);
}
