//! Responsive breakpoint system and screen geometry.
//!
//! Single source of truth for where each region sits, shared by rendering
//! and mouse hit-testing so the two never disagree.

use crate::session::PaneKind;
use ratatui::layout::{Position, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakpoint {
    /// < 60 cols: sidebar hidden
    Compact,
    /// 60-99 cols: Half-screen
    Normal,
    /// 100-139 cols: Full terminal
    Wide,
    /// 140+ cols: Ultrawide monitor
    UltraWide,
}

impl Breakpoint {
    pub fn from_width(width: u16) -> Self {
        match width {
            0..=59 => Breakpoint::Compact,
            60..=99 => Breakpoint::Normal,
            100..=139 => Breakpoint::Wide,
            _ => Breakpoint::UltraWide,
        }
    }

    fn sidebar_width(&self) -> u16 {
        match self {
            Breakpoint::Compact => 0,
            Breakpoint::Normal => 18,
            Breakpoint::Wide => 22,
            Breakpoint::UltraWide => 26,
        }
    }

    fn list_width(&self, total: u16) -> u16 {
        match self {
            Breakpoint::Compact => total * 2 / 5,
            Breakpoint::Normal => 28,
            Breakpoint::Wide => 32,
            Breakpoint::UltraWide => 40,
        }
    }
}

/// Tabs in the order they are drawn
pub const TABS: [PaneKind; 4] = [PaneKind::Agent, PaneKind::Diff, PaneKind::Shell, PaneKind::Vcs];
/// Columns per tab label in the tab bar
pub const TAB_WIDTH: u16 = 9;

/// What sits under a screen cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Sidebar row, counted from the first item
    Sidebar(usize),
    /// List row, counted from the first drawn line
    List(usize),
    Tab(PaneKind),
    Pane,
    Footer,
    Outside,
}

/// Screen rectangles for one terminal size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenLayout {
    pub area: Rect,
    pub sidebar: Rect,
    pub list: Rect,
    pub tabs: Rect,
    /// Pane block including its border
    pub pane: Rect,
    /// Status line plus key legend
    pub footer: Rect,
}

impl ScreenLayout {
    pub fn compute(area: Rect) -> Self {
        let bp = Breakpoint::from_width(area.width);
        let footer_height = 2.min(area.height);
        let body_height = area.height - footer_height;

        let sidebar_width = bp.sidebar_width().min(area.width);
        let list_width = bp.list_width(area.width).min(area.width - sidebar_width);
        let pane_x = area.x + sidebar_width + list_width;
        let pane_width = area.width - sidebar_width - list_width;
        let tabs_height = 1.min(body_height);

        Self {
            area,
            sidebar: Rect::new(area.x, area.y, sidebar_width, body_height),
            list: Rect::new(area.x + sidebar_width, area.y, list_width, body_height),
            tabs: Rect::new(pane_x, area.y, pane_width, tabs_height),
            pane: Rect::new(pane_x, area.y + tabs_height, pane_width, body_height - tabs_height),
            footer: Rect::new(area.x, area.y + body_height, area.width, footer_height),
        }
    }

    /// Inside of the pane border: what an attached process draws into
    pub fn pane_content(&self) -> Rect {
        Rect::new(
            self.pane.x.saturating_add(1),
            self.pane.y.saturating_add(1),
            self.pane.width.saturating_sub(2),
            self.pane.height.saturating_sub(2),
        )
    }

    /// Rows available for list entries inside the list border
    pub fn list_capacity(&self) -> usize {
        self.list.height.saturating_sub(2) as usize
    }

    pub fn region_at(&self, column: u16, row: u16) -> Region {
        let pos = Position::new(column, row);
        if self.sidebar.contains(pos) {
            return match row.checked_sub(self.sidebar.y + 1) {
                Some(r) => Region::Sidebar(r as usize),
                None => Region::Outside,
            };
        }
        if self.list.contains(pos) {
            return match row.checked_sub(self.list.y + 1) {
                Some(r) => Region::List(r as usize),
                None => Region::Outside,
            };
        }
        if self.tabs.contains(pos) {
            let index = ((column - self.tabs.x) / TAB_WIDTH) as usize;
            return TABS.get(index).map_or(Region::Outside, |pane| Region::Tab(*pane));
        }
        if self.pane.contains(pos) {
            return Region::Pane;
        }
        if self.footer.contains(pos) {
            return Region::Footer;
        }
        Region::Outside
    }
}

/// First list entry drawn so that `selected` stays on screen
pub fn list_offset(selected: usize, capacity_items: usize) -> usize {
    if capacity_items == 0 {
        return selected;
    }
    selected.saturating_sub(capacity_items - 1)
}

/// Place a floating box at (x, y), shifted left and up so it stays on screen
pub fn popup_rect(x: u16, y: u16, width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = x.min(area.right().saturating_sub(width)).max(area.x);
    let y = y.min(area.bottom().saturating_sub(height)).max(area.y);
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoint_thresholds() {
        assert_eq!(Breakpoint::from_width(40), Breakpoint::Compact);
        assert_eq!(Breakpoint::from_width(59), Breakpoint::Compact);
        assert_eq!(Breakpoint::from_width(60), Breakpoint::Normal);
        assert_eq!(Breakpoint::from_width(99), Breakpoint::Normal);
        assert_eq!(Breakpoint::from_width(100), Breakpoint::Wide);
        assert_eq!(Breakpoint::from_width(139), Breakpoint::Wide);
        assert_eq!(Breakpoint::from_width(140), Breakpoint::UltraWide);
    }

    #[test]
    fn regions_tile_the_screen() {
        let layout = ScreenLayout::compute(Rect::new(0, 0, 120, 40));
        assert_eq!(layout.sidebar.width, 22);
        assert_eq!(layout.list.x, 22);
        assert_eq!(layout.pane.x, 54);
        assert_eq!(layout.pane.width, 66);
        assert_eq!(layout.footer.y, 38);
        assert_eq!(layout.pane.bottom(), 38);
    }

    #[test]
    fn compact_hides_sidebar() {
        let layout = ScreenLayout::compute(Rect::new(0, 0, 50, 20));
        assert_eq!(layout.sidebar.width, 0);
        assert_eq!(layout.list.width, 20);
    }

    #[test]
    fn hit_testing() {
        let layout = ScreenLayout::compute(Rect::new(0, 0, 120, 40));
        assert_eq!(layout.region_at(3, 1), Region::Sidebar(0));
        assert_eq!(layout.region_at(30, 4), Region::List(3));
        assert_eq!(layout.region_at(30, 0), Region::Outside);
        assert_eq!(layout.region_at(54, 0), Region::Tab(PaneKind::Agent));
        assert_eq!(layout.region_at(54 + TAB_WIDTH, 0), Region::Tab(PaneKind::Diff));
        assert_eq!(layout.region_at(80, 10), Region::Pane);
        assert_eq!(layout.region_at(10, 39), Region::Footer);
    }

    #[test]
    fn popup_is_pulled_back_on_screen() {
        let area = Rect::new(0, 0, 80, 24);
        assert_eq!(popup_rect(75, 20, 20, 10, area), Rect::new(60, 14, 20, 10));
        assert_eq!(popup_rect(5, 5, 20, 10, area), Rect::new(5, 5, 20, 10));
    }

    #[test]
    fn pane_content_is_inside_the_border() {
        let layout = ScreenLayout::compute(Rect::new(0, 0, 120, 40));
        let content = layout.pane_content();
        assert_eq!(content.x, layout.pane.x + 1);
        assert_eq!(content.width, layout.pane.width - 2);
    }

    #[test]
    fn offset_keeps_selection_visible() {
        assert_eq!(list_offset(3, 10), 0);
        assert_eq!(list_offset(12, 10), 3);
        assert_eq!(list_offset(5, 0), 5);
    }
}
