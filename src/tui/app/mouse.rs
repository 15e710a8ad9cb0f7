// Mouse handling outside a focused pane

use super::nav::NavPosition;
use super::App;
use crate::session::PaneKind;
use crate::tui::layout::{list_offset, popup_rect, Region};
use crate::tui::state::UiState;
use crate::tui::task::Task;
use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;

impl App {
    pub(super) fn on_mouse(&mut self, event: MouseEvent) -> Vec<Task> {
        match &self.state {
            UiState::Default => self.on_default_mouse(event),
            UiState::FocusedOnPane { pane } => self.on_focused_mouse(*pane, event),
            UiState::ContextMenu(_) => self.on_menu_mouse(event),
            // A click anywhere closes these; search keeps its filter
            UiState::SwitchingRepo { .. } | UiState::Searching { .. } => {
                if matches!(event.kind, MouseEventKind::Down(_)) {
                    self.state = UiState::Default;
                }
                vec![]
            }
            _ => vec![],
        }
    }

    fn on_menu_mouse(&mut self, event: MouseEvent) -> Vec<Task> {
        if !matches!(event.kind, MouseEventKind::Down(_)) {
            return vec![];
        }
        let UiState::ContextMenu(menu) = std::mem::take(&mut self.state) else {
            return vec![];
        };
        let rect = popup_rect(menu.x, menu.y, menu.width(), menu.height(), self.layout.area);
        if !rect.contains(Position::new(event.column, event.row)) {
            return vec![];
        }

        // Border and filter line come before the first entry
        let chosen = (event.row - rect.y)
            .checked_sub(2)
            .and_then(|row| menu.choose_row(row as usize));
        match chosen {
            Some(action) => self.run_menu_action(action),
            None => {
                self.state = UiState::ContextMenu(menu);
                vec![]
            }
        }
    }

    /// Row height of one list entry
    fn list_row_height(&self) -> usize {
        if self.list.expanded {
            2
        } else {
            1
        }
    }

    /// Index into the visible list for a clicked list row
    fn list_index_at(&self, row: usize) -> Option<usize> {
        let row_height = self.list_row_height();
        let capacity = self.layout.list_capacity() / row_height;
        let offset = list_offset(self.list.selected_index(), capacity);
        let index = offset + row / row_height;
        (index < self.list.visible_ids().len()).then_some(index)
    }

    pub(super) fn on_default_mouse(&mut self, event: MouseEvent) -> Vec<Task> {
        let region = self.layout.region_at(event.column, event.row);
        match event.kind {
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                let up = event.kind == MouseEventKind::ScrollUp;
                self.scroll(region, up);
                vec![]
            }
            MouseEventKind::Down(MouseButton::Left) => match region {
                Region::Sidebar(index) => {
                    self.nav = NavPosition::Sidebar;
                    self.list.set_sidebar(index);
                    vec![]
                }
                Region::List(row) => {
                    if let Some(index) = self.list_index_at(row) {
                        self.list.select_index(index);
                        self.diff_selected = 0;
                        self.diff_scroll = 0;
                    }
                    self.nav = NavPosition::SessionList;
                    vec![]
                }
                Region::Tab(tab) => {
                    self.tab = tab;
                    self.preview_scroll = 0;
                    vec![]
                }
                Region::Pane => self.focus_pane(self.tab),
                Region::Footer | Region::Outside => vec![],
            },
            MouseEventKind::Down(MouseButton::Right) => match region {
                Region::Sidebar(index) => {
                    self.nav = NavPosition::Sidebar;
                    self.list.set_sidebar(index);
                    if !self.sidebar_is_topic(index) {
                        return vec![];
                    }
                    self.open_context_menu_at(event.column, event.row, true)
                }
                Region::List(row) => {
                    let Some(index) = self.list_index_at(row) else {
                        return vec![];
                    };
                    self.list.select_index(index);
                    self.nav = NavPosition::SessionList;
                    self.open_context_menu_at(event.column, event.row, false)
                }
                _ => vec![],
            },
            _ => vec![],
        }
    }

    fn scroll(&mut self, region: Region, up: bool) {
        match region {
            Region::Pane if self.tab == PaneKind::Diff => {
                self.diff_scroll = if up {
                    self.diff_scroll.saturating_sub(3)
                } else {
                    self.diff_scroll.saturating_add(3)
                };
            }
            // The preview counts back from its newest line
            Region::Pane => {
                self.preview_scroll = if up {
                    self.preview_scroll.saturating_add(3)
                } else {
                    self.preview_scroll.saturating_sub(3)
                };
            }
            Region::List(_) => {
                if up {
                    self.list.select_prev();
                } else {
                    self.list.select_next();
                }
            }
            Region::Sidebar(_) => {
                if up {
                    self.list.sidebar_prev();
                } else {
                    self.list.sidebar_next();
                }
            }
            _ => {}
        }
    }
}
