// Navigation ring and focus-mode input
//
// Shift+Left/Right walk a fixed ring of six positions. Landing on a
// process-backed pane attaches it; leaving detaches. While a pane has focus
// every key except the detach chord and the Shift arrows goes to the pane.

use super::App;
use crate::session::PaneKind;
use crate::tui::focus::{is_detach_key, key_to_bytes, mouse_to_sgr};
use crate::tui::layout::Region;
use crate::tui::state::UiState;
use crate::tui::task::Task;
use crate::util::shell_quote;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavPosition {
    Sidebar,
    SessionList,
    AgentPane,
    ShellPane,
    DiffPane,
    VcsPane,
}

impl NavPosition {
    const RING: [NavPosition; 6] = [
        NavPosition::Sidebar,
        NavPosition::SessionList,
        NavPosition::AgentPane,
        NavPosition::ShellPane,
        NavPosition::DiffPane,
        NavPosition::VcsPane,
    ];

    fn index(self) -> usize {
        Self::RING.iter().position(|p| *p == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::RING[(self.index() + 1) % Self::RING.len()]
    }

    pub fn prev(self) -> Self {
        Self::RING[(self.index() + Self::RING.len() - 1) % Self::RING.len()]
    }

    /// The pane this position stands for, if it is a pane
    pub fn pane(self) -> Option<PaneKind> {
        match self {
            NavPosition::AgentPane => Some(PaneKind::Agent),
            NavPosition::ShellPane => Some(PaneKind::Shell),
            NavPosition::DiffPane => Some(PaneKind::Diff),
            NavPosition::VcsPane => Some(PaneKind::Vcs),
            NavPosition::Sidebar | NavPosition::SessionList => None,
        }
    }

    pub fn for_pane(pane: PaneKind) -> Self {
        match pane {
            PaneKind::Agent => NavPosition::AgentPane,
            PaneKind::Shell => NavPosition::ShellPane,
            PaneKind::Diff => NavPosition::DiffPane,
            PaneKind::Vcs => NavPosition::VcsPane,
        }
    }
}

impl App {
    /// Show `pane` for the selected session and give it focus when possible.
    ///
    /// A missing, unstarted, paused or dead session only selects the tab.
    pub(super) fn focus_pane(&mut self, pane: PaneKind) -> Vec<Task> {
        self.tab = pane;
        self.nav = NavPosition::for_pane(pane);

        let Some(session) = self.list.selected() else {
            self.focus.detach();
            self.state = UiState::Default;
            return vec![];
        };

        if !pane.is_process_backed() {
            self.focus.detach();
            self.state = UiState::FocusedOnPane { pane };
            return vec![];
        }

        if !session.is_live() {
            tracing::debug!("{} is not running; selecting without attaching", session.title);
            self.focus.detach();
            self.state = UiState::Default;
            return vec![];
        }

        let id = session.id.clone();
        match self
            .focus
            .attach(self.backend.as_ref(), &id, pane, self.layout.pane_content())
        {
            Ok(()) => {
                self.state = UiState::FocusedOnPane { pane };
                vec![]
            }
            Err(e) => {
                self.state = UiState::Default;
                self.nav = NavPosition::SessionList;
                self.show_error(e.context(format!("failed to attach {} pane", pane.label())))
            }
        }
    }

    /// Leave focus mode and return to the session list
    pub(super) fn exit_focus(&mut self) -> Vec<Task> {
        self.focus.detach();
        self.diff_selected = 0;
        self.diff_scroll = 0;
        self.nav = NavPosition::SessionList;
        self.state = UiState::Default;
        vec![self.resize_task()]
    }

    /// Shift+Left/Right
    pub(super) fn nav_step(&mut self, forward: bool) -> Vec<Task> {
        let target = if forward {
            self.nav.next()
        } else {
            self.nav.prev()
        };
        match target.pane() {
            Some(pane) => self.focus_pane(pane),
            None => {
                let had_focus = self.focus.detach() || !self.state.is_default();
                self.nav = target;
                self.state = UiState::Default;
                if had_focus {
                    vec![self.resize_task()]
                } else {
                    vec![]
                }
            }
        }
    }

    /// Shift+Up/Down, and plain Up/Down outside focus
    pub(super) fn nav_vertical(&mut self, down: bool) -> Vec<Task> {
        match self.nav.pane() {
            None if self.nav == NavPosition::Sidebar => {
                if down {
                    self.list.sidebar_next();
                } else {
                    self.list.sidebar_prev();
                }
                vec![]
            }
            None => {
                if down {
                    self.list.select_next();
                } else {
                    self.list.select_prev();
                }
                vec![]
            }
            Some(pane) => {
                // Re-attach the same pane on the neighbouring session
                self.focus.detach();
                if down {
                    self.list.select_next();
                } else {
                    self.list.select_prev();
                }
                self.diff_selected = 0;
                self.diff_scroll = 0;
                self.focus_pane(pane)
            }
        }
    }

    pub(super) fn on_focused_key(&mut self, pane: PaneKind, key: KeyEvent) -> Vec<Task> {
        if is_detach_key(&key) {
            return self.exit_focus();
        }
        if key.modifiers.contains(KeyModifiers::SHIFT) {
            match key.code {
                KeyCode::Left => return self.nav_step(false),
                KeyCode::Right => return self.nav_step(true),
                KeyCode::Up => return self.nav_vertical(false),
                KeyCode::Down => return self.nav_vertical(true),
                _ => {}
            }
        }
        if pane == PaneKind::Diff {
            return self.on_diff_key(key);
        }

        let Some(bytes) = key_to_bytes(&key) else {
            return vec![];
        };
        self.forward_to_pane(&bytes)
    }

    /// Write to the attached sink, leaving focus if its process is gone
    fn forward_to_pane(&mut self, bytes: &[u8]) -> Vec<Task> {
        match self.focus.forward(bytes) {
            Ok(true) => vec![],
            Ok(false) => {
                tracing::info!("Pane process is no longer running; leaving focus");
                self.exit_focus()
            }
            Err(e) => {
                let mut tasks = self.exit_focus();
                tasks.extend(self.show_error(e.context("failed to write to pane")));
                tasks
            }
        }
    }

    fn diff_files(&self) -> Vec<String> {
        self.list
            .selected()
            .map(|s| s.diff_stats.files.clone())
            .unwrap_or_default()
    }

    fn on_diff_key(&mut self, key: KeyEvent) -> Vec<Task> {
        let count = self.diff_files().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.diff_selected = self.diff_selected.saturating_sub(1);
                vec![]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.diff_selected + 1 < count {
                    self.diff_selected += 1;
                }
                vec![]
            }
            KeyCode::Char('K') => {
                self.diff_scroll = self.diff_scroll.saturating_sub(1);
                vec![]
            }
            KeyCode::Char('J') => {
                self.diff_scroll = self.diff_scroll.saturating_add(1);
                vec![]
            }
            KeyCode::Enter => self.open_in_editor(),
            KeyCode::Char('q') | KeyCode::Esc => self.exit_focus(),
            _ => vec![],
        }
    }

    /// Open the highlighted diff file in an editor inside the shell pane
    fn open_in_editor(&mut self) -> Vec<Task> {
        let Some(file) = self.diff_files().get(self.diff_selected).cloned() else {
            return vec![];
        };
        let mut tasks = self.focus_pane(PaneKind::Shell);
        if self.focus.pane() == Some(PaneKind::Shell) {
            let command = format!("${{EDITOR:-vi}} {}\r", shell_quote(&file));
            tasks.extend(self.forward_to_pane(command.as_bytes()));
        }
        tasks
    }

    pub(super) fn on_focused_mouse(&mut self, pane: PaneKind, event: MouseEvent) -> Vec<Task> {
        let content = self.layout.pane_content();
        if !content.contains(Position::new(event.column, event.row)) {
            if !matches!(event.kind, MouseEventKind::Down(_)) {
                return vec![];
            }
            if let Region::Tab(tab) = self.layout.region_at(event.column, event.row) {
                self.focus.detach();
                return self.focus_pane(tab);
            }
            let mut tasks = self.exit_focus();
            tasks.extend(self.on_default_mouse(event));
            return tasks;
        }

        if pane == PaneKind::Diff {
            match event.kind {
                MouseEventKind::ScrollUp => self.diff_scroll = self.diff_scroll.saturating_sub(1),
                MouseEventKind::ScrollDown => self.diff_scroll = self.diff_scroll.saturating_add(1),
                MouseEventKind::Down(MouseButton::Left) => {
                    // Two summary lines sit above the file list
                    let row = (event.row - content.y) as usize + self.diff_scroll as usize;
                    if let Some(index) = row.checked_sub(2) {
                        if index < self.diff_files().len() {
                            self.diff_selected = index;
                        }
                    }
                }
                _ => {}
            }
            return vec![];
        }

        match mouse_to_sgr(&event, content) {
            Some(sequence) => self.forward_to_pane(sequence.as_bytes()),
            None => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_wraps_both_ways() {
        assert_eq!(NavPosition::VcsPane.next(), NavPosition::Sidebar);
        assert_eq!(NavPosition::Sidebar.prev(), NavPosition::VcsPane);
        assert_eq!(NavPosition::SessionList.next(), NavPosition::AgentPane);

        let mut pos = NavPosition::Sidebar;
        for _ in 0..6 {
            pos = pos.next();
        }
        assert_eq!(pos, NavPosition::Sidebar);
    }

    #[test]
    fn panes_map_to_positions() {
        for pane in [PaneKind::Agent, PaneKind::Shell, PaneKind::Diff, PaneKind::Vcs] {
            assert_eq!(NavPosition::for_pane(pane).pane(), Some(pane));
        }
        assert_eq!(NavPosition::Sidebar.pane(), None);
    }
}
