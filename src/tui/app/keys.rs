// Global key map for the Default state
//
// GlobalKey names every command reachable from the list view. The footer
// legend draws a subset of them and the pre-filter flashes the entry that
// matches a press before the command runs.

use super::{App, NavPosition, TerminalRequest};
use crate::config::Config;
use crate::session::{ControllerError, PaneKind, Session, SessionOptions, MAX_TITLE_WIDTH};
use crate::tui::list::SidebarItem;
use crate::tui::modal::TextInput;
use crate::tui::state::{HelpTopic, PendingAction, PendingConfirmation, UiState};
use crate::tui::task::Task;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalKey {
    Up,
    Down,
    Left,
    Right,
    ShiftUp,
    ShiftDown,
    ShiftLeft,
    ShiftRight,
    Tab,
    Enter,
    New,
    NewWithPrompt,
    NewSkipPermissions,
    Kill,
    Push,
    CreatePr,
    Checkout,
    Resume,
    Prompt,
    Zen,
    NewTopic,
    MoveToTopic,
    KillTopic,
    SwitchRepo,
    History,
    Integrations,
    AutoYes,
    Filter,
    Sort,
    Expand,
    ContextMenu,
    ShellPane,
    VcsPane,
    Search,
    Help,
    Quit,
}

impl GlobalKey {
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(GlobalKey::Quit),
                _ => None,
            };
        }
        let global = match key.code {
            KeyCode::Up if shift => GlobalKey::ShiftUp,
            KeyCode::Down if shift => GlobalKey::ShiftDown,
            KeyCode::Left if shift => GlobalKey::ShiftLeft,
            KeyCode::Right if shift => GlobalKey::ShiftRight,
            KeyCode::Up | KeyCode::Char('k') => GlobalKey::Up,
            KeyCode::Down | KeyCode::Char('j') => GlobalKey::Down,
            KeyCode::Left | KeyCode::Char('h') => GlobalKey::Left,
            KeyCode::Right | KeyCode::Char('l') => GlobalKey::Right,
            KeyCode::Tab => GlobalKey::Tab,
            KeyCode::Enter | KeyCode::Char('o') => GlobalKey::Enter,
            KeyCode::Char('n') => GlobalKey::New,
            KeyCode::Char('N') => GlobalKey::NewWithPrompt,
            KeyCode::Char('S') => GlobalKey::NewSkipPermissions,
            KeyCode::Char('D') => GlobalKey::Kill,
            KeyCode::Char('p') => GlobalKey::Push,
            KeyCode::Char('P') => GlobalKey::CreatePr,
            KeyCode::Char('c') => GlobalKey::Checkout,
            KeyCode::Char('r') => GlobalKey::Resume,
            KeyCode::Char('i') => GlobalKey::Prompt,
            KeyCode::Char('z') => GlobalKey::Zen,
            KeyCode::Char('T') => GlobalKey::NewTopic,
            KeyCode::Char('m') => GlobalKey::MoveToTopic,
            KeyCode::Char('X') => GlobalKey::KillTopic,
            KeyCode::Char('R') => GlobalKey::SwitchRepo,
            KeyCode::Char('H') => GlobalKey::History,
            KeyCode::Char('I') => GlobalKey::Integrations,
            KeyCode::Char('y') => GlobalKey::AutoYes,
            KeyCode::Char('f') => GlobalKey::Filter,
            KeyCode::Char('s') => GlobalKey::Sort,
            KeyCode::Char('e') => GlobalKey::Expand,
            KeyCode::Char(' ') => GlobalKey::ContextMenu,
            KeyCode::Char('t') => GlobalKey::ShellPane,
            KeyCode::Char('g') => GlobalKey::VcsPane,
            KeyCode::Char('/') => GlobalKey::Search,
            KeyCode::Char('?') => GlobalKey::Help,
            KeyCode::Char('q') => GlobalKey::Quit,
            _ => return None,
        };
        Some(global)
    }

    /// Key label and description as shown in the footer legend
    pub fn legend(&self) -> Option<(&'static str, &'static str)> {
        let entry = match self {
            GlobalKey::New => ("n", "new"),
            GlobalKey::NewWithPrompt => ("N", "new+prompt"),
            GlobalKey::Kill => ("D", "kill"),
            GlobalKey::Enter => ("↵", "focus"),
            GlobalKey::Push => ("p", "push"),
            GlobalKey::CreatePr => ("P", "PR"),
            GlobalKey::Checkout => ("c", "checkout"),
            GlobalKey::Resume => ("r", "resume"),
            GlobalKey::Prompt => ("i", "prompt"),
            GlobalKey::Zen => ("z", "zen"),
            GlobalKey::NewTopic => ("T", "topic"),
            GlobalKey::SwitchRepo => ("R", "repo"),
            GlobalKey::AutoYes => ("y", "auto-yes"),
            GlobalKey::Tab => ("tab", "pane"),
            GlobalKey::Search => ("/", "search"),
            GlobalKey::Help => ("?", "help"),
            GlobalKey::Quit => ("q", "quit"),
            _ => return None,
        };
        Some(entry)
    }

    /// Whether the footer legend has an entry to flash
    pub fn in_legend(&self) -> bool {
        self.legend().is_some()
    }

    /// Legend order
    pub const LEGEND: [GlobalKey; 17] = [
        GlobalKey::New,
        GlobalKey::NewWithPrompt,
        GlobalKey::Kill,
        GlobalKey::Enter,
        GlobalKey::Push,
        GlobalKey::CreatePr,
        GlobalKey::Checkout,
        GlobalKey::Resume,
        GlobalKey::Prompt,
        GlobalKey::Zen,
        GlobalKey::NewTopic,
        GlobalKey::SwitchRepo,
        GlobalKey::AutoYes,
        GlobalKey::Tab,
        GlobalKey::Search,
        GlobalKey::Help,
        GlobalKey::Quit,
    ];
}

/// Text input for a session title
pub(super) fn title_input(title: &str, value: &str) -> TextInput {
    TextInput::new(title)
        .with_value(value)
        .max_width(MAX_TITLE_WIDTH)
}

/// Record for a session that is about to be named
fn blank_session(config: &Config, repo: std::path::PathBuf, topic: &str, skip: bool) -> Session {
    Session::new(SessionOptions {
        title: String::new(),
        repo_path: repo,
        program: config.default_program.clone(),
        topic_name: topic.to_string(),
        skip_permissions: skip,
        ..Default::default()
    })
}

impl App {
    pub(super) fn on_default_key(&mut self, key: KeyEvent) -> Vec<Task> {
        let Some(global) = GlobalKey::from_key(&key) else {
            return vec![];
        };
        match global {
            GlobalKey::Up => self.nav_vertical(false),
            GlobalKey::Down => self.nav_vertical(true),
            GlobalKey::ShiftUp => self.nav_vertical(false),
            GlobalKey::ShiftDown => self.nav_vertical(true),
            GlobalKey::ShiftLeft => self.nav_step(false),
            GlobalKey::ShiftRight => self.nav_step(true),
            GlobalKey::Left => {
                self.nav = NavPosition::Sidebar;
                vec![]
            }
            GlobalKey::Right => match self.nav {
                NavPosition::Sidebar => {
                    self.nav = NavPosition::SessionList;
                    vec![]
                }
                _ => self.focus_pane(self.tab),
            },
            GlobalKey::Enter => match self.nav {
                NavPosition::Sidebar => {
                    self.nav = NavPosition::SessionList;
                    vec![]
                }
                _ => self.focus_pane(self.tab),
            },
            GlobalKey::Tab => {
                self.tab = self.tab.next_tab();
                self.preview_scroll = 0;
                if self.nav.pane().is_some() {
                    self.nav = NavPosition::for_pane(self.tab);
                }
                vec![]
            }
            GlobalKey::New => self.begin_new_session(false, false),
            GlobalKey::NewWithPrompt => self.begin_new_session(true, false),
            GlobalKey::NewSkipPermissions => self.begin_new_session(false, true),
            GlobalKey::Kill => self.confirm_kill(),
            GlobalKey::Push => self.confirm_push(),
            GlobalKey::CreatePr => self.begin_pr(),
            GlobalKey::Checkout => self.begin_checkout(),
            GlobalKey::Resume => self.resume_selected(),
            GlobalKey::Prompt => self.begin_send_prompt(),
            GlobalKey::Zen => self.request_zen(),
            GlobalKey::NewTopic => self.begin_new_topic(),
            GlobalKey::MoveToTopic => self.begin_move_to_topic(),
            GlobalKey::KillTopic => self.confirm_kill_topic(),
            GlobalKey::SwitchRepo => self.open_repo_picker(),
            GlobalKey::History => self.open_project_history(),
            GlobalKey::Integrations => self.open_integrations(),
            GlobalKey::AutoYes => self.toggle_auto_yes(),
            GlobalKey::Filter => {
                self.list.cycle_filter();
                vec![]
            }
            GlobalKey::Sort => {
                self.list.cycle_sort();
                vec![]
            }
            GlobalKey::Expand => {
                self.list.expanded = !self.list.expanded;
                vec![]
            }
            GlobalKey::ContextMenu => self.open_context_menu_for_selection(),
            GlobalKey::ShellPane => self.focus_pane(PaneKind::Shell),
            GlobalKey::VcsPane => self.focus_pane(PaneKind::Vcs),
            GlobalKey::Search => {
                self.list.select_sidebar_item(&SidebarItem::All);
                self.state = UiState::Searching {
                    input: TextInput::new("Search").with_value(self.list.search()),
                };
                vec![]
            }
            GlobalKey::Help => {
                self.state = UiState::Help {
                    topic: HelpTopic::General,
                    then: None,
                };
                vec![]
            }
            GlobalKey::Quit => self.quit(),
        }
    }

    /// Add an unnamed session and start naming it. `prompt_after` opens the
    /// prompt overlay once the name is accepted.
    pub(super) fn begin_new_session(&mut self, prompt_after: bool, skip: bool) -> Vec<Task> {
        let limit = self.config.instance_limit;
        if self.list.len() >= limit {
            return self.show_error(ControllerError::TooManyInstances(limit));
        }

        // New sessions join the topic the sidebar points at
        let (repo, topic) = match self.list.sidebar_topic() {
            Some(topic) => (Some(topic.repo_path.clone()), Some(topic.clone())),
            None => (self.list.current_repo(), None),
        };
        let Some(repo) = repo else {
            return self.show_error(anyhow::anyhow!("no repository is open"));
        };

        let topic_name = topic.as_ref().map(|t| t.name.as_str()).unwrap_or("");
        let mut session = blank_session(&self.config, repo, topic_name, skip);
        session.auto_yes = self.config.auto_yes || topic.is_some_and(|t| t.auto_yes);
        let id = session.id.clone();

        self.list.add(session);
        self.list.select_id(&id);
        self.nav = NavPosition::SessionList;
        self.state = UiState::CreatingSession {
            id,
            input: title_input("Session name", ""),
            prompt_after,
        };
        vec![]
    }

    pub(super) fn confirm_kill(&mut self) -> Vec<Task> {
        let Some(session) = self.list.selected() else {
            return vec![];
        };
        if session.is_busy() {
            let title = session.title.clone();
            return self.show_error(ControllerError::Busy(title));
        }
        self.state = UiState::Confirm(PendingConfirmation {
            message: format!("[!] Kill session '{}'?", session.title),
            action: PendingAction::KillSession {
                id: session.id.clone(),
            },
        });
        vec![]
    }

    pub(super) fn confirm_push(&mut self) -> Vec<Task> {
        let Some(session) = self.list.selected() else {
            return vec![];
        };
        if !session.started || session.is_paused() {
            let title = session.title.clone();
            return self.show_error(ControllerError::NotRunning(title));
        }
        self.state = UiState::Confirm(PendingConfirmation {
            message: format!("[!] Push changes from session '{}'?", session.title),
            action: PendingAction::PushSession {
                id: session.id.clone(),
            },
        });
        vec![]
    }

    fn begin_checkout(&mut self) -> Vec<Task> {
        let Some(session) = self.list.selected() else {
            return vec![];
        };
        if session.is_busy() {
            let title = session.title.clone();
            return self.show_error(ControllerError::Busy(title));
        }
        if !session.started || session.is_paused() {
            return vec![];
        }
        self.state = UiState::Help {
            topic: HelpTopic::Checkout,
            then: Some(PendingAction::PauseSession {
                id: session.id.clone(),
            }),
        };
        vec![]
    }

    /// Resume a paused session or restart a dead agent; anything else
    /// that is running is left alone
    fn resume_selected(&mut self) -> Vec<Task> {
        let Some(session) = self.list.selected() else {
            return vec![];
        };
        if session.is_busy() {
            let title = session.title.clone();
            return self.show_error(ControllerError::Busy(title));
        }
        if !session.is_paused() && !(session.started && session.dead) {
            return vec![];
        }
        let id = session.id.clone();
        self.resume_session(&id, None)
    }

    fn begin_send_prompt(&mut self) -> Vec<Task> {
        let Some(session) = self.list.selected() else {
            return vec![];
        };
        if session.is_busy() {
            let title = session.title.clone();
            return self.show_error(ControllerError::Busy(title));
        }
        if !session.is_live() {
            let title = session.title.clone();
            return self.show_error(ControllerError::NotRunning(title));
        }
        self.state = UiState::SendingPrompt {
            input: TextInput::new(format!("Prompt for {}", session.title)).multiline(),
            id: session.id.clone(),
        };
        vec![]
    }

    pub(super) fn request_zen(&mut self) -> Vec<Task> {
        let Some(session) = self.list.selected() else {
            return vec![];
        };
        if !session.is_live() {
            return vec![];
        }
        self.focus.detach();
        self.terminal_request = Some(TerminalRequest::Zen {
            id: session.id.clone(),
        });
        vec![]
    }

    /// Toggle auto-accept on the sidebar topic (cascading to its members)
    /// or on the selected session
    fn toggle_auto_yes(&mut self) -> Vec<Task> {
        if self.nav == NavPosition::Sidebar {
            if let Some(topic) = self.list.sidebar_topic() {
                let name = topic.name.clone();
                let enabled = !topic.auto_yes;
                if let Some(topic) = self.list.topic_mut(&name) {
                    topic.auto_yes = enabled;
                }
                for id in self.list.members(&name) {
                    self.list.update(&id, |s| s.auto_yes = enabled);
                }
                self.show_toast(format!(
                    "Auto-accept {} for topic {}",
                    if enabled { "ON" } else { "OFF" },
                    name
                ));
                let mut tasks = self.save_topics();
                tasks.extend(self.save_instances());
                return tasks;
            }
        }

        let Some(session) = self.list.selected() else {
            return vec![];
        };
        let id = session.id.clone();
        let title = session.title.clone();
        let enabled = !session.auto_yes;
        self.list.update(&id, |s| s.auto_yes = enabled);
        self.show_toast(format!(
            "Auto-accept {} for {}",
            if enabled { "ON" } else { "OFF" },
            title
        ));
        self.save_instances()
    }

    fn quit(&mut self) -> Vec<Task> {
        tracing::info!("Shutting down");
        self.cancel.cancel();
        self.focus.detach();
        if let Err(e) = self.store.save_instances(self.list.all()) {
            tracing::error!("Failed to save instances on exit: {:#}", e);
        }
        self.should_quit = true;
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifted_arrows_are_navigation() {
        let key = KeyEvent::new(KeyCode::Up, KeyModifiers::SHIFT);
        assert_eq!(GlobalKey::from_key(&key), Some(GlobalKey::ShiftUp));
        assert!(!GlobalKey::ShiftUp.in_legend());
    }

    #[test]
    fn ctrl_c_quits_but_other_chords_do_nothing() {
        let quit = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(GlobalKey::from_key(&quit), Some(GlobalKey::Quit));
        let other = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL);
        assert_eq!(GlobalKey::from_key(&other), None);
    }

    #[test]
    fn legend_entries_all_have_labels() {
        for key in GlobalKey::LEGEND {
            assert!(key.legend().is_some(), "{:?}", key);
        }
    }
}
