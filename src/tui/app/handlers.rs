// Overlay key handlers and deferred actions
//
// Each handler receives its state by value. It puts the state back when the
// overlay stays open, and leaves Default in place otherwise.

use super::keys::title_input;
use super::nav::NavPosition;
use super::topics::UNGROUPED_LABEL;
use super::App;
use crate::session::{ControllerError, PaneKind, MAX_TITLE_WIDTH};
use crate::tui::clipboard::copy_to_clipboard;
use crate::tui::list::SidebarItem;
use crate::tui::modal::{
    confirm_input, ConfirmAction, ContextMenu, InputAction, MenuItem, MenuOutcome, Picker,
    PickerAction, TextInput,
};
use crate::tui::msg::Msg;
use crate::tui::state::{MenuAction, PendingAction, PendingConfirmation, UiState};
use crate::tui::task::Task;
use crossterm::event::{KeyCode, KeyEvent};
use std::path::PathBuf;

impl App {
    pub(super) fn on_overlay_key(&mut self, key: KeyEvent) -> Vec<Task> {
        let state = std::mem::take(&mut self.state);
        match state {
            UiState::CreatingSession {
                id,
                input,
                prompt_after,
            } => self.creating_session_key(id, input, prompt_after, &key),
            UiState::EnteringPrompt { id, mut input } => match input.handle_input(&key) {
                InputAction::Submit => self.submit_prompt(&id, input.value),
                InputAction::Cancel => vec![],
                _ => {
                    self.state = UiState::EnteringPrompt { id, input };
                    vec![]
                }
            },
            UiState::SendingPrompt { mut input, id } => match input.handle_input(&key) {
                InputAction::Submit => self.submit_prompt(&id, input.value),
                InputAction::Cancel => vec![],
                _ => {
                    self.state = UiState::SendingPrompt { input, id };
                    vec![]
                }
            },
            UiState::Help { then, .. } => match then {
                Some(action) => self.run_action(action),
                None => vec![],
            },
            UiState::Confirm(pending) => match confirm_input(&key) {
                ConfirmAction::Confirm => self.run_action(pending.action),
                ConfirmAction::Cancel => vec![],
                ConfirmAction::None => {
                    self.state = UiState::Confirm(pending);
                    vec![]
                }
            },
            UiState::SyncConfirm { id, message } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.push(&id, true),
                KeyCode::Char('n') | KeyCode::Char('N') => self.push(&id, false),
                KeyCode::Esc => vec![],
                _ => {
                    self.state = UiState::SyncConfirm { id, message };
                    vec![]
                }
            },
            UiState::AddingProject { mut input } => match input.handle_input(&key) {
                InputAction::Submit => match self.open_folder(&input.value) {
                    Ok(tasks) => tasks,
                    Err(e) => {
                        self.state = UiState::AddingProject { input };
                        self.show_error(e)
                    }
                },
                InputAction::Cancel => vec![],
                _ => {
                    self.state = UiState::AddingProject { input };
                    vec![]
                }
            },
            UiState::ManagingIntegrations { picker } => self.integrations_key(picker, &key),
            UiState::ProjectHistory { picker, filtering } => {
                self.history_key(picker, filtering, &key)
            }
            UiState::ContextMenu(mut menu) => match menu.handle_input(&key) {
                MenuOutcome::Open => {
                    self.state = UiState::ContextMenu(menu);
                    vec![]
                }
                MenuOutcome::Dismiss => vec![],
                MenuOutcome::Chosen(action) => self.run_menu_action(action),
            },
            UiState::CreatingTopic { mut input, repo } => match input.handle_input(&key) {
                InputAction::Submit => {
                    let name = input.value.trim().to_string();
                    if let Err(e) = self.validate_topic_name(&name, None) {
                        self.state = UiState::CreatingTopic { input, repo };
                        return self.show_error(e);
                    }
                    self.state = UiState::ConfirmingTopicSharing { name, repo };
                    vec![]
                }
                InputAction::Cancel => vec![],
                _ => {
                    self.state = UiState::CreatingTopic { input, repo };
                    vec![]
                }
            },
            UiState::ConfirmingTopicSharing { name, repo } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.create_topic(name, repo, true),
                KeyCode::Char('n') | KeyCode::Char('N') => self.create_topic(name, repo, false),
                KeyCode::Esc => vec![],
                _ => {
                    self.state = UiState::ConfirmingTopicSharing { name, repo };
                    vec![]
                }
            },
            UiState::MovingToTopic { mut picker, id } => match picker.handle_input(&key) {
                PickerAction::Submit(index) => {
                    let topic = match picker.items().get(index) {
                        Some(label) if index > 0 && label != UNGROUPED_LABEL => label.clone(),
                        _ => String::new(),
                    };
                    self.move_to_topic(&id, &topic)
                }
                PickerAction::Cancel => vec![],
                PickerAction::None => {
                    self.state = UiState::MovingToTopic { picker, id };
                    vec![]
                }
            },
            UiState::SwitchingRepo { picker, paths } => self.switching_repo_key(picker, paths, &key),
            UiState::PickingRepoForTopic { mut picker, paths } => {
                match picker.handle_input(&key) {
                    PickerAction::Submit(index) => match paths.get(index) {
                        Some(repo) => {
                            self.state = UiState::CreatingTopic {
                                input: TextInput::new("Topic name"),
                                repo: repo.clone(),
                            };
                            vec![]
                        }
                        None => vec![],
                    },
                    PickerAction::Cancel => vec![],
                    PickerAction::None => {
                        self.state = UiState::PickingRepoForTopic { picker, paths };
                        vec![]
                    }
                }
            }
            UiState::Searching { input } => self.searching_key(input, &key),
            UiState::RenamingSession { mut input, id } => match input.handle_input(&key) {
                InputAction::Submit => {
                    let title = input.value.trim().to_string();
                    match self.rename_session(&id, title) {
                        Ok(tasks) => tasks,
                        Err(e) => {
                            self.state = UiState::RenamingSession { input, id };
                            self.show_error(e)
                        }
                    }
                }
                InputAction::Cancel => vec![],
                InputAction::TooLong => {
                    self.state = UiState::RenamingSession { input, id };
                    self.show_error(ControllerError::TitleTooLong(MAX_TITLE_WIDTH))
                }
                _ => {
                    self.state = UiState::RenamingSession { input, id };
                    vec![]
                }
            },
            UiState::RenamingTopic { mut input, old } => match input.handle_input(&key) {
                InputAction::Submit => {
                    let name = input.value.trim().to_string();
                    if let Err(e) = self.validate_topic_name(&name, Some(&old)) {
                        self.state = UiState::RenamingTopic { input, old };
                        return self.show_error(e);
                    }
                    self.rename_topic(&old, &name)
                }
                InputAction::Cancel => vec![],
                _ => {
                    self.state = UiState::RenamingTopic { input, old };
                    vec![]
                }
            },
            UiState::EditingPrTitle { mut input, id } => match input.handle_input(&key) {
                InputAction::Submit => {
                    let pr_title = input.value.trim().to_string();
                    if pr_title.is_empty() {
                        self.state = UiState::EditingPrTitle { input, id };
                        return self.show_error(ControllerError::TitleEmpty);
                    }
                    self.generate_pr_body(id, pr_title)
                }
                InputAction::Cancel => vec![],
                _ => {
                    self.state = UiState::EditingPrTitle { input, id };
                    vec![]
                }
            },
            UiState::EditingPrBody {
                mut input,
                id,
                pr_title,
            } => match input.handle_input(&key) {
                InputAction::Submit => self.create_pr(&id, pr_title, input.value),
                InputAction::Cancel => vec![],
                _ => {
                    self.state = UiState::EditingPrBody {
                        input,
                        id,
                        pr_title,
                    };
                    vec![]
                }
            },
            // Routed elsewhere; put them back untouched
            state @ (UiState::Default | UiState::FocusedOnPane { .. }) => {
                self.state = state;
                vec![]
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session naming and prompts
    // ─────────────────────────────────────────────────────────────────────

    fn creating_session_key(
        &mut self,
        id: String,
        mut input: TextInput,
        prompt_after: bool,
        key: &KeyEvent,
    ) -> Vec<Task> {
        match input.handle_input(key) {
            InputAction::Submit => {
                let title = input.value.trim().to_string();
                let error = if title.is_empty() {
                    Some(ControllerError::TitleEmpty)
                } else if self.list.title_taken(&title, &id) {
                    Some(ControllerError::AlreadyExists(title.clone()))
                } else {
                    None
                };
                if let Some(error) = error {
                    self.state = UiState::CreatingSession {
                        id,
                        input,
                        prompt_after,
                    };
                    return self.show_error(error);
                }

                tracing::info!("Creating session {}", title);
                self.list.update(&id, |s| {
                    s.title = title.clone();
                    s.set_loading("Starting...");
                });
                self.nav = NavPosition::SessionList;
                if prompt_after {
                    self.state = UiState::EnteringPrompt {
                        id: id.clone(),
                        input: TextInput::new(format!("Prompt for {}", title)).multiline(),
                    };
                }
                vec![self.start_task(&id, None, None)]
            }
            InputAction::Cancel => {
                self.list.remove(&id);
                vec![]
            }
            InputAction::TooLong => {
                self.state = UiState::CreatingSession {
                    id,
                    input,
                    prompt_after,
                };
                self.show_error(ControllerError::TitleTooLong(MAX_TITLE_WIDTH))
            }
            InputAction::Changed | InputAction::None => {
                self.state = UiState::CreatingSession {
                    id,
                    input,
                    prompt_after,
                };
                vec![]
            }
        }
    }

    fn submit_prompt(&mut self, id: &str, prompt: String) -> Vec<Task> {
        if prompt.trim().is_empty() {
            return vec![];
        }
        self.send_prompt(id, prompt)
    }

    /// Give a session a new display title; its id stays the same
    fn rename_session(&mut self, id: &str, title: String) -> Result<Vec<Task>, ControllerError> {
        if title.is_empty() {
            return Err(ControllerError::TitleEmpty);
        }
        if self.list.title_taken(&title, id) {
            return Err(ControllerError::AlreadyExists(title));
        }
        tracing::info!("Renaming session {} to {}", id, title);
        self.list.update(id, |s| s.title = title);
        Ok(self.save_instances())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pickers and search
    // ─────────────────────────────────────────────────────────────────────

    fn integrations_key(&mut self, mut picker: Picker, key: &KeyEvent) -> Vec<Task> {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => return vec![],
            KeyCode::Char(' ') => {
                if let Some(index) = picker.selected() {
                    self.toggle_integration(index);
                    picker.set_items(self.integration_items());
                }
            }
            KeyCode::Up | KeyCode::Char('k') => picker.up(),
            KeyCode::Down | KeyCode::Char('j') => picker.down(),
            _ => {}
        }
        self.state = UiState::ManagingIntegrations { picker };
        vec![]
    }

    fn history_key(&mut self, mut picker: Picker, filtering: bool, key: &KeyEvent) -> Vec<Task> {
        if filtering {
            match key.code {
                KeyCode::Esc => {
                    self.state = UiState::ProjectHistory {
                        picker,
                        filtering: false,
                    };
                    return vec![];
                }
                KeyCode::Enter => return self.open_history_entry(picker.selected()),
                _ => {
                    picker.handle_input(key);
                }
            }
            self.state = UiState::ProjectHistory { picker, filtering };
            return vec![];
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return vec![],
            KeyCode::Enter | KeyCode::Char(' ') => return self.open_history_entry(picker.selected()),
            KeyCode::Char(ch @ '1'..='9') => {
                let position = ch as usize - '1' as usize;
                let index = picker.visible().nth(position).map(|(index, _)| index);
                if index.is_some() {
                    return self.open_history_entry(index);
                }
            }
            KeyCode::Char('/') => {
                self.state = UiState::ProjectHistory {
                    picker,
                    filtering: true,
                };
                return vec![];
            }
            KeyCode::Char('n') => {
                self.state = UiState::AddingProject {
                    input: TextInput::new("Open folder"),
                };
                return vec![];
            }
            KeyCode::Char('c') => {
                let tasks = self.trim_history();
                picker.set_items(self.history_items());
                self.state = UiState::ProjectHistory { picker, filtering };
                return tasks;
            }
            KeyCode::Up | KeyCode::Char('k') => picker.up(),
            KeyCode::Down | KeyCode::Char('j') => picker.down(),
            _ => {}
        }
        self.state = UiState::ProjectHistory { picker, filtering };
        vec![]
    }

    fn open_history_entry(&mut self, index: Option<usize>) -> Vec<Task> {
        let Some(repo) = index.and_then(|i| self.recent_repos.get(i)).cloned() else {
            return vec![];
        };
        if !repo.is_dir() {
            return self.show_error(ControllerError::NotADirectory(repo.display().to_string()));
        }
        self.switch_repo(repo)
    }

    fn switching_repo_key(
        &mut self,
        mut picker: Picker,
        paths: Vec<Option<PathBuf>>,
        key: &KeyEvent,
    ) -> Vec<Task> {
        // Space toggles a repository in or out of the multi-repo view
        if key.code == KeyCode::Char(' ') && picker.query().is_empty() {
            let mut tasks = Vec::new();
            if let Some(Some(repo)) = picker.selected().and_then(|i| paths.get(i)) {
                tasks = self.toggle_repo(&repo.clone());
            }
            let (labels, paths) = self.repo_picker_items();
            picker.set_items(labels);
            self.state = UiState::SwitchingRepo { picker, paths };
            return tasks;
        }

        match picker.handle_input(key) {
            PickerAction::Submit(index) => match paths.get(index) {
                Some(Some(repo)) => self.switch_repo(repo.clone()),
                _ => {
                    self.state = UiState::AddingProject {
                        input: TextInput::new("Open folder"),
                    };
                    vec![]
                }
            },
            PickerAction::Cancel => vec![],
            PickerAction::None => {
                self.state = UiState::SwitchingRepo { picker, paths };
                vec![]
            }
        }
    }

    fn searching_key(&mut self, mut input: TextInput, key: &KeyEvent) -> Vec<Task> {
        match key.code {
            KeyCode::Up => self.list.sidebar_prev(),
            KeyCode::Down => self.list.sidebar_next(),
            _ => match input.handle_input(key) {
                InputAction::Cancel => {
                    self.list.set_search("");
                    return vec![];
                }
                // The filter stays applied after Enter
                InputAction::Submit => return vec![],
                InputAction::Changed => self.list.set_search(&input.value),
                InputAction::TooLong | InputAction::None => {}
            },
        }
        self.state = UiState::Searching { input };
        vec![]
    }

    // ─────────────────────────────────────────────────────────────────────
    // Deferred actions
    // ─────────────────────────────────────────────────────────────────────

    /// Run an action captured by a confirmation or help screen
    pub(super) fn run_action(&mut self, action: PendingAction) -> Vec<Task> {
        tracing::debug!(?action, "running deferred action");
        match action {
            PendingAction::KillSession { id } => self.kill_session(&id, None),
            PendingAction::PushSession { id } => self.push_check(&id),
            PendingAction::PauseSession { id } => self.pause_session(&id, None),
            PendingAction::KillTopicMembers { topic } => self.kill_topic_members(&topic),
            PendingAction::DeleteTopic {
                topic,
                kill_members,
            } => self.delete_topic(&topic, kill_members),
            PendingAction::PushTopic { topic } => self.push_topic(&topic),
        }
    }

    fn confirm(&mut self, message: String, action: PendingAction) -> Vec<Task> {
        self.state = UiState::Confirm(PendingConfirmation { message, action });
        vec![]
    }

    // ─────────────────────────────────────────────────────────────────────
    // Context menus
    // ─────────────────────────────────────────────────────────────────────

    fn session_menu(&self) -> Vec<MenuItem<MenuAction>> {
        let Some(session) = self.list.selected() else {
            return vec![];
        };
        let mut items = vec![MenuItem::new("Focus agent", MenuAction::Focus)];
        if session.is_live() {
            items.push(MenuItem::new("Zen mode", MenuAction::Zen));
        }
        items.push(MenuItem::new("Kill", MenuAction::Kill));
        if session.is_paused() {
            items.push(MenuItem::new("Resume", MenuAction::Resume));
        } else if session.started && session.dead {
            items.push(MenuItem::new("Restart agent", MenuAction::Restart));
        } else if session.started {
            items.push(MenuItem::new("Pause", MenuAction::Pause));
        }
        items.push(MenuItem::new("Rename", MenuAction::Rename));
        items.push(MenuItem::new("Move to topic", MenuAction::MoveToTopic));
        items.push(MenuItem::new("Push branch", MenuAction::PushBranch));
        items.push(MenuItem::new("Create PR", MenuAction::CreatePr));
        items.push(MenuItem::new("Copy worktree path", MenuAction::CopyWorktreePath));
        items.push(MenuItem::new("Copy branch name", MenuAction::CopyBranch));
        items
    }

    fn topic_menu(&self) -> Vec<MenuItem<MenuAction>> {
        let Some(topic) = self.list.sidebar_topic() else {
            return vec![];
        };
        let mut items = vec![
            MenuItem::new("Kill all instances", MenuAction::KillTopic),
            MenuItem::new("Delete topic and instances", MenuAction::DeleteTopicAndInstances),
            MenuItem::new("Delete topic (keep instances)", MenuAction::DeleteTopic),
            MenuItem::new("Rename topic", MenuAction::RenameTopic),
        ];
        if topic.shared_worktree {
            items.push(MenuItem::new("Push topic branch", MenuAction::PushTopic));
        }
        items
    }

    /// Keyboard menu, anchored at the highlighted row
    pub(super) fn open_context_menu_for_selection(&mut self) -> Vec<Task> {
        if self.nav == NavPosition::Sidebar {
            let x = self.layout.sidebar.x + 2;
            let y = self.layout.sidebar.y + 1 + self.list.sidebar_selected() as u16;
            return self.open_context_menu_at(x, y, true);
        }
        let row_height = if self.list.expanded { 2 } else { 1 };
        let capacity = self.layout.list_capacity() / row_height;
        let selected = self.list.selected_index();
        let row = selected - crate::tui::layout::list_offset(selected, capacity);
        let x = self.layout.list.x + 2;
        let y = self.layout.list.y + 1 + (row * row_height) as u16;
        self.open_context_menu_at(x, y, false)
    }

    /// Open the topic menu (`on_topic`) or the session menu at a screen position
    pub(super) fn open_context_menu_at(&mut self, x: u16, y: u16, on_topic: bool) -> Vec<Task> {
        let items = if on_topic {
            self.topic_menu()
        } else {
            self.session_menu()
        };
        if items.is_empty() {
            return vec![];
        }
        self.state = UiState::ContextMenu(ContextMenu::new(x, y, items));
        vec![]
    }

    pub(super) fn run_menu_action(&mut self, action: MenuAction) -> Vec<Task> {
        tracing::debug!(?action, "context menu");
        match action {
            MenuAction::Focus => self.focus_pane(PaneKind::Agent),
            MenuAction::Zen => self.request_zen(),
            MenuAction::Kill => self.confirm_kill(),
            MenuAction::Pause => match self.selected_id() {
                Some(id) => self.pause_session(&id, None),
                None => vec![],
            },
            MenuAction::Resume | MenuAction::Restart => match self.selected_id() {
                Some(id) => self.resume_session(&id, None),
                None => vec![],
            },
            MenuAction::Rename => {
                let Some(session) = self.list.selected() else {
                    return vec![];
                };
                self.state = UiState::RenamingSession {
                    input: title_input("Rename session", &session.title),
                    id: session.id.clone(),
                };
                vec![]
            }
            MenuAction::MoveToTopic => self.begin_move_to_topic(),
            MenuAction::PushBranch => self.confirm_push(),
            MenuAction::CreatePr => self.begin_pr(),
            MenuAction::CopyWorktreePath => {
                let Some(id) = self.selected_id() else {
                    return vec![];
                };
                let backend = self.backend.clone();
                vec![Task::spawn(async move {
                    let copied = match backend.working_copy(&id).await {
                        Ok(working_copy) => {
                            let path = working_copy.path().display().to_string();
                            copy_to_clipboard(&path).map(|()| path)
                        }
                        Err(e) => Err(e),
                    };
                    match copied {
                        Ok(path) => Msg::Toast(format!("Copied {}", path)),
                        Err(e) => Msg::Error(e.context("failed to copy worktree path")),
                    }
                })]
            }
            MenuAction::CopyBranch => {
                let Some(branch) = self.list.selected().map(|s| s.branch.clone()) else {
                    return vec![];
                };
                match copy_to_clipboard(&branch) {
                    Ok(()) => {
                        self.show_toast(format!("Copied {}", branch));
                        vec![]
                    }
                    Err(e) => self.show_error(e.context("failed to copy branch name")),
                }
            }
            MenuAction::KillTopic => self.confirm_kill_topic(),
            MenuAction::DeleteTopicAndInstances | MenuAction::DeleteTopic => {
                let Some(name) = self.list.sidebar_topic().map(|t| t.name.clone()) else {
                    return self.show_error(ControllerError::NoTopicSelected);
                };
                let kill_members = action == MenuAction::DeleteTopicAndInstances;
                let message = if kill_members {
                    format!("[!] Delete topic '{}' and kill its instances?", name)
                } else {
                    format!("[!] Delete topic '{}'? Instances are kept.", name)
                };
                self.confirm(
                    message,
                    PendingAction::DeleteTopic {
                        topic: name,
                        kill_members,
                    },
                )
            }
            MenuAction::RenameTopic => {
                let Some(name) = self.list.sidebar_topic().map(|t| t.name.clone()) else {
                    return self.show_error(ControllerError::NoTopicSelected);
                };
                self.state = UiState::RenamingTopic {
                    input: TextInput::new("Rename topic").with_value(name.clone()),
                    old: name,
                };
                vec![]
            }
            MenuAction::PushTopic => {
                let Some(name) = self.list.sidebar_topic().map(|t| t.name.clone()) else {
                    return self.show_error(ControllerError::NoTopicSelected);
                };
                self.confirm(
                    format!("[!] Push changes from topic '{}'?", name),
                    PendingAction::PushTopic { topic: name },
                )
            }
        }
    }

    /// Sidebar row for a topic, used when a click lands on it
    pub(super) fn sidebar_is_topic(&self, index: usize) -> bool {
        matches!(self.list.sidebar().get(index), Some(SidebarItem::Topic(_)))
    }
}
