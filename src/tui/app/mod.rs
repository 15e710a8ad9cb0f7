// TUI application state - the session-orchestration controller
//
// `App` owns every piece of controller state and changes it in exactly one
// place: `update`. Terminal input, timers, background results and brain
// actions all arrive as `Msg` values; each call returns the follow-up
// `Task`s for the event loop to run. Handlers are split across the
// submodules by concern, each adding an `impl App` block.

mod gateway;
mod handlers;
mod keys;
mod lifecycle;
mod mouse;
mod nav;
mod refresh;
mod topics;

#[cfg(test)]
mod tests;

pub use keys::GlobalKey;
pub use nav::NavPosition;

use super::components::toast::Toast;
use super::focus::FocusMux;
use super::layout::ScreenLayout;
use super::list::SessionList;
use super::msg::Msg;
use super::state::UiState;
use super::task::Task;
use super::theme::Theme;
use crate::brain::ActionIntake;
use crate::config::Config;
use crate::logging::LogBuffer;
use crate::session::{PaneKind, SessionBackend, Status};
use crate::storage::Persistence;
use anyhow::{Context, Result};
use crossterm::event::KeyEvent;
use ratatui::layout::Rect;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Something the event loop must do with the real terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalRequest {
    /// Hand the whole terminal to a session until the operator detaches
    Zen { id: String },
}

/// The error line above the footer
#[derive(Debug, Clone)]
pub struct ErrorBanner {
    pub message: String,
    id: u64,
}

pub struct App {
    pub config: Config,
    backend: Arc<dyn SessionBackend>,
    store: Box<dyn Persistence>,
    cancel: CancellationToken,
    pub log_buffer: LogBuffer,

    /// Exclusive UI mode; overlays own their data
    pub state: UiState,
    pub list: SessionList,
    pub nav: NavPosition,
    /// Content tab shown for the selected session
    pub tab: PaneKind,
    pub focus: FocusMux,

    /// Last captured agent output and the selection generation it belongs to
    pub preview: String,
    pub preview_generation: u64,
    /// Lines scrolled back from the bottom of the preview
    pub preview_scroll: u16,
    /// Highlighted file in the diff pane
    pub diff_selected: usize,
    pub diff_scroll: u16,

    pub layout: ScreenLayout,
    pub theme: Theme,
    pub error: Option<ErrorBanner>,
    error_seq: u64,
    pub toast: Option<Toast>,
    /// Menu legend entry flashed by the key pre-filter
    pub highlight: Option<GlobalKey>,
    /// The pre-filter already re-emitted the key being handled
    key_sent: bool,

    /// Most recent first
    pub recent_repos: Vec<PathBuf>,
    /// Prompts typed while their session was still starting
    pending_prompts: HashMap<String, String>,
    /// Topics waiting on their members' kills before they are removed
    topic_deletions: HashMap<String, topics::TopicDeletion>,
    terminal_request: Option<TerminalRequest>,
    pub should_quit: bool,
}

impl App {
    /// Load persisted sessions and topics and open `active_repos`
    pub fn new(
        config: Config,
        backend: Arc<dyn SessionBackend>,
        store: Box<dyn Persistence>,
        log_buffer: LogBuffer,
        cancel: CancellationToken,
        active_repos: Vec<PathBuf>,
    ) -> Result<Self> {
        let mut sessions = store
            .load_instances()
            .context("Failed to load sessions")?;
        let topics = store.load_topics().context("Failed to load topics")?;
        let mut recent_repos = store
            .load_recent_repos()
            .context("Failed to load recent repositories")?;

        // Anything that never finished starting has nothing behind it
        sessions.retain(|s| s.started);
        for session in sessions.iter_mut() {
            if session.status == Status::Loading {
                session.set_status(Status::Ready);
            }
        }

        for repo in active_repos.iter().rev() {
            recent_repos.retain(|r| r != repo);
            recent_repos.insert(0, repo.clone());
        }
        if let Err(e) = store.save_recent_repos(&recent_repos) {
            tracing::warn!("Failed to record recent repositories: {:#}", e);
        }

        tracing::info!(
            "Loaded {} sessions and {} topics across {} repositories",
            sessions.len(),
            topics.len(),
            active_repos.len()
        );

        Ok(Self {
            config,
            backend,
            store,
            cancel,
            log_buffer,
            state: UiState::Default,
            list: SessionList::new(sessions, topics, active_repos),
            nav: NavPosition::SessionList,
            tab: PaneKind::Agent,
            focus: FocusMux::default(),
            preview: String::new(),
            preview_generation: 0,
            preview_scroll: 0,
            diff_selected: 0,
            diff_scroll: 0,
            layout: ScreenLayout::default(),
            theme: Theme::default(),
            error: None,
            error_seq: 0,
            toast: None,
            highlight: None,
            key_sent: false,
            recent_repos,
            pending_prompts: HashMap::new(),
            topic_deletions: HashMap::new(),
            terminal_request: None,
            should_quit: false,
        })
    }

    /// Timers and the brain intake, armed once at startup
    pub fn initial_tasks(&self, intake: ActionIntake) -> Vec<Task> {
        vec![
            Task::Ready(Msg::PreviewTick),
            Task::Ready(Msg::MetadataTick),
            Task::Intake(intake),
        ]
    }

    pub fn backend(&self) -> Arc<dyn SessionBackend> {
        self.backend.clone()
    }

    /// Pending request for the real terminal, if any
    pub fn take_terminal_request(&mut self) -> Option<TerminalRequest> {
        self.terminal_request.take()
    }

    /// Fold one message into the controller
    pub fn update(&mut self, msg: Msg) -> Vec<Task> {
        tracing::trace!(msg = msg.name(), state = self.state.name(), "dispatch");
        match msg {
            Msg::Key(key) => self.on_key(key),
            Msg::Mouse(event) => self.on_mouse(event),
            Msg::Resize(width, height) => self.on_resize(width, height),
            Msg::KeyUp => {
                self.highlight = None;
                vec![]
            }
            Msg::HideError(id) => {
                if self.error.as_ref().is_some_and(|banner| banner.id == id) {
                    self.error = None;
                }
                vec![]
            }
            Msg::Error(e) => self.show_error(e),
            Msg::Toast(message) => {
                self.show_toast(message);
                vec![]
            }

            Msg::PreviewTick => self.on_preview_tick(),
            Msg::PreviewCaptured {
                generation,
                content,
            } => {
                self.on_preview_captured(generation, content);
                vec![]
            }
            Msg::MetadataTick => self.on_metadata_tick(),
            Msg::MetadataSwept(results) => self.on_metadata_swept(results),

            Msg::Action { request, intake } => self.on_action(request, intake),
            Msg::IntakeClosed => {
                tracing::info!("Brain action intake closed");
                vec![]
            }

            Msg::SessionStarted {
                id,
                result,
                reply,
                prompt,
            } => self.on_session_started(id, result, reply, prompt),
            Msg::SessionPaused { id, result, reply } => self.on_session_paused(id, result, reply),
            Msg::SessionResumed {
                id,
                result,
                reply,
                restarted,
            } => self.on_session_resumed(id, result, reply, restarted),
            Msg::SessionKilled {
                id,
                title,
                result,
                reply,
                prior_status,
            } => {
                let killed = result.is_ok();
                let mut tasks =
                    self.on_session_killed(id.clone(), title, result, reply, prior_status);
                tasks.extend(self.on_member_killed(&id, killed));
                tasks
            }
            Msg::PromptSent {
                title,
                result,
                reply,
            } => self.on_prompt_sent(title, result, reply),

            Msg::PushChecked { id, result } => self.on_push_checked(id, result),
            Msg::PushFinished { title, result } => match result {
                Ok(()) => {
                    self.show_toast(format!("Pushed changes from {}", title));
                    vec![]
                }
                Err(e) => self.show_error(e.context("failed to push")),
            },
            Msg::PrBodyGenerated {
                id,
                pr_title,
                result,
            } => self.on_pr_body_generated(id, pr_title, result),
            Msg::PrCreated { title, result } => match result {
                Ok(url) => {
                    self.show_toast(format!("PR created for {}: {}", title, url));
                    vec![]
                }
                Err(e) => self.show_error(e.context("failed to create PR")),
            },

            Msg::TopicReady { name, result } => self.on_topic_ready(name, result),
            Msg::TopicCleaned { name, result } => match result {
                Ok(()) => {
                    tracing::info!("Cleaned up topic {}", name);
                    vec![]
                }
                Err(e) => self.show_error(e.context(format!("failed to clean up topic {}", name))),
            },

            Msg::ZenFinished(result) => {
                let mut tasks = vec![self.resize_task()];
                if let Err(e) = result {
                    tasks.extend(self.show_error(e.context("zen mode")));
                }
                tasks
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Keyboard routing
    // ─────────────────────────────────────────────────────────────────────

    fn on_key(&mut self, key: KeyEvent) -> Vec<Task> {
        if let Some(tasks) = self.prefilter(key) {
            return tasks;
        }
        match &self.state {
            UiState::Default => self.on_default_key(key),
            UiState::FocusedOnPane { pane } => self.on_focused_key(*pane, key),
            _ => self.on_overlay_key(key),
        }
    }

    /// Flash the matching menu entry, then handle the key on the next cycle.
    ///
    /// Returns None when the key should be handled right away.
    fn prefilter(&mut self, key: KeyEvent) -> Option<Vec<Task>> {
        if std::mem::take(&mut self.key_sent) || !self.state.is_default() {
            return None;
        }
        let global = GlobalKey::from_key(&key)?;
        if !global.in_legend() {
            return None;
        }
        // Entering or zooming into a paused session does nothing worth flashing
        if matches!(global, GlobalKey::Enter | GlobalKey::Zen)
            && self.list.selected().is_some_and(|s| s.is_paused())
        {
            return None;
        }

        self.key_sent = true;
        self.highlight = Some(global);
        Some(vec![
            Task::Ready(Msg::Key(key)),
            Task::After(self.config.timing.keyup(), Msg::KeyUp),
        ])
    }

    fn on_resize(&mut self, width: u16, height: u16) -> Vec<Task> {
        self.layout = ScreenLayout::compute(Rect::new(0, 0, width, height));
        match self.focus.resize(self.layout.pane_content()) {
            Ok(()) => vec![],
            Err(e) => self.show_error(e.context("failed to resize pane")),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Shared helpers
    // ─────────────────────────────────────────────────────────────────────

    /// Log an error, show it in the banner and schedule its removal
    pub(super) fn show_error(&mut self, error: impl Into<anyhow::Error>) -> Vec<Task> {
        let error = error.into();
        tracing::error!("{:#}", error);
        self.error_seq += 1;
        self.error = Some(ErrorBanner {
            message: format!("{:#}", error),
            id: self.error_seq,
        });
        vec![Task::After(
            self.config.timing.error_clear(),
            Msg::HideError(self.error_seq),
        )]
    }

    pub(super) fn show_toast(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.toast = Some(Toast::new(message));
    }

    pub(super) fn save_instances(&mut self) -> Vec<Task> {
        match self.store.save_instances(self.list.all()) {
            Ok(()) => vec![],
            Err(e) => self.show_error(e.context("failed to save instances")),
        }
    }

    pub(super) fn save_topics(&mut self) -> Vec<Task> {
        match self.store.save_topics(self.list.topics()) {
            Ok(()) => vec![],
            Err(e) => self.show_error(e.context("failed to save topics")),
        }
    }

    pub(super) fn save_recent_repos(&mut self) -> Vec<Task> {
        match self.store.save_recent_repos(&self.recent_repos) {
            Ok(()) => vec![],
            Err(e) => self.show_error(e.context("failed to save recent repositories")),
        }
    }

    /// Re-run layout after the chrome changed shape
    pub(super) fn resize_task(&self) -> Task {
        Task::Ready(Msg::Resize(self.layout.area.width, self.layout.area.height))
    }

    /// Id of the selected session
    pub(super) fn selected_id(&self) -> Option<String> {
        self.list.selected_id().map(str::to_string)
    }

    /// Text the error line shows, if any
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|banner| banner.message.as_str())
    }
}
