// Session lifecycle: start, pause, resume, kill, prompts, push and PRs
//
// Each operation marks the session Loading, hands the blocking backend call
// to a Spawn task and applies the outcome when the result message comes
// back. The same entry points serve keys, menus and brain actions; only
// brain actions carry a Responder.

use super::{App, NavPosition};
use crate::brain::{ActionResponse, Responder};
use crate::session::{ControllerError, SessionBackend, StartInfo, Status, Topic};
use crate::tui::modal::TextInput;
use crate::tui::msg::Msg;
use crate::tui::state::UiState;
use crate::tui::task::Task;
use anyhow::{anyhow, Result};
use chrono::Local;
use serde_json::{Map, Value};
use std::time::Duration;

/// Reply to a brain request, if one is waiting
fn respond(reply: Option<Responder>, response: ActionResponse) {
    if let Some(reply) = reply {
        reply.send(response);
    }
}

/// Commit message for pushes and pull requests
pub(super) fn commit_message(title: &str) -> String {
    format!(
        "[hive] update from '{}' on {}",
        title,
        Local::now().format("%d %b %y %H:%M %Z")
    )
}

/// Kill unless the session branch is checked out in the main repository
async fn checked_kill(
    backend: &dyn SessionBackend,
    id: &str,
    title: &str,
    paused: bool,
) -> Result<()> {
    // A paused session has no worktree left to check
    if !paused {
        let working_copy = backend.working_copy(id).await?;
        if working_copy.is_branch_checked_out().await? {
            return Err(ControllerError::CheckedOut(title.to_string()).into());
        }
    }
    backend.kill(id).await
}

/// Whether the remote branch moved, plus the branch name
async fn divergence(backend: &dyn SessionBackend, id: &str) -> Result<(bool, String)> {
    let working_copy = backend.working_copy(id).await?;
    let diverged = working_copy.has_diverged().await?;
    Ok((diverged, working_copy.branch()))
}

impl App {
    // ─────────────────────────────────────────────────────────────────────
    // Start
    // ─────────────────────────────────────────────────────────────────────

    /// Start the session's agent in the background. A session in a shared,
    /// started topic reuses the topic's worktree.
    pub(super) fn start_task(
        &self,
        id: &str,
        reply: Option<Responder>,
        prompt: Option<String>,
    ) -> Task {
        let backend = self.backend.clone();
        let session = self.list.get(id).cloned();
        let shared = session
            .as_ref()
            .and_then(|s| self.list.topic(&s.topic_name))
            .and_then(Topic::shared);
        let id = id.to_string();

        Task::spawn(async move {
            let result = match session {
                Some(session) => backend.start(&session, shared.as_ref()).await,
                None => Err(anyhow!("session {} vanished before it started", id)),
            };
            Msg::SessionStarted {
                id,
                result,
                reply,
                prompt,
            }
        })
    }

    pub(super) fn on_session_started(
        &mut self,
        id: String,
        result: Result<StartInfo>,
        reply: Option<Responder>,
        prompt: Option<String>,
    ) -> Vec<Task> {
        let info = match result {
            Ok(info) => info,
            Err(e) => {
                self.pending_prompts.remove(&id);
                self.list.remove(&id);
                let message = format!("failed to start instance: {:#}", e);
                respond(reply, ActionResponse::err(message.clone()));
                return self.show_error(anyhow!(message));
            }
        };

        let Some(title) = self.list.get(&id).map(|s| s.title.clone()) else {
            // Killed while starting; stop the agent we just launched
            self.pending_prompts.remove(&id);
            respond(
                reply,
                ActionResponse::err(format!("instance {} was removed before it started", id)),
            );
            let backend = self.backend.clone();
            return vec![Task::spawn(async move {
                Msg::SessionKilled {
                    result: backend.kill(&id).await,
                    id,
                    title: String::new(),
                    reply: None,
                    prior_status: Status::Ready,
                }
            })];
        };

        self.list.update(&id, |s| {
            s.started = true;
            s.dead = false;
            if !info.branch.is_empty() {
                s.branch = info.branch.clone();
            }
            s.set_status(Status::Ready);
        });
        tracing::info!("Started {} on branch {}", title, info.branch);

        let mut tasks = self.save_instances();

        let mut data = Map::new();
        data.insert("title".into(), Value::String(title.clone()));
        data.insert("status".into(), Value::String("created".into()));
        respond(reply, ActionResponse::ok_with(data));

        let queued = self.pending_prompts.remove(&id);
        if let Some(prompt) = prompt.or(queued) {
            let delay = self.config.timing.prompt_delay();
            tasks.push(self.prompt_task(&id, &title, prompt, delay, None));
        }
        tasks
    }

    // ─────────────────────────────────────────────────────────────────────
    // Prompts
    // ─────────────────────────────────────────────────────────────────────

    pub(super) fn prompt_task(
        &self,
        id: &str,
        title: &str,
        prompt: String,
        delay: Duration,
        reply: Option<Responder>,
    ) -> Task {
        let backend = self.backend.clone();
        let id = id.to_string();
        let title = title.to_string();
        Task::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = backend.send_prompt(&id, &prompt).await;
            Msg::PromptSent {
                title,
                result,
                reply,
            }
        })
    }

    /// Send a prompt now, or queue it until the session finishes starting
    pub(super) fn send_prompt(&mut self, id: &str, prompt: String) -> Vec<Task> {
        let Some(session) = self.list.get(id) else {
            return self.show_error(ControllerError::NotFound(id.to_string()));
        };
        if !session.started {
            self.pending_prompts.insert(id.to_string(), prompt);
            return vec![];
        }
        if session.is_busy() {
            let title = session.title.clone();
            return self.show_error(ControllerError::Busy(title));
        }
        let title = session.title.clone();
        self.list.update(id, |s| s.set_status(Status::Running));
        vec![self.prompt_task(id, &title, prompt, Duration::ZERO, None)]
    }

    pub(super) fn on_prompt_sent(
        &mut self,
        title: String,
        result: Result<()>,
        reply: Option<Responder>,
    ) -> Vec<Task> {
        match result {
            Ok(()) => {
                tracing::info!("Sent prompt to {}", title);
                respond(reply, ActionResponse::ok());
                vec![]
            }
            Err(e) if reply.is_some() => {
                let message = format!("failed to inject message: {:#}", e);
                respond(reply, ActionResponse::err(message.clone()));
                self.show_error(anyhow!(message))
            }
            Err(e) => self.show_error(e.context(format!("failed to send prompt to {}", title))),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pause and resume
    // ─────────────────────────────────────────────────────────────────────

    pub(super) fn pause_session(&mut self, id: &str, reply: Option<Responder>) -> Vec<Task> {
        let Some(session) = self.list.get(id) else {
            let error = ControllerError::NotFound(id.to_string());
            respond(reply, ActionResponse::err(error.to_string()));
            return self.show_error(error);
        };
        if session.is_busy() {
            let error = ControllerError::Busy(session.title.clone());
            respond(reply, ActionResponse::err(error.to_string()));
            return self.show_error(error);
        }
        if session.is_paused() {
            let error = ControllerError::AlreadyPaused(session.title.clone());
            respond(reply, ActionResponse::err(error.to_string()));
            return self.show_error(error);
        }

        self.list.update(id, |s| s.set_loading("Pausing..."));
        let backend = self.backend.clone();
        let id = id.to_string();
        vec![Task::spawn(async move {
            Msg::SessionPaused {
                result: backend.pause(&id).await,
                id,
                reply,
            }
        })]
    }

    pub(super) fn on_session_paused(
        &mut self,
        id: String,
        result: Result<()>,
        reply: Option<Responder>,
    ) -> Vec<Task> {
        match result {
            Ok(()) => {
                let mut tasks = self.release_focus_on(&id);
                self.list.update(&id, |s| {
                    s.set_status(Status::Paused);
                    s.prompt_detected = false;
                });
                if let Some(session) = self.list.get(&id) {
                    tracing::info!("Paused {}", session.title);
                }
                respond(reply, ActionResponse::ok());
                tasks.extend(self.save_instances());
                tasks
            }
            Err(e) => {
                self.list.update(&id, |s| s.set_status(Status::Ready));
                let message = format!("failed to pause: {:#}", e);
                respond(reply, ActionResponse::err(message.clone()));
                self.show_error(anyhow!(message))
            }
        }
    }

    /// Resume a paused session, or relaunch one whose agent died
    pub(super) fn resume_session(&mut self, id: &str, reply: Option<Responder>) -> Vec<Task> {
        let Some(session) = self.list.get(id) else {
            let error = ControllerError::NotFound(id.to_string());
            respond(reply, ActionResponse::err(error.to_string()));
            return self.show_error(error);
        };

        if session.is_busy() {
            let error = ControllerError::Busy(session.title.clone());
            respond(reply, ActionResponse::err(error.to_string()));
            return self.show_error(error);
        }

        let restart = if session.is_paused() {
            false
        } else if session.started && session.dead {
            true
        } else {
            let error = ControllerError::NotPaused(session.title.clone());
            respond(reply, ActionResponse::err(error.to_string()));
            return self.show_error(error);
        };

        let message = if restart {
            "Restarting agent..."
        } else {
            "Resuming..."
        };
        self.list.update(id, |s| s.set_loading(message));

        let backend = self.backend.clone();
        let id = id.to_string();
        vec![Task::spawn(async move {
            let result = if restart {
                backend.restart(&id).await
            } else {
                backend.resume(&id).await
            };
            Msg::SessionResumed {
                id,
                result,
                reply,
                restarted: restart,
            }
        })]
    }

    pub(super) fn on_session_resumed(
        &mut self,
        id: String,
        result: Result<()>,
        reply: Option<Responder>,
        restarted: bool,
    ) -> Vec<Task> {
        match result {
            Ok(()) => {
                self.list.update(&id, |s| {
                    s.dead = false;
                    s.set_status(Status::Ready);
                });
                if let Some(session) = self.list.get(&id) {
                    let verb = if restarted { "Restarted" } else { "Resumed" };
                    tracing::info!("{} {}", verb, session.title);
                }
                respond(reply, ActionResponse::ok());
                self.save_instances()
            }
            Err(e) => {
                // A failed restart leaves the agent dead; a failed resume stays paused
                let status = if restarted {
                    Status::Ready
                } else {
                    Status::Paused
                };
                self.list.update(&id, |s| s.set_status(status));
                let verb = if restarted { "restart" } else { "resume" };
                let message = format!("failed to {}: {:#}", verb, e);
                respond(reply, ActionResponse::err(message.clone()));
                self.show_error(anyhow!(message))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Kill
    // ─────────────────────────────────────────────────────────────────────

    /// Kill a session. Refuses while its branch is checked out in the main
    /// repository, leaving the session in place.
    pub(super) fn kill_session(&mut self, id: &str, reply: Option<Responder>) -> Vec<Task> {
        let Some(session) = self.list.get(id) else {
            let error = ControllerError::NotFound(id.to_string());
            respond(reply, ActionResponse::err(error.to_string()));
            return self.show_error(error);
        };

        if !session.started {
            // Nothing was launched yet
            let title = session.title.clone();
            self.pending_prompts.remove(id);
            self.list.remove(id);
            tracing::info!("Removed unstarted session {}", title);
            respond(reply, ActionResponse::ok());
            return self.save_instances();
        }

        if session.is_busy() {
            let error = ControllerError::Busy(session.title.clone());
            respond(reply, ActionResponse::err(error.to_string()));
            return self.show_error(error);
        }

        let prior_status = session.status;
        let paused = session.is_paused();
        let title = session.title.clone();
        self.list.update(id, |s| s.set_loading("Killing..."));

        let backend = self.backend.clone();
        let id = id.to_string();
        vec![Task::spawn(async move {
            let result = checked_kill(backend.as_ref(), &id, &title, paused).await;
            Msg::SessionKilled {
                id,
                title,
                result,
                reply,
                prior_status,
            }
        })]
    }

    pub(super) fn on_session_killed(
        &mut self,
        id: String,
        title: String,
        result: Result<()>,
        reply: Option<Responder>,
        prior_status: Status,
    ) -> Vec<Task> {
        match result {
            Ok(()) => {
                let mut tasks = self.release_focus_on(&id);
                self.pending_prompts.remove(&id);
                if self.list.remove(&id).is_some() {
                    tracing::info!("Killed {}", title);
                    tasks.extend(self.save_instances());
                }
                respond(reply, ActionResponse::ok());
                tasks
            }
            Err(e) => {
                self.list.update(&id, |s| s.set_status(prior_status));
                let message = format!("failed to kill: {:#}", e);
                respond(reply, ActionResponse::err(message.clone()));
                self.show_error(anyhow!(message))
            }
        }
    }

    /// Drop focus if it is held on `id`'s panes
    fn release_focus_on(&mut self, id: &str) -> Vec<Task> {
        if !self.focus.is_attached_to(id) {
            return vec![];
        }
        if matches!(self.state, UiState::FocusedOnPane { .. }) {
            return self.exit_focus();
        }
        self.focus.detach();
        self.nav = NavPosition::SessionList;
        vec![]
    }

    // ─────────────────────────────────────────────────────────────────────
    // Push
    // ─────────────────────────────────────────────────────────────────────

    /// Check whether the remote moved before pushing
    pub(super) fn push_check(&mut self, id: &str) -> Vec<Task> {
        let Some(session) = self.list.get(id) else {
            return self.show_error(ControllerError::NotFound(id.to_string()));
        };
        if !session.started || session.is_paused() {
            let title = session.title.clone();
            return self.show_error(ControllerError::NotRunning(title));
        }

        let backend = self.backend.clone();
        let id = id.to_string();
        vec![Task::spawn(async move {
            let result = divergence(backend.as_ref(), &id).await;
            Msg::PushChecked { id, result }
        })]
    }

    pub(super) fn on_push_checked(&mut self, id: String, result: Result<(bool, String)>) -> Vec<Task> {
        match result {
            Ok((false, _)) => self.push(&id, false),
            Ok((true, branch)) if self.state.is_default() => {
                self.state = UiState::SyncConfirm {
                    id,
                    message: format!(
                        "Remote branch '{}' has different commits. Sync before pushing?",
                        branch
                    ),
                };
                vec![]
            }
            Ok((true, branch)) => self.show_error(anyhow!(
                "remote branch '{}' has different commits; push again to sync",
                branch
            )),
            Err(e) => self.show_error(e.context("failed to push")),
        }
    }

    pub(super) fn push(&mut self, id: &str, sync: bool) -> Vec<Task> {
        let Some(session) = self.list.get(id) else {
            return self.show_error(ControllerError::NotFound(id.to_string()));
        };
        let title = session.title.clone();
        let message = commit_message(&title);
        tracing::info!("Pushing {} (sync: {})", title, sync);

        let backend = self.backend.clone();
        let id = id.to_string();
        vec![Task::spawn(async move {
            let result = match backend.working_copy(&id).await {
                Ok(working_copy) => working_copy.push_changes(&message, sync).await,
                Err(e) => Err(e),
            };
            Msg::PushFinished { title, result }
        })]
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pull requests
    // ─────────────────────────────────────────────────────────────────────

    pub(super) fn begin_pr(&mut self) -> Vec<Task> {
        let Some(session) = self.list.selected() else {
            return vec![];
        };
        if !session.started || session.is_paused() {
            let title = session.title.clone();
            return self.show_error(ControllerError::NotRunning(title));
        }
        self.state = UiState::EditingPrTitle {
            input: TextInput::new("PR title").with_value(session.title.clone()),
            id: session.id.clone(),
        };
        vec![]
    }

    /// Ask the working copy for a PR description
    pub(super) fn generate_pr_body(&mut self, id: String, pr_title: String) -> Vec<Task> {
        let backend = self.backend.clone();
        vec![Task::spawn(async move {
            let result = match backend.working_copy(&id).await {
                Ok(working_copy) => working_copy.generate_pr_body().await,
                Err(e) => Err(e),
            };
            Msg::PrBodyGenerated {
                id,
                pr_title,
                result,
            }
        })]
    }

    pub(super) fn on_pr_body_generated(
        &mut self,
        id: String,
        pr_title: String,
        result: Result<String>,
    ) -> Vec<Task> {
        if !self.state.is_default() {
            tracing::info!("Discarding PR description; another overlay is open");
            return vec![];
        }
        let body = result.unwrap_or_else(|e| {
            tracing::warn!("Failed to generate PR description: {:#}", e);
            String::new()
        });
        self.state = UiState::EditingPrBody {
            input: TextInput::new("PR description").multiline().with_value(body),
            id,
            pr_title,
        };
        vec![]
    }

    pub(super) fn create_pr(&mut self, id: &str, pr_title: String, body: String) -> Vec<Task> {
        let Some(session) = self.list.get(id) else {
            return self.show_error(ControllerError::NotFound(id.to_string()));
        };
        let title = session.title.clone();
        let message = commit_message(&title);
        self.show_toast("Creating PR...");

        let backend = self.backend.clone();
        let id = id.to_string();
        vec![Task::spawn(async move {
            let result = match backend.working_copy(&id).await {
                Ok(working_copy) => working_copy.create_pr(&pr_title, &body, &message).await,
                Err(e) => Err(e),
            };
            Msg::PrCreated { title, result }
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_message_names_the_session() {
        let message = commit_message("demo");
        assert!(message.starts_with("[hive] update from 'demo' on "));
    }
}
