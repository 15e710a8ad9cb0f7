// Background refresh: pane preview and status sweep
//
// Both timers are one-shot. The handler for each tick starts the work and
// the handler for its result re-arms the next tick, unless shutdown began.

use super::App;
use crate::session::{PaneKind, SessionBackend, Status};
use crate::tui::msg::{Msg, SweepResult};
use crate::tui::task::Task;
use futures::future::join_all;
use std::sync::Arc;

/// Observe one session: liveness, output change, prompt, diff stats
async fn sweep_one(backend: Arc<dyn SessionBackend>, id: String, auto_yes: bool) -> SweepResult {
    if !backend.is_alive(&id).await {
        return SweepResult {
            id,
            alive: false,
            snapshot: None,
            diff: None,
            tapped: false,
        };
    }

    let snapshot = match backend.snapshot(&id).await {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!("Failed to sample {}: {:#}", id, e);
            None
        }
    };

    let mut tapped = false;
    if let Some(snapshot) = snapshot {
        if auto_yes && !snapshot.updated && snapshot.has_prompt {
            match backend.tap_enter(&id).await {
                Ok(()) => tapped = true,
                Err(e) => tracing::warn!("Failed to auto-accept prompt for {}: {:#}", id, e),
            }
        }
    }

    let diff = match backend.working_copy(&id).await {
        Ok(working_copy) => match working_copy.diff_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!("Failed to update diff stats for {}: {:#}", id, e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("No working copy for {}: {:#}", id, e);
            None
        }
    };

    SweepResult {
        id,
        alive: true,
        snapshot,
        diff,
        tapped,
    }
}

impl App {
    pub(super) fn on_preview_tick(&mut self) -> Vec<Task> {
        if self.cancel.is_cancelled() {
            return vec![];
        }
        if self.toast.as_ref().is_some_and(|toast| toast.is_expired()) {
            self.toast = None;
        }

        let mut tasks = vec![Task::After(
            self.config.timing.preview_tick(),
            Msg::PreviewTick,
        )];

        // A focused agent pane draws from its own sink
        let attached_agent = self.focus.pane() == Some(PaneKind::Agent);
        if self.tab != PaneKind::Agent || attached_agent {
            return tasks;
        }
        let Some(session) = self.list.selected() else {
            return tasks;
        };
        if !session.is_live() {
            return tasks;
        }

        let generation = self.list.generation();
        let backend = self.backend.clone();
        let id = session.id.clone();
        tasks.push(Task::spawn(async move {
            let content = match backend.preview(&id).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::debug!("Preview of {} failed: {:#}", id, e);
                    String::new()
                }
            };
            Msg::PreviewCaptured {
                generation,
                content,
            }
        }));
        tasks
    }

    /// Apply a capture unless the selection moved on since it was taken
    pub(super) fn on_preview_captured(&mut self, generation: u64, content: String) {
        if generation != self.list.generation() {
            tracing::trace!("Discarding stale preview (generation {})", generation);
            return;
        }
        self.preview = content;
        self.preview_generation = generation;
    }

    pub(super) fn on_metadata_tick(&mut self) -> Vec<Task> {
        if self.cancel.is_cancelled() {
            return vec![];
        }

        // Loading sessions are mid-operation; their status is not ours to touch
        let targets: Vec<(String, bool)> = self
            .list
            .visible_sessions()
            .filter(|s| s.is_live() && s.status != Status::Loading)
            .map(|s| (s.id.clone(), s.auto_yes || self.config.auto_yes))
            .collect();

        let backend = self.backend.clone();
        vec![Task::spawn(async move {
            let sweeps = targets
                .into_iter()
                .map(|(id, auto_yes)| sweep_one(backend.clone(), id, auto_yes));
            Msg::MetadataSwept(join_all(sweeps).await)
        })]
    }

    pub(super) fn on_metadata_swept(&mut self, results: Vec<SweepResult>) -> Vec<Task> {
        for result in results {
            let selected = self.list.is_selected(&result.id);
            let Some(session) = self.list.get_mut(&result.id) else {
                continue;
            };
            // An operation started while the sweep was out
            if matches!(session.status, Status::Loading | Status::Paused) {
                continue;
            }

            if !result.alive {
                if !session.dead {
                    tracing::info!("Agent for {} exited", session.title);
                }
                session.dead = true;
                continue;
            }
            session.dead = false;

            if let Some(snapshot) = result.snapshot {
                if snapshot.updated {
                    session.set_status(Status::Running);
                    session.prompt_detected = false;
                } else if snapshot.has_prompt {
                    // Waiting on a question: status stays until it is answered
                    if !result.tapped && !session.prompt_detected && !selected {
                        session.notified = true;
                    }
                    session.prompt_detected = !result.tapped;
                } else {
                    if session.status == Status::Running && !selected {
                        session.notified = true;
                    }
                    session.set_status(Status::Ready);
                    session.prompt_detected = false;
                }
            }
            if let Some(diff) = result.diff {
                session.diff_stats = diff;
            }
        }
        self.list.refresh();

        if self.cancel.is_cancelled() {
            return vec![];
        }
        vec![Task::After(
            self.config.timing.metadata_tick(),
            Msg::MetadataTick,
        )]
    }
}
