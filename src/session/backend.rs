// Backend seams - the process and working-copy side of a session
//
// Everything here is implemented outside the controller (tmux, git, or the
// in-memory demo backend). The controller only calls these traits from
// background tasks and feeds the results back as messages.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::{DiffStats, Session, Topic};

/// Which content view a pane shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaneKind {
    Agent,
    Shell,
    Diff,
    Vcs,
}

impl PaneKind {
    pub fn label(&self) -> &'static str {
        match self {
            PaneKind::Agent => "Agent",
            PaneKind::Shell => "Shell",
            PaneKind::Diff => "Diff",
            PaneKind::Vcs => "VCS",
        }
    }

    /// Tab cycle order in the content area
    pub fn next_tab(self) -> Self {
        match self {
            PaneKind::Agent => PaneKind::Diff,
            PaneKind::Diff => PaneKind::Shell,
            PaneKind::Shell => PaneKind::Vcs,
            PaneKind::Vcs => PaneKind::Agent,
        }
    }

    /// Whether focusing this pane attaches a live process
    pub fn is_process_backed(&self) -> bool {
        !matches!(self, PaneKind::Diff)
    }
}

/// A worktree shared by every session in a topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedWorktree {
    pub path: PathBuf,
    pub branch: String,
}

/// What the backend reports after a successful start
#[derive(Debug, Clone, Default)]
pub struct StartInfo {
    pub branch: String,
}

/// One status-sweep observation of an agent's output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Output changed since the previous snapshot
    pub updated: bool,
    /// The agent is sitting on a confirmation prompt
    pub has_prompt: bool,
}

/// Raw input sink of an attached pane process
pub trait PaneSink: Send {
    fn is_running(&self) -> bool;
    fn send(&mut self, bytes: &[u8]) -> Result<()>;
    fn resize(&mut self, cols: u16, rows: u16) -> Result<()>;
    /// Current screen text, for drawing the pane
    fn contents(&self) -> String;
    fn close(&mut self);
}

/// A session's isolated working copy
#[async_trait]
pub trait WorkingCopy: Send + Sync {
    fn path(&self) -> PathBuf;
    fn branch(&self) -> String;
    /// True when the session branch is checked out in the main repository
    async fn is_branch_checked_out(&self) -> Result<bool>;
    async fn diff_stats(&self) -> Result<DiffStats>;
    /// Remote branch has commits the local one lacks
    async fn has_diverged(&self) -> Result<bool>;
    async fn push_changes(&self, message: &str, sync: bool) -> Result<()>;
    async fn generate_pr_body(&self) -> Result<String>;
    async fn create_pr(&self, title: &str, body: &str, commit_message: &str) -> Result<String>;
}

/// Process lifecycle of supervised agents, keyed by session id
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn start(&self, session: &Session, shared: Option<&SharedWorktree>) -> Result<StartInfo>;
    async fn pause(&self, id: &str) -> Result<()>;
    async fn resume(&self, id: &str) -> Result<()>;
    /// Relaunch an agent whose process died, keeping its worktree
    async fn restart(&self, id: &str) -> Result<()>;
    async fn kill(&self, id: &str) -> Result<()>;
    async fn send_prompt(&self, id: &str, prompt: &str) -> Result<()>;
    /// Acknowledge a waiting prompt with a bare Enter
    async fn tap_enter(&self, id: &str) -> Result<()>;
    async fn snapshot(&self, id: &str) -> Result<Snapshot>;
    async fn preview(&self, id: &str) -> Result<String>;
    async fn working_copy(&self, id: &str) -> Result<Arc<dyn WorkingCopy>>;
    async fn is_alive(&self, id: &str) -> bool;
    /// Open the raw input side of a pane process. Runs on the event loop, so
    /// implementations must not block.
    fn attach(
        &self,
        id: &str,
        pane: PaneKind,
        cols: u16,
        rows: u16,
    ) -> Result<Box<dyn PaneSink>>;
    async fn setup_topic(&self, topic: &Topic) -> Result<Option<SharedWorktree>>;
    async fn cleanup_topic(&self, topic: &Topic) -> Result<()>;
    /// Full-terminal attach; returns when the operator detaches
    async fn zen(&self, id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_cycle_visits_every_pane() {
        let mut pane = PaneKind::Agent;
        let mut seen = vec![pane];
        for _ in 0..3 {
            pane = pane.next_tab();
            seen.push(pane);
        }
        assert_eq!(
            seen,
            vec![PaneKind::Agent, PaneKind::Diff, PaneKind::Shell, PaneKind::Vcs]
        );
        assert_eq!(pane.next_tab(), PaneKind::Agent);
    }

    #[test]
    fn only_diff_is_local() {
        assert!(PaneKind::Agent.is_process_backed());
        assert!(PaneKind::Shell.is_process_backed());
        assert!(PaneKind::Vcs.is_process_backed());
        assert!(!PaneKind::Diff.is_process_backed());
    }
}
