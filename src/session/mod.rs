// Session module - controller-owned records for supervised agents
//
// A Session is one agent process plus its isolated working copy. The
// controller owns these records outright; the backend only ever sees ids.
// A Topic groups sessions and may bind them to one shared worktree.

mod backend;
mod error;

pub use backend::{
    PaneKind, PaneSink, Snapshot, SessionBackend, SharedWorktree, StartInfo, WorkingCopy,
};
pub use error::ControllerError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Maximum display width of a session title
pub const MAX_TITLE_WIDTH: usize = 32;

/// Lifecycle status shown next to each session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    /// A blocking operation (start, pause, resume, restart) is in flight.
    /// The status sweep never overwrites this.
    Loading,
    /// Output changed since the last sweep
    Running,
    /// Output is idle
    #[default]
    Ready,
    /// Worktree removed, agent stopped; can be resumed
    Paused,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Loading => "loading",
            Status::Running => "running",
            Status::Ready => "ready",
            Status::Paused => "paused",
        }
    }
}

/// Working-copy change counts for the list badge and diff pane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    #[serde(default)]
    pub files: Vec<String>,
}

impl DiffStats {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Everything needed to create a new session record
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub title: String,
    pub repo_path: PathBuf,
    pub program: String,
    pub topic_name: String,
    pub skip_permissions: bool,
    pub role: String,
    pub parent_title: String,
}

/// A supervised agent session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Stable backend key; survives renames
    pub id: String,
    /// Unique display key, also used for lookup
    pub title: String,
    /// Empty means ungrouped
    #[serde(default)]
    pub topic_name: String,
    pub repo_path: PathBuf,
    pub program: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parent_title: String,
    pub status: Status,
    pub started: bool,
    pub auto_yes: bool,
    pub skip_permissions: bool,
    #[serde(default)]
    pub diff_stats: DiffStats,
    pub created_at: DateTime<Utc>,

    // Runtime-only flags
    #[serde(skip)]
    pub loading_message: String,
    #[serde(skip)]
    pub prompt_detected: bool,
    #[serde(skip)]
    pub notified: bool,
    /// The agent process exited underneath us
    #[serde(skip)]
    pub dead: bool,
}

impl Session {
    pub fn new(opts: SessionOptions) -> Self {
        let created_at = Utc::now();
        Self {
            id: session_id(&opts.repo_path, &opts.title, &created_at),
            title: opts.title,
            topic_name: opts.topic_name,
            repo_path: opts.repo_path,
            program: opts.program,
            branch: String::new(),
            role: opts.role,
            parent_title: opts.parent_title,
            status: Status::Ready,
            started: false,
            auto_yes: false,
            skip_permissions: opts.skip_permissions,
            diff_stats: DiffStats::default(),
            created_at,
            loading_message: String::new(),
            prompt_detected: false,
            notified: false,
            dead: false,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.status == Status::Paused
    }

    /// Started, not paused, and the agent process is still there
    pub fn is_live(&self) -> bool {
        self.started && !self.is_paused() && !self.dead
    }

    /// A start, pause, resume or kill is still running for this session
    pub fn is_busy(&self) -> bool {
        self.started && self.status == Status::Loading
    }

    /// Mark a blocking operation as in flight
    pub fn set_loading(&mut self, message: &str) {
        self.status = Status::Loading;
        self.loading_message = message.to_string();
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
        if status != Status::Loading {
            self.loading_message.clear();
        }
    }

    /// Case-insensitive match on title or topic; `query` must already be lowercase
    pub fn matches(&self, query: &str) -> bool {
        self.title.to_lowercase().contains(query) || self.topic_name.to_lowercase().contains(query)
    }
}

/// Derive a short, stable id from where and when the session was born
fn session_id(repo: &std::path::Path, title: &str, created_at: &DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repo.to_string_lossy().as_bytes());
    hasher.update(title.as_bytes());
    hasher.update(
        created_at
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_le_bytes(),
    );
    let digest = hasher.finalize();
    digest[..6].iter().map(|b| format!("{:02x}", b)).collect()
}

/// A named grouping of sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub repo_path: PathBuf,
    pub shared_worktree: bool,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub worktree_path: Option<PathBuf>,
    #[serde(default)]
    pub auto_yes: bool,
    #[serde(default)]
    pub started: bool,
    pub created_at: DateTime<Utc>,
}

impl Topic {
    pub fn new(name: impl Into<String>, repo_path: PathBuf, shared_worktree: bool) -> Self {
        Self {
            name: name.into(),
            repo_path,
            shared_worktree,
            branch: String::new(),
            worktree_path: None,
            auto_yes: false,
            started: false,
            created_at: Utc::now(),
        }
    }

    /// The worktree new members should start in, if this topic shares one
    pub fn shared(&self) -> Option<SharedWorktree> {
        if !self.shared_worktree || !self.started {
            return None;
        }
        self.worktree_path.as_ref().map(|path| SharedWorktree {
            path: path.clone(),
            branch: self.branch.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(title: &str) -> SessionOptions {
        SessionOptions {
            title: title.to_string(),
            repo_path: PathBuf::from("/repo"),
            program: "claude".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn new_session_is_not_live() {
        let s = Session::new(opts("demo"));
        assert!(!s.started);
        assert!(!s.is_live());
        assert_eq!(s.status, Status::Ready);
        assert_eq!(s.id.len(), 12);
    }

    #[test]
    fn paused_and_dead_sessions_are_not_live() {
        let mut s = Session::new(opts("demo"));
        s.started = true;
        assert!(s.is_live());

        s.set_status(Status::Paused);
        assert!(!s.is_live());

        s.set_status(Status::Ready);
        s.dead = true;
        assert!(!s.is_live());
    }

    #[test]
    fn leaving_loading_clears_message() {
        let mut s = Session::new(opts("demo"));
        s.set_loading("Pausing...");
        assert_eq!(s.loading_message, "Pausing...");
        s.set_status(Status::Paused);
        assert!(s.loading_message.is_empty());
    }

    #[test]
    fn matches_title_or_topic() {
        let mut s = Session::new(opts("Refactor Parser"));
        s.topic_name = "backend".to_string();
        assert!(s.matches("parser"));
        assert!(s.matches("back"));
        assert!(!s.matches("frontend"));
    }

    #[test]
    fn only_started_sessions_are_busy_while_loading() {
        let mut s = Session::new(opts("demo"));
        s.set_loading("Starting...");
        assert!(!s.is_busy());
        s.started = true;
        assert!(s.is_busy());
        s.set_status(Status::Ready);
        assert!(!s.is_busy());
    }

    #[test]
    fn runtime_flags_are_not_persisted() {
        let mut s = Session::new(opts("demo"));
        s.notified = true;
        s.dead = true;
        let json = serde_json::to_string(&s).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert!(!back.notified);
        assert!(!back.dead);
        assert_eq!(back.id, s.id);
    }

    #[test]
    fn topic_shares_worktree_only_once_started() {
        let mut t = Topic::new("auth", PathBuf::from("/repo"), true);
        t.worktree_path = Some(PathBuf::from("/wt/auth"));
        t.branch = "session/auth".to_string();
        assert!(t.shared().is_none());

        t.started = true;
        let shared = t.shared().unwrap();
        assert_eq!(shared.branch, "session/auth");

        let plain = Topic::new("misc", PathBuf::from("/repo"), false);
        assert!(plain.shared().is_none());
    }

    #[test]
    fn diff_without_line_changes_is_empty() {
        let d = DiffStats {
            added: 12,
            removed: 3,
            files: vec![],
        };
        assert!(!d.is_empty());
        assert!(DiffStats::default().is_empty());
    }
}
