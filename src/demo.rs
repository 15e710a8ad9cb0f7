// Demo backend: simulated agents so the whole TUI runs without tmux or git
//
// Each agent prints a scripted burst of output after every prompt, then
// settles on a confirmation question. Pausing hands the branch to the
// operator (the branch reads as checked out until resume). A simulated
// brain agent submits gateway requests through the same channel a real
// orchestrator would.

use crate::brain::{params, ActionSender, ActionType};
use crate::session::{
    DiffStats, PaneKind, PaneSink, Snapshot, Session, SessionBackend, SharedWorktree, StartInfo,
    Topic, WorkingCopy,
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Lines an agent prints while working on a prompt, one per snapshot
const WORK_SCRIPT: &[&str] = &[
    "Reading project structure...",
    "  src/lib.rs",
    "  src/main.rs",
    "Searching for relevant code...",
    "Planning changes (3 steps)",
    "  1. Update the parser",
    "  2. Add a regression test",
    "  3. Run the test suite",
    "Editing src/parser.rs",
    "Editing tests/parser.rs",
    "Running cargo test... ok",
];

/// Longest scrollback kept per agent
const MAX_OUTPUT_LINES: usize = 500;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Mutable state of one simulated agent, shared with its working copy and
/// any attached pane
#[derive(Debug)]
struct AgentState {
    title: String,
    branch: String,
    worktree: PathBuf,
    alive: bool,
    paused: bool,
    /// The operator has the branch checked out
    checked_out: bool,
    output: Vec<String>,
    /// Script lines still to print
    pending: Vec<String>,
    waiting_prompt: bool,
    diff: DiffStats,
    shell: Vec<String>,
    prompts: usize,
}

impl AgentState {
    fn new(title: &str, branch: &str, worktree: PathBuf) -> Self {
        Self {
            title: title.to_string(),
            branch: branch.to_string(),
            worktree,
            alive: true,
            paused: false,
            checked_out: false,
            output: vec![format!("On branch {}", branch), String::new()],
            pending: Vec::new(),
            waiting_prompt: false,
            diff: DiffStats::default(),
            shell: vec!["demo shell; type a command and press Enter".to_string()],
            prompts: 0,
        }
    }

    fn print(&mut self, line: impl Into<String>) {
        self.output.push(line.into());
        if self.output.len() > MAX_OUTPUT_LINES {
            let excess = self.output.len() - MAX_OUTPUT_LINES;
            self.output.drain(..excess);
        }
    }

    /// Queue a burst of work in answer to a prompt
    fn accept_prompt(&mut self, prompt: &str) {
        self.print(format!("> {}", prompt));
        self.waiting_prompt = false;
        self.prompts += 1;
        self.pending = WORK_SCRIPT.iter().rev().map(|s| s.to_string()).collect();
    }

    /// Advance the script by one line; returns whether anything changed
    fn step(&mut self) -> bool {
        let Some(line) = self.pending.pop() else {
            return false;
        };
        if let Some(file) = line.strip_prefix("Editing ") {
            let file = file.to_string();
            if !self.diff.files.contains(&file) {
                self.diff.files.push(file);
            }
            self.diff.added += 7 * self.prompts;
            self.diff.removed += 2;
        }
        self.print(line);
        if self.pending.is_empty() {
            self.print("Apply these changes? (press Enter to accept)");
            self.waiting_prompt = true;
        }
        true
    }

    fn tail(&self, rows: usize) -> String {
        let skip = self.output.len().saturating_sub(rows);
        self.output[skip..].join("\n")
    }
}

type Agent = Arc<Mutex<AgentState>>;

/// In-memory SessionBackend
pub struct DemoBackend {
    agents: Mutex<HashMap<String, Agent>>,
    branch_prefix: String,
    root: PathBuf,
}

impl DemoBackend {
    pub fn new(branch_prefix: impl Into<String>, data_dir: PathBuf) -> Self {
        Self {
            agents: Mutex::new(HashMap::new()),
            branch_prefix: branch_prefix.into(),
            root: data_dir.join("worktrees"),
        }
    }

    fn agent(&self, id: &str) -> Result<Agent> {
        lock(&self.agents)
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("no demo agent for {}", id))
    }

    /// Sessions persisted by an earlier run have no agent in memory; a
    /// resume or restart brings one up in their place
    fn agent_or_revive(&self, id: &str) -> Agent {
        lock(&self.agents)
            .entry(id.to_string())
            .or_insert_with(|| {
                let state = AgentState::new(id, "(restored)", self.root.join(id));
                Arc::new(Mutex::new(state))
            })
            .clone()
    }

    fn branch_for(&self, name: &str) -> String {
        let slug: String = name
            .chars()
            .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        format!("{}{}", self.branch_prefix, slug)
    }
}

#[async_trait]
impl SessionBackend for DemoBackend {
    async fn start(&self, session: &Session, shared: Option<&SharedWorktree>) -> Result<StartInfo> {
        // Long enough to watch the loading state
        tokio::time::sleep(Duration::from_millis(600)).await;

        let (branch, worktree) = match shared {
            Some(shared) => (shared.branch.clone(), shared.path.clone()),
            None => (
                self.branch_for(&session.title),
                self.root.join(&session.id),
            ),
        };
        let mut state = AgentState::new(&session.title, &branch, worktree);
        state.output.insert(
            0,
            format!("{} (demo) in {}", session.program, session.repo_path.display()),
        );
        state.print("How can I help?");

        lock(&self.agents).insert(session.id.clone(), Arc::new(Mutex::new(state)));
        tracing::info!("Demo agent started for {}", session.title);
        Ok(StartInfo { branch })
    }

    async fn pause(&self, id: &str) -> Result<()> {
        let agent = self.agent(id)?;
        tokio::time::sleep(Duration::from_millis(300)).await;
        let mut state = lock(&agent);
        state.paused = true;
        state.checked_out = true;
        state.print("[paused: changes committed, worktree removed]");
        Ok(())
    }

    async fn resume(&self, id: &str) -> Result<()> {
        let agent = self.agent_or_revive(id);
        tokio::time::sleep(Duration::from_millis(300)).await;
        let mut state = lock(&agent);
        state.checked_out = false;
        state.paused = false;
        state.alive = true;
        state.print("[resumed]");
        Ok(())
    }

    async fn restart(&self, id: &str) -> Result<()> {
        let agent = self.agent_or_revive(id);
        let mut state = lock(&agent);
        state.alive = true;
        state.pending.clear();
        state.print("[agent restarted]");
        Ok(())
    }

    async fn kill(&self, id: &str) -> Result<()> {
        let removed = lock(&self.agents).remove(id);
        if let Some(agent) = removed {
            lock(&agent).alive = false;
        }
        Ok(())
    }

    async fn send_prompt(&self, id: &str, prompt: &str) -> Result<()> {
        let agent = self.agent(id)?;
        let mut state = lock(&agent);
        if !state.alive || state.paused {
            bail!("{} is not running", state.title);
        }
        state.accept_prompt(prompt);
        Ok(())
    }

    async fn tap_enter(&self, id: &str) -> Result<()> {
        let agent = self.agent(id)?;
        let mut state = lock(&agent);
        if state.waiting_prompt {
            state.waiting_prompt = false;
            state.print("Changes applied.");
            state.print("How can I help?");
        }
        Ok(())
    }

    async fn snapshot(&self, id: &str) -> Result<Snapshot> {
        let agent = self.agent(id)?;
        let mut state = lock(&agent);
        let updated = state.step();
        Ok(Snapshot {
            updated,
            has_prompt: state.waiting_prompt,
        })
    }

    async fn preview(&self, id: &str) -> Result<String> {
        let agent = self.agent(id)?;
        let state = lock(&agent);
        Ok(state.tail(200))
    }

    async fn working_copy(&self, id: &str) -> Result<Arc<dyn WorkingCopy>> {
        let agent = self.agent(id)?;
        Ok(Arc::new(DemoWorkingCopy { agent }))
    }

    async fn is_alive(&self, id: &str) -> bool {
        match self.agent(id) {
            Ok(agent) => {
                let alive = lock(&agent).alive;
                alive
            }
            Err(_) => false,
        }
    }

    fn attach(
        &self,
        id: &str,
        pane: PaneKind,
        cols: u16,
        rows: u16,
    ) -> Result<Box<dyn PaneSink>> {
        let agent = self.agent(id)?;
        Ok(Box::new(DemoSink {
            agent,
            pane,
            line: String::new(),
            rows,
            cols,
            open: true,
        }))
    }

    async fn setup_topic(&self, topic: &Topic) -> Result<Option<SharedWorktree>> {
        if !topic.shared_worktree {
            return Ok(None);
        }
        Ok(Some(SharedWorktree {
            path: self.root.join(format!("topic-{}", topic.name)),
            branch: self.branch_for(&topic.name),
        }))
    }

    async fn cleanup_topic(&self, topic: &Topic) -> Result<()> {
        tracing::debug!("Demo cleanup for topic {}", topic.name);
        Ok(())
    }

    async fn zen(&self, id: &str) -> Result<()> {
        let agent = self.agent(id)?;
        let screen = {
            let state = lock(&agent);
            format!(
                "── {} ({}) ──\n{}\n\n[demo zen mode] Press Enter to return.\n",
                state.title,
                state.branch,
                state.tail(40)
            )
        };
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut stdout = std::io::stdout();
            stdout.write_all(screen.as_bytes())?;
            stdout.flush()?;
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            Ok(())
        })
        .await?
    }
}

/// Working copy view over a demo agent
struct DemoWorkingCopy {
    agent: Agent,
}

#[async_trait]
impl WorkingCopy for DemoWorkingCopy {
    fn path(&self) -> PathBuf {
        lock(&self.agent).worktree.clone()
    }

    fn branch(&self) -> String {
        lock(&self.agent).branch.clone()
    }

    async fn is_branch_checked_out(&self) -> Result<bool> {
        Ok(lock(&self.agent).checked_out)
    }

    async fn diff_stats(&self) -> Result<DiffStats> {
        Ok(lock(&self.agent).diff.clone())
    }

    async fn has_diverged(&self) -> Result<bool> {
        // Every other prompt pretends someone else pushed too
        Ok(lock(&self.agent).prompts % 2 == 1)
    }

    async fn push_changes(&self, message: &str, sync: bool) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(400)).await;
        let mut state = lock(&self.agent);
        if sync {
            state.print("[synced with remote]");
        }
        let line = format!("[pushed {}: {}]", state.branch, message);
        state.print(line);
        Ok(())
    }

    async fn generate_pr_body(&self) -> Result<String> {
        let state = lock(&self.agent);
        let mut body = format!("## Changes\n\nWork from session '{}'.\n\n", state.title);
        for file in &state.diff.files {
            body.push_str(&format!("- {}\n", file));
        }
        Ok(body)
    }

    async fn create_pr(&self, title: &str, _body: &str, commit_message: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_millis(400)).await;
        let mut state = lock(&self.agent);
        state.print(format!("[committed: {}]", commit_message));
        state.print(format!("[opened PR: {}]", title));
        Ok(format!("https://example.invalid/pull/{}", state.prompts.max(1)))
    }
}

/// Pane sink over a demo agent. The agent pane turns typed lines into
/// prompts; shell and VCS panes echo.
struct DemoSink {
    agent: Agent,
    pane: PaneKind,
    line: String,
    rows: u16,
    cols: u16,
    open: bool,
}

impl DemoSink {
    fn submit(&mut self, state: &mut AgentState) {
        let line = std::mem::take(&mut self.line);
        match self.pane {
            PaneKind::Agent => {
                if state.waiting_prompt && line.is_empty() {
                    state.waiting_prompt = false;
                    state.print("Changes applied.");
                } else if !line.is_empty() {
                    state.accept_prompt(&line);
                }
            }
            _ => {
                state.shell.push(format!("$ {}", line));
                if !line.is_empty() {
                    state.shell.push(format!("demo: {}: simulated", line));
                }
            }
        }
    }
}

impl PaneSink for DemoSink {
    fn is_running(&self) -> bool {
        self.open && (self.pane != PaneKind::Agent || lock(&self.agent).alive)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let agent = self.agent.clone();
        let mut state = lock(&agent);
        for ch in String::from_utf8_lossy(bytes).chars() {
            match ch {
                '\r' | '\n' => self.submit(&mut state),
                '\x7f' | '\x08' => {
                    self.line.pop();
                }
                c if !c.is_control() => self.line.push(c),
                _ => {}
            }
        }
        Ok(())
    }

    fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        self.cols = cols;
        self.rows = rows;
        Ok(())
    }

    fn contents(&self) -> String {
        let state = lock(&self.agent);
        let rows = self.rows.max(1) as usize;
        let mut lines: Vec<String> = match self.pane {
            PaneKind::Agent => state.output.clone(),
            PaneKind::Vcs => {
                let mut status = vec![format!("On branch {}", state.branch)];
                if state.diff.files.is_empty() {
                    status.push("nothing to commit, working tree clean".to_string());
                } else {
                    status.push("Changes not staged for commit:".to_string());
                    status.extend(state.diff.files.iter().map(|f| format!("\tmodified: {}", f)));
                }
                status.push(String::new());
                status.extend(state.shell.iter().cloned());
                status
            }
            _ => state.shell.clone(),
        };
        let prompt = if self.pane == PaneKind::Agent { "> " } else { "$ " };
        lines.push(format!("{}{}", prompt, self.line));

        let skip = lines.len().saturating_sub(rows);
        lines[skip..]
            .iter()
            .map(|l| crate::util::truncate_to_width(l, self.cols as usize))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Play an orchestrating agent: spawn a helper session, then keep feeding it
/// follow-up prompts through the action gateway
pub fn spawn_brain(sender: ActionSender, cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = brain_loop(sender) => {}
        }
    });
}

async fn brain_loop(sender: ActionSender) {
    tokio::time::sleep(Duration::from_secs(5)).await;

    let title = format!("helper-{}", Utc::now().format("%H%M%S"));
    let created = sender
        .submit(
            ActionType::CreateSession,
            params([
                ("title", json!(title)),
                ("prompt", json!("Add a regression test for the parser")),
                ("role", json!("tester")),
            ]),
        )
        .await;
    match created {
        Ok(response) if response.ok => tracing::info!("Demo brain created {}", title),
        Ok(response) => {
            tracing::warn!("Demo brain could not create {}: {:?}", title, response.error);
            return;
        }
        Err(e) => {
            tracing::warn!("Demo brain gave up: {:#}", e);
            return;
        }
    }

    let follow_ups = [
        "Also cover the empty-input case",
        "Run clippy and fix any warnings",
        "Summarize what changed",
    ];
    for content in follow_ups {
        tokio::time::sleep(Duration::from_secs(20)).await;
        let result = sender
            .submit(
                ActionType::InjectMessage,
                params([
                    ("to", json!(title)),
                    ("content", json!(content)),
                    ("from", json!("demo-brain")),
                ]),
            )
            .await;
        match result {
            Ok(response) if response.ok => {}
            Ok(response) => {
                tracing::info!("Demo brain stopped: {:?}", response.error);
                return;
            }
            Err(e) => {
                tracing::warn!("Demo brain stopped: {:#}", e);
                return;
            }
        }
    }
}
