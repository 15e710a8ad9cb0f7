// Controller tests against an in-memory backend and store

use super::*;
use crate::brain::{self, params, ActionRequest, ActionResponse, ActionType};
use crate::session::{
    DiffStats, PaneSink, Snapshot, Session, SessionOptions, SharedWorktree, StartInfo, Topic,
    WorkingCopy,
};
use crate::tui::list::SidebarItem;
use crate::tui::msg::SweepResult;
use crate::tui::state::{PendingAction, PendingConfirmation};
use anyhow::anyhow;
use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

// ─────────────────────────────────────────────────────────────────────────────
// Fakes
// ─────────────────────────────────────────────────────────────────────────────

struct FakeSink {
    open: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl PaneSink for FakeSink {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.sent.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }

    fn resize(&mut self, _cols: u16, _rows: u16) -> Result<()> {
        Ok(())
    }

    fn contents(&self) -> String {
        String::new()
    }

    fn close(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

struct FakeWorkingCopy {
    checked_out: bool,
}

#[async_trait]
impl WorkingCopy for FakeWorkingCopy {
    fn path(&self) -> PathBuf {
        PathBuf::from("/worktrees/fake")
    }

    fn branch(&self) -> String {
        "hive/fake".into()
    }

    async fn is_branch_checked_out(&self) -> Result<bool> {
        Ok(self.checked_out)
    }

    async fn diff_stats(&self) -> Result<DiffStats> {
        Ok(DiffStats {
            added: 3,
            removed: 1,
            files: vec!["src/lib.rs".into()],
        })
    }

    async fn has_diverged(&self) -> Result<bool> {
        Ok(false)
    }

    async fn push_changes(&self, _message: &str, _sync: bool) -> Result<()> {
        Ok(())
    }

    async fn generate_pr_body(&self) -> Result<String> {
        Ok("body".into())
    }

    async fn create_pr(&self, _title: &str, _body: &str, _commit_message: &str) -> Result<String> {
        Ok("https://example.invalid/pr/1".into())
    }
}

#[derive(Default)]
struct FakeBackend {
    /// Session ids whose branch is checked out in the main repository
    checked_out: Mutex<HashSet<String>>,
    killed: Mutex<Vec<String>>,
    cleaned: Mutex<Vec<String>>,
    prompts: Mutex<Vec<(String, String)>>,
    open_sinks: Arc<AtomicUsize>,
    sink_running: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl FakeBackend {
    fn new() -> Self {
        let backend = Self::default();
        backend.sink_running.store(true, Ordering::SeqCst);
        backend
    }
}

#[async_trait]
impl SessionBackend for FakeBackend {
    async fn start(&self, session: &Session, _shared: Option<&SharedWorktree>) -> Result<StartInfo> {
        Ok(StartInfo {
            branch: format!("hive/{}", session.title),
        })
    }

    async fn pause(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn resume(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn restart(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn kill(&self, id: &str) -> Result<()> {
        self.killed.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn send_prompt(&self, id: &str, prompt: &str) -> Result<()> {
        self.prompts
            .lock()
            .unwrap()
            .push((id.to_string(), prompt.to_string()));
        Ok(())
    }

    async fn tap_enter(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn snapshot(&self, _id: &str) -> Result<Snapshot> {
        Ok(Snapshot::default())
    }

    async fn preview(&self, id: &str) -> Result<String> {
        Ok(format!("output of {}", id))
    }

    async fn working_copy(&self, id: &str) -> Result<Arc<dyn WorkingCopy>> {
        let checked_out = self.checked_out.lock().unwrap().contains(id);
        Ok(Arc::new(FakeWorkingCopy { checked_out }))
    }

    async fn is_alive(&self, _id: &str) -> bool {
        true
    }

    fn attach(&self, _id: &str, _pane: PaneKind, _cols: u16, _rows: u16) -> Result<Box<dyn PaneSink>> {
        self.open_sinks.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSink {
            open: self.open_sinks.clone(),
            running: self.sink_running.clone(),
            sent: self.sent.clone(),
        }))
    }

    async fn setup_topic(&self, topic: &Topic) -> Result<Option<SharedWorktree>> {
        Ok(topic.shared_worktree.then(|| SharedWorktree {
            path: PathBuf::from("/worktrees/topic"),
            branch: format!("hive/{}", topic.name),
        }))
    }

    async fn cleanup_topic(&self, topic: &Topic) -> Result<()> {
        self.cleaned.lock().unwrap().push(topic.name.clone());
        Ok(())
    }

    async fn zen(&self, _id: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Saved {
    sessions: Vec<Session>,
    topics: Vec<Topic>,
    recent: Vec<PathBuf>,
}

struct MemoryStore(Arc<Mutex<Saved>>);

impl Persistence for MemoryStore {
    fn save_instances(&self, sessions: &[Session]) -> Result<()> {
        self.0.lock().unwrap().sessions = sessions.to_vec();
        Ok(())
    }

    fn load_instances(&self) -> Result<Vec<Session>> {
        Ok(self.0.lock().unwrap().sessions.clone())
    }

    fn save_topics(&self, topics: &[Topic]) -> Result<()> {
        self.0.lock().unwrap().topics = topics.to_vec();
        Ok(())
    }

    fn load_topics(&self) -> Result<Vec<Topic>> {
        Ok(self.0.lock().unwrap().topics.clone())
    }

    fn save_recent_repos(&self, repos: &[PathBuf]) -> Result<()> {
        self.0.lock().unwrap().recent = repos.to_vec();
        Ok(())
    }

    fn load_recent_repos(&self) -> Result<Vec<PathBuf>> {
        Ok(self.0.lock().unwrap().recent.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

const REPO: &str = "/work/repo";

fn running(title: &str) -> Session {
    let mut session = Session::new(SessionOptions {
        title: title.into(),
        repo_path: PathBuf::from(REPO),
        program: "claude".into(),
        ..Default::default()
    });
    session.started = true;
    session
}

struct Harness {
    app: App,
    backend: Arc<FakeBackend>,
    saved: Arc<Mutex<Saved>>,
}

impl Harness {
    fn new(sessions: Vec<Session>, topics: Vec<Topic>) -> Self {
        let saved = Arc::new(Mutex::new(Saved {
            sessions,
            topics,
            recent: vec![],
        }));
        let backend = Arc::new(FakeBackend::new());
        let mut config = Config::default();
        config.timing.prompt_delay_ms = 0;

        let mut app = App::new(
            config,
            backend.clone(),
            Box::new(MemoryStore(saved.clone())),
            LogBuffer::new(),
            CancellationToken::new(),
            vec![PathBuf::from(REPO)],
        )
        .unwrap();
        app.update(Msg::Resize(120, 40));
        Self {
            app,
            backend,
            saved,
        }
    }

    /// Fold a message and everything it triggers. Timers are not run;
    /// their messages are returned instead.
    async fn send(&mut self, msg: Msg) -> Vec<Msg> {
        let mut queue = VecDeque::from([msg]);
        let mut timers = Vec::new();
        while let Some(msg) = queue.pop_front() {
            for task in self.app.update(msg) {
                match task {
                    Task::Ready(msg) => queue.push_back(msg),
                    Task::After(_, msg) => timers.push(msg),
                    Task::Spawn(future) => queue.push_back(future.await),
                    Task::Intake(_) => {}
                }
            }
        }
        timers
    }

    async fn press(&mut self, code: KeyCode) -> Vec<Msg> {
        self.send(Msg::Key(KeyEvent::new(code, KeyModifiers::NONE)))
            .await
    }

    async fn shift(&mut self, code: KeyCode) -> Vec<Msg> {
        self.send(Msg::Key(KeyEvent::new(code, KeyModifiers::SHIFT)))
            .await
    }

    async fn type_text(&mut self, text: &str) {
        for ch in text.chars() {
            self.press(KeyCode::Char(ch)).await;
        }
    }

    /// Submit a brain action and return its reply
    async fn action(
        &mut self,
        kind: ActionType,
        pairs: Vec<(&str, serde_json::Value)>,
    ) -> ActionResponse {
        let (request, rx) = ActionRequest::new(kind, params(pairs));
        let (_sender, intake) = brain::channel();
        self.send(Msg::Action { request, intake }).await;
        expect_reply(rx)
    }

    /// Run tasks that were held back from `update`
    async fn finish(&mut self, tasks: Vec<Task>) {
        for task in tasks {
            if let Task::Spawn(future) = task {
                let msg = future.await;
                self.send(msg).await;
            }
        }
    }

    fn id_of(&self, title: &str) -> String {
        self.app.list.by_title(title).unwrap().id.clone()
    }
}

fn expect_reply(mut rx: oneshot::Receiver<ActionResponse>) -> ActionResponse {
    rx.try_recv().expect("action was not answered")
}

// ─────────────────────────────────────────────────────────────────────────────
// Brain gateway
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_without_title_changes_nothing() {
    let mut h = Harness::new(vec![running("a")], vec![]);

    let reply = h
        .action(ActionType::CreateSession, vec![("title", json!(""))])
        .await;

    assert!(!reply.ok);
    assert_eq!(reply.error.as_deref(), Some("title is required"));
    assert_eq!(h.app.list.len(), 1);
    assert_eq!(h.app.list.visible_ids().len(), 1);
}

#[tokio::test]
async fn kill_of_unknown_target_names_it() {
    let mut h = Harness::new(vec![running("a")], vec![]);

    let reply = h
        .action(ActionType::KillSession, vec![("target", json!("ghost"))])
        .await;

    assert!(!reply.ok);
    assert!(reply.error.unwrap().contains("ghost"));
    assert_eq!(h.app.list.len(), 1);
    assert!(h.backend.killed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn kill_refuses_a_checked_out_branch() {
    let mut h = Harness::new(vec![running("demo")], vec![]);
    let id = h.id_of("demo");
    h.backend.checked_out.lock().unwrap().insert(id.clone());

    let reply = h
        .action(ActionType::KillSession, vec![("target", json!("demo"))])
        .await;

    assert!(!reply.ok);
    assert!(reply.error.unwrap().contains("currently checked out"));
    assert!(h.app.list.get(&id).is_some());
    assert!(h.app.list.visible_ids().contains(&id));
    assert_eq!(h.app.list.get(&id).unwrap().status, Status::Ready);
    assert!(h.app.error_message().unwrap().contains("checked out"));
}

#[tokio::test]
async fn create_replies_once_after_the_agent_starts() {
    let mut h = Harness::new(vec![running("planner")], vec![]);

    let reply = h
        .action(
            ActionType::CreateSession,
            vec![
                ("title", json!("worker")),
                ("prompt", json!("write tests")),
                ("source_instance", json!("planner")),
            ],
        )
        .await;

    assert!(reply.ok);
    let data = reply.data.unwrap();
    assert_eq!(data["title"], "worker");
    assert_eq!(data["status"], "created");

    let worker = h.app.list.by_title("worker").unwrap();
    assert!(worker.started);
    assert_eq!(worker.parent_title, "planner");
    assert_eq!(worker.branch, "hive/worker");
    let prompts = h.backend.prompts.lock().unwrap();
    assert_eq!(prompts.as_slice(), &[(worker.id.clone(), "write tests".to_string())]);
}

#[tokio::test]
async fn duplicate_title_is_rejected() {
    let mut h = Harness::new(vec![running("a")], vec![]);

    let reply = h
        .action(ActionType::CreateSession, vec![("title", json!("a"))])
        .await;

    assert_eq!(reply.error.as_deref(), Some("instance \"a\" already exists"));
    assert_eq!(h.app.list.len(), 1);
}

#[tokio::test]
async fn inject_reaches_a_running_session() {
    let mut h = Harness::new(vec![running("a")], vec![]);

    let reply = h
        .action(
            ActionType::InjectMessage,
            vec![
                ("to", json!("a")),
                ("content", json!("rebase please")),
                ("from", json!("lead")),
            ],
        )
        .await;

    assert!(reply.ok);
    let prompts = h.backend.prompts.lock().unwrap();
    assert_eq!(prompts[0].1, "[HIVE] lead says: rebase please");
}

#[tokio::test]
async fn pause_then_resume_through_the_gateway() {
    let mut h = Harness::new(vec![running("a")], vec![]);
    let id = h.id_of("a");

    let reply = h
        .action(ActionType::PauseSession, vec![("target", json!("a"))])
        .await;
    assert!(reply.ok);
    assert_eq!(h.app.list.get(&id).unwrap().status, Status::Paused);

    let reply = h
        .action(ActionType::PauseSession, vec![("target", json!("a"))])
        .await;
    assert_eq!(reply.error.as_deref(), Some("instance \"a\" is already paused"));

    let reply = h
        .action(ActionType::ResumeSession, vec![("target", json!("a"))])
        .await;
    assert!(reply.ok);
    assert_eq!(h.app.list.get(&id).unwrap().status, Status::Ready);
}

#[tokio::test]
async fn operations_wait_for_the_one_in_flight() {
    let mut h = Harness::new(vec![running("a")], vec![]);
    let id = h.id_of("a");
    let busy = "instance \"a\" is busy with another operation";

    // The pause is dispatched but its result has not come back
    let pausing = h.app.pause_session(&id, None);
    assert_eq!(h.app.list.get(&id).unwrap().status, Status::Loading);

    let reply = h
        .action(
            ActionType::InjectMessage,
            vec![("to", json!("a")), ("content", json!("hello"))],
        )
        .await;
    assert_eq!(reply.error.as_deref(), Some(busy));
    for kind in [
        ActionType::PauseSession,
        ActionType::ResumeSession,
        ActionType::KillSession,
    ] {
        let reply = h.action(kind, vec![("target", json!("a"))]).await;
        assert_eq!(reply.error.as_deref(), Some(busy));
    }
    assert!(h.backend.prompts.lock().unwrap().is_empty());
    assert!(h.backend.killed.lock().unwrap().is_empty());
    assert_eq!(h.app.list.get(&id).unwrap().status, Status::Loading);

    for key in ['D', 'i', 'r', 'c'] {
        h.app.error = None;
        h.press(KeyCode::Char(key)).await;
        assert!(h.app.state.is_default(), "{} opened {}", key, h.app.state.name());
        assert_eq!(h.app.error_message(), Some(busy));
    }

    h.finish(pausing).await;
    assert!(h.app.list.get(&id).unwrap().is_paused());
}

#[tokio::test]
async fn unknown_action_is_answered() {
    let mut h = Harness::new(vec![], vec![]);

    let reply = h
        .action(ActionType::from("merge_everything"), vec![])
        .await;

    assert_eq!(
        reply.error.as_deref(),
        Some("unknown action type: merge_everything")
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyboard flows
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn legend_keys_are_flashed_then_handled() {
    let mut h = Harness::new(vec![], vec![]);

    let tasks = h
        .app
        .update(Msg::Key(KeyEvent::new(KeyCode::Char('?'), KeyModifiers::NONE)));
    assert_eq!(h.app.highlight, Some(GlobalKey::Help));
    assert!(h.app.state.is_default());
    assert!(matches!(tasks[0], Task::Ready(Msg::Key(_))));
    assert!(matches!(tasks[1], Task::After(_, Msg::KeyUp)));

    h.press(KeyCode::Char('?')).await;
    assert!(matches!(h.app.state, UiState::Help { .. }));
    h.send(Msg::KeyUp).await;
    assert_eq!(h.app.highlight, None);
}

#[tokio::test]
async fn new_session_from_keys() {
    let mut h = Harness::new(vec![], vec![]);

    h.press(KeyCode::Char('n')).await;
    assert!(matches!(h.app.state, UiState::CreatingSession { .. }));
    assert_eq!(h.app.list.len(), 1);

    h.type_text("fix-auth").await;
    h.press(KeyCode::Enter).await;

    assert!(h.app.state.is_default());
    let session = h.app.list.by_title("fix-auth").unwrap();
    assert!(session.started);
    assert_eq!(session.status, Status::Ready);
    assert_eq!(h.saved.lock().unwrap().sessions.len(), 1);
}

#[tokio::test]
async fn empty_name_keeps_the_overlay_open() {
    let mut h = Harness::new(vec![], vec![]);

    h.press(KeyCode::Char('n')).await;
    h.press(KeyCode::Enter).await;

    assert!(matches!(h.app.state, UiState::CreatingSession { .. }));
    assert_eq!(h.app.error_message(), Some("title cannot be empty"));

    h.press(KeyCode::Esc).await;
    assert!(h.app.state.is_default());
    assert_eq!(h.app.list.len(), 0);
}

#[tokio::test]
async fn prompt_typed_while_starting_is_sent_after_start() {
    let mut h = Harness::new(vec![], vec![]);

    h.press(KeyCode::Char('N')).await;
    h.type_text("w").await;
    // Submit the name but hold back the start result
    let tasks = h
        .app
        .update(Msg::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
    assert!(matches!(h.app.state, UiState::EnteringPrompt { .. }));
    h.type_text("go").await;
    h.press(KeyCode::Enter).await;
    assert!(h.backend.prompts.lock().unwrap().is_empty());

    for task in tasks {
        if let Task::Spawn(future) = task {
            let msg = future.await;
            h.send(msg).await;
        }
    }
    let prompts = h.backend.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].1, "go");
}

#[tokio::test]
async fn confirmed_action_is_the_one_captured() {
    let mut h = Harness::new(vec![running("a"), running("b")], vec![]);
    let a = h.id_of("a");
    let b = h.id_of("b");

    let first = PendingAction::KillSession { id: a.clone() };
    h.app.state = UiState::Confirm(PendingConfirmation {
        message: "[!] Kill session 'a'?".into(),
        action: first.clone(),
    });
    // A newer question replaces the first before it is answered
    h.app.state = UiState::Confirm(PendingConfirmation {
        message: "[!] Kill session 'b'?".into(),
        action: PendingAction::KillSession { id: b.clone() },
    });

    let tasks = h.app.run_action(first);
    for task in tasks {
        if let Task::Spawn(future) = task {
            let msg = future.await;
            h.send(msg).await;
        }
    }
    assert!(h.app.list.get(&a).is_none());
    assert!(h.app.list.get(&b).is_some());
    assert_eq!(h.backend.killed.lock().unwrap().as_slice(), &[a]);
}

#[tokio::test]
async fn kill_from_keys_asks_first() {
    let mut h = Harness::new(vec![running("a")], vec![]);

    h.press(KeyCode::Char('D')).await;
    match &h.app.state {
        UiState::Confirm(pending) => assert_eq!(pending.message, "[!] Kill session 'a'?"),
        other => panic!("expected confirmation, got {}", other.name()),
    }

    h.press(KeyCode::Char('x')).await;
    assert!(matches!(h.app.state, UiState::Confirm(_)));
    h.press(KeyCode::Char('y')).await;
    assert!(h.app.state.is_default());
    assert_eq!(h.app.list.len(), 0);
}

#[tokio::test]
async fn resume_key_leaves_a_running_session_alone() {
    let mut h = Harness::new(vec![running("a")], vec![]);
    let id = h.id_of("a");

    h.press(KeyCode::Char('r')).await;

    assert!(h.app.state.is_default());
    assert_eq!(h.app.error_message(), None);
    assert_eq!(h.app.list.get(&id).unwrap().status, Status::Ready);
}

#[tokio::test]
async fn search_enter_keeps_the_filter() {
    let mut h = Harness::new(vec![running("auth-fix"), running("docs")], vec![]);

    h.press(KeyCode::Char('/')).await;
    h.type_text("auth").await;
    assert_eq!(h.app.list.visible_ids().len(), 1);
    h.press(KeyCode::Enter).await;
    assert!(h.app.state.is_default());
    assert_eq!(h.app.list.visible_ids().len(), 1);

    h.press(KeyCode::Char('/')).await;
    h.press(KeyCode::Esc).await;
    assert_eq!(h.app.list.visible_ids().len(), 2);
}

#[tokio::test]
async fn topic_auto_yes_cascades_to_members() {
    let mut member = running("a");
    member.topic_name = "auth".into();
    let topic = Topic::new("auth", PathBuf::from(REPO), false);
    let mut h = Harness::new(vec![member, running("b")], vec![topic]);

    h.app.list.select_sidebar_item(&SidebarItem::Topic("auth".into()));
    h.app.nav = NavPosition::Sidebar;
    h.press(KeyCode::Char('y')).await;

    assert!(h.app.list.topic("auth").unwrap().auto_yes);
    assert!(h.app.list.by_title("a").unwrap().auto_yes);
    assert!(!h.app.list.by_title("b").unwrap().auto_yes);
    assert!(h.saved.lock().unwrap().topics[0].auto_yes);
}

fn grouped(title: &str, topic: &str) -> Session {
    let mut session = running(title);
    session.topic_name = topic.into();
    session
}

#[tokio::test]
async fn deleting_a_topic_kills_members_before_cleanup() {
    let topic = Topic::new("auth", PathBuf::from(REPO), false);
    let mut h = Harness::new(
        vec![grouped("a", "auth"), grouped("b", "auth"), running("c")],
        vec![topic],
    );

    let tasks = h.app.delete_topic("auth", true);
    // Nothing is cleaned up while the kills are out
    assert!(h.app.list.topic("auth").is_some());
    assert!(h.backend.cleaned.lock().unwrap().is_empty());

    h.finish(tasks).await;
    assert!(h.app.list.topic("auth").is_none());
    assert_eq!(h.backend.killed.lock().unwrap().len(), 2);
    assert_eq!(h.backend.cleaned.lock().unwrap().as_slice(), &["auth".to_string()]);
    assert_eq!(h.app.list.len(), 1);
    assert!(h.saved.lock().unwrap().topics.is_empty());
}

#[tokio::test]
async fn topic_survives_a_member_that_cannot_be_killed() {
    let topic = Topic::new("auth", PathBuf::from(REPO), false);
    let mut h = Harness::new(vec![grouped("a", "auth"), grouped("b", "auth")], vec![topic]);
    let a = h.id_of("a");
    let b = h.id_of("b");
    h.backend.checked_out.lock().unwrap().insert(a.clone());

    let tasks = h.app.delete_topic("auth", true);
    h.finish(tasks).await;

    assert!(h.app.list.topic("auth").is_some());
    assert!(h.backend.cleaned.lock().unwrap().is_empty());
    let refused = h.app.list.get(&a).unwrap();
    assert_eq!(refused.topic_name, "auth");
    assert_eq!(refused.status, Status::Ready);
    assert!(h.app.list.get(&b).is_none());
    assert_eq!(
        h.app.error_message(),
        Some("kept topic auth: not every instance could be killed")
    );
}

#[tokio::test]
async fn ungrouping_a_topic_still_cleans_it_up() {
    let topic = Topic::new("auth", PathBuf::from(REPO), false);
    let mut h = Harness::new(vec![grouped("a", "auth"), grouped("b", "auth")], vec![topic]);

    let tasks = h.app.delete_topic("auth", false);
    h.finish(tasks).await;

    assert!(h.app.list.topic("auth").is_none());
    assert!(h.backend.killed.lock().unwrap().is_empty());
    assert_eq!(h.backend.cleaned.lock().unwrap().as_slice(), &["auth".to_string()]);
    assert!(h.app.list.all().iter().all(|s| s.topic_name.is_empty()));
    assert!(h.saved.lock().unwrap().sessions.iter().all(|s| s.topic_name.is_empty()));
}

#[tokio::test]
async fn new_shared_topic_gets_its_worktree() {
    let mut h = Harness::new(vec![], vec![]);

    h.press(KeyCode::Char('T')).await;
    h.type_text("payments").await;
    h.press(KeyCode::Enter).await;
    assert!(matches!(h.app.state, UiState::ConfirmingTopicSharing { .. }));
    h.press(KeyCode::Char('y')).await;

    let topic = h.app.list.topic("payments").unwrap();
    assert!(topic.started);
    assert_eq!(topic.branch, "hive/payments");
    assert_eq!(h.app.list.sidebar_item(), SidebarItem::Topic("payments".into()));
}

#[tokio::test]
async fn sessions_in_shared_topics_cannot_move() {
    let mut member = running("a");
    member.topic_name = "shared".into();
    let topic = Topic::new("shared", PathBuf::from(REPO), true);
    let mut h = Harness::new(vec![member], vec![topic]);

    h.press(KeyCode::Char('m')).await;

    assert!(h.app.state.is_default());
    assert_eq!(
        h.app.error_message(),
        Some("cannot move instances in shared-worktree topics")
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Focus
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn shift_navigation_keeps_one_pane_attached() {
    let mut h = Harness::new(vec![running("a")], vec![]);

    h.press(KeyCode::Enter).await;
    assert!(matches!(
        h.app.state,
        UiState::FocusedOnPane {
            pane: PaneKind::Agent
        }
    ));
    assert_eq!(h.backend.open_sinks.load(Ordering::SeqCst), 1);

    // Agent → Shell swaps sinks, Shell → Diff has none
    h.shift(KeyCode::Right).await;
    assert_eq!(h.app.nav, NavPosition::ShellPane);
    assert_eq!(h.backend.open_sinks.load(Ordering::SeqCst), 1);
    h.shift(KeyCode::Right).await;
    assert_eq!(h.app.nav, NavPosition::DiffPane);
    assert_eq!(h.backend.open_sinks.load(Ordering::SeqCst), 0);
    h.shift(KeyCode::Left).await;
    assert_eq!(h.backend.open_sinks.load(Ordering::SeqCst), 1);

    h.send(Msg::Key(KeyEvent::new(KeyCode::Char('o'), KeyModifiers::CONTROL)))
        .await;
    assert!(h.app.state.is_default());
    assert_eq!(h.backend.open_sinks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn shift_down_moves_the_focused_pane_to_the_next_session() {
    let mut h = Harness::new(vec![running("a"), running("b")], vec![]);
    let ids = h.app.list.visible_ids().to_vec();

    h.press(KeyCode::Char('t')).await;
    assert_eq!(h.app.focus.session_id(), Some(ids[0].as_str()));
    h.shift(KeyCode::Down).await;

    assert_eq!(h.backend.open_sinks.load(Ordering::SeqCst), 1);
    assert_eq!(h.app.focus.session_id(), Some(ids[1].as_str()));
    assert_eq!(h.app.focus.pane(), Some(PaneKind::Shell));
    assert!(matches!(
        h.app.state,
        UiState::FocusedOnPane {
            pane: PaneKind::Shell
        }
    ));
}

#[tokio::test]
async fn shift_down_onto_a_paused_session_only_selects_it() {
    let mut h = Harness::new(vec![running("a"), running("b")], vec![]);
    let ids = h.app.list.visible_ids().to_vec();
    h.app.list.update(&ids[1], |s| s.set_status(Status::Paused));

    h.press(KeyCode::Char('t')).await;
    assert_eq!(h.backend.open_sinks.load(Ordering::SeqCst), 1);
    h.shift(KeyCode::Down).await;

    assert!(h.app.state.is_default());
    assert_eq!(h.backend.open_sinks.load(Ordering::SeqCst), 0);
    assert!(!h.app.focus.is_attached());
    assert_eq!(h.app.list.selected_id(), Some(ids[1].as_str()));
}

#[tokio::test]
async fn focused_keys_reach_the_pane() {
    let mut h = Harness::new(vec![running("a")], vec![]);

    h.press(KeyCode::Enter).await;
    h.press(KeyCode::Char('l')).await;
    h.press(KeyCode::Enter).await;

    assert_eq!(h.backend.sent.lock().unwrap().as_slice(), b"l\r");
}

#[tokio::test]
async fn dead_sink_ends_focus() {
    let mut h = Harness::new(vec![running("a")], vec![]);

    h.press(KeyCode::Enter).await;
    h.backend.sink_running.store(false, Ordering::SeqCst);
    h.press(KeyCode::Char('x')).await;

    assert!(h.app.state.is_default());
    assert!(!h.app.focus.is_attached());
}

#[tokio::test]
async fn pausing_the_focused_session_releases_focus() {
    let mut h = Harness::new(vec![running("a")], vec![]);
    let id = h.id_of("a");

    h.press(KeyCode::Enter).await;
    let tasks = h.app.pause_session(&id, None);
    for task in tasks {
        if let Task::Spawn(future) = task {
            let msg = future.await;
            h.send(msg).await;
        }
    }

    assert!(h.app.state.is_default());
    assert_eq!(h.backend.open_sinks.load(Ordering::SeqCst), 0);
    assert!(h.app.list.get(&id).unwrap().is_paused());
}

// ─────────────────────────────────────────────────────────────────────────────
// Background refresh
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stale_preview_is_discarded() {
    let mut h = Harness::new(vec![running("a"), running("b")], vec![]);
    let generation = h.app.list.generation();

    h.app.list.select_next();
    h.send(Msg::PreviewCaptured {
        generation,
        content: "old".into(),
    })
    .await;
    assert_eq!(h.app.preview, "");

    h.send(Msg::PreviewTick).await;
    let selected = h.app.list.selected_id().unwrap().to_string();
    assert_eq!(h.app.preview, format!("output of {}", selected));
}

#[tokio::test]
async fn sweep_marks_finished_work_unseen() {
    let mut h = Harness::new(vec![running("a"), running("b")], vec![]);
    let other = h
        .app
        .list
        .all()
        .iter()
        .find(|s| !h.app.list.is_selected(&s.id))
        .unwrap()
        .id
        .clone();
    h.app.list.update(&other, |s| s.set_status(Status::Running));

    let timers = h
        .send(Msg::MetadataSwept(vec![SweepResult {
            id: other.clone(),
            alive: true,
            snapshot: Some(Snapshot {
                updated: false,
                has_prompt: false,
            }),
            diff: None,
            tapped: false,
        }]))
        .await;

    let session = h.app.list.get(&other).unwrap();
    assert_eq!(session.status, Status::Ready);
    assert!(session.notified);
    assert!(!session.prompt_detected);
    assert!(timers.iter().any(|m| matches!(m, Msg::MetadataTick)));
}

#[tokio::test]
async fn sweep_leaves_prompt_waiting_sessions_running() {
    let mut h = Harness::new(vec![running("a"), running("b")], vec![]);
    let ids = h.app.list.visible_ids().to_vec();
    for id in &ids {
        h.app.list.update(id, |s| s.set_status(Status::Running));
    }
    let waiting = |id: &String| SweepResult {
        id: id.clone(),
        alive: true,
        snapshot: Some(Snapshot {
            updated: false,
            has_prompt: true,
        }),
        diff: None,
        tapped: false,
    };

    h.send(Msg::MetadataSwept(ids.iter().map(waiting).collect()))
        .await;

    // Unselected: flagged once, status untouched
    let other = h.app.list.get(&ids[1]).unwrap();
    assert_eq!(other.status, Status::Running);
    assert!(other.prompt_detected);
    assert!(other.notified);

    let selected = h.app.list.get(&ids[0]).unwrap();
    assert_eq!(selected.status, Status::Running);
    assert!(selected.prompt_detected);
    assert!(!selected.notified);

    // An auto-accepted prompt clears the flag, still without a status change
    let mut tapped = waiting(&ids[1]);
    tapped.tapped = true;
    h.send(Msg::MetadataSwept(vec![tapped])).await;
    let other = h.app.list.get(&ids[1]).unwrap();
    assert_eq!(other.status, Status::Running);
    assert!(!other.prompt_detected);
}

#[tokio::test]
async fn sweep_leaves_loading_sessions_alone() {
    let mut h = Harness::new(vec![running("a")], vec![]);
    let id = h.id_of("a");
    h.app.list.update(&id, |s| s.set_loading("Pausing..."));

    h.send(Msg::MetadataSwept(vec![SweepResult {
        id: id.clone(),
        alive: false,
        snapshot: None,
        diff: None,
        tapped: false,
    }]))
    .await;

    let session = h.app.list.get(&id).unwrap();
    assert_eq!(session.status, Status::Loading);
    assert!(!session.dead);
}

#[tokio::test]
async fn sweep_applies_diff_stats() {
    let mut h = Harness::new(vec![running("a")], vec![]);
    let id = h.id_of("a");

    h.send(Msg::MetadataTick).await;

    let stats = &h.app.list.get(&id).unwrap().diff_stats;
    assert_eq!((stats.added, stats.removed), (3, 1));
    assert_eq!(stats.files, vec!["src/lib.rs".to_string()]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors, repositories
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn only_the_latest_error_is_cleared() {
    let mut h = Harness::new(vec![], vec![]);

    let first = h.send(Msg::Error(anyhow!("first"))).await;
    h.send(Msg::Error(anyhow!("second"))).await;
    for msg in first {
        h.send(msg).await;
    }
    assert_eq!(h.app.error_message(), Some("second"));
}

#[test]
fn repo_picker_disambiguates_and_marks_active() {
    let mut other = running("x");
    other.repo_path = PathBuf::from("/forks/repo");
    let h = Harness::new(vec![running("a"), other], vec![]);

    let (labels, paths) = h.app.repo_picker_items();

    assert_eq!(
        labels,
        vec!["work/repo (1) ●", "forks/repo (1)", "Open folder..."]
    );
    assert_eq!(paths.last(), Some(&None));
}

#[test]
fn unstarted_sessions_are_not_restored() {
    let mut unstarted = running("half");
    unstarted.started = false;
    let mut loading = running("busy");
    loading.set_loading("Pausing...");

    let h = Harness::new(vec![unstarted, loading], vec![]);

    assert_eq!(h.app.list.len(), 1);
    assert_eq!(h.app.list.by_title("busy").unwrap().status, Status::Ready);
}
